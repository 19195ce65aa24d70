pub mod accounts;
pub mod commands;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod slash;
pub mod transport;

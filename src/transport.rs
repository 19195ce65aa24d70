//! Outbound side of the chat platform as seen by the dispatcher.

use anyhow::Result;
use serde_json::{json, Value};
use serenity::async_trait;

use crate::slash::SlashSchema;

pub const COLOUR_RED: u32 = 0xE74C3C;
pub const COLOUR_DARK_ORANGE: u32 = 0xA84300;
pub const COLOUR_BLURPLE: u32 = 0x5865F2;

/// Where a reply must be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    Channel(u64),
    /// A deferred slash interaction, answered by editing its original response.
    Interaction { channel_id: u64, token: String },
}

impl ReplyTarget {
    pub fn channel_id(&self) -> u64 {
        match self {
            ReplyTarget::Channel(id) => *id,
            ReplyTarget::Interaction { channel_id, .. } => *channel_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub footer: Option<String>,
    pub colour: Option<u32>,
}

impl Embed {
    pub fn titled(title: impl Into<String>) -> Self {
        Embed {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    /// Discord embed object.
    pub fn to_json(&self) -> Value {
        let mut embed = json!({});
        if let Some(title) = &self.title {
            embed["title"] = json!(title);
        }
        if let Some(description) = &self.description {
            embed["description"] = json!(description);
        }
        if let Some(footer) = &self.footer {
            embed["footer"] = json!({ "text": footer });
        }
        if let Some(colour) = self.colour {
            embed["color"] = json!(colour);
        }
        embed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Reply {
            content: None,
            embed: Some(embed),
        }
    }

    /// Message body for message-create and interaction-edit endpoints.
    pub fn to_json(&self) -> Value {
        let embeds: Vec<Value> = self.embed.iter().map(Embed::to_json).collect();
        json!({
            "content": self.content.clone().unwrap_or_default(),
            "embeds": embeds,
        })
    }
}

/// Platform operations the core needs. Failures are logged by the caller and
/// never abort an invocation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_reply(&self, target: &ReplyTarget, reply: Reply) -> Result<()>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()>;

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<()>;

    async fn register_schemas(&self, schemas: &[SlashSchema]) -> Result<()>;
}

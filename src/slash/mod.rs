//! # Slash Schema Synthesis
//!
//! Derives the structured command schema offered to the platform from the
//! module tree. Each command tagged [`CommandTag::Slash`] yields one
//! fragment; module nesting becomes subcommand groups and subcommands.
//! Fragments sharing a top-level name are merged by [`dedup`].
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod dedup;
pub mod register;

use serde::Serialize;

use crate::error::SchemaConflictError;
use crate::registry::{CommandId, CommandTag, ModuleId, ModuleTree, Parameter, ParameterKind};

pub use dedup::deduplicate;

/// Longest description the platform accepts.
pub const MAX_DESCRIPTION_LEN: usize = 100;

const EMPTY_DESCRIPTION: &str = "No description provided.";

/// Platform option type of a leaf parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
}

impl From<ParameterKind> for OptionKind {
    fn from(kind: ParameterKind) -> Self {
        match kind {
            ParameterKind::Number => OptionKind::Number,
            ParameterKind::Integer => OptionKind::Integer,
            ParameterKind::Boolean => OptionKind::Boolean,
            ParameterKind::Channel => OptionKind::Channel,
            ParameterKind::User => OptionKind::User,
            ParameterKind::Role => OptionKind::Role,
            ParameterKind::Text => OptionKind::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterOption {
    pub name: String,
    pub kind: OptionKind,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaOption {
    SubCommandGroup {
        name: String,
        description: String,
        options: Vec<SchemaOption>,
    },
    SubCommand {
        name: String,
        description: String,
        options: Vec<SchemaOption>,
    },
    Parameter(ParameterOption),
}

impl SchemaOption {
    pub fn name(&self) -> &str {
        match self {
            SchemaOption::SubCommandGroup { name, .. } | SchemaOption::SubCommand { name, .. } => name,
            SchemaOption::Parameter(p) => &p.name,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, SchemaOption::Parameter(_))
    }
}

/// One top-level slash command as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlashSchema {
    pub name: String,
    pub description: String,
    pub options: Vec<SchemaOption>,
}

/// Synthesizes every slash-tagged command, then merges fragments by name.
///
/// Fails on the first conflict; callers treat that as fatal at startup.
pub fn build_schemas(tree: &ModuleTree) -> Result<Vec<SlashSchema>, SchemaConflictError> {
    deduplicate(synthesize_schemas(tree))
}

/// One fragment per slash-tagged command, in registration order.
pub fn synthesize_schemas(tree: &ModuleTree) -> Vec<SlashSchema> {
    tree.commands()
        .filter(|(_, command)| command.has_tag(CommandTag::Slash))
        .map(|(id, _)| synthesize_command(tree, id))
        .collect()
}

/// Builds the fragment for a single command.
pub fn synthesize_command(tree: &ModuleTree, id: CommandId) -> SlashSchema {
    let command = tree.command(id);
    let chain = slash_chain(tree, command.module);
    let parameters: Vec<SchemaOption> = command.parameters.iter().map(parameter_option).collect();

    let Some((&top, layers)) = chain.split_first() else {
        return SlashSchema {
            name: slash_name(&command.name),
            description: describe(&command.summary),
            options: parameters,
        };
    };

    // innermost layer first: either the command itself or, when unnamed, its deepest module
    let (mut options, groups) = if !command.name.is_empty() {
        let leaf = SchemaOption::SubCommand {
            name: slash_name(&command.name),
            description: describe(&command.summary),
            options: parameters,
        };
        (vec![leaf], layers)
    } else {
        match layers.split_last() {
            Some((&deepest, rest)) => {
                let module = tree.module(deepest);
                let leaf = SchemaOption::SubCommand {
                    name: slash_name(&module.name),
                    description: describe(&module.summary),
                    options: parameters,
                };
                (vec![leaf], rest)
            }
            None => (parameters, layers),
        }
    };

    for &group in groups.iter().rev() {
        let module = tree.module(group);
        options = vec![SchemaOption::SubCommandGroup {
            name: slash_name(&module.name),
            description: describe(&module.summary),
            options,
        }];
    }

    let top = tree.module(top);
    SlashSchema {
        name: slash_name(&top.name),
        description: describe(&top.summary),
        options,
    }
}

/// Named modules from the top-level ancestor down to `module`.
fn slash_chain(tree: &ModuleTree, module: ModuleId) -> Vec<ModuleId> {
    let mut chain = Vec::new();
    for id in tree.parent_chain(module) {
        chain.push(id);
        if tree.is_top_level(id) {
            break;
        }
    }
    chain.reverse();
    chain.retain(|&id| tree.module(id).contributes_segment());
    chain
}

fn parameter_option(parameter: &Parameter) -> SchemaOption {
    SchemaOption::Parameter(ParameterOption {
        name: parameter.display_name(),
        kind: parameter.kind.into(),
        description: describe(&parameter.summary),
        required: !parameter.optional,
    })
}

fn slash_name(name: &str) -> String {
    name.to_lowercase()
}

fn describe(summary: &str) -> String {
    let summary = summary.trim();
    if summary.is_empty() {
        return EMPTY_DESCRIPTION.to_string();
    }
    if summary.chars().count() <= MAX_DESCRIPTION_LEN {
        return summary.to_string();
    }
    let mut cut: String = summary.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
    cut.push_str("...");
    cut
}

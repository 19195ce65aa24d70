//! Merges fragments that share a top-level name.
//!
//! The platform rejects duplicate top-level names, so sibling commands of one
//! top module are folded into a single schema. Option trees are merged
//! recursively by name; the first occurrence keeps its description.

use std::collections::HashMap;

use super::{SchemaOption, SlashSchema};
use crate::error::SchemaConflictError;

/// Groups fragments by top-level name, preserving first-occurrence order.
pub fn deduplicate(fragments: Vec<SlashSchema>) -> Result<Vec<SlashSchema>, SchemaConflictError> {
    let mut merged: Vec<SlashSchema> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for fragment in fragments {
        match positions.get(&fragment.name) {
            Some(&index) => {
                let target = &mut merged[index];
                let path = target.name.clone();
                merge_options(&mut target.options, fragment.options, &path)?;
            }
            None => {
                positions.insert(fragment.name.clone(), merged.len());
                merged.push(fragment);
            }
        }
    }

    Ok(merged)
}

/// Folds `incoming` into `target` at one nesting level.
fn merge_options(
    target: &mut Vec<SchemaOption>,
    incoming: Vec<SchemaOption>,
    path: &str,
) -> Result<(), SchemaConflictError> {
    for option in incoming {
        check_level_shape(target, &option, path)?;

        let Some(existing) = target.iter_mut().find(|o| o.name() == option.name()) else {
            target.push(option);
            continue;
        };

        match (existing, option) {
            (
                SchemaOption::SubCommandGroup { name, options, .. },
                SchemaOption::SubCommandGroup { options: more, .. },
            )
            | (
                SchemaOption::SubCommand { name, options, .. },
                SchemaOption::SubCommand { options: more, .. },
            ) => {
                let nested = format!("{} {}", path, name);
                merge_options(options, more, &nested)?;
            }
            (SchemaOption::Parameter(left), SchemaOption::Parameter(right)) => {
                if left.kind != right.kind {
                    return Err(conflict(
                        path,
                        &right.name,
                        format!("declared as {:?} and {:?}", left.kind, right.kind),
                    ));
                }
                if left.required != right.required {
                    return Err(conflict(
                        path,
                        &right.name,
                        "declared both required and optional".to_string(),
                    ));
                }
            }
            (existing, option) => {
                return Err(conflict(
                    path,
                    option.name(),
                    format!("{} collides with {}", node_kind(existing), node_kind(&option)),
                ));
            }
        }
    }
    Ok(())
}

/// The platform forbids mixing parameters with subcommands on one level.
fn check_level_shape(
    target: &[SchemaOption],
    option: &SchemaOption,
    path: &str,
) -> Result<(), SchemaConflictError> {
    let Some(other) = target.iter().find(|o| o.is_parameter() != option.is_parameter()) else {
        return Ok(());
    };
    Err(conflict(
        path,
        option.name(),
        format!("{} cannot sit next to {} `{}`", node_kind(option), node_kind(other), other.name()),
    ))
}

fn node_kind(option: &SchemaOption) -> &'static str {
    match option {
        SchemaOption::SubCommandGroup { .. } => "subcommand group",
        SchemaOption::SubCommand { .. } => "subcommand",
        SchemaOption::Parameter(_) => "parameter",
    }
}

fn conflict(path: &str, option: &str, reason: String) -> SchemaConflictError {
    SchemaConflictError {
        path: path.to_string(),
        option: option.to_string(),
        reason,
    }
}

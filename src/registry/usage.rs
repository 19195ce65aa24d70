//! Human readable renderings of commands and modules for help surfaces.

use std::sync::OnceLock;

use regex::Regex;

use super::{CommandId, CommandTag, ModuleId, ModuleTree, Parameter};

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid camel case pattern"))
}

/// `targetUser` / `target_user` -> `target-user`.
pub fn hyphenate(name: &str) -> String {
    camel_boundary()
        .replace_all(name, "$1-$2")
        .replace('_', "-")
        .to_lowercase()
}

/// `<name>` when required, `[name]` when optional.
pub fn format_parameter(parameter: &Parameter) -> String {
    let name = parameter.display_name();
    if parameter.optional {
        format!("[{}]", name)
    } else {
        format!("<{}>", name)
    }
}

/// Prefix, primary alias, then every parameter; each piece ends with a space.
pub fn format_command_usage(tree: &ModuleTree, command: CommandId, prefix: &str) -> String {
    let mut usage = format!("{}{} ", prefix, tree.full_name(command));
    for parameter in &tree.command(command).parameters {
        usage.push_str(&format_parameter(parameter));
        usage.push(' ');
    }
    usage
}

/// `0 commands`, `1 command`, `2 commands`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Summary text, direct command and submodule counts, and the parent if nested.
pub fn format_module_summary(tree: &ModuleTree, id: ModuleId) -> String {
    let module = tree.module(id);
    let mut summary = if module.summary.is_empty() {
        String::from("No description provided.")
    } else {
        module.summary.clone()
    };

    summary.push_str(&format!(
        "\nContains {} and {}.",
        pluralize(module.commands.len(), "command"),
        pluralize(module.submodules.len(), "submodule")
    ));

    if let Some(parent) = module.parent {
        let path = tree.module_path(parent);
        if !path.is_empty() {
            summary.push_str(&format!("\nSubmodule of `{}`.", path.join(" ")));
        }
    }

    summary
}

/// One usage line per visible direct command of `id`, followed by its summary.
pub fn format_module_commands(tree: &ModuleTree, id: ModuleId, prefix: &str) -> String {
    tree.module(id)
        .commands
        .iter()
        .map(|&c| (c, tree.command(c)))
        .filter(|(_, command)| !command.has_tag(CommandTag::Hidden))
        .map(|(c, command)| {
            let usage = format_command_usage(tree, c, prefix);
            if command.summary.is_empty() {
                format!("`{}`", usage.trim_end())
            } else {
                format!("`{}` - {}", usage.trim_end(), command.summary)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::Noop;
    use crate::registry::{CommandBuilder, ModuleBuilder, ParameterKind};

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("targetUser"), "target-user");
        assert_eq!(hyphenate("target_user"), "target-user");
        assert_eq!(hyphenate("reason"), "reason");
        assert_eq!(hyphenate("userID"), "user-id");
    }

    #[test]
    fn test_format_command_usage() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::ungrouped().command(
                    CommandBuilder::new("warn", Noop)
                        .parameter(Parameter::new("user", ParameterKind::User))
                        .parameter(Parameter::new("reason", ParameterKind::Text).optional()),
                ),
            )
            .build();
        let warn = tree.module(tree.roots()[0]).commands[0];
        assert_eq!(format_command_usage(&tree, warn, "!"), "!warn <user> [reason] ");
    }

    #[test]
    fn test_usage_uses_module_path_and_hyphenated_names() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::new("admin").submodule(
                    ModuleBuilder::new("role").command(
                        CommandBuilder::new("give", Noop)
                            .parameter(Parameter::new("targetUser", ParameterKind::User)),
                    ),
                ),
            )
            .build();
        let role = tree.module(tree.roots()[0]).submodules[0];
        let give = tree.module(role).commands[0];
        assert_eq!(format_command_usage(&tree, give, "?"), "?admin role give <target-user> ");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "command"), "0 commands");
        assert_eq!(pluralize(1, "command"), "1 command");
        assert_eq!(pluralize(5, "command"), "5 commands");
    }

    #[test]
    fn test_format_module_summary() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::new("admin")
                    .summary("Server administration")
                    .command(CommandBuilder::new("ban", Noop))
                    .submodule(
                        ModuleBuilder::new("role")
                            .summary("Role management")
                            .command(CommandBuilder::new("add", Noop))
                            .command(CommandBuilder::new("remove", Noop)),
                    ),
            )
            .build();
        let admin = tree.roots()[0];
        let role = tree.module(admin).submodules[0];

        assert_eq!(
            format_module_summary(&tree, admin),
            "Server administration\nContains 1 command and 1 submodule."
        );
        assert_eq!(
            format_module_summary(&tree, role),
            "Role management\nContains 2 commands and 0 submodules.\nSubmodule of `admin`."
        );
        assert_eq!(format_module_summary(&tree, role), format_module_summary(&tree, role));
    }

    #[test]
    fn test_module_commands_skip_hidden() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::new("tools")
                    .command(CommandBuilder::new("shown", Noop).summary("Visible"))
                    .command(CommandBuilder::new("secret", Noop).hidden()),
            )
            .build();
        let listing = format_module_commands(&tree, tree.roots()[0], "!");
        assert_eq!(listing, "`!tools shown` - Visible");
    }
}

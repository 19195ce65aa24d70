//! # Module Tree
//!
//! Static command hierarchy. Modules nest, hold commands and are stored in an
//! arena addressed by [`ModuleId`]/[`CommandId`]; parents are plain indices so
//! the tree never owns a cycle. The tree is assembled once through
//! [`TreeBuilder`] and is read-only afterwards.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod alias;
pub mod usage;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serenity::model::permissions::Permissions;

use crate::dispatch::CommandHandler;
use alias::AliasIndex;

pub use alias::{AliasTarget, Resolution};

/// Index of a module inside its [`ModuleTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(usize);

/// Index of a command inside its [`ModuleTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

/// Semantic type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Number,
    Integer,
    Boolean,
    Channel,
    User,
    Role,
    /// Free text, also the fallback for anything without a dedicated kind.
    Text,
}

impl ParameterKind {
    /// Phrase used in parse failure messages.
    pub fn describe(&self) -> &'static str {
        match self {
            ParameterKind::Number => "a number",
            ParameterKind::Integer => "an integer",
            ParameterKind::Boolean => "true or false",
            ParameterKind::Channel => "a channel",
            ParameterKind::User => "a user",
            ParameterKind::Role => "a role",
            ParameterKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub optional: bool,
    /// Swallows every remaining token of a prefix invocation.
    pub remainder: bool,
    pub summary: String,
}

impl Parameter {
    /// Creates a required parameter.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Parameter {
            name: name.into(),
            kind,
            optional: false,
            remainder: false,
            summary: String::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn remainder(mut self) -> Self {
        self.remainder = true;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Lowercase hyphenated name used in usage strings and slash options.
    pub fn display_name(&self) -> String {
        usage::hyphenate(&self.name)
    }
}

/// Descriptive tags attached to a command at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandTag {
    /// Exposed to the platform as a slash command.
    Slash,
    /// Left out of help listings.
    Hidden,
}

#[derive(Debug, Clone)]
pub struct Module {
    /// Empty for an ungrouped command set.
    pub name: String,
    pub aliases: Vec<String>,
    pub summary: String,
    pub parent: Option<ModuleId>,
    pub submodules: Vec<ModuleId>,
    pub commands: Vec<CommandId>,
    /// Children of a top marker count as top-level modules.
    pub top_marker: bool,
}

impl Module {
    /// Whether the module adds a word to the aliases of everything below it.
    pub fn contributes_segment(&self) -> bool {
        !self.name.is_empty() && !self.top_marker
    }

    /// Name followed by the extra aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

pub struct Command {
    /// Empty when invoking the module itself runs this command.
    pub name: String,
    pub aliases: Vec<String>,
    pub summary: String,
    pub parameters: Vec<Parameter>,
    pub module: ModuleId,
    pub tags: BTreeSet<CommandTag>,
    /// Higher runs first when several commands share an alias.
    pub priority: i32,
    pub required_permissions: Permissions,
    pub handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn has_tag(&self, tag: CommandTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_slash(&self) -> bool {
        self.has_tag(CommandTag::Slash)
    }

    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }

    /// Whether `count` positional arguments fit this command's signature.
    pub fn accepts(&self, count: usize) -> bool {
        let takes_remainder = self.parameters.last().map_or(false, |p| p.remainder);
        count >= self.required_count() && (takes_remainder || count <= self.parameters.len())
    }

    /// Name followed by the extra aliases, or a single empty word when unnamed.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("module", &self.module)
            .field("parameters", &self.parameters)
            .field("tags", &self.tags)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Immutable module/command arena plus its alias index.
pub struct ModuleTree {
    modules: Vec<Module>,
    commands: Vec<Command>,
    roots: Vec<ModuleId>,
    aliases: AliasIndex,
}

impl ModuleTree {
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn command(&self, id: CommandId) -> &Command {
        &self.commands[id.0]
    }

    pub fn roots(&self) -> &[ModuleId] {
        &self.roots
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate().map(|(i, m)| (ModuleId(i), m))
    }

    pub fn commands(&self) -> impl Iterator<Item = (CommandId, &Command)> {
        self.commands.iter().enumerate().map(|(i, c)| (CommandId(i), c))
    }

    pub fn alias_index(&self) -> &AliasIndex {
        &self.aliases
    }

    pub fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.module(id).parent
    }

    /// `id` followed by each ancestor up to its root.
    ///
    /// Walks at most as many steps as there are modules, so a corrupted parent
    /// link can never loop forever.
    pub fn parent_chain(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if chain.len() > self.modules.len() {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Number of ancestors above `id`.
    pub fn depth(&self, id: ModuleId) -> usize {
        self.parent_chain(id).len() - 1
    }

    pub fn is_top_level(&self, id: ModuleId) -> bool {
        match self.parent(id) {
            None => true,
            Some(parent) => self.module(parent).top_marker,
        }
    }

    /// Names of the modules contributing to `id`'s alias path, outermost first.
    pub fn module_path(&self, id: ModuleId) -> Vec<&str> {
        let mut path: Vec<&str> = self
            .parent_chain(id)
            .into_iter()
            .map(|m| self.module(m))
            .filter(|m| m.contributes_segment())
            .map(|m| m.name.as_str())
            .collect();
        path.reverse();
        path
    }

    /// Module path plus command name, the command's primary alias.
    pub fn full_name(&self, id: CommandId) -> String {
        let command = self.command(id);
        let mut words = self.module_path(command.module);
        if !command.name.is_empty() {
            words.push(&command.name);
        }
        words.join(" ").to_lowercase()
    }

    /// Command of `module` that runs when the module itself is invoked.
    pub fn default_command(&self, module: ModuleId) -> Option<CommandId> {
        self.module(module)
            .commands
            .iter()
            .copied()
            .find(|&c| self.command(c).name.is_empty())
    }
}

/// Registration-time description of a module subtree.
#[derive(Default)]
pub struct ModuleBuilder {
    name: String,
    aliases: Vec<String>,
    summary: String,
    top_marker: bool,
    commands: Vec<CommandBuilder>,
    submodules: Vec<ModuleBuilder>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A nameless module whose commands are invoked by their own names.
    pub fn ungrouped() -> Self {
        ModuleBuilder::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Marks this module as a container whose children are top-level modules.
    pub fn top_module(mut self) -> Self {
        self.top_marker = true;
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn submodule(mut self, module: ModuleBuilder) -> Self {
        self.submodules.push(module);
        self
    }
}

/// Registration-time description of a command.
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    summary: String,
    parameters: Vec<Parameter>,
    tags: BTreeSet<CommandTag>,
    priority: i32,
    required_permissions: Permissions,
    handler: Arc<dyn CommandHandler>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        CommandBuilder {
            name: name.into(),
            aliases: Vec::new(),
            summary: String::new(),
            parameters: Vec::new(),
            tags: BTreeSet::new(),
            priority: 0,
            required_permissions: Permissions::empty(),
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn slash(self) -> Self {
        self.tag(CommandTag::Slash)
    }

    pub fn hidden(self) -> Self {
        self.tag(CommandTag::Hidden)
    }

    pub fn tag(mut self, tag: CommandTag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn requires(mut self, permissions: Permissions) -> Self {
        self.required_permissions |= permissions;
        self
    }
}

#[derive(Default)]
pub struct TreeBuilder {
    roots: Vec<ModuleBuilder>,
}

impl TreeBuilder {
    pub fn module(mut self, module: ModuleBuilder) -> Self {
        self.roots.push(module);
        self
    }

    pub fn build(self) -> ModuleTree {
        let mut tree = ModuleTree {
            modules: Vec::new(),
            commands: Vec::new(),
            roots: Vec::new(),
            aliases: AliasIndex::default(),
        };

        for root in self.roots {
            let id = tree.insert(root, None);
            tree.roots.push(id);
        }

        tree.aliases = AliasIndex::build(&tree);
        tree
    }
}

impl ModuleTree {
    fn insert(&mut self, builder: ModuleBuilder, parent: Option<ModuleId>) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(Module {
            name: builder.name,
            aliases: builder.aliases,
            summary: builder.summary,
            parent,
            submodules: Vec::new(),
            commands: Vec::new(),
            top_marker: builder.top_marker,
        });

        for command in builder.commands {
            let command_id = CommandId(self.commands.len());
            self.commands.push(Command {
                name: command.name,
                aliases: command.aliases,
                summary: command.summary,
                parameters: command.parameters,
                module: id,
                tags: command.tags,
                priority: command.priority,
                required_permissions: command.required_permissions,
                handler: command.handler,
            });
            self.modules[id.0].commands.push(command_id);
        }

        for submodule in builder.submodules {
            let child = self.insert(submodule, Some(id));
            self.modules[id.0].submodules.push(child);
        }

        id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dispatch::{CommandContext, CommandHandler, CommandResult};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serenity::async_trait;

    pub(crate) struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn run(&self, _ctx: &CommandContext<'_>) -> CommandResult {
            Ok(None)
        }
    }

    fn random_module(rng: &mut StdRng, depth: usize, counter: &mut usize) -> ModuleBuilder {
        *counter += 1;
        let mut module = ModuleBuilder::new(format!("m{}", counter));
        for i in 0..rng.random_range(0..3) {
            module = module.command(CommandBuilder::new(format!("c{}", i), Noop));
        }
        if depth > 0 {
            for _ in 0..rng.random_range(0..3) {
                module = module.submodule(random_module(rng, depth - 1, counter));
            }
        }
        module
    }

    fn declared_depths(tree: &ModuleTree) -> Vec<(ModuleId, usize)> {
        let mut out = Vec::new();
        let mut stack: Vec<(ModuleId, usize)> = tree.roots().iter().map(|&r| (r, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            for &child in &tree.module(id).submodules {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    #[test]
    fn test_parent_chain_terminates_at_nesting_depth() {
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut counter = 0;
            let mut builder = ModuleTree::builder();
            for _ in 0..rng.random_range(1..4) {
                builder = builder.module(random_module(&mut rng, 4, &mut counter));
            }
            let tree = builder.build();

            for (id, depth) in declared_depths(&tree) {
                let chain = tree.parent_chain(id);
                assert_eq!(chain.len(), depth + 1, "seed {}", seed);
                assert_eq!(tree.depth(id), depth);
                let root = *chain.last().unwrap();
                assert!(tree.parent(root).is_none());
            }
        }
    }

    #[test]
    fn test_builder_links_children_and_parents() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::new("admin")
                    .command(CommandBuilder::new("ban", Noop))
                    .submodule(ModuleBuilder::new("role").command(CommandBuilder::new("add", Noop))),
            )
            .build();

        let admin = tree.roots()[0];
        let role = tree.module(admin).submodules[0];
        assert_eq!(tree.parent(role), Some(admin));
        assert_eq!(tree.module(admin).commands.len(), 1);

        let add = tree.module(role).commands[0];
        assert_eq!(tree.command(add).module, role);
        assert_eq!(tree.full_name(add), "admin role add");
        assert!(tree.is_top_level(admin));
        assert!(!tree.is_top_level(role));
    }

    #[test]
    fn test_top_marker_children_are_top_level() {
        let tree = ModuleTree::builder()
            .module(ModuleBuilder::ungrouped().top_module().submodule(ModuleBuilder::new("admin")))
            .build();

        let root = tree.roots()[0];
        let admin = tree.module(root).submodules[0];
        assert!(tree.is_top_level(admin));
        assert_eq!(tree.module_path(admin), vec!["admin"]);
    }

    #[test]
    fn test_accepts_respects_optional_and_remainder() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::ungrouped()
                    .command(
                        CommandBuilder::new("warn", Noop)
                            .parameter(Parameter::new("user", ParameterKind::User))
                            .parameter(Parameter::new("reason", ParameterKind::Text).optional()),
                    )
                    .command(
                        CommandBuilder::new("say", Noop)
                            .parameter(Parameter::new("text", ParameterKind::Text).remainder()),
                    ),
            )
            .build();

        let root = tree.roots()[0];
        let warn = tree.command(tree.module(root).commands[0]);
        assert!(!warn.accepts(0));
        assert!(warn.accepts(1));
        assert!(warn.accepts(2));
        assert!(!warn.accepts(3));

        let say = tree.command(tree.module(root).commands[1]);
        assert!(!say.accepts(0));
        assert!(say.accepts(7));
    }
}

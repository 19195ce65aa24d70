//! Flat alias lookup over the module tree.
//!
//! Every module and command is reachable through its full alias path: the
//! names (or aliases) of each contributing ancestor followed by its own name,
//! joined by single spaces and lower-cased. Input is matched against the
//! longest alias path that prefixes it.

use std::collections::{BTreeSet, HashMap};

use super::{CommandId, ModuleId, ModuleTree};
use crate::error::NotFoundError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasTarget {
    Module(ModuleId),
    Command(CommandId),
}

/// Outcome of resolving input against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub module: ModuleId,
    /// `None` means the module itself was named and should be described.
    pub command: Option<CommandId>,
    /// All commands sharing the matched alias, highest priority first.
    pub overloads: Vec<CommandId>,
    /// Number of input words consumed by the alias.
    pub consumed: usize,
}

#[derive(Debug, Default, Clone)]
pub struct AliasIndex {
    entries: HashMap<String, Vec<AliasTarget>>,
    max_words: usize,
}

impl AliasIndex {
    pub(super) fn build(tree: &ModuleTree) -> Self {
        let mut index = AliasIndex::default();

        for (id, _) in tree.modules() {
            for alias in tree.module_aliases(id) {
                if !alias.is_empty() {
                    index.insert(alias, AliasTarget::Module(id));
                }
            }
        }

        for (id, _) in tree.commands() {
            for alias in tree.command_aliases(id) {
                if !alias.is_empty() {
                    index.insert(alias, AliasTarget::Command(id));
                }
            }
        }

        for targets in index.entries.values_mut() {
            // modules first, then commands by descending priority, registration order otherwise
            targets.sort_by_key(|target| match target {
                AliasTarget::Module(m) => (0, 0, m.0),
                AliasTarget::Command(c) => (1, -tree.command(*c).priority, c.0),
            });
        }

        index
    }

    fn insert(&mut self, alias: String, target: AliasTarget) {
        self.max_words = self.max_words.max(alias.split(' ').count());
        let targets = self.entries.entry(alias).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    pub fn lookup(&self, alias: &str) -> &[AliasTarget] {
        self.entries
            .get(&alias.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Longest alias that prefixes `words`, with the number of words it spans.
    pub fn search<S: AsRef<str>>(&self, words: &[S]) -> Option<(usize, &[AliasTarget])> {
        let lowered: Vec<String> = words.iter().map(|w| w.as_ref().to_lowercase()).collect();
        let longest = lowered.len().min(self.max_words);

        (1..=longest).rev().find_map(|count| {
            self.entries
                .get(&lowered[..count].join(" "))
                .map(|targets| (count, targets.as_slice()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ModuleTree {
    /// Every full alias path of `id`; a single empty string when it adds no words.
    pub fn module_aliases(&self, id: ModuleId) -> Vec<String> {
        let module = self.module(id);
        let inherited = match module.parent {
            Some(parent) => self.module_aliases(parent),
            None => vec![String::new()],
        };

        if !module.contributes_segment() {
            return inherited;
        }

        let mut aliases = Vec::new();
        for prefix in &inherited {
            for name in module.names() {
                aliases.push(join_words(prefix, name));
            }
        }
        aliases
    }

    /// Every full alias path of a command.
    pub fn command_aliases(&self, id: CommandId) -> Vec<String> {
        let command = self.command(id);
        let mut aliases = Vec::new();
        for prefix in self.module_aliases(command.module) {
            for name in command.names() {
                let alias = join_words(&prefix, name);
                if !aliases.contains(&alias) {
                    aliases.push(alias);
                }
            }
        }
        aliases
    }

    /// Flat, de-duplicated set of every module and command alias path.
    pub fn alias_candidates(&self) -> BTreeSet<String> {
        let modules = self.modules().flat_map(|(id, _)| self.module_aliases(id));
        let commands = self.commands().flat_map(|(id, _)| self.command_aliases(id));
        modules.chain(commands).filter(|a| !a.is_empty()).collect()
    }

    /// Resolves whitespace separated input to a module and/or command.
    pub fn resolve(&self, input: &str) -> Result<Resolution, NotFoundError> {
        let words: Vec<&str> = input.split_whitespace().collect();
        self.resolve_words(&words)
    }

    /// Resolves pre-split words; unused trailing words are left to the caller.
    ///
    /// A module matching the same alias as a command wins; the commands kept
    /// as overloads are then only those owned by that module.
    pub fn resolve_words<S: AsRef<str>>(&self, words: &[S]) -> Result<Resolution, NotFoundError> {
        let not_found = || NotFoundError {
            input: words.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" "),
        };
        let (consumed, targets) = self.aliases.search(words).ok_or_else(not_found)?;

        let module = targets.iter().find_map(|t| match t {
            AliasTarget::Module(m) => Some(*m),
            AliasTarget::Command(_) => None,
        });
        let commands = targets.iter().filter_map(|t| match t {
            AliasTarget::Command(c) => Some(*c),
            AliasTarget::Module(_) => None,
        });

        let (module, overloads) = match module {
            Some(module) => {
                let owned: Vec<CommandId> = commands.filter(|&c| self.command(c).module == module).collect();
                (module, owned)
            }
            None => {
                let overloads: Vec<CommandId> = commands.collect();
                let first = *overloads.first().ok_or_else(not_found)?;
                (self.command(first).module, overloads)
            }
        };

        Ok(Resolution {
            module,
            command: overloads.first().copied(),
            overloads,
            consumed,
        })
    }
}

fn join_words(prefix: &str, name: &str) -> String {
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_lowercase(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{} {}", prefix, name.to_lowercase()),
    }
}

//! Normalized invocation descriptors and argument binding.
//!
//! Prefix messages and slash interactions both arrive here and leave as the
//! same thing: a resolved command plus [`BoundArgs`].

use std::sync::OnceLock;

use regex::Regex;
use serenity::model::permissions::Permissions;

use crate::accounts::AccountKey;
use crate::error::CommandError;
use crate::registry::{Command, CommandId, ModuleTree, Parameter, ParameterKind};
use crate::transport::ReplyTarget;

/// Who triggered an invocation and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSource {
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author_id: u64,
    pub permissions: Permissions,
    pub reply_to: ReplyTarget,
}

impl InvocationSource {
    /// Guild-scoped inside guilds, user-scoped in direct messages.
    pub fn account_key(&self) -> AccountKey {
        match self.guild_id {
            Some(guild_id) => AccountKey::guild(guild_id),
            None => AccountKey::user(self.author_id),
        }
    }
}

/// A chat message that may start with a prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInvocation {
    pub source: InvocationSource,
    pub message_id: u64,
    pub content: String,
}

/// A slash interaction: command path plus named option values.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredInvocation {
    pub source: InvocationSource,
    /// Top-level name, then any subcommand group and subcommand.
    pub path: Vec<String>,
    pub options: Vec<(String, ArgValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    FreeText(TextInvocation),
    Structured(StructuredInvocation),
}

impl Invocation {
    pub fn source(&self) -> &InvocationSource {
        match self {
            Invocation::FreeText(text) => &text.source,
            Invocation::Structured(structured) => &structured.source,
        }
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Channel(u64),
    User(u64),
    Role(u64),
}

fn mention_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(@!?|@&|#)(\d+)>$").expect("valid mention pattern"))
}

/// Accepts a raw id or the matching mention form.
fn parse_snowflake(input: &str, sigils: &[&str]) -> Option<u64> {
    if let Ok(id) = input.parse() {
        return Some(id);
    }
    let captures = mention_pattern().captures(input)?;
    if !sigils.contains(&&captures[1]) {
        return None;
    }
    captures[2].parse().ok()
}

impl ArgValue {
    /// Parses one prefix-command word as `kind`.
    pub fn parse(input: &str, kind: ParameterKind) -> Option<ArgValue> {
        match kind {
            ParameterKind::Text => Some(ArgValue::Text(input.to_string())),
            ParameterKind::Integer => input.parse().ok().map(ArgValue::Integer),
            ParameterKind::Number => input
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ArgValue::Number),
            ParameterKind::Boolean => match input.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(ArgValue::Boolean(true)),
                "false" | "no" | "off" | "0" => Some(ArgValue::Boolean(false)),
                _ => None,
            },
            ParameterKind::User => parse_snowflake(input, &["@", "@!"]).map(ArgValue::User),
            ParameterKind::Role => parse_snowflake(input, &["@&"]).map(ArgValue::Role),
            ParameterKind::Channel => parse_snowflake(input, &["#"]).map(ArgValue::Channel),
        }
    }

    /// Converts an interaction value to `kind`, re-parsing text if needed.
    pub fn coerce(self, kind: ParameterKind) -> Option<ArgValue> {
        match (self, kind) {
            (value @ ArgValue::Text(_), ParameterKind::Text)
            | (value @ ArgValue::Integer(_), ParameterKind::Integer)
            | (value @ ArgValue::Number(_), ParameterKind::Number)
            | (value @ ArgValue::Boolean(_), ParameterKind::Boolean)
            | (value @ ArgValue::Channel(_), ParameterKind::Channel)
            | (value @ ArgValue::User(_), ParameterKind::User)
            | (value @ ArgValue::Role(_), ParameterKind::Role) => Some(value),
            (ArgValue::Integer(n), ParameterKind::Number) => Some(ArgValue::Number(n as f64)),
            (ArgValue::Text(text), kind) => ArgValue::parse(&text, kind),
            (other, ParameterKind::Text) => Some(ArgValue::Text(other.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Text(text) => write!(f, "{}", text),
            ArgValue::Integer(n) => write!(f, "{}", n),
            ArgValue::Number(n) => write!(f, "{}", n),
            ArgValue::Boolean(b) => write!(f, "{}", b),
            ArgValue::Channel(id) => write!(f, "<#{}>", id),
            ArgValue::User(id) => write!(f, "<@{}>", id),
            ArgValue::Role(id) => write!(f, "<@&{}>", id),
        }
    }
}

/// Unbound arguments as they came from the invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArgs {
    Positional(Vec<String>),
    Named(Vec<(String, ArgValue)>),
}

impl RawArgs {
    pub fn len(&self) -> usize {
        match self {
            RawArgs::Positional(words) => words.len(),
            RawArgs::Named(options) => options.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Argument values keyed by declared parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, ArgValue)>,
}

impl BoundArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ArgValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ArgValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ArgValue::User(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ArgValue::Channel(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ArgValue::Role(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse_failed(parameter: &Parameter) -> CommandError {
    CommandError::ParseFailed {
        parameter: parameter.display_name(),
        expected: parameter.kind.describe(),
    }
}

/// Binds raw arguments to `command`'s parameters.
pub fn bind(command: &Command, args: &RawArgs) -> Result<BoundArgs, CommandError> {
    match args {
        RawArgs::Positional(words) => bind_positional(command, words),
        RawArgs::Named(options) => bind_named(command, options),
    }
}

fn bind_positional(command: &Command, words: &[String]) -> Result<BoundArgs, CommandError> {
    if !command.accepts(words.len()) {
        return Err(CommandError::BadArgCount);
    }

    let mut bound = BoundArgs::default();
    for (index, parameter) in command.parameters.iter().enumerate() {
        let Some(word) = words.get(index) else {
            break;
        };
        let input = if parameter.remainder {
            words[index..].join(" ")
        } else {
            word.clone()
        };
        let value = ArgValue::parse(&input, parameter.kind).ok_or_else(|| parse_failed(parameter))?;
        bound.values.push((parameter.name.clone(), value));
    }
    Ok(bound)
}

fn bind_named(command: &Command, options: &[(String, ArgValue)]) -> Result<BoundArgs, CommandError> {
    let matches = |parameter: &Parameter, name: &str| {
        parameter.display_name() == name || parameter.name.eq_ignore_ascii_case(name)
    };

    if options
        .iter()
        .any(|(name, _)| !command.parameters.iter().any(|p| matches(p, name)))
    {
        return Err(CommandError::BadArgCount);
    }

    let mut bound = BoundArgs::default();
    for parameter in &command.parameters {
        match options.iter().find(|(name, _)| matches(parameter, name)) {
            Some((_, value)) => {
                let value = value
                    .clone()
                    .coerce(parameter.kind)
                    .ok_or_else(|| parse_failed(parameter))?;
                bound.values.push((parameter.name.clone(), value));
            }
            None if !parameter.optional => return Err(CommandError::BadArgCount),
            None => {}
        }
    }
    Ok(bound)
}

/// Highest priority overload whose arity fits, else the highest priority one.
pub fn select_overload(tree: &ModuleTree, overloads: &[CommandId], args: &RawArgs) -> Option<CommandId> {
    overloads
        .iter()
        .copied()
        .find(|&id| tree.command(id).accepts(args.len()))
        .or_else(|| overloads.first().copied())
}

/// Returns the text after a matching prefix or bot mention.
pub fn strip_prefix<'a>(content: &'a str, prefixes: &[String], bot_user_id: Option<u64>) -> Option<&'a str> {
    if let Some(id) = bot_user_id {
        for mention in [format!("<@{}>", id), format!("<@!{}>", id)] {
            if let Some(rest) = content.strip_prefix(mention.as_str()) {
                return Some(rest.trim_start());
            }
        }
    }

    let mut ordered: Vec<&String> = prefixes.iter().filter(|p| !p.is_empty()).collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.len()));
    ordered
        .into_iter()
        .find_map(|prefix| content.strip_prefix(prefix.as_str()))
}

/// Splits on whitespace, keeping double-quoted runs together.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_word = false;

    for c in input.trim().chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}

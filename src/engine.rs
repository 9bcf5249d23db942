//! Token-parsing engine.
//!
//! `Engine` is a registry of slots (positional or optional) plus nested
//! subcommands. At parse time the registry is compiled into a
//! [`clap::Command`]; the matches are then flattened into one [`Record`] keyed
//! by destination name, with argparse-style action semantics (see `extract`).
//!
//! Registration validates everything clap would otherwise only catch with a
//! debug assertion, so a bad slot is an [`EngineError`] and never a panic.
mod extract;

use std::ffi::OsString;

use clap::builder::{ValueParser, ValueRange};
use clap::parser::MatchesError;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{Action, Converter, Nargs};
use crate::value::Record;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Positional { name: String },
    /// Option strings, e.g. `["--verbose", "-v"]`.
    Optional { flags: Vec<String> },
}

/// Engine-level slot definition. `dest: None` derives the destination from the
/// primary flag (or the positional name).
#[derive(Debug, Clone)]
pub struct Slot {
    pub(crate) kind: SlotKind,
    pub(crate) dest: Option<String>,
    pub(crate) action: Action,
    pub(crate) nargs: Option<Nargs>,
    pub(crate) constant: Option<Value>,
    pub(crate) default: Option<Value>,
    pub(crate) converter: Option<Converter>,
    pub(crate) choices: Vec<Value>,
    pub(crate) help: Option<String>,
}

#[derive(Debug, Clone)]
struct Registered {
    dest: String,
    longs: Vec<String>,
    shorts: Vec<char>,
    slot: Slot,
}

#[derive(Debug, Clone)]
pub struct Engine {
    name: String,
    about: Option<String>,
    slots: Vec<Registered>,
    groups: Vec<Vec<String>>,
    subcommands: IndexMap<String, Engine>,
    subcommand_dest: Option<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid option string `{0}`: expected `-x` or `--name`")]
    InvalidFlag(String),
    #[error("invalid destination name `{0}`")]
    InvalidDest(String),
    #[error("invalid positional or subcommand name `{0}`")]
    InvalidName(String),
    #[error("conflicting option string `{flag}`: already used by `{existing}`")]
    ConflictingFlag { flag: String, existing: String },
    #[error("destination `{0}` is already registered")]
    DuplicateDest(String),
    #[error("destination `{dest}` of subcommand `{command}` is already used by a parent command")]
    ShadowedDest { dest: String, command: String },
    #[error("count of `{dest}` overflows a 64-bit integer")]
    CountOverflow { dest: String },
    #[error("slot `{dest}`: {reason}")]
    InvalidSlot { dest: String, reason: String },
    #[error("subcommand `{0}` is already registered")]
    DuplicateSubcommand(String),
    #[error("unknown subcommand `{0}`")]
    UnknownSubcommand(String),
    #[error("exclusive group refers to `{0}`, which is not an optional slot of this command")]
    UnknownGroupMember(String),
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error("cannot read parsed value of `{dest}`: {source}")]
    Extract {
        dest: String,
        #[source]
        source: MatchesError,
    },
}

static LONG_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--([A-Za-z0-9][A-Za-z0-9_.-]*)$").expect("static regex"));
static SHORT_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-([A-Za-z0-9])$").expect("static regex"));
static DEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));
static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static regex"));

// clap owns -h/--help on every command
const RESERVED_LONG: &str = "help";
const RESERVED_SHORT: char = 'h';

// ————————————————————————————————————————————————————————————————————————————
// SLOT BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl Slot {
    pub fn positional(name: impl Into<String>) -> Self {
        Self::with_kind(SlotKind::Positional { name: name.into() })
    }

    pub fn optional<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(SlotKind::Optional {
            flags: flags.into_iter().map(Into::into).collect(),
        })
    }

    fn with_kind(kind: SlotKind) -> Self {
        Slot {
            kind,
            dest: None,
            action: Action::Store,
            nargs: None,
            constant: None,
            default: None,
            converter: None,
            choices: Vec::new(),
            help: None,
        }
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn constant(mut self, constant: impl Into<Value>) -> Self {
        self.constant = Some(constant.into());
        self
    }

    pub fn default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Restrict accepted values; compared after conversion.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn kind(&self) -> &SlotKind {
        &self.kind
    }

    pub fn action_kind(&self) -> Action {
        self.action
    }

    pub fn nargs_spec(&self) -> Option<Nargs> {
        self.nargs
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, SlotKind::Positional { .. })
    }

    /// argparse rule: first long flag, else first short flag, dashes → `_`.
    fn implied_dest(&self) -> Result<String, EngineError> {
        match &self.kind {
            SlotKind::Positional { name } => Ok(name.replace('-', "_")),
            SlotKind::Optional { flags } => flags
                .iter()
                .find(|f| f.starts_with("--"))
                .or_else(|| flags.first())
                .map(|f| f.trim_start_matches('-').replace('-', "_"))
                .ok_or_else(|| EngineError::InvalidSlot {
                    dest: "<unnamed>".into(),
                    reason: "an optional slot needs at least one option string".into(),
                }),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRATION
// ————————————————————————————————————————————————————————————————————————————

impl Engine {
    pub fn new(name: impl Into<String>) -> Self {
        Engine {
            name: name.into(),
            about: None,
            slots: Vec::new(),
            groups: Vec::new(),
            subcommands: IndexMap::new(),
            subcommand_dest: None,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, slot: Slot) -> Result<&mut Self, EngineError> {
        let dest = match &slot.dest {
            Some(dest) => dest.clone(),
            None => slot.implied_dest()?,
        };
        if !DEST.is_match(&dest) {
            return Err(EngineError::InvalidDest(dest));
        }
        if self.dest_taken(&dest) {
            return Err(EngineError::DuplicateDest(dest));
        }

        let (longs, shorts) = match &slot.kind {
            SlotKind::Positional { name } => {
                if !NAME.is_match(name) {
                    return Err(EngineError::InvalidName(name.clone()));
                }
                (Vec::new(), Vec::new())
            }
            SlotKind::Optional { flags } => split_flags(flags)?,
        };
        if matches!(slot.kind, SlotKind::Optional { .. }) && longs.is_empty() && shorts.is_empty() {
            return Err(invalid(&dest, "an optional slot needs at least one option string"));
        }
        for long in &longs {
            if let Some(existing) = self.long_owner(long) {
                return Err(EngineError::ConflictingFlag {
                    flag: format!("--{long}"),
                    existing: existing.to_string(),
                });
            }
        }
        for short in &shorts {
            if let Some(existing) = self.short_owner(*short) {
                return Err(EngineError::ConflictingFlag {
                    flag: format!("-{short}"),
                    existing: existing.to_string(),
                });
            }
        }
        self.check_semantics(&dest, &slot)?;

        debug!(
            command = self.name.as_str(),
            dest = dest.as_str(),
            positional = slot.is_positional(),
            action:? = slot.action;
            "Registered slot"
        );
        self.slots.push(Registered { dest, longs, shorts, slot });
        Ok(self)
    }

    pub fn add_subcommand(
        &mut self,
        name: impl Into<String>,
        about: Option<&str>,
    ) -> Result<&mut Engine, EngineError> {
        let name = name.into();
        if !NAME.is_match(&name) {
            return Err(EngineError::InvalidName(name));
        }
        if self.subcommands.contains_key(&name) {
            return Err(EngineError::DuplicateSubcommand(name));
        }
        let mut sub = Engine::new(name.clone());
        sub.about = about.map(str::to_string);
        debug!(command = self.name.as_str(), subcommand = name.as_str(); "Registered subcommand");
        Ok(self.subcommands.entry(name).or_insert(sub))
    }

    pub fn subcommand_mut(&mut self, name: &str) -> Result<&mut Engine, EngineError> {
        self.subcommands
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownSubcommand(name.to_string()))
    }

    /// Store the selected subcommand's name under `dest` (`null` when none ran).
    pub fn subcommand_dest(&mut self, dest: impl Into<String>) -> Result<&mut Self, EngineError> {
        let dest = dest.into();
        if !DEST.is_match(&dest) {
            return Err(EngineError::InvalidDest(dest));
        }
        if self.dest_taken(&dest) {
            return Err(EngineError::DuplicateDest(dest));
        }
        self.subcommand_dest = Some(dest);
        Ok(self)
    }

    /// At most one of `dests` may be given on the command line.
    pub fn exclusive_group<I, S>(&mut self, dests: I) -> Result<&mut Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = dests.into_iter().map(Into::into).collect();
        for member in &members {
            let known = self.slots.iter().any(|s| &s.dest == member && !s.slot.is_positional());
            if !known {
                return Err(EngineError::UnknownGroupMember(member.clone()));
            }
        }
        self.groups.push(members);
        Ok(self)
    }

    /// Check that no subcommand reuses a destination of a command above it.
    /// Subcommands registered through [`Engine::subcommand_mut`] cannot see
    /// their parents, so the check runs over the finished tree.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.validate_chain(&mut Vec::new())
    }

    /// Every destination the engine can ever produce, across all subcommands.
    pub fn destinations(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.collect_destinations(&mut out);
        out
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.slots.iter().map(|r| (r.dest.as_str(), &r.slot))
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &Engine> {
        self.subcommands.values()
    }

    fn collect_destinations(&self, out: &mut IndexSet<String>) {
        out.extend(self.slots.iter().map(|s| s.dest.clone()));
        out.extend(self.subcommand_dest.iter().cloned());
        for sub in self.subcommands.values() {
            sub.collect_destinations(out);
        }
    }

    // a parent slot may not share a destination with anything below it
    fn dest_taken(&self, dest: &str) -> bool {
        self.destinations().contains(dest)
    }

    fn validate_chain<'a>(&'a self, inherited: &mut Vec<&'a str>) -> Result<(), EngineError> {
        let start = inherited.len();
        let own = self.slots.iter().map(|s| s.dest.as_str()).chain(self.subcommand_dest.as_deref());
        for dest in own {
            if inherited.contains(&dest) {
                return Err(EngineError::ShadowedDest {
                    dest: dest.to_string(),
                    command: self.name.clone(),
                });
            }
            inherited.push(dest);
        }
        for sub in self.subcommands.values() {
            sub.validate_chain(inherited)?;
        }
        inherited.truncate(start);
        Ok(())
    }

    fn long_owner(&self, long: &str) -> Option<&str> {
        if long == RESERVED_LONG {
            return Some("help");
        }
        self.slots.iter().find(|s| s.longs.iter().any(|l| l == long)).map(|s| s.dest.as_str())
    }

    fn short_owner(&self, short: char) -> Option<&str> {
        if short == RESERVED_SHORT {
            return Some("help");
        }
        self.slots.iter().find(|s| s.shorts.contains(&short)).map(|s| s.dest.as_str())
    }

    fn check_semantics(&self, dest: &str, slot: &Slot) -> Result<(), EngineError> {
        if let Some(Nargs::Exactly(0)) = slot.nargs {
            return Err(invalid(dest, "nargs must be at least 1"));
        }
        if slot.nargs.is_some() && !slot.action.takes_values() {
            return Err(invalid(dest, format!("action `{}` does not take nargs", slot.action)));
        }
        if slot.is_positional() {
            if slot.action != Action::Store {
                return Err(invalid(
                    dest,
                    format!("action `{}` is not valid for a positional", slot.action),
                ));
            }
            let variadic = self.slots.iter().find(|s| {
                s.slot.is_positional() && s.slot.nargs.is_some_and(Nargs::is_variadic)
            });
            if let Some(previous) = variadic {
                return Err(invalid(
                    dest,
                    format!("positional cannot follow variadic positional `{}`", previous.dest),
                ));
            }
        }
        match (slot.action, &slot.default) {
            (Action::Count, Some(default)) if !default.is_null() && !default.is_i64() => {
                Err(invalid(dest, "count default must be an integer"))
            }
            (Action::Append | Action::AppendConst, Some(default))
                if !default.is_null() && !default.is_array() =>
            {
                Err(invalid(dest, "append default must be a list"))
            }
            _ => Ok(()),
        }
    }
}

fn invalid(dest: &str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidSlot { dest: dest.to_string(), reason: reason.into() }
}

fn split_flags(flags: &[String]) -> Result<(Vec<String>, Vec<char>), EngineError> {
    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    for flag in flags {
        if let Some(caps) = LONG_FLAG.captures(flag) {
            longs.push(caps[1].to_string());
        } else if let Some(short) =
            SHORT_FLAG.captures(flag).and_then(|caps| caps[1].chars().next())
        {
            shorts.push(short);
        } else {
            return Err(EngineError::InvalidFlag(flag.clone()));
        }
    }
    Ok((longs, shorts))
}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

impl Engine {
    /// Parse `tokens` (no program name) into a flat record: every slot of the
    /// selected command chain gets an entry, unselected subcommands get none.
    pub fn parse<I, T>(&self, tokens: I) -> Result<Record, EngineError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.validate()?;
        let matches = self.to_command().no_binary_name(true).try_get_matches_from(tokens)?;
        let mut record = Record::new();
        self.collect(&matches, &mut record)?;
        trace!(command = self.name.as_str(), record:? = record; "Parsed tokens");
        Ok(record)
    }

    fn collect(&self, matches: &ArgMatches, record: &mut Record) -> Result<(), EngineError> {
        for slot in &self.slots {
            record.insert(slot.dest.clone(), extract::value_of(slot, matches)?);
        }
        let selected = matches.subcommand();
        if let Some(dest) = &self.subcommand_dest {
            let name = selected.map_or(Value::Null, |(name, _)| Value::String(name.to_string()));
            record.insert(dest.clone(), name);
        }
        if let Some((name, sub_matches)) = selected {
            if let Some(sub) = self.subcommands.get(name) {
                sub.collect(sub_matches, record)?;
            }
        }
        Ok(())
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(self.name.clone())
            .args_override_self(true)
            .disable_help_subcommand(true);
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }
        // argparse only reads `-5` as a value when no option looks like a number
        let negative_numbers =
            !self.slots.iter().any(|s| s.shorts.iter().any(char::is_ascii_digit));
        for slot in &self.slots {
            command = command.arg(slot.to_arg(negative_numbers));
        }
        for (index, members) in self.groups.iter().enumerate() {
            command = command.group(
                ArgGroup::new(format!("exclusive#{index}"))
                    .args(members.clone())
                    .multiple(false),
            );
        }
        for sub in self.subcommands.values() {
            command = command.subcommand(sub.to_command());
        }
        command
    }
}

impl Registered {
    fn to_arg(&self, negative_numbers: bool) -> Arg {
        let mut arg = Arg::new(self.dest.clone());
        if let SlotKind::Positional { name } = &self.slot.kind {
            let required = !matches!(self.slot.nargs, Some(Nargs::Optional | Nargs::ZeroOrMore));
            arg = arg.value_name(name.clone()).required(required);
        }
        if let Some((first, rest)) = self.longs.split_first() {
            arg = arg.long(first.clone()).visible_aliases(rest.to_vec());
        }
        if let Some((first, rest)) = self.shorts.split_first() {
            arg = arg.short(*first).visible_short_aliases(rest.to_vec());
        }
        arg = match self.slot.action {
            Action::Store => arg
                .action(ArgAction::Set)
                .value_parser(self.value_parser())
                .allow_negative_numbers(negative_numbers),
            Action::Append => arg
                .action(ArgAction::Append)
                .value_parser(self.value_parser())
                .allow_negative_numbers(negative_numbers),
            Action::StoreTrue | Action::StoreConst => arg.action(ArgAction::SetTrue),
            Action::StoreFalse => arg.action(ArgAction::SetFalse),
            // one marker value per occurrence; `ArgAction::Count` saturates at u8::MAX
            Action::Count | Action::AppendConst => arg
                .action(ArgAction::Append)
                .num_args(0)
                .default_missing_value("true")
                .value_parser(ValueParser::bool()),
        };
        if let Some(nargs) = self.slot.nargs {
            arg = arg.num_args(value_range(nargs));
        }
        if let Some(help) = &self.slot.help {
            arg = arg.help(help.clone());
        }
        arg
    }

    fn value_parser(&self) -> ValueParser {
        let converter = self.slot.converter.clone().unwrap_or_default();
        let choices = self.slot.choices.clone();
        ValueParser::new(move |raw: &str| -> Result<Value, String> {
            let value = converter.convert(raw)?;
            if choices.is_empty() || choices.contains(&value) {
                return Ok(value);
            }
            let allowed = choices.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
            Err(format!("invalid choice: {value} (choose from {allowed})"))
        })
    }
}

fn value_range(nargs: Nargs) -> ValueRange {
    match nargs {
        Nargs::Exactly(n) => ValueRange::new(n),
        Nargs::Optional => ValueRange::new(0..=1),
        Nargs::ZeroOrMore => ValueRange::new(0..),
        Nargs::OneOrMore => ValueRange::new(1..),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn foo_bar_engine() -> Engine {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["--foo"]).action(Action::StoreTrue)).unwrap();
        engine.register(Slot::optional(["--bar"]).action(Action::StoreFalse)).unwrap();
        engine.exclusive_group(["foo", "bar"]).unwrap();
        engine
    }

    #[test]
    fn store_true_and_store_false_defaults() {
        let engine = foo_bar_engine();
        let record = engine.parse(["--foo"]).unwrap();
        assert_eq!(record.get("foo"), Some(&json!(true)));
        assert_eq!(record.get("bar"), Some(&json!(true)));
        let record = engine.parse(["--bar"]).unwrap();
        assert_eq!(record.get("foo"), Some(&json!(false)));
        assert_eq!(record.get("bar"), Some(&json!(false)));
    }

    #[test]
    fn exclusive_group_rejects_both() {
        let err = foo_bar_engine().parse(["--foo", "--bar"]).unwrap_err();
        assert!(matches!(err, EngineError::Usage(_)));
    }

    #[test]
    fn derives_dest_from_primary_long_flag() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["-o", "--out-dir"])).unwrap();
        let record = engine.parse(["-o", "x"]).unwrap();
        assert_eq!(record.get("out_dir"), Some(&json!("x")));
    }

    #[test]
    fn rejects_conflicts_and_duplicates() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["--foo", "-f"])).unwrap();
        assert!(matches!(
            engine.register(Slot::optional(["--other", "-f"])),
            Err(EngineError::ConflictingFlag { .. })
        ));
        assert!(matches!(
            engine.register(Slot::optional(["--foo2"]).dest("foo")),
            Err(EngineError::DuplicateDest(_))
        ));
        assert!(matches!(
            engine.register(Slot::optional(["-h"]).dest("hosts")),
            Err(EngineError::ConflictingFlag { .. })
        ));
        assert!(matches!(
            engine.register(Slot::optional(["-long"])),
            Err(EngineError::InvalidFlag(_))
        ));
    }

    #[test]
    fn rejects_invalid_semantics() {
        let mut engine = Engine::new("prog");
        assert!(engine.register(Slot::positional("x").action(Action::Count)).is_err());
        assert!(engine
            .register(Slot::optional(["--v"]).action(Action::Count).default("ten"))
            .is_err());
        assert!(engine
            .register(Slot::optional(["--t"]).action(Action::StoreTrue).nargs(Nargs::OneOrMore))
            .is_err());
        engine.register(Slot::positional("files").nargs(Nargs::OneOrMore)).unwrap();
        assert!(matches!(
            engine.register(Slot::positional("after")),
            Err(EngineError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn count_and_consts() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["-v"]).dest("verbose").action(Action::Count)).unwrap();
        engine
            .register(Slot::optional(["-s"]).dest("start").action(Action::Count).default(10))
            .unwrap();
        engine
            .register(Slot::optional(["--c"]).action(Action::StoreConst).constant(42))
            .unwrap();
        engine
            .register(Slot::optional(["--a"]).action(Action::AppendConst).constant("a"))
            .unwrap();

        let record = engine.parse(Vec::<String>::new()).unwrap();
        assert_eq!(record.get("verbose"), Some(&Value::Null));
        assert_eq!(record.get("start"), Some(&json!(10)));
        assert_eq!(record.get("c"), Some(&Value::Null));
        assert_eq!(record.get("a"), Some(&Value::Null));

        let record = engine.parse(["-vv", "-s", "-s", "--c", "--a", "--a"]).unwrap();
        assert_eq!(record.get("verbose"), Some(&json!(2)));
        assert_eq!(record.get("start"), Some(&json!(12)));
        assert_eq!(record.get("c"), Some(&json!(42)));
        assert_eq!(record.get("a"), Some(&json!(["a", "a"])));
    }

    #[test]
    fn nargs_and_append() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["--many"]).nargs(Nargs::OneOrMore)).unwrap();
        engine.register(Slot::optional(["--each"]).action(Action::Append)).unwrap();
        engine.register(Slot::optional(["--maybe"]).nargs(Nargs::Optional).constant("c")).unwrap();

        let record = engine.parse(Vec::<String>::new()).unwrap();
        assert_eq!(record.get("many"), Some(&Value::Null));
        assert_eq!(record.get("each"), Some(&Value::Null));
        assert_eq!(record.get("maybe"), Some(&Value::Null));

        let record = engine
            .parse(["--many", "a", "b", "--each", "x", "--each", "y", "--maybe"])
            .unwrap();
        assert_eq!(record.get("many"), Some(&json!(["a", "b"])));
        assert_eq!(record.get("each"), Some(&json!(["x", "y"])));
        assert_eq!(record.get("maybe"), Some(&json!("c")));
    }

    #[test]
    fn converters_and_choices_surface_as_usage_errors() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::positional("n").converter(Converter::Int)).unwrap();
        engine.register(Slot::optional(["--baz"]).choices(["X", "Y", "Z"])).unwrap();
        assert_eq!(engine.parse(["12"]).unwrap().get("n"), Some(&json!(12)));
        assert!(matches!(engine.parse(["twelve"]), Err(EngineError::Usage(_))));
        assert!(matches!(engine.parse(["1", "--baz", "Q"]), Err(EngineError::Usage(_))));
    }

    #[test]
    fn subcommands_flatten_into_one_record() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["--foo"]).action(Action::StoreTrue)).unwrap();
        engine.subcommand_dest("command").unwrap();
        engine
            .add_subcommand("a", Some("a help"))
            .unwrap()
            .register(Slot::positional("bar").converter(Converter::Int).default(11))
            .unwrap();
        engine
            .add_subcommand("b", None)
            .unwrap()
            .register(Slot::optional(["--baz"]))
            .unwrap();

        let record = engine.parse(["a", "12"]).unwrap();
        assert_eq!(record.get("bar"), Some(&json!(12)));
        assert_eq!(record.get("command"), Some(&json!("a")));
        assert!(record.get("baz").is_none());

        let record = engine.parse(Vec::<String>::new()).unwrap();
        assert_eq!(record.get("command"), Some(&Value::Null));
        assert!(record.get("bar").is_none());

        let dests: Vec<String> = engine.destinations().into_iter().collect();
        assert_eq!(dests, ["foo", "command", "bar", "baz"]);
        assert!(matches!(
            engine.add_subcommand("a", None),
            Err(EngineError::DuplicateSubcommand(_))
        ));
    }

    #[test]
    fn negative_numbers_are_values() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::positional("n").converter(Converter::Int)).unwrap();
        engine.register(Slot::optional(["--x"]).converter(Converter::Float)).unwrap();
        engine
            .register(Slot::optional(["--xs"]).action(Action::Append).converter(Converter::Int))
            .unwrap();
        let record = engine.parse(["-5", "--x", "-0.5", "--xs", "-1", "--xs", "-2"]).unwrap();
        assert_eq!(record.get("n"), Some(&json!(-5)));
        assert_eq!(record.get("x"), Some(&json!(-0.5)));
        assert_eq!(record.get("xs"), Some(&json!([-1, -2])));
    }

    #[test]
    fn numeric_short_flags_disable_negative_values() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["-1"]).dest("one").action(Action::StoreTrue)).unwrap();
        engine.register(Slot::optional(["--n"])).unwrap();
        assert!(matches!(engine.parse(["--n", "-1"]), Err(EngineError::Usage(_))));
        assert_eq!(engine.parse(["-1"]).unwrap().get("one"), Some(&json!(true)));
    }

    #[test]
    fn counts_do_not_saturate() {
        let mut engine = Engine::new("prog");
        engine.register(Slot::optional(["-v"]).dest("verbose").action(Action::Count)).unwrap();
        engine
            .register(Slot::optional(["-a"]).dest("marks").action(Action::AppendConst).constant(1))
            .unwrap();
        let tokens: Vec<&str> = std::iter::repeat_n(["-v", "-a"], 300).flatten().collect();
        let record = engine.parse(tokens).unwrap();
        assert_eq!(record.get("verbose"), Some(&json!(300)));
        assert_eq!(record.get("marks").and_then(Value::as_array).map(Vec::len), Some(300));
    }

    #[test]
    fn count_overflow_is_an_error() {
        let mut engine = Engine::new("prog");
        let verbose = Slot::optional(["-v"]).dest("verbose").action(Action::Count);
        engine.register(verbose.default(i64::MAX)).unwrap();
        let record = engine.parse(Vec::<String>::new()).unwrap();
        assert_eq!(record.get("verbose"), Some(&json!(i64::MAX)));
        assert!(matches!(engine.parse(["-v"]), Err(EngineError::CountOverflow { .. })));
    }

    #[test]
    fn parent_and_subcommand_cannot_share_a_destination() {
        let mut engine = Engine::new("prog");
        engine.add_subcommand("a", None).unwrap().register(Slot::positional("bar")).unwrap();
        assert!(matches!(
            engine.register(Slot::optional(["--bar"])),
            Err(EngineError::DuplicateDest(_))
        ));
        assert!(matches!(engine.subcommand_dest("bar"), Err(EngineError::DuplicateDest(_))));

        // registered below after the parent already owns it
        engine.register(Slot::optional(["--baz"])).unwrap();
        engine.subcommand_mut("a").unwrap().register(Slot::optional(["--baz"])).unwrap();
        assert!(matches!(engine.validate(), Err(EngineError::ShadowedDest { .. })));
        assert!(matches!(engine.parse(["a", "x"]), Err(EngineError::ShadowedDest { .. })));
    }
}

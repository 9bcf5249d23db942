//! Argument descriptors: CLI metadata attached to a schema field at
//! declaration time.
//!
//! A descriptor is pure data. Nothing touches the engine until the parser
//! builder resolves it against the field it belongs to (see [`ArgumentDescriptor::resolve`]).
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::engine::{Slot, SlotKind};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Store,
    StoreConst,
    StoreTrue,
    StoreFalse,
    Append,
    AppendConst,
    Count,
}

/// Number of tokens a slot consumes per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "NargsRepr")]
pub enum Nargs {
    Exactly(usize),
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NargsRepr {
    Count(usize),
    Symbol(String),
}

pub type ConvertFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;

/// Turns one raw token into a loosely-typed value (`type=` in argparse terms).
#[derive(Clone, Default)]
pub enum Converter {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    Path,
    Custom(Arc<ConvertFn>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArgumentDescriptor {
    #[serde(rename = "flags")]
    names: Vec<String>,
    shortcut: Option<String>,
    dest: Option<String>,
    action: Option<Action>,
    nargs: Option<Nargs>,
    #[serde(rename = "const")]
    constant: Option<Value>,
    default: Option<Value>,
    #[serde(rename = "type")]
    converter: Option<Converter>,
    choices: Vec<Value>,
    help: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("positional and flag names cannot be mixed: {0:?}")]
    MixedNames(Vec<String>),
    #[error("a positional argument takes exactly one name, got {0:?}")]
    MultiplePositionalNames(Vec<String>),
    #[error("shortcut `{0}` cannot be attached to a positional argument")]
    ShortcutOnPositional(String),
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

/// Start a descriptor. With no names the field binds to `--<field name>`.
pub fn add_argument() -> ArgumentDescriptor {
    <ArgumentDescriptor as Default>::default()
}

impl ArgumentDescriptor {
    /// A name starting with `-` is a flag; a bare name makes the slot positional.
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn flags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Single-dash alias next to the primary flag, e.g. `-b`.
    pub fn shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
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

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn shortcut_name(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    pub fn explicit_dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn action_kind(&self) -> Action {
        self.action.unwrap_or_default()
    }

    pub fn nargs_spec(&self) -> Option<Nargs> {
        self.nargs
    }

    pub fn const_value(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn type_converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn allowed_values(&self) -> &[Value] {
        &self.choices
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Bind the descriptor to `field`: classify positional vs optional and fix
    /// the destination (explicit `dest`, else the field name).
    pub fn resolve(&self, field: &str) -> Result<Slot, DescriptorError> {
        let (dashed, bare): (Vec<&String>, Vec<&String>) =
            self.names.iter().partition(|name| name.starts_with('-'));

        let kind = match (dashed.is_empty(), bare.as_slice()) {
            (true, []) => SlotKind::Optional { flags: vec![format!("--{field}")] },
            (true, [name]) => {
                if let Some(shortcut) = &self.shortcut {
                    return Err(DescriptorError::ShortcutOnPositional(shortcut.clone()));
                }
                SlotKind::Positional { name: (*name).clone() }
            }
            (true, _) => return Err(DescriptorError::MultiplePositionalNames(self.names.clone())),
            (false, []) => SlotKind::Optional {
                flags: dashed.into_iter().cloned().collect(),
            },
            (false, _) => return Err(DescriptorError::MixedNames(self.names.clone())),
        };
        let kind = match (kind, &self.shortcut) {
            (SlotKind::Optional { mut flags }, Some(shortcut)) => {
                flags.push(shortcut.clone());
                SlotKind::Optional { flags }
            }
            (kind, _) => kind,
        };

        Ok(Slot {
            kind,
            dest: Some(self.dest.clone().unwrap_or_else(|| field.to_string())),
            action: self.action_kind(),
            nargs: self.nargs,
            constant: self.constant.clone(),
            default: self.default.clone(),
            converter: self.converter.clone(),
            choices: self.choices.clone(),
            help: self.help.clone(),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERTERS
// ————————————————————————————————————————————————————————————————————————————

impl Converter {
    pub fn custom<F>(convert: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Converter::Custom(Arc::new(convert))
    }

    pub fn convert(&self, raw: &str) -> Result<Value, String> {
        match self {
            Converter::Str | Converter::Path => Ok(Value::String(raw.to_string())),
            Converter::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("invalid int value: '{raw}'")),
            Converter::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float value: '{raw}'")),
            Converter::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid bool value: '{raw}'")),
            },
            Converter::Custom(convert) => convert(raw),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Converter::Str => "str",
            Converter::Int => "int",
            Converter::Float => "float",
            Converter::Bool => "bool",
            Converter::Path => "path",
            Converter::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter::{}", self.name())
    }
}

impl FromStr for Converter {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "str" | "string" => Converter::Str,
            "int" => Converter::Int,
            "float" => Converter::Float,
            "bool" => Converter::Bool,
            "path" => Converter::Path,
            other => return Err(format!("unknown converter `{other}`")),
        })
    }
}

impl<'de> Deserialize<'de> for Converter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ACTION / NARGS HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl Action {
    /// Actions that consume tokens after the flag.
    pub fn takes_values(self) -> bool {
        matches!(self, Action::Store | Action::Append)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Store => "store",
            Action::StoreConst => "store_const",
            Action::StoreTrue => "store_true",
            Action::StoreFalse => "store_false",
            Action::Append => "append",
            Action::AppendConst => "append_const",
            Action::Count => "count",
        };
        f.write_str(name)
    }
}

impl Nargs {
    /// Whether the number of consumed tokens is open-ended.
    pub fn is_variadic(self) -> bool {
        matches!(self, Nargs::Optional | Nargs::ZeroOrMore | Nargs::OneOrMore)
    }
}

impl TryFrom<NargsRepr> for Nargs {
    type Error = String;

    fn try_from(repr: NargsRepr) -> Result<Self, Self::Error> {
        match repr {
            NargsRepr::Count(0) => Err("nargs must be at least 1".to_string()),
            NargsRepr::Count(n) => Ok(Nargs::Exactly(n)),
            NargsRepr::Symbol(s) => match s.as_str() {
                "?" => Ok(Nargs::Optional),
                "*" => Ok(Nargs::ZeroOrMore),
                "+" => Ok(Nargs::OneOrMore),
                other => Err(format!("unknown nargs `{other}`")),
            },
        }
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nargs::Exactly(n) => write!(f, "{n}"),
            Nargs::Optional => f.write_str("?"),
            Nargs::ZeroOrMore => f.write_str("*"),
            Nargs::OneOrMore => f.write_str("+"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_names_binds_to_long_flag_of_field() {
        let slot = add_argument().default("x").resolve("str_arg").unwrap();
        assert_eq!(slot.kind, SlotKind::Optional { flags: vec!["--str_arg".into()] });
        assert_eq!(slot.dest.as_deref(), Some("str_arg"));
        assert_eq!(slot.default, Some(json!("x")));
    }

    #[test]
    fn shortcut_joins_the_flag_list() {
        let slot = add_argument()
            .shortcut("-b")
            .action(Action::StoreTrue)
            .resolve("bool_arg")
            .unwrap();
        assert_eq!(
            slot.kind,
            SlotKind::Optional { flags: vec!["--bool_arg".into(), "-b".into()] }
        );
        assert_eq!(slot.action, Action::StoreTrue);
    }

    #[test]
    fn bare_name_is_positional_with_field_dest() {
        let slot = add_argument().flag("pos").converter(Converter::Int).resolve("pos_arg").unwrap();
        assert_eq!(slot.kind, SlotKind::Positional { name: "pos".into() });
        assert_eq!(slot.dest.as_deref(), Some("pos_arg"));
    }

    #[test]
    fn explicit_dest_wins() {
        let slot = add_argument().flag("--foo").dest("bar").resolve("bar").unwrap();
        assert_eq!(slot.kind, SlotKind::Optional { flags: vec!["--foo".into()] });
        assert_eq!(slot.dest.as_deref(), Some("bar"));
    }

    #[test]
    fn invalid_name_combinations() {
        assert!(matches!(
            add_argument().flags(["a", "--b"]).resolve("f"),
            Err(DescriptorError::MixedNames(_))
        ));
        assert!(matches!(
            add_argument().flags(["a", "b"]).resolve("f"),
            Err(DescriptorError::MultiplePositionalNames(_))
        ));
        assert!(matches!(
            add_argument().flag("a").shortcut("-a").resolve("f"),
            Err(DescriptorError::ShortcutOnPositional(_))
        ));
    }

    #[test]
    fn converters() {
        assert_eq!(Converter::Int.convert("12").unwrap(), json!(12));
        assert!(Converter::Int.convert("1.5").is_err());
        assert_eq!(Converter::Float.convert("1.5").unwrap(), json!(1.5));
        assert!(Converter::Float.convert("nan").is_err());
        assert_eq!(Converter::Bool.convert("Yes").unwrap(), json!(true));
        assert_eq!(Converter::Path.convert("/tmp").unwrap(), json!("/tmp"));
        let upper = Converter::custom(|s| Ok(Value::String(s.to_uppercase())));
        assert_eq!(upper.convert("abc").unwrap(), json!("ABC"));
    }

    #[test]
    fn deserializes_from_schema_documents() {
        let desc: ArgumentDescriptor = serde_json::from_value(json!({
            "flags": ["--foo"],
            "action": "append_const",
            "const": "a",
            "type": "int",
            "nargs": "+"
        }))
        .unwrap();
        assert_eq!(desc.action_kind(), Action::AppendConst);
        assert_eq!(desc.const_value(), Some(&json!("a")));
        assert_eq!(desc.nargs_spec(), Some(Nargs::OneOrMore));
        assert_eq!(desc.type_converter().map(Converter::name), Some("int"));

        let n: Nargs = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(n, Nargs::Exactly(2));
        assert!(serde_json::from_value::<Nargs>(json!(0)).is_err());
        assert!(serde_json::from_value::<ArgumentDescriptor>(json!({"bogus": 1})).is_err());
    }
}

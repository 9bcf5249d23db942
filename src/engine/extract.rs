//! clap matches → loosely-typed values, following argparse action semantics.
use clap::ArgMatches;
use clap::parser::{MatchesError, ValueSource};
use serde_json::Value;

use super::{EngineError, Registered, Slot};
use crate::descriptor::{Action, Nargs};

pub(super) fn value_of(
    registered: &Registered,
    matches: &ArgMatches,
) -> Result<Value, EngineError> {
    let id = registered.dest.as_str();
    let slot = &registered.slot;
    let given = matches.value_source(id) == Some(ValueSource::CommandLine);
    let failed =
        |source: MatchesError| EngineError::Extract { dest: registered.dest.clone(), source };

    let value = match slot.action {
        Action::Store if !given => missing_store(slot),
        Action::Store => {
            let values = values_of(matches, id).map_err(failed)?;
            match slot.nargs {
                None => values.last().cloned().unwrap_or(Value::Null),
                Some(Nargs::Optional) => values.last().cloned().unwrap_or_else(|| constant(slot)),
                Some(_) => Value::Array(values),
            }
        }
        Action::Append if !given => default(slot),
        Action::Append => {
            let mut items = base_list(slot);
            for occurrence in occurrences_of(matches, id).map_err(failed)? {
                match slot.nargs {
                    None => items.extend(occurrence.last().cloned()),
                    Some(Nargs::Optional) => {
                        items.push(occurrence.last().cloned().unwrap_or_else(|| constant(slot)))
                    }
                    Some(_) => items.push(Value::Array(occurrence)),
                }
            }
            Value::Array(items)
        }
        Action::StoreTrue if given => Value::Bool(true),
        Action::StoreTrue => slot.default.clone().unwrap_or(Value::Bool(false)),
        Action::StoreFalse if given => Value::Bool(false),
        Action::StoreFalse => slot.default.clone().unwrap_or(Value::Bool(true)),
        Action::StoreConst if given => constant(slot),
        Action::StoreConst => default(slot),
        Action::Count => match count_of(matches, id).map_err(failed)? {
            0 => default(slot),
            n => {
                let start = slot.default.as_ref().and_then(Value::as_i64).unwrap_or(0);
                i64::try_from(n)
                    .ok()
                    .and_then(|n| start.checked_add(n))
                    .map(Value::from)
                    .ok_or_else(|| EngineError::CountOverflow { dest: registered.dest.clone() })?
            }
        },
        Action::AppendConst => match count_of(matches, id).map_err(failed)? {
            0 => default(slot),
            n => {
                let mut items = base_list(slot);
                items.extend(std::iter::repeat_n(constant(slot), n));
                Value::Array(items)
            }
        },
    };
    Ok(value)
}

fn default(slot: &Slot) -> Value {
    slot.default.clone().unwrap_or(Value::Null)
}

fn constant(slot: &Slot) -> Value {
    slot.constant.clone().unwrap_or(Value::Null)
}

fn base_list(slot: &Slot) -> Vec<Value> {
    match &slot.default {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

// a `*` positional that received nothing is an empty list, not None
fn missing_store(slot: &Slot) -> Value {
    match (&slot.kind, slot.nargs, &slot.default) {
        (super::SlotKind::Positional { .. }, Some(Nargs::ZeroOrMore), None) => {
            Value::Array(Vec::new())
        }
        _ => default(slot),
    }
}

fn values_of(matches: &ArgMatches, id: &str) -> Result<Vec<Value>, MatchesError> {
    Ok(matches
        .try_get_many::<Value>(id)?
        .map(|values| values.cloned().collect())
        .unwrap_or_default())
}

fn occurrences_of(matches: &ArgMatches, id: &str) -> Result<Vec<Vec<Value>>, MatchesError> {
    Ok(matches
        .try_get_occurrences::<Value>(id)?
        .map(|occurrences| occurrences.map(|values| values.cloned().collect()).collect())
        .unwrap_or_default())
}

fn count_of(matches: &ArgMatches, id: &str) -> Result<usize, MatchesError> {
    Ok(matches.try_get_many::<bool>(id)?.map_or(0, |markers| markers.len()))
}

//! Runs the JSON scenario fixtures under `fixtures/` end to end: build the
//! parser (optionally on top of a pre-built engine), parse every case in the
//! requested mode and compare namespaces or error kinds.
use std::path::{Path, PathBuf};

use clap::Parser;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use typedparser::{
    ArgumentDescriptor, Engine, ParseOptions, Record, SchemaDocument, TypedParser, parse_typed_args,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// run typedparser scenario fixtures
#[derive(Parser, Debug)]
struct RunnerArgs {
    /// only run fixtures whose file stem matches this regex
    #[arg(long)]
    filter: Option<String>,

    /// fixtures directory
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))]
    fixtures: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    schema: Value,
    #[serde(default)]
    engine: Option<EngineSpec>,
    cases: Vec<Case>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineSpec {
    slots: Vec<ArgumentDescriptor>,
    exclusive: Vec<Vec<String>>,
    subcommand_dest: Option<String>,
    subcommands: Vec<SubcommandSpec>,
}

#[derive(Debug, Deserialize)]
struct SubcommandSpec {
    name: String,
    #[serde(default)]
    help: Option<String>,
    #[serde(flatten)]
    engine: EngineSpec,
}

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    tokens: Vec<String>,
    /// reconcile this record directly instead of parsing tokens
    #[serde(default)]
    record: Option<Record>,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Expect(Value),
    /// `Debug` name of the expected `ErrorKind`
    Error(String),
}

static STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("static regex"));

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

fn main() {
    let args = RunnerArgs::parse();
    let filter = match args.filter.as_deref().map(Regex::new).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid --filter: {error}");
            std::process::exit(2);
        }
    };
    let paths = match fixture_paths(&args.fixtures) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("cannot read fixtures from {}: {error}", args.fixtures.display());
            std::process::exit(2);
        }
    };
    let mut failures = 0;
    for path in paths {
        let stem = file_stem(&path);
        if filter.as_ref().is_some_and(|f| !f.is_match(&stem)) {
            continue;
        }
        match run_fixture(&path) {
            Ok(count) => eprintln!("✅ {stem} ({count} cases)"),
            Err(error) => {
                failures += 1;
                eprintln!("❌ {stem}: {error}");
            }
        }
    }
    if failures > 0 {
        std::process::exit(1);
    }
}

fn fixture_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    Ok(paths)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Returns the number of cases run.
fn run_fixture(path: &Path) -> Result<usize, String> {
    let stem = file_stem(path);
    if !STEM.is_match(&stem) {
        return Err(format!("fixture names must be snake_case, got `{stem}`"));
    }
    let source = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    let fixture: Fixture = serde_path_to_error::deserialize(de)
        .map_err(|err| format!("at JSON path {} → {}", err.path(), err.inner()))?;
    let schema_source = fixture.schema.to_string();

    for (index, case) in fixture.cases.iter().enumerate() {
        let document = SchemaDocument::from_json_str(&schema_source).map_err(|e| e.to_string())?;
        let options = ParseOptions { strict: case.strict, ..document.options };
        let result = match &case.record {
            Some(record) => parse_typed_args(record.clone(), &document.schema, case.strict)
                .map_err(typedparser::Error::from),
            None => build_engine(fixture.engine.as_ref(), document.schema.name())
                .and_then(|engine| TypedParser::build(engine, document.schema, options))
                .and_then(|parser| parser.parse_namespace(&case.tokens)),
        };
        let label = format!("case {index} (strict: {}, tokens: {:?})", case.strict, case.tokens);
        match (&case.outcome, result) {
            (Outcome::Expect(expected), Ok(namespace)) => {
                let actual = namespace.into_value();
                if &actual != expected {
                    return Err(format!("{label}: expected {expected}, got {actual}"));
                }
            }
            (Outcome::Expect(_), Err(error)) => {
                return Err(format!("{label}: unexpected error: {error}"));
            }
            (Outcome::Error(kind), Ok(namespace)) => {
                return Err(format!("{label}: expected {kind} error, got {}", namespace.to_value()));
            }
            (Outcome::Error(kind), Err(error)) => {
                let actual = format!("{:?}", error.kind());
                if &actual != kind {
                    return Err(format!("{label}: expected {kind} error, got {actual}: {error}"));
                }
            }
        }
    }
    Ok(fixture.cases.len())
}

fn build_engine(spec: Option<&EngineSpec>, name: &str) -> Result<Engine, typedparser::Error> {
    let mut engine = Engine::new(name);
    if let Some(spec) = spec {
        populate(&mut engine, spec)?;
    }
    Ok(engine)
}

fn populate(engine: &mut Engine, spec: &EngineSpec) -> Result<(), typedparser::Error> {
    for descriptor in &spec.slots {
        // engine slots carry their own dest; fall back to the first name
        let field = descriptor
            .explicit_dest()
            .or_else(|| descriptor.names().first().map(String::as_str))
            .unwrap_or_default()
            .trim_start_matches('-')
            .replace('-', "_");
        let slot = descriptor.resolve(&field).map_err(|source| {
            typedparser::ParserBuildError::InvalidDescriptor { field: field.clone(), source }
        })?;
        engine.register(slot)?;
    }
    for group in &spec.exclusive {
        engine.exclusive_group(group.iter().cloned())?;
    }
    if let Some(dest) = &spec.subcommand_dest {
        engine.subcommand_dest(dest.clone())?;
    }
    for sub in &spec.subcommands {
        let child = engine.add_subcommand(sub.name.clone(), sub.help.as_deref())?;
        populate(child, &sub.engine)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_fixtures_pass() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        let paths = fixture_paths(&dir).unwrap();
        assert!(!paths.is_empty(), "no fixtures under {}", dir.display());
        let failures: Vec<String> = paths
            .iter()
            .filter_map(|path| {
                run_fixture(path).err().map(|e| format!("{}: {e}", file_stem(path)))
            })
            .collect();
        assert!(failures.is_empty(), "{}", failures.join("\n"));
    }

    #[test]
    fn missing_fixture_directory_is_an_error() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("no-such-fixtures");
        assert!(fixture_paths(&dir).is_err());
    }
}

//! CLI: drive schema documents from the shell (parse | check | describe)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use serde_json::Value;

use typedparser::{
    Binding, Engine, ErrorKind, FieldRecord, ParseOptions, Reconciler, SchemaDocument, SlotKind,
    TypedParser,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// build typed argument parsers from JSON schema documents
#[derive(Parser, Debug)]
#[command(name = "typedparser", version)]
pub struct CommandLineInterface {
    /// log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse raw tokens against a schema and print the reconciled namespace
    Parse(ParseOut),
    /// reconcile already-parsed JSON records against a schema
    Check(CheckRecords),
    /// print the fields of a schema and how each one is bound
    Describe(DescribeSchema),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document (.json)
    #[arg(long, short)]
    schema: PathBuf,

    /// enforce strict reconciliation regardless of the document's options
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// accept undeclared attributes in strict mode
    #[arg(long, default_value_t = false)]
    skip_unknowns: bool,

    /// disable int → float and str → path coercion
    #[arg(long, default_value_t = false)]
    no_coerce: bool,
}

#[derive(clap::Parser, Debug)]
struct ParseOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// tokens handed to the schema's parser, after `--`
    #[arg(last = true)]
    tokens: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckRecords {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// One or more records. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    record: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct DescribeSchema {
    /// schema document (.json)
    #[arg(long, short)]
    schema: PathBuf,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    /// Document options, overridden by whatever was switched on here.
    fn load(&self) -> anyhow::Result<(SchemaDocument, ParseOptions)> {
        let document = load_document(&self.schema)?;
        let mut options = document.options;
        options.strict |= self.strict;
        options.skip_unknowns |= self.skip_unknowns;
        options.coerce &= !self.no_coerce;
        debug!(schema = document.schema.name(), options:? = options; "Loaded schema document");
        Ok((document, options))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Parse(target) => {
                let (document, options) = target.schema_settings.load()?;
                let engine = Engine::new(document.schema.name());
                let parser = TypedParser::build(engine, document.schema, options)?;
                let namespace = parser.parse_namespace(&target.tokens)?;
                let rendered = serde_json::to_string_pretty(&namespace.into_value())?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("creating {}", parent.display()))?;
                    }
                    std::fs::write(out, &rendered)
                        .with_context(|| format!("writing {}", out.display()))?;
                    info!(path:? = out; "Wrote namespace");
                } else {
                    println!("{rendered}");
                }
                Ok(())
            }
            Command::Check(target) => {
                let (document, options) = target.schema_settings.load()?;
                let reconciler = Reconciler::new(&document.schema, options);
                let record_paths = resolve_file_path_patterns(&target.record)?;
                let mut failed = 0usize;
                for record_path in &record_paths {
                    let outcome = read_record(record_path)
                        .and_then(|record| Ok(reconciler.reconcile(record)?));
                    match outcome {
                        Ok(_) => println!("{} {}", "✅".green(), record_path.display()),
                        Err(error) => {
                            failed += 1;
                            println!("{} {}: {error:#}", "❌".red(), record_path.display());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} records failed", record_paths.len());
                }
                Ok(())
            }
            Command::Describe(target) => {
                let document = load_document(&target.schema)?;
                let schema = &document.schema;
                println!(
                    "{} {} ({} shape, strict: {})",
                    "schema".bold(),
                    schema.name().cyan(),
                    schema.shape(),
                    document.options.strict
                );
                for field in schema.fields() {
                    println!("  {}", describe_field(field));
                }
                Ok(())
            }
        }
    }
}

/// Process exit code for a failed run: 2 for usage errors, 1 otherwise.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<typedparser::Error>().map(typedparser::Error::kind) {
        Some(ErrorKind::Usage) => 2,
        _ => 1,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_document(path: &Path) -> anyhow::Result<SchemaDocument> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    SchemaDocument::from_json_str(&source)
        .with_context(|| format!("loading schema {}", path.display()))
}

fn read_record(path: &Path) -> anyhow::Result<typedparser::Record> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading record {}", path.display()))?;
    match serde_json::from_str::<Value>(&source)? {
        Value::Object(record) => Ok(record),
        other => bail!("expected a JSON object, found {}", typedparser::value::kind_of(&other)),
    }
}

fn describe_field(field: &FieldRecord) -> String {
    let binding = match field.binding() {
        Binding::Unbound { default } => format!("unbound, default {default}"),
        Binding::Argument(descriptor) => match descriptor.resolve(field.name()) {
            Ok(slot) => {
                let names = match slot.kind() {
                    SlotKind::Positional { name } => name.clone(),
                    SlotKind::Optional { flags } => flags.join(", "),
                };
                format!(
                    "{names} ({}), dest {}, default {}",
                    slot.action_kind(),
                    field.destination(),
                    field.default()
                )
            }
            Err(error) => format!("{}", error.to_string().red()),
        },
    };
    format!("{} {} → {binding}", field.name().bold(), field.declared_type().to_string().yellow())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matched nothing is an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

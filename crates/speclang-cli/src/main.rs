use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use speclang_ast::sexpr::{from_sexpr, to_sexpr};
use speclang_cli::{Evaluator, Runner, RunnerConfig, Value};
use speclang_parse::{compile, decompile};
use speclang_types::{catalog, Capability, CapabilitySet, Limits};

#[derive(Parser, Debug)]
#[command(name = "speclang")]
#[command(about = "Contract-spec runner: spec-lang evaluation, assertion trees and case chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the cases in one or more case documents
    Run {
        /// Markdown, .spec.yaml, .spec.yml or .spec.json documents
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Contract root for `/`-rooted references
        #[arg(long)]
        root: Option<PathBuf>,

        /// Only run the case with this id
        #[arg(long = "case")]
        case_id: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Evaluate a mapping-form expression and print the JSON result
    Eval {
        /// Expression as JSON or YAML text
        expr: String,

        /// Subject as JSON or YAML text
        #[arg(long, default_value = "null")]
        subject: String,

        #[arg(long)]
        max_steps: Option<u64>,

        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Capability token to grant (repeatable), e.g. ops.os
        #[arg(long = "cap")]
        caps: Vec<String>,
    },

    /// Compile a mapping-form expression and print its S-expression
    Compile {
        expr: String,
    },

    /// Convert an S-expression back to mapping form
    Decompile {
        sexpr: String,
    },

    /// Print the builtin catalog as JSON
    Catalog,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            paths,
            root,
            case_id,
            format,
        } => cmd_run(paths, root, case_id.as_deref(), format),

        Commands::Eval {
            expr,
            subject,
            max_steps,
            timeout_ms,
            caps,
        } => cmd_eval(&expr, &subject, max_steps, timeout_ms, &caps),

        Commands::Compile { expr } => {
            let expr = compile(&parse_data(&expr)?)?;
            println!("{}", to_sexpr(&expr));
            Ok(())
        }

        Commands::Decompile { sexpr } => {
            let expr = from_sexpr(&parse_data(&sexpr)?)?;
            println!("{}", decompile(&expr));
            Ok(())
        }

        Commands::Catalog => {
            println!("{}", serde_json::to_string_pretty(catalog::BUILTINS)?);
            Ok(())
        }
    }
}

/// JSON or YAML text as JSON data.
fn parse_data(text: &str) -> Result<serde_json::Value> {
    serde_yaml::from_str(text).with_context(|| format!("invalid JSON/YAML input: {text}"))
}

fn cmd_run(paths: Vec<PathBuf>, root: Option<PathBuf>, case_id: Option<&str>, format: Format) -> Result<()> {
    let mut config = RunnerConfig::from_env()?;
    if let Some(root) = root {
        config = config.with_root(root);
    }
    let runner = Runner::new(config);
    let summary = runner.run_paths(&paths, case_id);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => {
            for err in &summary.errors {
                println!("ERROR {err}");
            }
            for report in &summary.cases {
                match (&report.category, &report.message) {
                    (Some(category), Some(message)) => {
                        println!("FAIL {} {} [{category}] {message}", report.id, report.doc_path)
                    }
                    _ => println!("PASS {} {}", report.id, report.doc_path),
                }
            }
        }
    }

    if !summary.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_eval(
    expr: &str,
    subject: &str,
    max_steps: Option<u64>,
    timeout_ms: Option<u64>,
    caps: &[String],
) -> Result<()> {
    let expr = compile(&parse_data(expr)?)?;
    let subject = Value::from_json(&parse_data(subject)?);

    let mut limits = Limits::default();
    if let Some(n) = max_steps {
        limits = limits.with_max_steps(n);
    }
    if let Some(ms) = timeout_ms {
        limits = limits.with_timeout_ms(ms);
    }
    let mut capabilities = CapabilitySet::none();
    for token in caps {
        match Capability::from_name(token) {
            Some(cap) => capabilities.insert(cap),
            None => bail!("unknown capability: {token}"),
        }
    }
    let config = RunnerConfig::from_env()?;

    let value = Evaluator::new()
        .with_limits(limits)
        .with_capabilities(capabilities)
        .with_host(Arc::clone(&config.host))
        .eval(&expr, &subject)?;
    println!("{}", value.to_json()?);
    Ok(())
}

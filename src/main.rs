use clap::{Parser, Subcommand};
use smartify::{ParamError, Result, SchemaDoc, diagnostics};

use anyhow::Context;
use serde_json::Value;
use std::io::Read;

#[derive(Parser)]
#[command(name = "smartify")]
#[command(about = "Validate and reshape JSON input against a parameter schema", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an input document against a schema.
    Run {
        #[arg(long)]
        schema: String,

        /// Input JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,

        #[arg(short = 'o', long)]
        out: Option<String>,

        /// Emit `{ "<output key>": value }` instead of the bare value.
        #[arg(long)]
        wrap: bool,
    },

    /// Print an outline of a schema's parameters and processors.
    Describe {
        #[arg(long)]
        schema: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diagnostics::init_logging(cli.verbose);

    match cli.cmd {
        Commands::Run {
            schema,
            input,
            out,
            wrap,
        } => {
            // 1) Load + validate the schema document.
            let spec = SchemaDoc::from_file(&schema)?.validate_and_build()?;

            // 2) Read the input value.
            let value = read_input(&input)?;

            // 3) Evaluate.
            let (key, output) = match spec.evaluate(value) {
                Ok(pair) => pair,
                Err(err) => return Err(report(err)),
            };
            tracing::info!(key = %key, "evaluation succeeded");

            // 4) Write the result.
            let output = if wrap {
                let mut map = serde_json::Map::new();
                map.insert(key, output);
                Value::Object(map)
            } else {
                output
            };
            let text = serde_json::to_string_pretty(&output)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, text + "\n").with_context(|| {
                        diagnostics::error_message(format!("write output file {}", path))
                    })?;
                    eprintln!("Wrote {}", path);
                }
                None => println!("{}", text),
            }
        }
        Commands::Describe { schema } => {
            let spec = SchemaDoc::from_file(&schema)?.validate_and_build()?;
            print!("{}", spec.describe());
        }
    }

    Ok(())
}

fn read_input(path: &str) -> Result<Value> {
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .with_context(|| diagnostics::error_message("read input from stdin"))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| diagnostics::error_message(format!("read input file {}", path)))?
    };
    serde_json::from_str(&text)
        .with_context(|| diagnostics::error_message(format!("parse input {}", path)))
}

fn report(err: ParamError) -> anyhow::Error {
    let mut msg = format!("[{}] {}", err.kind(), err);
    if let Some(detail) = err.debug_message() {
        msg.push_str(&format!(": {}", detail));
    }
    anyhow::anyhow!(diagnostics::error_message(msg))
}

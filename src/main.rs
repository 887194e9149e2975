//! Observable-property weaver CLI entry point.

mod cli;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use oaph_weaver::{ModuleDef, WeaveResult, WeaverConfig, dump, slice_method, weave};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Weave {
            module,
            config,
            output,
            listing,
        } => weave_file(&module, config.as_deref(), output.as_deref(), listing),
        Command::Dump { module } => {
            load_module(&module).map(|module| {
                print!("{}", dump(&module));
                ExitCode::SUCCESS
            })
        }
        Command::Slice {
            module,
            method,
            index,
        } => load_module(&module)
            .and_then(|module| slice_method(&module, &method, index))
            .map(|slice| {
                print!("{}", slice.root.render());
                for approximation in &slice.approximations {
                    println!(
                        "approximated at {:04}: wanted {} operands, found {}",
                        approximation.index, approximation.requested, approximation.available
                    );
                }
                ExitCode::SUCCESS
            }),
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    })
}

fn load_module(path: &Path) -> WeaveResult<ModuleDef> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn weave_file(
    path: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    listing: bool,
) -> WeaveResult<ExitCode> {
    let config = match config {
        Some(path) => WeaverConfig::load(path)?,
        None => WeaverConfig::default(),
    };
    let mut module = load_module(path)?;
    let report = weave(&mut module, &config);

    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
    for property in &report.woven {
        println!("woven {}::{} -> {}", property.owner, property.name, property.field.name);
    }
    for field in &report.unused_fields {
        println!("possibly unused {field}");
    }
    if listing {
        print!("{}", dump(&module));
    }
    if let Some(output) = output {
        std::fs::write(output, serde_json::to_string_pretty(&module)?)?;
    }

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

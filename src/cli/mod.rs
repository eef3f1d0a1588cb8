//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::contract;
use crate::filter;
use crate::report;
use crate::resolver;
use crate::workspace::{collect_invocations, CsWorkspace, SourceAnalysisProvider};
use crate::{clean_path, read_file_lossy, CoverageError, MethodBinding};

// ─── CLI ─────────────────────────────────────────────────────────────

/// API test-coverage analyzer for OpenAPI-generated C# clients
#[derive(Parser, Debug)]
#[command(name = "swagcov", version, about, after_help = "\
Run 'swagcov <COMMAND> --help' for detailed options and examples.\n\
Common options: -d <DIR> (workspace root), -c <FILE> (NSwag config)")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Count client-method invocations per contract endpoint
    #[command(after_long_help = "\
WHAT IT DOES:
  Reads the NSwag config to find the contract document and the generated
  client, matches each endpoint to its client method, scans every .cs file
  under the workspace root for calls to those methods, drops the client's
  own internal calls, and writes per-endpoint counts as CSV.

EXAMPLES:
  swagcov coverage                          # nswag.json in the current dir
  swagcov coverage -d ./server -c api/nswag.json
  swagcov coverage --sort-by request -o coverage.csv
  swagcov coverage --debug 2> pipeline.log  # dump intermediate artifacts")]
    Coverage(CoverageArgs),

    /// List contract endpoints and their resolved client methods
    #[command(after_long_help = "\
WHAT IT DOES:
  Runs only the contract and resolution stages: extracts the endpoint
  catalog from the OpenAPI document and prints which generated client
  method implements each endpoint. No workspace scan.

EXAMPLES:
  swagcov endpoints
  swagcov endpoints -d ./server -c api/nswag.json")]
    Endpoints(EndpointsArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Coverage(args) => {
            init_tracing(args.debug);
            cmd_coverage(args)
        }
        Commands::Endpoints(args) => {
            init_tracing(args.debug);
            cmd_endpoints(args)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug { "swagcov=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Shared pipeline stages ─────────────────────────────────────────

/// Resolve the config path against the workspace root (absolute paths win)
/// and run the contract + resolution stages common to both commands.
fn resolve_binding(
    dir: &str,
    config: &str,
) -> Result<(contract::ClientInfo, MethodBinding), CoverageError> {
    let config_path = {
        let p = PathBuf::from(config);
        if p.is_absolute() { p } else { Path::new(dir).join(p) }
    };

    let client = contract::extract_client_info(&config_path)?;
    let endpoints = contract::extract_endpoints(&config_path)?;
    debug!(endpoints = endpoints.len(), client = %client.class_name, "contract loaded");

    let (client_source, _) = read_file_lossy(&client.file_path)?;
    let binding = resolver::build_binding(&client_source, &endpoints)?;
    Ok((client, binding))
}

fn binding_as_map(binding: &MethodBinding) -> BTreeMap<String, String> {
    binding
        .iter()
        .map(|(e, n)| (e.to_string(), n.to_string()))
        .collect()
}

fn dump_json<T: serde::Serialize>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => eprintln!("[debug] {label}:\n{json}"),
        Err(e) => eprintln!("[debug] {label}: serialization failed: {e}"),
    }
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_coverage(args: CoverageArgs) -> Result<(), CoverageError> {
    let started = Instant::now();

    let (client, binding) = resolve_binding(&args.dir, &args.config)?;
    if args.debug {
        dump_json("endpoint-to-method binding", &binding_as_map(&binding));
    }

    let workspace = CsWorkspace::open(Path::new(&args.dir), args.threads)?;
    eprintln!(
        "[swagcov] scanning {} documents for {} client methods...",
        workspace.documents().len(),
        binding.len()
    );

    let targets: HashSet<String> = binding.method_names().map(str::to_string).collect();
    let index = collect_invocations(&workspace, &targets, args.threads)?;
    if args.debug {
        dump_json("raw invocation index", &index);
    }

    let client_suffix = clean_path(&client.file_path.to_string_lossy());
    let defined = filter::filter_by_definition(&index, &client.class_name, &client_suffix)?;
    let external = filter::filter_out_client_invocations(&defined, &client.class_name, &client_suffix)?;
    if args.debug {
        dump_json("filtered invocation index", &external);
    }

    let report = report::aggregate(&binding, &external)?;
    let rows = report::to_sorted_rows(&report, args.sort_by);
    report::write_csv(Path::new(&args.output_csv), &rows)?;

    let total: usize = rows.iter().map(|(_, c)| *c).sum();
    println!("Count  Request");
    for (request, count) in &rows {
        println!("{count:>5}  {request}");
    }
    eprintln!(
        "[swagcov] {} endpoints, {} external invocations, CSV written to {} ({:.2}s)",
        rows.len(),
        total,
        args.output_csv,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_endpoints(args: EndpointsArgs) -> Result<(), CoverageError> {
    let (client, binding) = resolve_binding(&args.dir, &args.config)?;
    if args.debug {
        dump_json("endpoint-to-method binding", &binding_as_map(&binding));
    }

    println!("Client: {} ({})", client.class_name, client.file_path.display());
    for (endpoint, method_name) in binding_as_map(&binding) {
        println!("{endpoint}  ->  {method_name}");
    }
    eprintln!("[swagcov] {} endpoints resolved", binding.len());
    Ok(())
}

//! CLI argument structs for all subcommands.

use clap::Parser;

use crate::report::SortBy;

#[derive(Parser, Debug)]
pub struct CoverageArgs {
    /// Workspace root containing the C# sources to scan
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// NSwag configuration file (relative paths resolve against --dir)
    #[arg(short, long, default_value = "nswag.json")]
    pub config: String,

    /// Report row ordering
    #[arg(long, value_enum, default_value_t = SortBy::Count)]
    pub sort_by: SortBy,

    /// CSV output path
    #[arg(short, long, default_value = "invocationsCount.csv")]
    pub output_csv: String,

    /// Number of parallel threads (0 = auto)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Dump intermediate pipeline artifacts as JSON to stderr
    #[arg(long)]
    pub debug: bool,
}

#[derive(Parser, Debug)]
pub struct EndpointsArgs {
    /// Workspace root the config path resolves against
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// NSwag configuration file (relative paths resolve against --dir)
    #[arg(short, long, default_value = "nswag.json")]
    pub config: String,

    /// Dump intermediate pipeline artifacts as JSON to stderr
    #[arg(long)]
    pub debug: bool,
}

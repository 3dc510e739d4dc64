use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "dealprof",
    version,
    about = "Aggregate timing metrics from valuation trace outputs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract per-run timings from result documents and a submit log,
    /// and tabulate per-experiment means.
    Aggregate(AggregateArgs),
    /// Rewrite callable-product payloads into the double-trigger
    /// autocall form.
    Rewrite(RewriteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    /// Trace documents, named `<experiment>_result[_<n>].json`.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Submit log with the wall-clock execution times. Defaults to
    /// `submit.log` next to the common prefix of the inputs.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Where to write the aggregate manifest; stdout when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RewriteArgs {
    /// Payload documents to rewrite.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory for the rewritten documents. Defaults to the inputs'
    /// common prefix with a `_nocal` suffix.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

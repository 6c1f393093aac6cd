use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use pwsum::{
    logging::init_logging, reassemble, report::render_summary, LoadOptions, NodeReport,
    ReportFormat, RootSelection,
};
use std::{collections::BTreeSet, path::PathBuf, process::ExitCode};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "pwsum", version)]
#[command(about = "Sum file counts and sizes of a pwalk scan up to the root directory")]
struct Cli {
    /// CSV file written by pwalk
    input: PathBuf,

    /// The first line of the input is a header
    #[arg(long)]
    header: bool,

    /// What to do when more than one directory has parent inode 0
    #[arg(long, value_enum, default_value_t = Roots::Last)]
    roots: Roots,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Report this directory instead of the root
    #[arg(long, value_name = "INODE")]
    node: Option<u64>,

    /// Log progress to stderr (overridden by PWSUM_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Roots {
    Last,
    Smallest,
    Strict,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Roots> for RootSelection {
    fn from(roots: Roots) -> Self {
        match roots {
            Roots::Last => RootSelection::Last,
            Roots::Smallest => RootSelection::Smallest,
            Roots::Strict => RootSelection::Strict,
        }
    }
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => ReportFormat::Text,
            Format::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            println!("{}", Cli::command().render_usage());
            return ExitCode::from(1);
        }
    };

    init_logging(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> pwsum::Result<String> {
    let options = LoadOptions {
        has_headers: cli.header,
        root_selection: cli.roots.into(),
    };

    let (tree, aggregation) = reassemble(&cli.input, &options)?;

    let missing = aggregation
        .dangling
        .iter()
        .map(|dangling| dangling.missing_parent)
        .collect::<BTreeSet<_>>();
    for parent in missing {
        warn!(parent, "parent directory missing from scan, totals above it are partial");
    }

    if !aggregation.cycles.is_empty() {
        warn!(nodes = ?aggregation.cycles, "parent references form a cycle");
    }

    if !aggregation.saturated.is_empty() {
        warn!(nodes = ?aggregation.saturated, "totals exceed u64 and were clamped");
    }

    let report = match cli.node {
        Some(inode) => NodeReport::for_node(&tree, inode)?,
        None => NodeReport::for_root(&tree),
    };

    render_summary(&tree, &report, cli.format.into())
}

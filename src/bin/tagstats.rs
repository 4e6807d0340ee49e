use clap::{Args, Parser, Subcommand, ValueEnum};
use tagstats::{AggregatedCount, ExecConfig, Pipeline, RowFileLoader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Count HTML tag attributes extracted from web-crawl archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count every loaded tag/attribute row
    Count(InputArgs),

    /// Rank the most used script files
    Scripts(InputArgs),

    /// Rank the most used meta keywords
    Keywords(InputArgs),

    /// Row count plus both rankings
    Report(InputArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Row files produced by the archive parser (paths, file:// or http(s):// URLs)
    #[arg(required = true)]
    locations: Vec<String>,

    /// Number of partitions the table is split into, one map task each
    #[arg(short, long, default_value_t = 8)]
    partitions: usize,

    /// Number of reduce tasks
    #[arg(short, long, default_value_t = 4)]
    reducers: usize,

    /// Only show the top N entries of each ranking
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn setup_logging(verbose: bool) {
    // `--verbose` wins over RUST_LOG, otherwise fall back to info
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Logs go to stderr, stdout only carries the result
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn render_table(title: &str, counts: &[AggregatedCount]) {
    println!("{}", title);
    println!("{:<32}{:>10}", "key", "count");
    for c in counts {
        println!("{:<32}{:>10}", c.key, c.count);
    }
    if counts.is_empty() {
        println!("(no rows)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (Command::Count(args) | Command::Scripts(args) | Command::Keywords(args) | Command::Report(args)) =
        &cli.command;

    setup_logging(args.verbose);
    info!(
        "[Configuration] #{} Location(s) | #{} Partition(s) | #{} Reduce Task(s)",
        args.locations.len(),
        args.partitions,
        args.reducers
    );

    let pipeline = Pipeline::new(RowFileLoader::new())
        .with_config(ExecConfig { reduce_n: args.reducers })
        .with_limit(args.limit);

    // A load failure returns here, before anything is printed
    let table = pipeline.load(&args.locations, args.partitions).await?;

    match (&cli.command, args.format) {
        (Command::Count(_), Format::Text) => println!("{}", tagstats::count(&table)),
        (Command::Count(_), Format::Json) => {
            println!("{}", serde_json::json!({ "total_rows": tagstats::count(&table) }))
        }
        (Command::Scripts(_), format) => {
            let counts = pipeline.scripts(&table);
            match format {
                Format::Text => render_table("Script libraries", &counts),
                Format::Json => println!("{}", serde_json::to_string_pretty(&counts)?),
            }
        }
        (Command::Keywords(_), format) => {
            let counts = pipeline.keywords(&table);
            match format {
                Format::Text => render_table("Meta keywords", &counts),
                Format::Json => println!("{}", serde_json::to_string_pretty(&counts)?),
            }
        }
        (Command::Report(_), format) => {
            let report = pipeline.analyze(&table);
            match format {
                Format::Text => {
                    println!("Total rows: {}\n", report.total_rows);
                    render_table("Script libraries", &report.js_libraries);
                    println!();
                    render_table("Meta keywords", &report.keywords);
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }

    Ok(())
}

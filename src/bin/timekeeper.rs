use clap::{Parser, Subcommand};

use timekeeper::{
    JiraSource, PoolOptions, ReportParams, ReportRow, Timekeeper, TimekeeperOptions,
};

#[derive(Parser)]
#[command(name = "timekeeper", about = "JIRA work-log time-tracking reports")]
struct Cli {
    /// JIRA endpoint, e.g. https://example.atlassian.net
    /// (default: $TIMEKEEPER_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// JIRA username (default: $TIMEKEEPER_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// JIRA password (default: $TIMEKEEPER_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Number of concurrent fetch workers
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Maximum issues returned by one search
    #[arg(long, default_value = "100")]
    max_results: u32,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time tracked per work-log entry for a project/sprint, oldest first
    Sprint {
        /// Project key
        #[arg(long)]
        project: Option<String>,
        /// Sprint name (default: currently open sprints)
        #[arg(long)]
        sprint: Option<String>,
        /// Keep only entries by this author identifier
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Work logged on recently updated issues, most recent first
    Recent {
        /// Project key
        #[arg(long)]
        project: Option<String>,
        /// Staleness window as a JIRA date expression, e.g. -7d
        /// (default: last 30 days)
        #[arg(long)]
        delay: Option<String>,
        /// Keep only entries by this author identifier
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Flag value, then TIMEKEEPER_* environment variable.
fn resolve_setting(flag: Option<String>, env_key: &str, what: &str) -> anyhow::Result<String> {
    flag.or_else(|| std::env::var(env_key).ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing {what}: pass the flag or set {env_key}"))
}

fn print_rows(rows: &[ReportRow], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    for row in rows {
        println!(
            "{}\t{}\t{:.2}h\t{}\t{}",
            row.date, row.user, row.duration, row.ticket, row.ticket_url
        );
    }
    eprintln!("{} rows", rows.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let endpoint = resolve_setting(cli.endpoint, "TIMEKEEPER_ENDPOINT", "endpoint")?;
    let username = resolve_setting(cli.username, "TIMEKEEPER_USERNAME", "username")?;
    let password = resolve_setting(cli.password, "TIMEKEEPER_PASSWORD", "password")?;

    let source = std::sync::Arc::new(JiraSource::new(&endpoint, &username, &password)?);
    let options = TimekeeperOptions {
        max_results: cli.max_results,
        pool: PoolOptions {
            workers: cli.workers,
            ..PoolOptions::default()
        },
    };
    let keeper = Timekeeper::new(source, &endpoint, &options);

    match cli.command {
        Commands::Sprint {
            project,
            sprint,
            user,
            json,
        } => {
            let params = ReportParams {
                project,
                sprint,
                user,
                updated_since: None,
            };
            let rows = keeper.time_tracking(&params).await?;
            print_rows(&rows, json)?;
        }
        Commands::Recent {
            project,
            delay,
            user,
            json,
        } => {
            let params = ReportParams {
                project,
                sprint: None,
                user,
                updated_since: delay,
            };
            let rows = keeper.recent_activity(&params).await?;
            print_rows(&rows, json)?;
        }
    }

    keeper.shutdown().await;
    Ok(())
}

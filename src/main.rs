mod cli;
mod core;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(name = "c88", about = "88code subscription credit monitor", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once and show the remaining balance
    Status,
    /// Keep polling and print every balance update until Ctrl-C
    Watch {
        /// Seconds between polls (default: refresh_interval_secs from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// List active subscriptions
    List {
        /// Also show the balance spendable without resets
        #[arg(short, long)]
        all: bool,
    },
    /// Pick an action or a subscription to reset interactively
    Menu,
    /// Reset credits for one subscription
    Reset {
        /// Subscription ID
        id: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the config file location
    Path,
}

/// Log to stderr. `RUST_LOG` wins; otherwise warnings only, or debug with `-v`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "warn,c88=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
            AppConfig::default()
        }
    };

    let output_opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            cli::output::OutputFormat::from_name(
                cli.format
                    .as_deref()
                    .unwrap_or(&config.settings.default_format),
            )
        },
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
    };
    colored::control::set_override(output_opts.use_color);

    match cli.command {
        None | Some(Commands::Status) => cli::status_cmd::run(&config, &output_opts).await?,
        Some(Commands::Watch { interval }) => {
            cli::watch_cmd::run(&config, interval, &output_opts).await?
        }
        Some(Commands::List { all }) => cli::list_cmd::run(&config, all, &output_opts).await?,
        Some(Commands::Menu) => cli::menu_cmd::run(&config, &output_opts).await?,
        Some(Commands::Reset { id }) => cli::reset_cmd::run(&config, &id, &output_opts).await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
            ConfigAction::Path => cli::config_cmd::path(&output_opts)?,
        },
    }

    Ok(())
}

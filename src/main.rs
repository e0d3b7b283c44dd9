use anyhow::Result;
use clap::{Parser, Subcommand};
use nairaprice::cli::setup::setup;
use nairaprice::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for nairaprice::AppCommand {
    fn from(cmd: Commands) -> nairaprice::AppCommand {
        match cmd {
            Commands::Serve => nairaprice::AppCommand::Serve,
            Commands::Rate => nairaprice::AppCommand::Rate,
            Commands::Quote { cost, shipping } => nairaprice::AppCommand::Quote {
                cost_price: cost,
                shipping_cost: shipping,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the pricing web API (default)
    Serve,
    /// Fetch and print the current USD sell rate
    Rate,
    /// Compute the selling price for an item
    Quote {
        /// Cost price in USD
        #[arg(long)]
        cost: f64,
        /// Shipping cost in USD
        #[arg(long, default_value_t = 0.0)]
        shipping: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => nairaprice::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            nairaprice::run_command(nairaprice::AppCommand::Serve, cli.config_path.as_deref())
                .await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

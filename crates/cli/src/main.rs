//! Command Line Interface for the CLMM yield position manager.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clmm_yield_domain::math::price_tick::tick_to_price;
use clmm_yield_domain::{DepositSide, optimal_range_with_width};
use clmm_yield_execution::config::ManagerConfig;
use dotenv::dotenv;
use std::env;

mod simulate;

#[derive(Parser)]
#[command(name = "clmm-yield")]
#[command(about = "Concentrated liquidity position manager for single-asset yield", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Token0,
    Token1,
}

impl From<Side> for DepositSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Token0 => DepositSide::Token0,
            Side::Token1 => DepositSide::Token1,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the range a single-sided deposit would use
    Range {
        /// Current pool tick
        #[arg(long, allow_hyphen_values = true)]
        tick: i32,

        /// Pool tick spacing
        #[arg(long, default_value_t = 60)]
        spacing: i32,

        /// Token supplied by the deposit
        #[arg(long, value_enum, default_value = "token0")]
        side: Side,

        /// Range width in tick spacings (overrides CLMM_YIELD_RANGE_WIDTH)
        #[arg(long)]
        width: Option<u32>,
    },
    /// Run deposits, a random swap flow and a withdrawal against an in-memory pool
    Simulate {
        /// Amount of each deposit
        #[arg(long, default_value_t = 1_000_000)]
        deposit: u128,

        /// Number of deposits
        #[arg(long, default_value_t = 2)]
        deposits: u32,

        /// Amount to withdraw at the end
        #[arg(long, default_value_t = 1_500_000)]
        withdraw: u128,

        /// Number of swap steps
        #[arg(long, default_value_t = 200)]
        steps: u32,

        /// Random seed
        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Pool fee in hundredths of a basis point
        #[arg(long, default_value_t = 3_000)]
        fee: u32,

        /// Pool tick spacing
        #[arg(long, default_value_t = 60)]
        spacing: i32,

        /// Standard deviation of the per-step tick move
        #[arg(long, default_value_t = 120.0)]
        tick_volatility: f64,

        /// Range width in tick spacings (overrides CLMM_YIELD_RANGE_WIDTH)
        #[arg(long)]
        width: Option<u32>,

        /// Print the event log as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Manager configuration from the environment, with flag overrides.
fn manager_config(width: Option<u32>) -> Result<ManagerConfig> {
    let mut config = ManagerConfig::default();
    if let Ok(value) = env::var("CLMM_YIELD_RANGE_WIDTH") {
        config.range_width_spacings = value
            .parse()
            .with_context(|| format!("CLMM_YIELD_RANGE_WIDTH is not a number: {value}"))?;
    }
    if let Ok(value) = env::var("CLMM_YIELD_DEADLINE_SLACK") {
        config.deadline_slack_secs = value
            .parse()
            .with_context(|| format!("CLMM_YIELD_DEADLINE_SLACK is not a number: {value}"))?;
    }
    if let Some(width) = width {
        config.range_width_spacings = width;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Range {
            tick,
            spacing,
            side,
            width,
        } => {
            let config = manager_config(width)?;
            let (amount0, amount1) = DepositSide::from(side).split(1);
            let range = optimal_range_with_width(amount0, amount1, tick, spacing, config.range_width_spacings)?;

            println!("Range:       {range}");
            println!("Lower price: {:.8}", tick_to_price(range.lower)?);
            println!("Upper price: {:.8}", tick_to_price(range.upper)?);
            println!("Width:       {} ticks", range.width());
        }
        Commands::Simulate {
            deposit,
            deposits,
            withdraw,
            steps,
            seed,
            fee,
            spacing,
            tick_volatility,
            width,
            json,
        } => {
            let params = simulate::SimulationParams {
                deposit,
                deposits,
                withdraw,
                steps,
                seed,
                fee,
                spacing,
                tick_volatility,
                config: manager_config(width)?,
            };
            simulate::run(params, json).await?;
        }
    }

    Ok(())
}

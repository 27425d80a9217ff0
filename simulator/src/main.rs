//! Cashpoint Simulator
//!
//! Drives an ATM against an in-process ledger through scripted scenarios
//! or a stream of random withdrawals, with fault injection.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod accounts;
mod controller;
mod faults;
mod metrics;
mod scenario;

use cashpoint_coordinator::AtmConfig;
use controller::SimulationController;
use scenario::Scenario;

/// Cashpoint Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Cashpoint ATM simulation environment")]
struct Args {
    /// Random accounts to open besides the fixed demo accounts
    #[arg(short, long, default_value = "10")]
    accounts: usize,

    /// Built-in scenario name or path to a JSON scenario file
    #[arg(short, long)]
    scenario: Option<String>,

    /// Simulation speed multiplier
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Run duration in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AtmConfig::from_env().map_err(anyhow::Error::msg)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let args = Args::parse();

    info!("Starting Cashpoint Simulator");
    info!("Cassettes: {:?}", config.inventory.cassettes);
    info!("Speed: {}x", args.speed);

    let controller = SimulationController::new(&config, args.accounts, args.speed, args.seed)?;

    if let Some(scenario_name) = &args.scenario {
        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(&scenario).await?;
    } else {
        info!("Running random withdrawals, available scenarios: {:?}", Scenario::builtin_names());
        info!("Press Ctrl+C to stop");

        let duration = if args.duration > 0 {
            Some(std::time::Duration::from_secs(args.duration))
        } else {
            None
        };

        controller.run(duration).await?;
    }

    let metrics = controller.get_metrics();
    info!("Simulation complete");
    info!("Total withdrawals: {}", metrics.total_withdrawals);
    info!("Successful: {}", metrics.successful_withdrawals);
    info!("Failed: {}", metrics.failed_withdrawals);
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    info!("Cash dispensed: {}", metrics.cash_dispensed);
    info!(
        "Latency avg/p50/p99: {}/{}/{}ms",
        metrics.average_latency_ms(),
        metrics.p50_latency_ms(),
        metrics.p99_latency_ms()
    );
    info!("Cash remaining: {}", controller.atm().total_cash());
    println!("{}", controller.atm().metrics().to_prometheus());

    Ok(())
}

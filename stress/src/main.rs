//! Main entry point for the stress binary

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use shared::logging;
use stress::services::{RealLauncher, WorkloadGenerator};
use stress::{DelayBounds, FaultDistribution, LaunchPlan, StressConfig, StressError, StressRunner, Workload};

/// Stress-test implementations of distributed algorithms by pausing, resuming and killing their processes
#[derive(Parser)]
#[command(name = "stress")]
#[command(about = "Fault-injection harness for perfect links, FIFO broadcast and lattice agreement")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "STRESS_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stress perfect links
    #[command(alias = "perfect-links")]
    Perfect {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        messages: MessageArgs,
    },

    /// Stress fifo broadcast
    #[command(alias = "fifo-broadcast")]
    Fifo {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        messages: MessageArgs,
    },

    /// Stress lattice agreement
    #[command(alias = "lattice-agreement")]
    Agreement {
        #[command(flatten)]
        common: CommonArgs,

        /// Maximum number (because it can crash) of proposals that each process can make
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
        proposals: u32,

        /// Maximum size of the proposal set that each process proposes
        #[arg(short = 'v', long = "proposal-values", value_parser = clap::value_parser!(u32).range(1..))]
        proposal_max_values: u32,

        /// The number of distinct values among all proposals
        #[arg(short = 'd', long = "distinct-values", value_parser = clap::value_parser!(u32).range(1..))]
        distinct_values: u32,
    },
}

#[derive(ClapArgs)]
struct CommonArgs {
    /// Path to run.sh
    #[arg(short = 'r', long)]
    runscript: PathBuf,

    /// Directory to store stdout, stderr and outputs generated by the processes
    #[arg(short = 'l', long = "logs")]
    logs_dir: PathBuf,

    /// Number of processes that broadcast
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u32).range(1..))]
    processes: u32,

    /// Number of successful attempts each stress worker makes
    #[arg(short = 'a', long, default_value = "8")]
    attempts: u64,

    /// Number of concurrent stress workers
    #[arg(short = 'c', long, default_value = "8", value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: u64,

    /// Distribution of the attempts (format: STOP:0.48,CONT:0.48,TERM:0.04)
    #[arg(long, default_value = "STOP:0.48,CONT:0.48,TERM:0.04")]
    attempts_distribution: FaultDistribution,

    /// Timeout in seconds after which the surviving processes are terminated (waits for Enter when absent)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Seed of the fault-injection random source
    #[arg(long)]
    seed: Option<u64>,

    /// Cap on loop iterations per worker, successful or not (unbounded when absent)
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Lower bound of the delay before each fault, in milliseconds
    #[arg(long, default_value = "50")]
    min_delay_ms: u64,

    /// Upper bound of the delay before each fault, in milliseconds
    #[arg(long, default_value = "500")]
    max_delay_ms: u64,
}

#[derive(ClapArgs)]
struct MessageArgs {
    /// Maximum number (because it can crash) of messages that each process can broadcast
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
    messages: u32,
}

impl Command {
    fn into_parts(self) -> (CommonArgs, Workload) {
        match self {
            Command::Perfect { common, messages } => (
                common,
                Workload::PerfectLinks {
                    messages: messages.messages,
                },
            ),
            Command::Fifo { common, messages } => (
                common,
                Workload::FifoBroadcast {
                    messages: messages.messages,
                },
            ),
            Command::Agreement {
                common,
                proposals,
                proposal_max_values,
                distinct_values,
            } => (
                common,
                Workload::LatticeAgreement {
                    proposals,
                    max_proposal_size: proposal_max_values,
                    distinct_values,
                },
            ),
        }
    }
}

fn build_config(common: CommonArgs, workload: Workload) -> stress::StressResult<StressConfig> {
    StressConfig::builder()
        .runscript(common.runscript)
        .logs_dir(common.logs_dir)
        .processes(common.processes)
        .workload(workload)
        .attempts(common.attempts)
        .concurrency(common.concurrency as usize)
        .distribution(common.attempts_distribution)
        .delay(DelayBounds::from_millis(common.min_delay_ms, common.max_delay_ms))
        .max_iterations(common.max_iterations)
        .timeout_secs(common.timeout)
        .seed(common.seed)
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment file may set STRESS_LOG_LEVEL before arguments are parsed
    dotenv::dotenv().ok();

    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let (common, workload) = args.command.into_parts();
    logging::log_startup(&format!("{} stress test", workload.name()));

    let config = match build_config(common, workload) {
        Ok(config) => config,
        Err(e) => return exit_with(e),
    };

    // Resolve the implementation before writing anything
    let launcher = match RealLauncher::from_runscript(&config.runscript) {
        Ok(launcher) => launcher,
        Err(e) => return exit_with(e),
    };

    let generated = WorkloadGenerator::new(&config.logs_dir, config.processes)
        .generate(&config.workload)
        .await
        .context("failed to generate workload artifacts")?;

    let plan = LaunchPlan {
        process_count: config.processes,
        hosts_file: generated.hosts_file,
        config_files: generated.config_files,
        output_dir: config.logs_dir.clone(),
    };

    let runner = StressRunner::new(launcher, plan, config.injection.clone(), config.drain).with_seed(config.seed);

    match runner.run().await {
        Ok(summary) => {
            logging::log_success(&format!(
                "Run {} finished: {} of {} allowed terminations injected",
                summary.run_id, summary.injected_terminations, summary.termination_limit
            ));
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}

/// Report a fatal error. Configuration errors and interrupts exit directly with
/// their own status; anything else is returned with context.
fn exit_with(error: StressError) -> anyhow::Result<()> {
    if matches!(error, StressError::Interrupted) {
        logging::log_shutdown("interrupted, all processes killed");
        // stdin may still be blocked on the operator prompt
        std::process::exit(error.exit_code());
    }

    if error.is_configuration() {
        logging::log_error("Configuration check", &error);
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }

    logging::log_error("Stress run", &error);
    Err(error).context("stress run failed")
}

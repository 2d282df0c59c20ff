use args::{parse_args, Args};
use simulator::network::{SimulationParams, TangleSimulator};
use std::time::Duration;
use tangle_core::{info, log::init_logger};

mod args;
pub mod simulator;

impl From<&Args> for SimulationParams {
    fn from(args: &Args) -> Self {
        Self {
            bps: args.bps,
            sim_time: Duration::from_secs(args.sim_time),
            milestone_interval: args.milestone_interval,
            spammer_share: args.spammer_share,
            seed: args.seed,
            monitor: !args.quiet,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = parse_args();
    if let Err(err) = init_logger(args.logdir.as_deref(), &args.log_level) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config = args.tipsel_config();
    info!("Tip selection config: {:?}", config);
    let report = TangleSimulator::new(config, SimulationParams::from(&args)).run().await;
    println!("{report}");
}

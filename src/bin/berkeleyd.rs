use std::{process::ExitCode, sync::Arc, time::Duration};

use berkeley_sync::{
    clock::SystemClock,
    coordinator::Coordinator,
    config::Config,
    participant::Handler,
    participant::Participant,
    transport::tcp::TcpTransport,
};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "berkeleyd", about = "Berkeley clock-synchronization node")]
struct Args {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand, Debug)]
enum Role {
    Coordinator {
        #[arg(long)]
        config: String,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    Participant {
        #[arg(long)]
        config: String,
        #[arg(long)]
        name: String,
    },
}

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_TRANSPORT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    berkeley_sync::logging::init();

    let args = Args::parse();
    match args.role {
        Role::Coordinator {
            config,
            rounds,
            interval_ms,
        } => run_coordinator(&config, rounds, interval_ms).await,
        Role::Participant { config, name } => run_participant(&config, &name).await,
    }
}

async fn run_coordinator(config_path: &str, rounds: u32, interval_ms: u64) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let coordinator = Coordinator::new(
        config.leader.name.clone(),
        config.leader.address.clone(),
        Arc::new(SystemClock::new()),
        Arc::new(TcpTransport),
        config.timeout(),
    );

    for round in 1..=rounds {
        let result = coordinator.run_round(&config.followers).await;
        info!(
            round,
            unreachable = result.unreachable.len(),
            responded = result.responded.len(),
            non_responding = result.non_responding.len(),
            time_updated = result.time_updated.len(),
            failed = result.failed.len(),
            "round complete"
        );
        print_summary(round, &result);
        if round != rounds {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }

    ExitCode::SUCCESS
}

fn print_summary(round: u32, result: &berkeley_sync::coordinator::RoundResult) {
    println!("round {round}:");
    println!("  unreachable:      {:?}", result.unreachable.keys().collect::<Vec<_>>());
    println!("  responded:        {:?}", result.responded.keys().collect::<Vec<_>>());
    println!("  non_responding:   {:?}", result.non_responding.keys().collect::<Vec<_>>());
    println!("  time_updated:     {:?}", result.time_updated.keys().collect::<Vec<_>>());
    println!("  failed:           {:?}", result.failed.keys().collect::<Vec<_>>());
}

async fn run_participant(config_path: &str, name: &str) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let peer = match config.follower(name) {
        Ok(peer) => peer,
        Err(err) => {
            error!(%err, "unknown participant name");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let clock = Arc::new(SystemClock::new());
    let handler = Handler::new(peer.name.clone(), peer.address.clone(), clock);
    let mut participant = match Participant::bind(&peer.address, handler).await {
        Ok(participant) => participant,
        Err(err) => {
            error!(%err, "failed to bind participant endpoint");
            return ExitCode::from(EXIT_TRANSPORT_ERROR);
        }
    };

    info!(name = %peer.name, address = %peer.address, "participant listening");
    let ctrl_c = Box::pin(async {
        let _ = tokio::signal::ctrl_c().await;
    });
    match participant.serve(ctrl_c).await {
        Ok(()) => {
            participant.close().await;
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "participant service loop failed");
            ExitCode::from(EXIT_TRANSPORT_ERROR)
        }
    }
}

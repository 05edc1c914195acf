use std::net::IpAddr;
use std::process;

use clap::Parser;
use tracing::{error, info};

use fragsort::common::init_logging;
use fragsort::worker::{DEFAULT_READ_CHUNK, WorkerConfig, connect_and_serve};

#[derive(Parser)]
#[command(
    name = "fragsort-worker",
    version,
    about = "Sort one fragment by line index for a coordinator"
)]
struct Cli {
    /// Coordinator address
    ip: IpAddr,

    /// Coordinator port
    port: u16,

    /// Bytes per socket read
    #[arg(long = "read-chunk", value_name = "BYTES", default_value_t = DEFAULT_READ_CHUNK)]
    read_chunk: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = WorkerConfig {
        read_chunk_size: cli.read_chunk,
    };
    match connect_and_serve((cli.ip, cli.port), &config) {
        Ok(summary) => {
            info!(
                received = summary.received.accepted,
                discarded = summary.received.discarded(),
                sent = summary.sent,
                "done"
            );
        }
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

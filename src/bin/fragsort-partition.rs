use std::path::PathBuf;
use std::process;

use clap::Parser;

use fragsort::common::{init_logging, io_error_msg};
use fragsort::error::EXIT_CONFIG;
use fragsort::partition::{PartitionConfig, Strategy, partition_file};

#[derive(Parser)]
#[command(
    name = "fragsort-partition",
    version,
    about = "Split a file into indexed fragments and a descriptor"
)]
struct Cli {
    /// File to split
    original: PathBuf,

    /// Number of fragments
    #[arg(short = 'n', long = "fragments", value_name = "N", default_value_t = 2)]
    fragments: usize,

    /// Deal lines to fragments in turn instead of in consecutive runs
    #[arg(long = "round-robin")]
    round_robin: bool,

    /// Name prefix for fragment and descriptor files
    #[arg(long = "prefix", value_name = "P", default_value = "frag")]
    prefix: String,

    /// Directory for the generated files
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PartitionConfig {
        fragments: cli.fragments,
        strategy: if cli.round_robin {
            Strategy::RoundRobin
        } else {
            Strategy::Contiguous
        },
        prefix: cli.prefix,
        out_dir: cli.dir,
    };

    match partition_file(&cli.original, &config) {
        Ok(summary) => println!("{}", summary.descriptor.display()),
        Err(e) => {
            eprintln!(
                "fragsort-partition: {}: {}",
                cli.original.display(),
                io_error_msg(&e)
            );
            process::exit(EXIT_CONFIG);
        }
    }
}

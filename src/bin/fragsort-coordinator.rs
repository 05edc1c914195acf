use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use fragsort::common::init_logging;
use fragsort::common::io::OutputSink;
use fragsort::coordinator::{Coordinator, CoordinatorConfig, DEFAULT_READ_CHUNK, verify_output};
use fragsort::error::{EXIT_CONFIG, EXIT_MISMATCH};
use fragsort::manifest::Manifest;

#[derive(Parser)]
#[command(
    name = "fragsort-coordinator",
    version,
    about = "Hand fragments to workers and merge their sorted results"
)]
struct Cli {
    /// Descriptor file: the original file, then one fragment per line
    descriptor: PathBuf,

    /// TCP port to listen on
    port: u16,

    /// Write the reconstruction to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Address to bind
    #[arg(long = "bind", value_name = "ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Compare the output with the original file when done
    #[arg(long = "verify", requires = "output")]
    verify: bool,

    /// Bytes per socket read
    #[arg(long = "read-chunk", value_name = "BYTES", default_value_t = DEFAULT_READ_CHUNK)]
    read_chunk: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let manifest = Manifest::load(&cli.descriptor)?;
    let fragments = manifest.open_fragments()?;

    let listener =
        TcpListener::bind((cli.bind, cli.port)).map_err(|e| fragsort::Error::transport("bind", e))?;
    let config = CoordinatorConfig {
        read_chunk_size: cli.read_chunk,
    };
    let coordinator = Coordinator::new(listener, fragments, config)?;

    let summary = {
        let mut sink = OutputSink::open(cli.output.as_deref()).with_context(|| match &cli.output {
            Some(p) => format!("cannot open {}", p.display()),
            None => "cannot open standard output".to_string(),
        })?;
        coordinator.run(&mut sink)?
    };
    info!(
        fragments = summary.fragments,
        records = summary.output.records,
        rejected = summary.rejected_connections,
        "run complete"
    );

    if cli.verify {
        if let Some(output) = &cli.output {
            let same = verify_output(&manifest.original, output).with_context(|| {
                format!("cannot compare {} with {}", output.display(), manifest.original.display())
            })?;
            if !same {
                error!(
                    original = %manifest.original.display(),
                    output = %output.display(),
                    "output differs from original"
                );
                return Ok(EXIT_MISMATCH);
            }
            info!(original = %manifest.original.display(), "output matches original");
        }
    }
    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            let code = e
                .downcast_ref::<fragsort::Error>()
                .map_or(EXIT_CONFIG, fragsort::Error::exit_code);
            error!("{:#}", e);
            process::exit(code);
        }
    }
}

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;

use clap::Parser;
use log::info;

use um::engine::Engine;
use um::error::UmError;
use um::loader::load_image;

/// A 32-bit word-oriented Universal Machine interpreter.
#[derive(Parser, Debug)]
#[command(name = "um", version, about)]
struct Cli {
    /// Path to the `.um` program image to execute.
    image: String,

    /// Increase diagnostic verbosity (-v, -vv, -vvv). Never affects the
    /// machine's own stdout/stdin byte streams.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(cli: &Cli) -> Result<(), UmError> {
    let file = File::open(&cli.image).map_err(|source| UmError::OpenFailed {
        path: cli.image.clone(),
        source,
    })?;

    let store = load_image(BufReader::new(file))?;
    info!("loaded {} word(s) from {}", store.length(0)?, cli.image);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut engine = Engine::new(store, stdin.lock(), stdout.lock());
    let result = engine.run();
    match &result {
        Ok(()) => info!("machine halted"),
        Err(err) => info!("machine stopped: {err}"),
    }
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("um: {err}");
            ExitCode::FAILURE
        }
    }
}

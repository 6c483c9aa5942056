// src/main.rs

use scriptpulse::{cli, logging, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("scriptpulse error: {err:?}");
            1
        }
    };
    // The stdin reader may still be parked on a blocking read.
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}

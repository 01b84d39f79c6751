use anyhow::{anyhow, Context, Result};
use beanscript::{default_driver, parse_file, DriverUnavailable, Runtime};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "beanscript",
    about = "Run a BeanScript keystroke script",
    version
)]
struct Args {
    /// Path to the script file; defaults to the first .bs file in the
    /// working directory
    script: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) if error.is::<DriverUnavailable>() => {
            eprintln!("{error:#}");
            ExitCode::from(2)
        }
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let script = match args.script {
        Some(path) => path,
        None => find_default_script()?,
    };

    let program = parse_file(&script)
        .with_context(|| format!("Failed to parse script file: {}", script.display()))?;

    let driver = default_driver()?;
    let mut runtime = Runtime::new(program, driver);
    runtime.run().await
}

/// Picks any `.bs` file in the working directory when no path was given.
fn find_default_script() -> Result<PathBuf> {
    for entry in std::fs::read_dir(".").context("Failed to read the working directory")? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "bs") {
            return Ok(path);
        }
    }
    Err(anyhow!("no script path given and no .bs file found in the working directory"))
}

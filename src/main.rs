use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use slideflat::{decode, decode_into_container, FlatSlide, FlattenConfig, Viewport};
use std::io::{self, Read};
use std::path::PathBuf;

/// Flatten HTML slides into positioned visual units and rebuild them
#[derive(Parser, Debug)]
#[command(name = "slideflat", version, about)]
struct Args {
    /// Viewport size as WxH (e.g., 1280x720)
    #[arg(long, global = true, default_value = "1280x720")]
    viewport: Viewport,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the flattened slide of an HTML fragment as JSON
    Encode {
        /// HTML file, or `-` for stdin
        input: PathBuf,
    },
    /// Rebuild markup from a flattened slide
    Decode {
        /// JSON file produced by `encode`, or `-` for stdin
        input: PathBuf,
    },
    /// Encode then decode into a container fitted to the viewport
    Roundtrip {
        /// HTML file, or `-` for stdin
        input: PathBuf,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = FlattenConfig {
        viewport: args.viewport,
        ..Default::default()
    };
    config.validate()?;

    match &args.command {
        Command::Encode { input } => {
            let markup = read_input(input)?;
            let flattener = slideflat::new_flattener(&config);
            let slide = flattener.encode(&markup).await;
            info!("extracted {} units", slide.units.len());
            println!("{}", slide.to_json()?);
        }
        Command::Decode { input } => {
            let json = read_input(input)?;
            let slide = FlatSlide::from_json(&json).context("input is not a flattened slide")?;
            println!("{}", decode(&slide.units));
        }
        Command::Roundtrip { input } => {
            let markup = read_input(input)?;
            let flattener = slideflat::new_flattener(&config);
            let slide = flattener.encode(&markup).await;
            info!(
                "extracted {} units, slide {:?}x{:?}",
                slide.units.len(),
                slide.width,
                slide.height
            );
            println!("{}", decode_into_container(&slide, config.viewport));
        }
    }
    Ok(())
}

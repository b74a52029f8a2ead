//! Flies a set of interval flyers concurrently and prints their records.
//!
//! The default settings reproduce the classic two-flyer demo: `flyer0` takes
//! 3 samples and `flyer1` takes 5, both at 500 ms, flown in one concurrent
//! plan. Override with a TOML file or `DAQ_FLYER_*` environment variables.

use anyhow::Result;
use clap::Parser;
use daq_flyer::activity::IntervalActivity;
use daq_flyer::config::Settings;
use daq_flyer::engine;
use daq_flyer::flyer::{Flyable, Flyer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fly_demo", about = "Fly interval flyers concurrently")]
struct Args {
    /// Optional TOML settings file, layered over the built-in defaults.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::new(args.config.as_deref())?;

    let mut flyers: Vec<Flyer> = settings
        .flyers
        .iter()
        .map(|cfg| {
            Flyer::new(
                cfg.name.clone(),
                Arc::new(IntervalActivity::new(cfg.steps, cfg.period)),
            )
        })
        .collect();

    for flyer in &flyers {
        println!("schema for {}:", flyer.name());
        for (field, key) in flyer.describe() {
            println!(
                "  {field}: dtype={} shape={:?} source={:?}",
                key.dtype, key.shape, key.source
            );
        }
    }

    let mut handles: Vec<&mut dyn Flyable> =
        flyers.iter_mut().map(|f| f as &mut dyn Flyable).collect();
    let results = engine::fly_all(&mut handles, Some(settings.wait_timeout)).await?;

    for (name, records) in results {
        println!("=================");
        println!("data for {name}");
        println!("{:>4}  {:>18}  {:>10}", "seq", "time", "x");
        for (seq, record) in records.iter().enumerate() {
            let x = record.data.get("x").copied().unwrap_or(f64::NAN);
            println!("{seq:>4}  {:>18.6}  {x:>10.4}", record.time);
        }
    }

    Ok(())
}

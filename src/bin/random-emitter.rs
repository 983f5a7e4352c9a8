// Copyright (c) 2025 - Cowboy AI, Inc.
//! Random Emitter Host Harness
//!
//! Runs the emission engine against stdin/stdout:
//! - each stdin line is a JSON configuration snapshot, e.g.
//!   `{"frequency": 2, "distribution": "normal", "options": {"mu": 0, "sigma": 1}}`
//! - each tick writes `{"v": <value>}` as one JSON line to stdout
//! - logs and rejected snapshots go to stderr
//! - stdin EOF stops reading snapshots, emission continues until Ctrl-C
//!
//! Run with: cargo run --bin random-emitter
//!
//! Environment:
//! - RANDOM_EMITTER_KEY: output key (default "v")
//! - RANDOM_EMITTER_SEED: base seed for reproducible runs
//! - RANDOM_EMITTER_CONFIG: snapshot applied at mount
//! - RUST_LOG: log filter (default info)

use anyhow::{Context, Result};
use cim_random_emitter::{ChannelSink, EmissionConfig, EngineController, EngineSettings};
use serde_json::{Map, Value};
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let settings = EngineSettings::from_env().context("Invalid emitter environment")?;
    info!(
        key = %settings.output_key,
        seed = ?settings.seed,
        initial = ?settings.initial_config,
        "starting random emitter"
    );

    let (sink, mut values) = ChannelSink::channel();
    let mut engine = EngineController::mount(sink, settings).context("Failed to mount engine")?;

    let writer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        while let Some(published) = values.recv().await {
            let mut line = Map::new();
            line.insert(published.key, serde_json::to_value(published.value)?);
            let mut out = stdout.lock();
            writeln!(out, "{}", Value::Object(line))?;
            out.flush()?;
        }
        anyhow::Ok(())
    });

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for interrupt: {}", e);
        }
    };
    serve(&mut engine, BufReader::new(tokio::io::stdin()), interrupt).await?;

    engine.shutdown();
    drop(engine);

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("output writer failed: {}", e),
        Err(e) => error!("output writer panicked: {}", e),
    }

    info!("random emitter stopped");
    Ok(())
}

/// Apply one snapshot per input line until `shutdown` resolves
///
/// End of input stops reading but not emission. `shutdown` is polled as a
/// single future for the whole loop, so it is never dropped between lines.
async fn serve<R, F>(engine: &mut EngineController, input: R, shutdown: F) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match EmissionConfig::from_json(&line) {
                        Ok(config) => {
                            if let Err(e) = engine.apply(config) {
                                warn!("snapshot rejected: {}", e);
                            }
                        }
                        Err(e) => warn!("snapshot rejected: {}", e),
                    },
                    None => {
                        info!("stdin closed, emitting until interrupted");
                        input_open = false;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("interrupt received");
                return Ok(());
            }
        }
    }
}

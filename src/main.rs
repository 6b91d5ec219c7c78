use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pa_signal_engine::config::Config;
use pa_signal_engine::engine::SignalEngine;
use pa_signal_engine::ingestion::{IngestionAdapter, RestIngestionAdapter};
use pa_signal_engine::notify::{LogSink, NotificationSink};
use pa_signal_engine::store::{CooldownStore, FileCooldownStore, InMemoryCooldownStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let cooldowns: Arc<dyn CooldownStore> = if cfg.dry_run {
        Arc::new(InMemoryCooldownStore::new())
    } else {
        Arc::new(FileCooldownStore::load(&cfg.cooldown_store_path)?)
    };
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
    let adapter: Arc<dyn IngestionAdapter> =
        Arc::new(RestIngestionAdapter::new(adapter_base_url(&cfg), &cfg));

    let shared_config = cfg.clone().shared();
    let mut engine = SignalEngine::new(shared_config, cooldowns.clone(), sink);

    for symbol in &cfg.symbols {
        for &tf in &cfg.timeframes {
            match adapter.backfill(symbol, tf, 200, None, None).await {
                Ok(candles) => engine.seed(symbol, tf, candles),
                Err(e) => warn!(symbol, %tf, error = %e, "initial backfill failed"),
            }
        }
    }

    info!(symbols = ?cfg.symbols, timeframes = ?cfg.timeframes, mode = ?cfg.mode, "signal engine starting");

    let cleanup_cooldowns = cooldowns.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = cleanup_cooldowns.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "expired cooldown entries cleaned up");
            }
        }
    });

    let symbols = cfg.symbols.clone();
    let timeframes = cfg.timeframes.clone();

    tokio::select! {
        res = run_stream(adapter, symbols, timeframes, &mut engine) => {
            if let Err(e) = res {
                error!(error = %e, "ingestion stream terminated");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested, stopping ingestion");
        }
    }

    Ok(())
}

fn adapter_base_url(cfg: &Config) -> String {
    format!("https://api.{}.example", cfg.exchange)
}

/// Drains closed/forming candle events from the adapter's stream into the
/// engine over an in-process channel, keeping the ingestion task and the
/// single-writer analysis loop on separate tasks per the concurrency model.
async fn run_stream(
    adapter: Arc<dyn IngestionAdapter>,
    symbols: Vec<String>,
    timeframes: Vec<pa_signal_engine::models::Timeframe>,
    engine: &mut SignalEngine,
) -> Result<()> {
    use pa_signal_engine::models::{Candle, Timeframe};
    use tokio::sync::mpsc;

    enum CandleEvent {
        Closed(String, Timeframe, Candle),
        Forming(String, Timeframe, Candle),
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<CandleEvent>();
    let tx_closed = tx.clone();
    let tx_forming = tx;

    let stream_task = tokio::spawn(async move {
        adapter
            .stream(
                symbols,
                timeframes,
                Box::new(move |symbol, tf, candle| {
                    let _ = tx_closed.send(CandleEvent::Closed(symbol.to_string(), tf, candle));
                }),
                Some(Box::new(move |symbol, tf, candle| {
                    let _ = tx_forming.send(CandleEvent::Forming(symbol.to_string(), tf, candle));
                })),
            )
            .await
    });

    while let Some(event) = rx.recv().await {
        match event {
            CandleEvent::Closed(symbol, tf, candle) => {
                engine.on_closed_candle(&symbol, tf, candle).await
            }
            CandleEvent::Forming(symbol, tf, candle) => {
                engine.on_forming_candle(&symbol, tf, candle).await
            }
        }
    }

    stream_task.await?
}

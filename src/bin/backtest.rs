use anyhow::Result;
use chrono::{Duration, Utc};
use tracing_subscriber::{fmt, EnvFilter};

use pa_signal_engine::backtesting::{data_fetcher, BacktestRunner};
use pa_signal_engine::config::Config;
use pa_signal_engine::ingestion::ReplayFeed;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let days_back: i64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(90);
    let step_minutes: i64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(60);

    let end = Utc::now();
    let start = end - Duration::days(days_back);

    println!("==============================================================");
    println!("  SIGNAL ENGINE BACKTESTER");
    println!("==============================================================");
    println!("  Symbols:    {:?}", cfg.symbols);
    println!("  Timeframes: {:?}", cfg.timeframes);
    println!("  Period:     {days_back} days");
    println!("  Step:       {step_minutes} minutes");
    println!("==============================================================\n");

    let adapter = pa_signal_engine::ingestion::RestIngestionAdapter::new(
        format!("https://api.{}.example", cfg.exchange),
        &cfg,
    );

    let mut feed = ReplayFeed::new(start);
    for symbol in &cfg.symbols {
        for &tf in &cfg.timeframes {
            let candles =
                data_fetcher::fetch_and_cache(&adapter, symbol, tf, start, end, "data").await?;
            if candles.is_empty() {
                println!("  WARNING: no data for {symbol}/{tf}, skipping");
                continue;
            }
            println!("  {symbol}/{tf}: {} candles", candles.len());
            feed.load(symbol, tf, candles);
        }
    }
    println!();

    let data_start = feed.earliest_time().unwrap_or(start);
    let data_end = feed.latest_time().unwrap_or(end);
    let bt_start = data_start + Duration::days(1);
    if bt_start >= data_end {
        println!("ERROR: not enough history for a backtest window");
        return Ok(());
    }

    feed.set_time(bt_start);
    let mut runner = BacktestRunner::new(feed, cfg.clone());
    for symbol in &cfg.symbols {
        for &tf in &cfg.timeframes {
            runner.seed(symbol, tf, 200).await?;
        }
    }

    println!(
        "Backtesting from {} to {}\n",
        bt_start.format("%Y-%m-%d %H:%M"),
        data_end.format("%Y-%m-%d %H:%M")
    );

    let report = runner.run(data_end, Duration::minutes(step_minutes)).await?;
    report.print_summary();

    Ok(())
}

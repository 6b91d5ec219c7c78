use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Signal, SignalStage};

/// Summary of one backtest pass: the signal engine never places or simulates
/// orders, so there is no PnL/equity section here — a backtest measures what
/// the engine would have emitted, not what it would have made.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub candles_processed: usize,
    pub setup_signals: usize,
    pub entry_signals: usize,
    pub by_symbol: HashMap<String, usize>,
    pub by_setup: HashMap<String, usize>,
    pub signals: Vec<Signal>,
}

impl BacktestReport {
    pub fn from_signals(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        candles_processed: usize,
        signals: Vec<Signal>,
    ) -> Self {
        let mut by_symbol: HashMap<String, usize> = HashMap::new();
        let mut by_setup: HashMap<String, usize> = HashMap::new();
        let mut setup_signals = 0;
        let mut entry_signals = 0;

        for signal in &signals {
            *by_symbol.entry(signal.symbol.clone()).or_default() += 1;
            *by_setup.entry(signal.setup.name().to_string()).or_default() += 1;
            match signal.stage {
                SignalStage::Setup => setup_signals += 1,
                SignalStage::Entry => entry_signals += 1,
            }
        }

        BacktestReport {
            start,
            end,
            candles_processed,
            setup_signals,
            entry_signals,
            by_symbol,
            by_setup,
            signals,
        }
    }

    pub fn print_summary(&self) {
        println!("{}", "=".repeat(60));
        println!("  BACKTEST REPORT");
        println!("{}", "=".repeat(60));
        println!(
            "  Period:     {} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
        );
        println!("  Candles:    {}", self.candles_processed);
        println!();
        println!("  SIGNALS");
        println!("  -----------------------------------");
        println!("  Setup:      {}", self.setup_signals);
        println!("  Entry:      {}", self.entry_signals);
        println!();

        if !self.by_symbol.is_empty() {
            println!("  BY SYMBOL");
            println!("  -----------------------------------");
            let mut symbols: Vec<_> = self.by_symbol.iter().collect();
            symbols.sort_by_key(|(k, _)| k.clone());
            for (symbol, count) in symbols {
                println!("  {symbol}: {count}");
            }
            println!();
        }

        if !self.by_setup.is_empty() {
            println!("  BY SETUP");
            println!("  -----------------------------------");
            let mut setups: Vec<_> = self.by_setup.iter().collect();
            setups.sort_by_key(|(k, _)| k.clone());
            for (setup, count) in setups {
                println!("  {setup}: {count}");
            }
        }
        println!("{}", "=".repeat(60));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use common::{Bar, Error, InstrumentCatalog, Notifier, QuoteSource, Result, Transition};
use engine::{CycleReport, DelayRange, ScheduleSettings, Scheduler, WatchList};
use strategy::{IndicatorCalculator, SignalEvaluator};

// ─── Test doubles ─────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Script {
    Bars(Vec<Bar>),
    Fail,
    Panic,
    Hang,
}

/// Quote source answering from a per-code script and counting calls.
#[derive(Default)]
struct ScriptedQuotes {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
    /// Removes this instrument from the watch list during the first fetch.
    remove_on_fetch: Option<(WatchList, String)>,
}

impl ScriptedQuotes {
    fn with(mut self, code: &str, script: Script) -> Self {
        self.scripts.insert(code.to_string(), script);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuotes {
    async fn fetch(&self, code: &str, _interval: &str, _range: &str) -> Result<Vec<Bar>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((watchlist, id)) = &self.remove_on_fetch {
            watchlist.remove(id).await?;
        }
        match self.scripts.get(code).cloned() {
            Some(Script::Bars(bars)) => Ok(bars),
            Some(Script::Fail) | None => Err(Error::Http(format!("{code}: connection reset"))),
            Some(Script::Panic) => panic!("malformed quote for {code}"),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Notifier that records every message and fails for texts containing `fail_on`.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    fail_on: Option<String>,
}

impl RecordingNotifier {
    fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref().is_some_and(|p| text.contains(p)) {
            return Err(Error::Notify("chat not found".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// Closes whose final bar is a full-confirmation BUY (EMA 5/20 upward cross,
/// RSI ≈ 28, MACD above signal).
const BUY_CLOSES: [f64; 36] = [
    125.0, 112.5, 100.0, 99.75, 99.5, 99.25, 99.0, 98.75, 98.5, 98.25, //
    98.0, 97.75, 97.5, 97.25, 97.0, 96.75, 96.5, 96.25, 96.0, 95.75, //
    95.5, 95.25, 95.0, 94.75, 94.5, 94.25, 94.0, 94.4, 94.8, 95.2, //
    95.6, 96.0, 96.4, 96.8, 97.2, 97.6,
];

fn bars(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + chrono::Duration::minutes(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        })
        .collect()
}

fn buy_bars() -> Vec<Bar> {
    bars(&BUY_CLOSES)
}

fn flat_bars() -> Vec<Bar> {
    bars(&[1.1; 50])
}

fn settings(delay_secs: u64) -> ScheduleSettings {
    ScheduleSettings {
        calculator: IndicatorCalculator::default(),
        evaluator: SignalEvaluator::default(),
        destination: "chat-1".to_string(),
        timezone: chrono_tz::UTC,
        interval: "1m".to_string(),
        range: "1d".to_string(),
        lookback: 50,
        delay: DelayRange::new(
            Duration::from_secs(delay_secs),
            Duration::from_secs(delay_secs),
        )
        .unwrap(),
        fetch_timeout: Duration::from_secs(5),
    }
}

async fn running_watchlist(ids: &[&str]) -> WatchList {
    let wl = WatchList::new(InstrumentCatalog::default());
    for id in ids {
        wl.add(id).await.unwrap();
    }
    wl.start().await.unwrap();
    wl
}

fn scheduler(
    wl: &WatchList,
    quotes: &Arc<ScriptedQuotes>,
    notifier: &Arc<RecordingNotifier>,
    delay_secs: u64,
) -> Scheduler {
    Scheduler::new(
        wl.clone(),
        quotes.clone(),
        notifier.clone(),
        settings(delay_secs),
    )
}

// ─── Single cycle ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cycle_delivers_buy_signal_to_destination() {
    let wl = running_watchlist(&["EUR/USD"]).await;
    let quotes = Arc::new(ScriptedQuotes::default().with("EURUSD=X", Script::Bars(buy_bars())));
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(
        report,
        CycleReport {
            evaluated: 1,
            signals: 1,
            skipped: 0,
            failures: 0
        }
    );
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "chat-1");
    assert!(sent[0].1.starts_with("✨ BUY SIGNAL - EUR/USD"));
    assert!(sent[0].1.contains("EMA: Bullish"));
}

#[tokio::test]
async fn neutral_and_short_series_send_nothing() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Bars(flat_bars()))
            .with("GBPUSD=X", Script::Bars(bars(&[1.25; 10]))),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.evaluated, 2);
    assert_eq!(report.signals, 0);
    assert_eq!(report.failures, 0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn lookback_keeps_only_recent_bars() {
    // A long flat prefix would hide the signal if it were not trimmed away
    let mut closes = vec![50.0; 200];
    closes.extend_from_slice(&BUY_CLOSES);
    let wl = running_watchlist(&["EUR/USD"]).await;
    let quotes = Arc::new(ScriptedQuotes::default().with("EURUSD=X", Script::Bars(bars(&closes))));
    let notifier = Arc::new(RecordingNotifier::default());

    let mut s = settings(120);
    s.lookback = BUY_CLOSES.len();
    let report = Scheduler::new(wl.clone(), quotes.clone(), notifier.clone(), s)
        .run_cycle()
        .await;

    assert_eq!(report.signals, 1);
}

#[tokio::test]
async fn fetch_failure_does_not_abort_cycle() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Fail)
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.failures, 1);
    assert_eq!(report.signals, 1);
    assert_eq!(quotes.calls(), 2);
    assert!(notifier.sent()[0].1.contains("GBP/USD"));
}

#[tokio::test]
async fn panic_in_one_slot_is_contained() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Panic)
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.failures, 1);
    assert_eq!(report.signals, 1);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn delivery_failure_does_not_affect_other_instruments() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Bars(buy_bars()))
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::failing_on("EUR/USD"));

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.signals, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 2);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("GBP/USD"));
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_times_out_and_cycle_continues() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Hang)
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.failures, 1);
    assert_eq!(report.signals, 1);
}

#[tokio::test]
async fn stopped_watch_list_skips_every_slot() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    wl.stop().await;
    let quotes = Arc::new(ScriptedQuotes::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.skipped, 2);
    assert_eq!(quotes.calls(), 0);
}

#[tokio::test]
async fn member_removed_mid_cycle_is_not_evaluated() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(ScriptedQuotes {
        remove_on_fetch: Some((wl.clone(), "GBP/USD".to_string())),
        ..ScriptedQuotes::default()
    }
    .with("EURUSD=X", Script::Bars(buy_bars()))
    .with("GBPUSD=X", Script::Bars(buy_bars())));
    let notifier = Arc::new(RecordingNotifier::default());

    // Members are visited by name: EUR/USD first, and its fetch removes GBP/USD
    let report = scheduler(&wl, &quotes, &notifier, 120).run_cycle().await;

    assert_eq!(report.evaluated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(quotes.calls(), 1);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("EUR/USD"));
}

// ─── Run loop ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn idle_until_started_then_cycles_on_delay() {
    let wl = WatchList::new(InstrumentCatalog::default());
    wl.add("EUR/USD").await.unwrap();
    let quotes = Arc::new(ScriptedQuotes::default().with("EURUSD=X", Script::Bars(flat_bars())));
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = tokio::spawn(scheduler(&wl, &quotes, &notifier, 10).run());

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(quotes.calls(), 0, "no fetches before start");

    wl.start().await.unwrap();
    // Cycles at t+0, t+10, t+20 and t+30
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(quotes.calls(), 4);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn stop_then_restart_performs_no_fetches_while_stopped() {
    let wl = running_watchlist(&["EUR/USD"]).await;
    let quotes = Arc::new(ScriptedQuotes::default().with("EURUSD=X", Script::Bars(flat_bars())));
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = tokio::spawn(scheduler(&wl, &quotes, &notifier, 120).run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(quotes.calls(), 1);

    wl.stop().await;
    tokio::time::sleep(Duration::from_secs(1_000)).await;
    assert_eq!(quotes.calls(), 1, "no fetches while stopped");

    wl.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(quotes.calls(), 2, "restart begins a new cycle immediately");

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_wait() {
    let wl = running_watchlist(&["EUR/USD"]).await;
    let quotes = Arc::new(ScriptedQuotes::default().with("EURUSD=X", Script::Bars(flat_bars())));
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = tokio::spawn(scheduler(&wl, &quotes, &notifier, 3_600).run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(quotes.calls(), 1);

    // Without cancellation the next cycle would wait out the full hour
    wl.stop().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    wl.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(quotes.calls(), 2);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn loop_survives_failing_instruments() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Panic)
            .with("GBPUSD=X", Script::Fail),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = tokio::spawn(scheduler(&wl, &quotes, &notifier, 10).run());

    tokio::time::sleep(Duration::from_secs(25)).await;
    // Three cycles of two fetches each
    assert_eq!(quotes.calls(), 6);
    assert!(!handle.is_finished());

    handle.abort();
}

// ─── Control during a stalled fetch ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn controls_respond_while_a_fetch_is_stalled() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Hang)
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = {
        let scheduler = scheduler(&wl, &quotes, &notifier, 120);
        tokio::spawn(async move { scheduler.run_cycle().await })
    };

    // EUR/USD is now hanging inside its fetch
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(quotes.calls(), 1);

    let removed = tokio::time::timeout(Duration::from_millis(1), wl.remove("GBP/USD")).await;
    assert!(matches!(removed, Ok(Ok(Transition::Changed))));
    let stopped = tokio::time::timeout(Duration::from_millis(1), wl.stop()).await;
    assert_eq!(stopped.ok(), Some(Transition::Changed));

    let report = cycle.await.unwrap();
    assert_eq!(report.failures, 1, "stalled fetch ends in a timeout");
    assert_eq!(report.skipped, 1);
    assert_eq!(quotes.calls(), 1);
    assert!(notifier.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_during_stalled_fetch_prevents_further_fetches() {
    let wl = running_watchlist(&["EUR/USD", "GBP/USD"]).await;
    let quotes = Arc::new(
        ScriptedQuotes::default()
            .with("EURUSD=X", Script::Hang)
            .with("GBPUSD=X", Script::Bars(buy_bars())),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = tokio::spawn(scheduler(&wl, &quotes, &notifier, 10).run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    let stopped = tokio::time::timeout(Duration::from_millis(1), wl.stop()).await;
    assert_eq!(stopped.ok(), Some(Transition::Changed));

    // Well past the fetch timeout and several would-be cycles
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(quotes.calls(), 1);
    assert!(notifier.sent().is_empty());
    assert!(!handle.is_finished());

    handle.abort();
}

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use futures_util::FutureExt;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use common::{
    Error, Instrument, Notifier, QuoteSource, Result, SchedulerState, SignalEvent,
};
use strategy::{message, IndicatorCalculator, ScheduleConfig, SignalEvaluator};

use crate::WatchList;

/// Uniform range the inter-cycle wait is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::Config(format!(
                "delay range minimum {min:?} exceeds maximum {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::rng().random_range(self.min..=self.max)
    }
}

/// Everything the scheduler needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub calculator: IndicatorCalculator,
    pub evaluator: SignalEvaluator,
    /// Notifier destination for every signal.
    pub destination: String,
    pub timezone: Tz,
    pub interval: String,
    pub range: String,
    /// Most recent bars kept from each fetch.
    pub lookback: usize,
    pub delay: DelayRange,
    pub fetch_timeout: Duration,
}

impl ScheduleSettings {
    pub fn from_config(
        schedule: &ScheduleConfig,
        calculator: IndicatorCalculator,
        evaluator: SignalEvaluator,
        destination: impl Into<String>,
        timezone: Tz,
    ) -> Result<Self> {
        Ok(Self {
            calculator,
            evaluator,
            destination: destination.into(),
            timezone,
            interval: schedule.interval.clone(),
            range: schedule.range.clone(),
            lookback: schedule.lookback,
            delay: DelayRange::new(
                Duration::from_secs(schedule.min_delay_secs),
                Duration::from_secs(schedule.max_delay_secs),
            )?,
            fetch_timeout: schedule.fetch_timeout(),
        })
    }
}

/// Tally of one pass over the watch list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Instruments whose slot ran to completion (signal or not).
    pub evaluated: usize,
    /// Non-neutral decisions handed to the Notifier.
    pub signals: usize,
    /// Instruments removed, or the loop stopped, before their slot ran.
    pub skipped: usize,
    /// Fetch failures, delivery failures and contained panics.
    pub failures: usize,
}

enum SlotOutcome {
    Quiet,
    Signalled { delivered: bool },
    Failed,
}

/// The dispatch loop: fetch, evaluate and notify for every watched instrument,
/// then wait a randomized interval. Idle while the watch list is stopped.
pub struct Scheduler {
    watchlist: WatchList,
    quotes: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    settings: ScheduleSettings,
}

impl Scheduler {
    pub fn new(
        watchlist: WatchList,
        quotes: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            watchlist,
            quotes,
            notifier,
            settings,
        }
    }

    /// Run forever. Call from `tokio::spawn`.
    pub async fn run(self) {
        let mut state_rx = self.watchlist.subscribe();
        info!(
            mode = %self.settings.evaluator.mode(),
            min_delay = ?self.settings.delay.min(),
            max_delay = ?self.settings.delay.max(),
            "Scheduler initialized in Stopped state. Waiting for start."
        );

        loop {
            if *state_rx.borrow_and_update() != SchedulerState::Running {
                if state_rx.changed().await.is_err() {
                    warn!("Watch list dropped, scheduler exiting");
                    return;
                }
                continue;
            }

            let report = self.run_cycle().await;
            info!(
                evaluated = report.evaluated,
                signals = report.signals,
                skipped = report.skipped,
                failures = report.failures,
                "Cycle complete"
            );

            if !self.watchlist.is_running().await {
                continue;
            }
            let delay = self.settings.delay.sample();
            info!(delay_secs = delay.as_secs(), "Waiting before next cycle");
            wait_or_stop(delay, &mut state_rx).await;
        }
    }

    /// One pass over a snapshot of the watch list.
    ///
    /// Each slot re-checks that the loop is still running and the instrument
    /// is still a member. A failing or panicking slot never affects the others.
    pub async fn run_cycle(&self) -> CycleReport {
        let members = self.watchlist.members().await;
        let mut report = CycleReport::default();

        for instrument in &members {
            if !self.watchlist.is_active(instrument).await {
                debug!(instrument = %instrument, "Skipping inactive slot");
                report.skipped += 1;
                continue;
            }

            match AssertUnwindSafe(self.run_slot(instrument))
                .catch_unwind()
                .await
            {
                Ok(SlotOutcome::Quiet) => report.evaluated += 1,
                Ok(SlotOutcome::Signalled { delivered }) => {
                    report.evaluated += 1;
                    report.signals += 1;
                    if !delivered {
                        report.failures += 1;
                    }
                }
                Ok(SlotOutcome::Failed) => report.failures += 1,
                Err(panic) => {
                    error!(
                        instrument = %instrument,
                        panic = panic_message(panic.as_ref()),
                        "Evaluation panicked; continuing with next instrument"
                    );
                    report.failures += 1;
                }
            }
        }
        report
    }

    async fn run_slot(&self, instrument: &Instrument) -> SlotOutcome {
        let event = match self.evaluate(instrument).await {
            Ok(Some(event)) => event,
            Ok(None) => return SlotOutcome::Quiet,
            Err(e) if e.is_transient() => {
                warn!(instrument = %instrument, error = %e, "Fetch failed; retrying next cycle");
                return SlotOutcome::Failed;
            }
            Err(e) => {
                error!(instrument = %instrument, error = %e, "Evaluation failed");
                return SlotOutcome::Failed;
            }
        };

        info!(
            instrument = %instrument,
            direction = %event.direction,
            rsi = event.rsi,
            "Signal fired"
        );
        SlotOutcome::Signalled {
            delivered: self.deliver(&event).await,
        }
    }

    /// Fetch, compute and evaluate one instrument.
    /// Insufficient history counts as no signal.
    async fn evaluate(&self, instrument: &Instrument) -> Result<Option<SignalEvent>> {
        let s = &self.settings;
        let fetch = self.quotes.fetch(&instrument.code, &s.interval, &s.range);
        let bars = tokio::time::timeout(s.fetch_timeout, fetch)
            .await
            .map_err(|_| Error::FetchTimeout {
                code: instrument.code.clone(),
                secs: s.fetch_timeout.as_secs(),
            })??;

        let recent = &bars[bars.len().saturating_sub(s.lookback)..];
        let series = match s.calculator.compute(recent) {
            Ok(series) => series,
            Err(Error::InsufficientData { needed, got }) => {
                debug!(instrument = %instrument, needed, got, "Not enough data");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let decision = s.evaluator.evaluate_latest(&series);
        let Some(curr) = series.last() else {
            return Ok(None);
        };
        Ok(s.evaluator
            .signal_event(instrument, curr, decision, Utc::now()))
    }

    async fn deliver(&self, event: &SignalEvent) -> bool {
        let text = message::render(event, self.settings.timezone);
        match self.notifier.send(&self.settings.destination, &text).await {
            Ok(()) => {
                debug!(instrument = %event.instrument, "Signal delivered");
                true
            }
            Err(e) => {
                warn!(instrument = %event.instrument, error = %e, "Failed to deliver signal");
                false
            }
        }
    }
}

/// Sleep for `delay`, returning early if the watch list is stopped.
async fn wait_or_stop(delay: Duration, state_rx: &mut watch::Receiver<SchedulerState>) {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                if *state_rx.borrow_and_update() == SchedulerState::Stopped {
                    info!("Stop requested, cancelling inter-cycle wait");
                    return;
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::info;

use common::{
    Error, Instrument, InstrumentCatalog, Result, SchedulerState, Transition, WatchStatus,
};

#[derive(Debug, Default)]
struct WatchState {
    members: BTreeSet<Instrument>,
    running: bool,
}

/// Cloneable handle to the set of watched instruments and the run flag.
///
/// The Control Surface mutates it; the `Scheduler` reads it once per cycle
/// slot and listens on [`subscribe`](Self::subscribe) for start/stop.
/// Every mutation and its state broadcast happen under one write lock.
#[derive(Clone)]
pub struct WatchList {
    state: Arc<RwLock<WatchState>>,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    catalog: Arc<InstrumentCatalog>,
}

impl WatchList {
    /// Empty, stopped watch list over `catalog`.
    pub fn new(catalog: InstrumentCatalog) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Stopped);
        Self {
            state: Arc::new(RwLock::new(WatchState::default())),
            state_tx: Arc::new(state_tx),
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    /// Add an instrument by display name or source code.
    pub async fn add(&self, id: &str) -> Result<Transition> {
        let instrument = self.catalog.lookup(id)?.clone();
        let mut state = self.state.write().await;
        if state.members.contains(&instrument) {
            return Ok(Transition::Unchanged);
        }
        info!(instrument = %instrument, "Instrument added to watch list");
        state.members.insert(instrument);
        Ok(Transition::Changed)
    }

    /// Remove an instrument by display name or source code.
    /// Removing the last member while running leaves the loop running with
    /// nothing to evaluate.
    pub async fn remove(&self, id: &str) -> Result<Transition> {
        let instrument = self.catalog.lookup(id)?;
        let mut state = self.state.write().await;
        if !state.members.remove(instrument) {
            return Ok(Transition::Unchanged);
        }
        info!(instrument = %instrument, "Instrument removed from watch list");
        Ok(Transition::Changed)
    }

    /// Begin cycling. Rejected while the watch list is empty.
    pub async fn start(&self) -> Result<Transition> {
        let mut state = self.state.write().await;
        if state.members.is_empty() {
            return Err(Error::InvalidState(
                "cannot start with an empty watch list".to_string(),
            ));
        }
        if state.running {
            info!("Start requested but scheduler is already running");
            return Ok(Transition::Unchanged);
        }
        state.running = true;
        self.state_tx.send_replace(SchedulerState::Running);
        info!(members = state.members.len(), "Scheduler started");
        Ok(Transition::Changed)
    }

    /// Stop cycling and cancel any pending inter-cycle wait.
    pub async fn stop(&self) -> Transition {
        let mut state = self.state.write().await;
        if !state.running {
            return Transition::Unchanged;
        }
        state.running = false;
        self.state_tx.send_replace(SchedulerState::Stopped);
        info!("Scheduler stopped");
        Transition::Changed
    }

    /// A consistent copy of the current members, ordered by name.
    pub async fn members(&self) -> Vec<Instrument> {
        self.state.read().await.members.iter().cloned().collect()
    }

    pub async fn status(&self) -> WatchStatus {
        let state = self.state.read().await;
        WatchStatus {
            state: running_state(state.running),
            members: state.members.iter().cloned().collect(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    /// True while running and `instrument` is still a member.
    pub async fn is_active(&self, instrument: &Instrument) -> bool {
        let state = self.state.read().await;
        state.running && state.members.contains(instrument)
    }

    /// Receiver notified on every start/stop.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }
}

fn running_state(running: bool) -> SchedulerState {
    if running {
        SchedulerState::Running
    } else {
        SchedulerState::Stopped
    }
}

//! Round Scheduler
//!
//! Owns the engine state behind one lock and drives the state machine on
//! a tokio task. The task sleeps until the state's next wake time, runs
//! one step, publishes the resulting events and goes back to sleep.
//! Player commands take the same lock, so every mutation (timer step or
//! command) is serialized and events go out in mutation order.
//!
//! The clock must track tokio time ([`TokioClock`](crate::core::TokioClock)):
//! the task sleeps with `tokio::time` and checks deadlines with the clock.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::config::{ConfigError, EngineConfig};
use crate::core::clock::Clock;
use crate::core::rng::RandomSource;
use crate::game::ledger::{Bet, CashOut, CommandError};
use crate::game::state::{EngineStats, GameState, PlayerId, RoundSnapshot};
use crate::game::tick::{self, TickResult};
use crate::service::bus::EventBus;

/// Scheduler lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// `start` called on a running scheduler.
    #[error("scheduler already running")]
    AlreadyRunning,
    /// `stop` called on a stopped scheduler.
    #[error("scheduler not running")]
    NotRunning,
}

/// Drives rounds in real time and serializes commands against them.
pub struct RoundScheduler {
    state: Arc<Mutex<GameState>>,
    clock: Arc<dyn Clock>,
    bus: Arc<dyn EventBus>,
    /// Wakes the task early when a command moved the deadline.
    wake: Arc<Notify>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RoundScheduler {
    /// Create a stopped scheduler.
    pub fn new(
        config: EngineConfig,
        rng: Box<dyn RandomSource>,
        clock: Arc<dyn Clock>,
        bus: Arc<dyn EventBus>,
    ) -> Result<Self, ConfigError> {
        let state = GameState::new(config, rng, clock.now_ms())?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            clock,
            bus,
            wake: Arc::new(Notify::new()),
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    /// Begin the round lifecycle.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        {
            let mut state = self.state.lock().await;
            let result = tick::begin(&mut state, self.clock.now_ms());
            publish(self.bus.as_ref(), &result);
        }

        let state = self.state.clone();
        let clock = self.clock.clone();
        let bus = self.bus.clone();
        let wake = self.wake.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        *task = Some(tokio::spawn(async move {
            run_loop(state, clock, bus, wake, shutdown_rx).await;
        }));

        info!("round scheduler started");
        Ok(())
    }

    /// Stop the lifecycle and park the engine in WAITING.
    ///
    /// Waits for an in-flight step to finish. Riding bets of a round that
    /// already took off are refunded and announced with `round_voided`.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let handle = self
            .task
            .lock()
            .await
            .take()
            .ok_or(SchedulerError::NotRunning)?;

        if self.shutdown_tx.send(()).is_err() {
            debug!("scheduler task already exited");
        }
        if let Err(e) = handle.await {
            error!("scheduler task failed: {}", e);
        }

        let mut state = self.state.lock().await;
        let result = tick::halt(&mut state, self.clock.now_ms());
        publish(self.bus.as_ref(), &result);

        info!("round scheduler stopped");
        Ok(())
    }

    /// Whether the lifecycle task is running.
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Place a bet in the active round.
    #[instrument(skip(self), fields(player = %player_id.short()))]
    pub async fn place_bet(
        &self,
        player_id: PlayerId,
        amount: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<Bet, CommandError> {
        self.state.lock().await.place_bet(player_id, amount, auto_cash_out)
    }

    /// Withdraw a bet before take-off.
    pub async fn cancel_bet(&self, player_id: PlayerId) -> Result<Bet, CommandError> {
        self.state.lock().await.cancel_bet(&player_id)
    }

    /// Cash out at the current multiplier.
    #[instrument(skip(self), fields(player = %player_id.short()))]
    pub async fn cash_out(&self, player_id: PlayerId) -> Result<CashOut, CommandError> {
        self.state.lock().await.cash_out(&player_id)
    }

    /// Crash the flying round now. Privileged; callers authorize.
    pub async fn force_crash(&self) -> Result<TickResult, CommandError> {
        let result = {
            let mut state = self.state.lock().await;
            let result = tick::force_crash(&mut state, self.clock.now_ms())?;
            publish(self.bus.as_ref(), &result);
            result
        };
        self.wake.notify_one();
        Ok(result)
    }

    /// Stage a configuration for the next round.
    pub async fn reconfigure(&self, config: EngineConfig) -> Result<(), ConfigError> {
        self.state.lock().await.stage_config(config)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current round view.
    pub async fn current_state(&self) -> RoundSnapshot {
        self.state.lock().await.snapshot(self.clock.now_ms())
    }

    /// Past crash points, most recent first.
    pub async fn history(&self) -> Vec<f64> {
        self.state.lock().await.history()
    }

    /// Aggregate statistics.
    pub async fn stats(&self) -> EngineStats {
        self.state.lock().await.stats(self.clock.now_ms())
    }

    /// Players with a bet in the active round.
    pub async fn active_players(&self) -> Vec<PlayerId> {
        self.state.lock().await.active_players()
    }
}

fn publish(bus: &dyn EventBus, result: &TickResult) {
    for event in &result.events {
        bus.publish(event.clone());
    }
}

/// Sleep until the next deadline, step, repeat.
async fn run_loop(
    state: Arc<Mutex<GameState>>,
    clock: Arc<dyn Clock>,
    bus: Arc<dyn EventBus>,
    wake: Arc<Notify>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let next_wake = {
            let mut state = state.lock().await;
            let now = clock.now_ms();
            let result = tick::tick(&mut state, now);
            publish(bus.as_ref(), &result);
            state.next_wake_ms().map(|at| at.saturating_sub(now))
        };

        let delay = Duration::from_millis(next_wake.unwrap_or(0));
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                debug!("scheduler shutdown signal received");
                break;
            }
            _ = wake.notified() => {}
            _ = tokio::time::sleep(delay), if next_wake.is_some() => {}
        }
    }
}

//! Crash Engine Server
//!
//! Runs the round lifecycle in real time with a handful of bot players and
//! logs every event. The network layer attaches to the same scheduler and
//! bus.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crash_engine::{
    service::protocol::{dispatch, ClientCommand, ServerReply},
    BroadcastBus, EngineConfig, EngineEventData, EntropyRng, PlayerId, RoundPhase,
    RoundScheduler, TokioClock, VERSION,
};

/// Rounds the demo plays before shutting down.
const DEMO_ROUNDS: u64 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("loading engine config")?;
    info!("Crash Engine v{}", VERSION);
    info!(
        "Tick: {} ms, wait {}-{} ms, history {}",
        config.tick_period_ms, config.wait_time_min_ms, config.wait_time_max_ms, config.history_capacity
    );

    let bus = Arc::new(BroadcastBus::default());
    let mut events = bus.subscribe();
    let scheduler = Arc::new(RoundScheduler::new(
        config,
        Box::new(EntropyRng::new()),
        Arc::new(TokioClock::new()),
        bus.clone(),
    )?);

    let bots: Vec<PlayerId> = (0..4)
        .map(|i| PlayerId::from_external(&format!("bot-{}", i)))
        .collect();

    scheduler.start().await?;

    let mut rounds = 0;
    while rounds < DEMO_ROUNDS {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                warn!("Event log lagged by {} events", n);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match &event.data {
            EngineEventData::GameStateChanged(view) => match view.state {
                RoundPhase::Waiting if view.next_round_in.is_some() => {
                    place_bot_bets(&scheduler, &bots, event.round_id).await;
                }
                RoundPhase::Crashed => {
                    info!(
                        "Round {} crashed at {:.2}x",
                        event.round_id,
                        view.final_multiplier.unwrap_or(1.0)
                    );
                    rounds += 1;
                }
                RoundPhase::Flying => {}
                _ => info!("Round {}: {}", event.round_id, view.state),
            },
            EngineEventData::PlayerAutoCashedOut(cash) => {
                info!(
                    "Player {} auto cashed out at {:.2}x for {:.2}",
                    cash.player_id.short(),
                    cash.multiplier,
                    cash.payout
                );
            }
            EngineEventData::RoundVoided(voided) => {
                warn!(
                    "Round {} voided, {} bets refunded ({:.2})",
                    event.round_id,
                    voided.refunds.len(),
                    voided.total_refunded
                );
            }
        }
    }

    scheduler.stop().await?;

    let reply = dispatch(&scheduler, ClientCommand::GetStats).await;
    info!("=== Session Stats ===");
    info!("{}", reply.to_json()?);
    if let ServerReply::History { history } = dispatch(&scheduler, ClientCommand::GetHistory).await {
        info!("History: {:?}", history);
    }

    Ok(())
}

/// Each bot stakes a fixed amount with a different auto cash-out target.
async fn place_bot_bets(scheduler: &RoundScheduler, bots: &[PlayerId], round_id: u64) {
    for (i, id) in bots.iter().enumerate() {
        let auto_cash_out = Some(1.2 + i as f64 * 0.6);
        let amount = 10.0 * (i + 1) as f64;

        if let Err(reason) = scheduler.place_bet(*id, amount, auto_cash_out).await {
            warn!("Bot {} bet rejected: {}", id.short(), reason.reason_code());
        }
    }
    info!("Round {}: {} bots placed bets", round_id, bots.len());
}

//! Round State Machine
//!
//! Every transition of the round lives here. All functions take the
//! current engine time explicitly and never sleep, so the same code runs
//! under the tokio scheduler and under a hand-driven clock in tests.
//!
//! ```text
//! WAITING --(random wait)--> STARTING --(countdown)--> FLYING
//!    ^                                                   |  (tick every Δt)
//!    +------------(cooldown)------------ CRASHED <-------+
//! ```

use tracing::{error, info, warn};

use crate::game::events::{EngineEvent, EngineEventData, VoidedRound};
use crate::game::ledger::{Bet, CommandError, Settlement};
use crate::game::state::{ms_to_secs, EngineFault, GameState, Round, RoundPhase};

/// Result of a state machine step.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events raised during this step, in order.
    pub events: Vec<EngineEvent>,
    /// Crash point, if the round crashed during this step.
    pub crashed: Option<f64>,
    /// Settlement of the crashed round.
    pub settlement: Option<Settlement>,
    /// Invariant violation that voided the round.
    pub fault: Option<EngineFault>,
    /// Riding bets refunded because the round was abandoned.
    pub voided: Vec<Bet>,
}

/// Schedule the first WAITING phase of an idle engine.
///
/// No-op if something is already scheduled.
pub fn begin(state: &mut GameState, now_ms: u64) -> TickResult {
    let mut result = TickResult::default();

    if state.round.deadline_ms.is_none() {
        if state.round.phase != RoundPhase::Waiting {
            // Idle engines are always parked in WAITING; anything else is a bug
            let fault = EngineFault::IllegalTransition {
                round_id: state.round.id,
                from: state.round.phase,
                to: RoundPhase::Waiting,
            };
            recover(state, now_ms, fault, &mut result);
        } else {
            state.apply_pending_config();
            schedule_wait(state, now_ms);
        }
    }

    result.events = state.take_events();
    result
}

/// Advance the round if its deadline has passed.
///
/// Performs at most one transition (or one FLYING tick) per call. A caller
/// that fell behind simply calls again: the next deadline is already due.
pub fn tick(state: &mut GameState, now_ms: u64) -> TickResult {
    let mut result = TickResult::default();

    let Some(deadline) = state.round.deadline_ms else {
        return result;
    };
    if now_ms < deadline {
        return result;
    }

    let step = match state.round.phase {
        RoundPhase::Waiting => start_countdown(state, now_ms),
        RoundPhase::Starting => take_off(state, now_ms),
        RoundPhase::Flying => fly(state, now_ms, &mut result),
        RoundPhase::Crashed => next_round(state, now_ms),
    };

    if let Err(fault) = step {
        recover(state, now_ms, fault, &mut result);
    }

    result.events = state.take_events();
    result
}

/// Crash the flying round immediately at its current multiplier.
///
/// Bypasses the hazard model but settles exactly like a natural crash.
/// The caller is responsible for authorizing this.
pub fn force_crash(state: &mut GameState, now_ms: u64) -> Result<TickResult, CommandError> {
    if state.round.phase != RoundPhase::Flying {
        warn!(round = state.round.id, phase = %state.round.phase, "forced crash rejected");
        return Err(CommandError::RoundNotFlying);
    }

    let mut result = TickResult::default();
    let multiplier = state.round.multiplier;
    info!(round = state.round.id, multiplier, "forced crash");

    match crash(state, now_ms, multiplier) {
        Ok(settlement) => {
            result.crashed = Some(multiplier);
            result.settlement = Some(settlement);
        }
        Err(fault) => recover(state, now_ms, fault, &mut result),
    }

    result.events = state.take_events();
    Ok(result)
}

/// Park the engine in an idle WAITING phase.
///
/// Bets of a round that has not taken off survive; a round that is in the
/// air or already crashed is abandoned and its riding bets are refunded.
pub fn halt(state: &mut GameState, now_ms: u64) -> TickResult {
    let mut result = TickResult::default();

    match state.round.phase {
        RoundPhase::Waiting | RoundPhase::Starting => {
            state.round.phase = RoundPhase::Waiting;
            state.round.deadline_ms = None;
        }
        RoundPhase::Flying | RoundPhase::Crashed => {
            void_round(state, &mut result);
            if !result.voided.is_empty() {
                warn!(
                    round = state.round.id,
                    voided = result.voided.len(),
                    "engine halted mid-round, bets refunded"
                );
            }
            state.round = Round::new(state.round.id + 1);
        }
    }

    info!(round = state.round.id, "engine halted");
    state.push_state_changed(now_ms);
    result.events = state.take_events();
    result
}

// =============================================================================
// TRANSITIONS
// =============================================================================

fn transition(state: &mut GameState, to: RoundPhase) -> Result<(), EngineFault> {
    let from = state.round.phase;
    if from.next() != to {
        return Err(EngineFault::IllegalTransition {
            round_id: state.round.id,
            from,
            to,
        });
    }
    state.round.phase = to;
    Ok(())
}

/// Draw a wait time and announce the WAITING phase.
fn schedule_wait(state: &mut GameState, now_ms: u64) {
    let wait_ms = state
        .rng
        .next_in_range(state.config.wait_time_min_ms, state.config.wait_time_max_ms);
    state.round.deadline_ms = Some(now_ms + wait_ms);

    info!(round = state.round.id, next_in_secs = ms_to_secs(wait_ms), "waiting for next round");
    state.push_state_changed(now_ms);
}

fn start_countdown(state: &mut GameState, now_ms: u64) -> Result<(), EngineFault> {
    transition(state, RoundPhase::Starting)?;
    state.round.deadline_ms = Some(now_ms + state.config.countdown_ms);

    info!(round = state.round.id, bets = state.ledger.len(), "countdown started");
    state.push_state_changed(now_ms);
    Ok(())
}

fn take_off(state: &mut GameState, now_ms: u64) -> Result<(), EngineFault> {
    transition(state, RoundPhase::Flying)?;
    state.round.multiplier = 1.0;
    state.round.started_at_ms = Some(now_ms);
    state.round.last_tick_ms = Some(now_ms);
    state.round.deadline_ms = Some(now_ms + state.config.tick_period_ms);

    info!(round = state.round.id, players = state.ledger.len(), "round started");
    state.push_state_changed(now_ms);
    Ok(())
}

/// One FLYING tick.
fn fly(state: &mut GameState, now_ms: u64, result: &mut TickResult) -> Result<(), EngineFault> {
    let round_id = state.round.id;
    let started = state
        .round
        .started_at_ms
        .ok_or(EngineFault::MissingStartTime { round_id })?;

    // Always recompute from the start time so late ticks never drift
    let elapsed_ms = now_ms.saturating_sub(started);
    let elapsed = ms_to_secs(elapsed_ms);
    let dt = ms_to_secs(now_ms.saturating_sub(state.round.last_tick_ms.unwrap_or(started)));

    let multiplier = state.growth.at(elapsed).max(state.round.multiplier);
    state.round.multiplier = multiplier;
    state.round.last_tick_ms = Some(now_ms);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(round = round_id, multiplier, elapsed, dt, "tick");

    let timed_out = elapsed_ms >= state.config.max_flight_ms;
    if timed_out || state.hazard.should_crash(multiplier, elapsed, dt, state.rng.as_mut()) {
        if timed_out {
            info!(round = round_id, "max flight time reached");
        }
        let settlement = crash(state, now_ms, multiplier)?;
        result.crashed = Some(multiplier);
        result.settlement = Some(settlement);
        return Ok(());
    }

    for cash in state.ledger.scan_auto_cash_outs(multiplier) {
        state.stats.add_payout(cash.payout);
        info!(
            round = round_id,
            player = %cash.player_id.short(),
            multiplier,
            payout = cash.payout,
            "auto cash out"
        );
        state.push_event(EngineEventData::PlayerAutoCashedOut(cash));
    }

    state.push_state_changed(now_ms);
    state.round.deadline_ms = Some(now_ms + state.config.tick_period_ms);
    Ok(())
}

/// FLYING -> CRASHED: record, settle, announce.
fn crash(state: &mut GameState, now_ms: u64, multiplier: f64) -> Result<Settlement, EngineFault> {
    if state.round.final_multiplier.is_some() {
        return Err(EngineFault::DoubleSettlement { round_id: state.round.id });
    }
    transition(state, RoundPhase::Crashed)?;

    state.round.final_multiplier = Some(multiplier);
    state.stats.record(multiplier);
    let settlement = state.ledger.settle();

    info!(
        round = state.round.id,
        multiplier,
        winners = settlement.winners.len(),
        losers = settlement.losers.len(),
        "round crashed"
    );

    state.push_state_changed(now_ms);
    state.round.deadline_ms = Some(now_ms + state.config.cooldown_ms);
    Ok(settlement)
}

/// CRASHED -> WAITING with a fresh round.
fn next_round(state: &mut GameState, now_ms: u64) -> Result<(), EngineFault> {
    transition(state, RoundPhase::Waiting)?;
    if !state.ledger.is_empty() {
        return Err(EngineFault::DoubleSettlement { round_id: state.round.id });
    }

    state.round = Round::new(state.round.id + 1);
    state.apply_pending_config();
    schedule_wait(state, now_ms);
    Ok(())
}

/// Void the faulted round and restart from WAITING.
fn recover(state: &mut GameState, now_ms: u64, fault: EngineFault, result: &mut TickResult) {
    void_round(state, result);
    error!(
        round = state.round.id,
        voided = result.voided.len(),
        %fault,
        "round fault, resetting to waiting"
    );

    state.round = Round::new(state.round.id + 1);
    state.apply_pending_config();
    schedule_wait(state, now_ms);
    result.fault = Some(fault);
}

/// Refund every riding bet of the active round.
///
/// Refunded stakes leave `total_bets`; cashed-out bets keep their payout.
fn void_round(state: &mut GameState, result: &mut TickResult) {
    let refunds = state.ledger.void_all();
    if refunds.is_empty() {
        return;
    }

    for bet in &refunds {
        state.stats.remove_bet(bet.amount);
    }
    state.push_event(EngineEventData::RoundVoided(VoidedRound::new(refunds.clone())));
    result.voided = refunds;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::clock::{Clock, ManualClock};
    use crate::core::rng::{DeterministicRng, RandomSource};
    use crate::game::multiplier::{GrowthMode, MultiplierModel};
    use crate::game::state::PlayerId;

    /// Always returns the same draw.
    struct FixedRandom(f64);

    impl RandomSource for FixedRandom {
        fn next_u64(&mut self) -> u64 {
            (self.0 * (1u64 << 53) as f64) as u64 * 2048
        }

        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }

    fn scenario_config() -> EngineConfig {
        EngineConfig {
            wait_time_min_ms: 3000,
            wait_time_max_ms: 3000,
            countdown_ms: 1000,
            growth: GrowthMode::Exponential { rate: 0.55 },
            ..Default::default()
        }
    }

    /// State that never crashes on its own.
    fn calm_state(config: EngineConfig) -> GameState {
        GameState::new(config, Box::new(FixedRandom(0.999_999)), 0).unwrap()
    }

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    /// Drive ticks until the round is flying; returns take-off time.
    fn fly_round(state: &mut GameState) -> u64 {
        begin(state, 0);
        let countdown_at = state.next_wake_ms().unwrap();
        tick(state, countdown_at);
        let take_off_at = state.next_wake_ms().unwrap();
        tick(state, take_off_at);
        assert_eq!(state.phase(), RoundPhase::Flying);
        take_off_at
    }

    #[test]
    fn test_phase_sequence_and_events() {
        let mut state = calm_state(scenario_config());

        let started = begin(&mut state, 0);
        assert_eq!(started.events.len(), 1);
        assert_eq!(started.events[0].as_state_change().unwrap().next_round_in, Some(3.0));
        assert_eq!(state.next_wake_ms(), Some(3000));

        // Nothing happens before the deadline
        assert!(tick(&mut state, 2999).events.is_empty());
        assert_eq!(state.phase(), RoundPhase::Waiting);

        let countdown = tick(&mut state, 3000);
        assert_eq!(state.phase(), RoundPhase::Starting);
        assert_eq!(countdown.events[0].as_state_change().unwrap().countdown, Some(1.0));

        let launch = tick(&mut state, 4000);
        assert_eq!(state.phase(), RoundPhase::Flying);
        let view = launch.events[0].as_state_change().unwrap();
        assert_eq!(view.multiplier, Some(1.0));
        assert_eq!(view.elapsed, Some(0.0));
        assert_eq!(state.next_wake_ms(), Some(4016));
    }

    #[test]
    fn test_begin_is_idempotent() {
        let mut state = calm_state(scenario_config());
        begin(&mut state, 0);
        let again = begin(&mut state, 500);
        assert!(again.events.is_empty());
        assert_eq!(state.next_wake_ms(), Some(3000));
    }

    #[test]
    fn test_auto_cash_out_scenario() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 100.0, Some(2.0)).unwrap();
        let take_off = fly_round(&mut state);

        let mut cashed = None;
        let mut now = 0;
        while cashed.is_none() {
            now = state.next_wake_ms().unwrap();
            let result = tick(&mut state, now);
            assert!(result.crashed.is_none());
            cashed = result.events.iter().find_map(|e| e.as_auto_cash_out()).cloned();
        }

        let cash = cashed.unwrap();
        let elapsed = ms_to_secs(now - take_off);
        // First 16ms tick at or after ln(2)/0.55 = 1.2603s
        assert!(elapsed >= 1.2602 && elapsed < 1.2602 + 0.016 + 1e-9, "fired at {elapsed}");

        // One tick of growth at 2x is 2 * 0.55 * 0.016 = 0.0176
        assert!(cash.payout >= 200.0 && cash.payout <= 200.0 + 100.0 * 0.0176);
        assert_eq!(cash.bet_amount, 100.0);
        assert!(cash.automatic);
        assert_eq!(state.stats(now).totals.total_payouts, cash.payout);

        // Never fires twice
        for _ in 0..20 {
            let now = state.next_wake_ms().unwrap();
            let result = tick(&mut state, now);
            assert!(result.events.iter().all(|e| e.as_auto_cash_out().is_none()));
        }
    }

    #[test]
    fn test_auto_cash_out_precedes_tick_event() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 10.0, Some(1.01)).unwrap();
        let take_off = fly_round(&mut state);

        let result = tick(&mut state, take_off + 100);
        let names: Vec<_> = result.events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["player_auto_cashed_out", "game_state_changed"]);
        assert!(result.events[0].seq < result.events[1].seq);
    }

    #[test]
    fn test_auto_wins_same_tick_manual_cash_out() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 10.0, Some(1.5)).unwrap();
        let take_off = fly_round(&mut state);

        // Multiplier passes 1.5x at ~0.737s
        tick(&mut state, take_off + 800);
        assert_eq!(state.cash_out(&player(1)).unwrap_err(), CommandError::AlreadyCashedOut);
    }

    #[test]
    fn test_force_crash_scenario() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 100.0, None).unwrap();
        state.place_bet(player(2), 50.0, Some(10.0)).unwrap();
        let take_off = fly_round(&mut state);

        // e^(0.55 * 2.262) = 3.4698
        tick(&mut state, take_off + 2262);
        let multiplier = state.round().multiplier;
        assert!((multiplier - 3.47).abs() < 0.005);

        let result = force_crash(&mut state, take_off + 2270).unwrap();
        assert_eq!(state.phase(), RoundPhase::Crashed);
        assert_eq!(result.crashed, Some(multiplier));
        assert_eq!(state.round().final_multiplier, Some(multiplier));

        let settlement = result.settlement.unwrap();
        assert_eq!(settlement.losers, vec![player(1), player(2)]);
        assert_eq!(settlement.total_paid, 0.0);
        assert_eq!(settlement.total_forfeited, 150.0);
        assert!(state.ledger().is_empty());

        assert_eq!(state.history()[0], 3.47);
        let view = result.events[0].as_state_change().unwrap();
        assert_eq!(view.state, RoundPhase::Crashed);
        assert_eq!(view.final_multiplier, Some(multiplier));
    }

    #[test]
    fn test_force_crash_requires_flight() {
        let mut state = calm_state(scenario_config());
        begin(&mut state, 0);
        assert_eq!(force_crash(&mut state, 10).unwrap_err(), CommandError::RoundNotFlying);
        assert_eq!(state.phase(), RoundPhase::Waiting);
    }

    #[test]
    fn test_bets_rejected_after_take_off() {
        let mut state = calm_state(scenario_config());
        let take_off = fly_round(&mut state);

        let flying = state.place_bet(player(1), 10.0, None);
        assert_eq!(flying.unwrap_err(), CommandError::RoundNotAccepting);

        force_crash(&mut state, take_off + 50).unwrap();
        let crashed = state.place_bet(player(1), 10.0, None);
        assert_eq!(crashed.unwrap_err(), CommandError::RoundNotAccepting);
    }

    #[test]
    fn test_max_flight_time_crashes() {
        let config = EngineConfig {
            max_flight_ms: 500,
            ..scenario_config()
        };
        let mut state = calm_state(config);
        let take_off = fly_round(&mut state);

        let result = tick(&mut state, take_off + 500);
        assert_eq!(state.phase(), RoundPhase::Crashed);
        assert!(result.crashed.is_some());
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn test_full_cycle_resets_ledger() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 10.0, None).unwrap();
        let take_off = fly_round(&mut state);
        force_crash(&mut state, take_off + 100).unwrap();

        let cooldown_end = state.next_wake_ms().unwrap();
        assert_eq!(cooldown_end, take_off + 100 + 2000);
        let result = tick(&mut state, cooldown_end);

        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert_eq!(state.round().id, 2);
        assert!(state.active_players().is_empty());
        assert_eq!(result.events[0].round_id, 2);
        assert!(state.place_bet(player(1), 10.0, None).is_ok());
    }

    #[test]
    fn test_late_tick_recomputes_from_start() {
        let mut state = calm_state(scenario_config());
        let take_off = fly_round(&mut state);

        // Scheduler stalls for 700ms; multiplier still matches wall time
        tick(&mut state, take_off + 700);
        let expected = (0.55f64 * 0.7).exp();
        assert!((state.round().multiplier - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_start_time_resets_round() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 10.0, None).unwrap();
        let take_off = fly_round(&mut state);
        state.round.started_at_ms = None;

        let result = tick(&mut state, take_off + 16);
        assert!(matches!(result.fault, Some(EngineFault::MissingStartTime { .. })));
        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert_eq!(state.round().id, 2);
        assert!(state.ledger().is_empty());
        assert!(state.next_wake_ms().is_some());
        assert!(state.history().is_empty());

        assert_eq!(result.voided.len(), 1);
        assert_eq!(result.events[0].name(), "round_voided");
        assert_eq!(state.stats(take_off + 16).totals.total_bets, 0.0);
    }

    #[test]
    fn test_double_settlement_detected() {
        let mut state = calm_state(scenario_config());
        let take_off = fly_round(&mut state);
        state.round.final_multiplier = Some(1.2);

        let result = force_crash(&mut state, take_off + 16).unwrap();
        assert!(matches!(result.fault, Some(EngineFault::DoubleSettlement { .. })));
        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_halt_mid_flight_refunds_riding_bets() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 20.0, None).unwrap();
        state.place_bet(player(2), 30.0, None).unwrap();
        let take_off = fly_round(&mut state);

        tick(&mut state, take_off + 500);
        let cash = state.cash_out(&player(2)).unwrap();

        let result = halt(&mut state, take_off + 600);
        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert_eq!(state.next_wake_ms(), None);
        assert!(state.ledger().is_empty());
        assert!(result.settlement.is_none());

        // Only the riding bet comes back; the cashed-out one keeps its payout
        assert_eq!(result.voided.len(), 1);
        assert_eq!(result.voided[0].player_id, player(1));
        assert_eq!(result.voided[0].amount, 20.0);

        let names: Vec<_> = result.events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["round_voided", "game_state_changed"]);
        let voided = result.events[0].as_round_voided().unwrap();
        assert_eq!(result.events[0].round_id, 1);
        assert_eq!(voided.total_refunded, 20.0);
        assert_eq!(result.events[1].round_id, 2);

        let totals = state.stats(take_off + 600).totals;
        assert_eq!(totals.total_bets, 30.0);
        assert_eq!(totals.total_payouts, cash.payout);
        assert_eq!(totals.total_games, 0);

        // Idle engines do nothing until begun again
        assert!(tick(&mut state, take_off + 10_000).events.is_empty());
    }

    #[test]
    fn test_halt_after_full_cash_out_emits_no_refund() {
        let mut state = calm_state(scenario_config());
        state.place_bet(player(1), 10.0, None).unwrap();
        let take_off = fly_round(&mut state);
        tick(&mut state, take_off + 100);
        state.cash_out(&player(1)).unwrap();

        let result = halt(&mut state, take_off + 200);
        assert!(result.voided.is_empty());
        assert_eq!(result.events.len(), 1);
        assert_eq!(state.stats(take_off + 200).totals.total_bets, 10.0);
    }

    #[test]
    fn test_halt_before_take_off_keeps_bets() {
        let mut state = calm_state(scenario_config());
        begin(&mut state, 0);
        tick(&mut state, 3000);
        state.place_bet(player(1), 10.0, None).unwrap();

        halt(&mut state, 3500);
        assert_eq!(state.phase(), RoundPhase::Waiting);
        assert_eq!(state.active_players(), vec![player(1)]);
    }

    #[test]
    fn test_staged_config_waits_for_next_round() {
        let mut state = calm_state(scenario_config());
        let take_off = fly_round(&mut state);

        let staged = EngineConfig {
            tick_period_ms: 8,
            ..scenario_config()
        };
        state.stage_config(staged).unwrap();

        tick(&mut state, take_off + 16);
        assert_eq!(state.next_wake_ms(), Some(take_off + 32));

        force_crash(&mut state, take_off + 32).unwrap();
        let cooldown_end = state.next_wake_ms().unwrap();
        tick(&mut state, cooldown_end);
        assert_eq!(state.config().tick_period_ms, 8);
    }

    #[test]
    fn test_multiplier_never_decreases_across_ticks() {
        let mut state =
            GameState::new(scenario_config(), Box::new(DeterministicRng::new(42)), 0).unwrap();
        fly_round(&mut state);

        let mut last = 1.0;
        while state.phase() == RoundPhase::Flying {
            let now = state.next_wake_ms().unwrap();
            tick(&mut state, now);
            assert!(state.round().multiplier >= last);
            last = state.round().multiplier;
        }
        assert_eq!(state.history().len(), 1);
    }

    /// Run `rounds` full rounds on a manual clock; returns seconds flown
    /// before each crash.
    fn simulate_flights(tick_period_ms: u64, seed: u64, rounds: usize) -> Vec<f64> {
        let config = EngineConfig {
            wait_time_min_ms: 10,
            wait_time_max_ms: 10,
            countdown_ms: 10,
            cooldown_ms: 10,
            tick_period_ms,
            ..scenario_config()
        };
        let growth = MultiplierModel::new(config.growth);
        let clock = ManualClock::new(0);
        let mut state =
            GameState::new(config, Box::new(DeterministicRng::new(seed)), clock.now_ms()).unwrap();
        begin(&mut state, clock.now_ms());

        let mut flights = Vec::with_capacity(rounds);
        while flights.len() < rounds {
            clock.set(state.next_wake_ms().unwrap());
            if let Some(crash_point) = tick(&mut state, clock.now_ms()).crashed {
                flights.push(growth.time_to_reach(crash_point).unwrap());
            }
        }
        flights
    }

    #[test]
    fn test_engine_crash_distribution_independent_of_tick_rate() {
        const ROUNDS: usize = 2000;
        let coarse = simulate_flights(16, 11, ROUNDS);
        let fine = simulate_flights(8, 12, ROUNDS);

        let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        let diff = (mean(&coarse) - mean(&fine)).abs();
        assert!(diff < 0.25, "mean flight time differs by {diff}s");

        let growth = MultiplierModel::new(GrowthMode::Exponential { rate: 0.55 });
        let share_below = |xs: &[f64], multiplier: f64| {
            let t = growth.time_to_reach(multiplier).unwrap();
            xs.iter().filter(|&&x| x < t).count() as f64 / xs.len() as f64
        };
        for &m in &[2.0, 10.0, 50.0] {
            let diff = (share_below(&coarse, m) - share_below(&fine, m)).abs();
            assert!(diff < 0.06, "P(crash < {m}x) differs by {diff}");
        }
    }
}

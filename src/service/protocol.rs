//! Protocol Messages
//!
//! JSON shapes for the network layer in front of the engine. Commands come
//! in tagged by `type`; replies carry `success` plus either the result or
//! a stable `reason` code, so clients never have to parse error text.
//!
//! `forceCrash` is deliberately absent: it is an operator action and goes
//! through [`RoundScheduler::force_crash`] directly.

use serde::{Deserialize, Serialize};

use crate::game::ledger::{Bet, CashOut, CommandError};
use crate::game::state::{EngineStats, PlayerId, RoundSnapshot};
use crate::service::scheduler::RoundScheduler;

// =============================================================================
// CLIENT -> ENGINE
// =============================================================================

/// Player-facing commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Stake on the upcoming round.
    #[serde(rename_all = "camelCase")]
    PlaceBet {
        /// Player placing the bet.
        player_id: PlayerId,
        /// Stake.
        amount: f64,
        /// Optional auto cash-out threshold.
        #[serde(default)]
        auto_cash_out: Option<f64>,
    },
    /// Cash out of the flying round.
    #[serde(rename_all = "camelCase")]
    CashOut {
        /// Player cashing out.
        player_id: PlayerId,
    },
    /// Withdraw a bet before take-off.
    #[serde(rename_all = "camelCase")]
    CancelBet {
        /// Player withdrawing.
        player_id: PlayerId,
    },
    /// Current round view.
    GetState,
    /// Recent crash points.
    GetHistory,
    /// Aggregate statistics.
    GetStats,
    /// Players in the active round.
    GetActivePlayers,
}

// =============================================================================
// ENGINE -> CLIENT
// =============================================================================

/// Reply to `place_bet` and `cancel_bet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetResponse {
    /// Whether the command was applied.
    pub success: bool,
    /// Why it was rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<CommandError>,
}

impl From<Result<Bet, CommandError>> for BetResponse {
    fn from(result: Result<Bet, CommandError>) -> Self {
        Self {
            success: result.is_ok(),
            reason: result.err(),
        }
    }
}

/// Reply to `cash_out`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashOutResponse {
    /// Whether the cash-out happened.
    pub success: bool,
    /// Multiplier locked in.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub multiplier: Option<f64>,
    /// Amount paid out.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payout: Option<f64>,
    /// Original stake.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bet_amount: Option<f64>,
    /// Why it was rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<CommandError>,
}

impl From<Result<CashOut, CommandError>> for CashOutResponse {
    fn from(result: Result<CashOut, CommandError>) -> Self {
        match result {
            Ok(cash) => Self {
                success: true,
                multiplier: Some(cash.multiplier),
                payout: Some(cash.payout),
                bet_amount: Some(cash.bet_amount),
                reason: None,
            },
            Err(reason) => Self {
                success: false,
                multiplier: None,
                payout: None,
                bet_amount: None,
                reason: Some(reason),
            },
        }
    }
}

/// Any reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    /// Result of `place_bet`.
    PlaceBet(BetResponse),
    /// Result of `cash_out`.
    CashOut(CashOutResponse),
    /// Result of `cancel_bet`.
    CancelBet(BetResponse),
    /// Current round view.
    State(RoundSnapshot),
    /// Crash points, most recent first.
    History {
        /// Rounded crash points.
        history: Vec<f64>,
    },
    /// Aggregate statistics.
    Stats(EngineStats),
    /// Players with a bet in the active round.
    ActivePlayers {
        /// Player ids.
        players: Vec<PlayerId>,
    },
}

impl ClientCommand {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerReply {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Run one client command against the scheduler.
pub async fn dispatch(scheduler: &RoundScheduler, command: ClientCommand) -> ServerReply {
    match command {
        ClientCommand::PlaceBet { player_id, amount, auto_cash_out } => ServerReply::PlaceBet(
            scheduler.place_bet(player_id, amount, auto_cash_out).await.into(),
        ),
        ClientCommand::CashOut { player_id } => {
            ServerReply::CashOut(scheduler.cash_out(player_id).await.into())
        }
        ClientCommand::CancelBet { player_id } => {
            ServerReply::CancelBet(scheduler.cancel_bet(player_id).await.into())
        }
        ClientCommand::GetState => ServerReply::State(scheduler.current_state().await),
        ClientCommand::GetHistory => ServerReply::History {
            history: scheduler.history().await,
        },
        ClientCommand::GetStats => ServerReply::Stats(scheduler.stats().await),
        ClientCommand::GetActivePlayers => ServerReply::ActivePlayers {
            players: scheduler.active_players().await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::core::clock::TokioClock;
    use crate::core::rng::DeterministicRng;
    use crate::service::bus::BroadcastBus;

    #[test]
    fn test_client_command_parse() {
        let id = PlayerId::new([9; 16]);
        let json = format!(
            r#"{{"type":"place_bet","playerId":"{}","amount":25.5,"autoCashOut":2.0}}"#,
            id
        );
        assert_eq!(
            ClientCommand::from_json(&json).unwrap(),
            ClientCommand::PlaceBet { player_id: id, amount: 25.5, auto_cash_out: Some(2.0) }
        );

        let no_auto = format!(r#"{{"type":"place_bet","playerId":"{}","amount":1}}"#, id);
        assert!(matches!(
            ClientCommand::from_json(&no_auto).unwrap(),
            ClientCommand::PlaceBet { auto_cash_out: None, .. }
        ));

        assert_eq!(
            ClientCommand::from_json(r#"{"type":"get_history"}"#).unwrap(),
            ClientCommand::GetHistory
        );
        assert!(ClientCommand::from_json(r#"{"type":"force_crash"}"#).is_err());
    }

    #[test]
    fn test_rejection_carries_reason_code() {
        let reply = BetResponse::from(Err(CommandError::RoundNotAccepting));
        let json: serde_json::Value = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["reason"], "ROUND_NOT_ACCEPTING");
    }

    #[test]
    fn test_cash_out_response_shape() {
        let ok = CashOutResponse::from(Ok(CashOut {
            player_id: PlayerId::new([1; 16]),
            multiplier: 2.5,
            payout: 25.0,
            bet_amount: 10.0,
            automatic: false,
        }));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["betAmount"], 10.0);
        assert!(json.get("reason").is_none());

        let err = CashOutResponse::from(Err(CommandError::AlreadyCashedOut));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["reason"], "ALREADY_CASHED_OUT");
        assert!(json.get("payout").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch() {
        let scheduler = RoundScheduler::new(
            EngineConfig::default(),
            Box::new(DeterministicRng::new(3)),
            Arc::new(TokioClock::new()),
            Arc::new(BroadcastBus::default()),
        )
        .unwrap();
        scheduler.start().await.unwrap();
        let id = PlayerId::from_external("eve");

        let placed = dispatch(
            &scheduler,
            ClientCommand::PlaceBet { player_id: id, amount: 10.0, auto_cash_out: None },
        )
        .await;
        assert_eq!(placed, ServerReply::PlaceBet(BetResponse { success: true, reason: None }));

        let early = dispatch(&scheduler, ClientCommand::CashOut { player_id: id }).await;
        let ServerReply::CashOut(response) = early else {
            panic!("unexpected reply");
        };
        assert_eq!(response.reason, Some(CommandError::RoundNotFlying));

        let players = dispatch(&scheduler, ClientCommand::GetActivePlayers).await;
        assert_eq!(players, ServerReply::ActivePlayers { players: vec![id] });

        let json = dispatch(&scheduler, ClientCommand::GetState).await.to_json().unwrap();
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""state":"waiting""#));

        scheduler.stop().await.unwrap();
    }
}

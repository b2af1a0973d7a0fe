use serde::Serialize;

use crate::analytics::market::WalletMarketRow;
use crate::analytics::positions::Position;
use crate::config::StrategySettings;

/// What to do with capital in one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Exit,
    EnterOrIncrease,
}

/// One recommended allocation step. Derived per evaluation tick, never
/// persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub pool_address: String,
    pub name: String,
    pub current_value_base: f64,
    /// Capital to add, set on `enter_or_increase` only.
    pub add_value_base: Option<f64>,
    /// The score that triggered the action (estimated pool APR for
    /// discovery entries).
    pub net_effective_pct: f64,
    pub reason: String,
}

/// A pool competing for capital in the sizing pass.
struct EntryCandidate {
    pool_address: String,
    name: String,
    current_value_base: f64,
    score: f64,
    reason: String,
}

/// Turns positions and market rows into exit/enter recommendations.
pub struct StrategyEngine {
    pub(crate) settings: StrategySettings,
    pub(crate) fee_rate: f64,
}

impl StrategyEngine {
    pub fn new(settings: StrategySettings, fee_rate: f64) -> Self {
        Self { settings, fee_rate }
    }

    /// Exit flags plus capped greedy entries. Pure over its inputs.
    ///
    /// The sizing pass is deliberately greedy and order-dependent: held
    /// positions ranked by score take capital before discovery candidates
    /// ranked by estimated APR, and earlier candidates drain the caps first.
    pub fn plan_actions(
        &self,
        positions: &[Position],
        market: &[WalletMarketRow],
    ) -> Vec<Action> {
        let cfg = &self.settings;
        let mut actions = Vec::new();

        // Exit pass: held value with a defined score below the threshold.
        for pos in positions {
            let Some(net) = pos.net_effective_pct else {
                continue;
            };
            if pos.current_value_base() > 0.0 && net < cfg.exit_threshold_pct {
                actions.push(Action {
                    kind: ActionKind::Exit,
                    pool_address: pos.pool_address.clone(),
                    name: pos.name.clone(),
                    current_value_base: pos.current_value_base(),
                    add_value_base: None,
                    net_effective_pct: net,
                    reason: format!("net {:.2} < exit {:.2}", net, cfg.exit_threshold_pct),
                });
            }
        }

        // Sizing pass.
        let mut total_value_now: f64 =
            positions.iter().map(|pos| pos.current_value_base()).sum();

        for candidate in self.entry_candidates(positions, market) {
            if total_value_now >= cfg.max_total_value {
                break;
            }

            let room = cfg.max_value_per_pool - candidate.current_value_base;
            if room <= 0.0 {
                continue;
            }

            let add = room
                .min(cfg.chunk_size)
                .min(cfg.max_total_value - total_value_now);
            if add <= 0.0 {
                continue;
            }

            total_value_now += add;
            actions.push(Action {
                kind: ActionKind::EnterOrIncrease,
                pool_address: candidate.pool_address,
                name: candidate.name,
                current_value_base: candidate.current_value_base,
                add_value_base: Some(add),
                net_effective_pct: candidate.score,
                reason: candidate.reason,
            });
        }

        actions
    }

    /// Held scale-ups (score order) followed by discovery entries (APR
    /// order).
    fn entry_candidates(
        &self,
        positions: &[Position],
        market: &[WalletMarketRow],
    ) -> Vec<EntryCandidate> {
        let cfg = &self.settings;

        let mut held: Vec<EntryCandidate> = positions
            .iter()
            .filter_map(|pos| {
                let net = pos.net_effective_pct?;
                if net < cfg.entry_min_net_pct {
                    return None;
                }
                Some(EntryCandidate {
                    pool_address: pos.pool_address.clone(),
                    name: pos.name.clone(),
                    current_value_base: pos.current_value_base(),
                    score: net,
                    reason: format!("net {:.2} >= entry {:.2}", net, cfg.entry_min_net_pct),
                })
            })
            .collect();
        held.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let discovered = self.discover(market).into_iter().map(|cand| EntryCandidate {
            pool_address: cand.pool_address,
            name: cand.name,
            current_value_base: 0.0,
            score: cand.pool_apr_pct,
            reason: format!("pool apr {:.2} (discovery)", cand.pool_apr_pct),
        });

        held.extend(discovered);
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::market::MarketRow;
    use chrono::{DateTime, Utc};

    fn settings() -> StrategySettings {
        StrategySettings {
            wallet_address: "0xwallet".to_string(),
            exit_threshold_pct: 2.0,
            entry_min_net_pct: 2.0,
            max_total_value: 100_000.0,
            max_value_per_pool: 40_000.0,
            chunk_size: 10_000.0,
            min_volume_24h: 1_000.0,
            min_reserve: 10_000.0,
            min_pool_apr_pct: 0.0,
            discover_top_n: 5,
            pool_allowlist: None,
        }
    }

    fn engine(settings: StrategySettings) -> StrategyEngine {
        StrategyEngine::new(settings, 0.05)
    }

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn position(pool: &str, value_lp: f64, net: Option<f64>) -> Position {
        Position {
            pool_address: pool.to_string(),
            name: format!("{}-name", pool),
            entry_ts: ts(),
            current_ts: ts(),
            days_in_position: 10.0,
            entry_user_base: value_lp,
            entry_user_quote: 0.0,
            current_user_base: value_lp,
            current_user_quote: 0.0,
            current_lp_share: 0.01,
            price_base_now: 50.0,
            value_hodl: value_lp,
            value_lp,
            il: 0.0,
            il_pct: 0.0,
            il_annualized_pct: None,
            pool_apr: net,
            net_effective_pct: net,
            il_usd: None,
            value_hodl_usd: None,
            value_lp_usd: None,
            target_weight: 0.0,
        }
    }

    fn market_row(pool: &str, volume_24h: f64, reserve_base: f64, lp_share: f64) -> WalletMarketRow {
        WalletMarketRow {
            market: MarketRow {
                pool_address: pool.to_string(),
                name: format!("{}-name", pool),
                price_base: 50.0,
                reserve_base,
                reserve_quote: reserve_base / 50.0,
                base_token: "0xbase".to_string(),
                quote_token: "0xquote".to_string(),
                ts: ts(),
                volume_24h,
                trades_24h: 10,
                volume_7d: volume_24h * 7.0,
                trades_7d: 70,
                price_change_24h_pct: None,
                price_change_7d_pct: None,
                volume_change_24h_pct: None,
                volume_change_7d_pct: None,
            },
            lp_balance: 0.0,
            lp_share,
            user_base: 0.0,
            user_quote: 0.0,
            fee_earn_24h: 0.0,
            fee_earn_7d: 0.0,
        }
    }

    #[test]
    fn flags_underperforming_positions_for_exit() {
        let engine = engine(settings());
        let positions = vec![position("a", 300.0, Some(1.5))];

        let actions = engine.plan_actions(&positions, &[]);
        let exits: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::Exit)
            .collect();

        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].pool_address, "a");
        assert_eq!(exits[0].current_value_base, 300.0);
        assert_eq!(exits[0].reason, "net 1.50 < exit 2.00");
    }

    #[test]
    fn undefined_scores_and_empty_positions_never_exit() {
        let engine = engine(settings());
        let positions = vec![
            position("no-score", 300.0, None),
            position("no-value", 0.0, Some(-5.0)),
        ];

        let actions = engine.plan_actions(&positions, &[]);
        assert!(actions.iter().all(|a| a.kind != ActionKind::Exit));
    }

    #[test]
    fn scale_ups_respect_per_pool_and_chunk_limits() {
        let engine = engine(settings());
        // 35k held with a 40k per-pool cap: room is 5k even though the
        // chunk would allow 10k.
        let positions = vec![position("a", 35_000.0, Some(8.0))];

        let actions = engine.plan_actions(&positions, &[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::EnterOrIncrease);
        assert_eq!(actions[0].add_value_base, Some(5_000.0));
    }

    #[test]
    fn sizing_never_exceeds_the_total_cap() {
        let mut cfg = settings();
        cfg.max_total_value = 50_000.0;
        let engine = engine(cfg);

        // 45k deployed, three hungry candidates; only 5k of room remains.
        let positions = vec![
            position("a", 45_000.0, Some(9.0)),
            position("b", 0.0, Some(8.0)),
            position("c", 0.0, Some(7.0)),
        ];

        let actions = engine.plan_actions(&positions, &[]);
        let added: f64 = actions
            .iter()
            .filter_map(|a| a.add_value_base)
            .sum();
        assert!(added <= 5_000.0 + f64::EPSILON);

        // Priority capital goes to the best-scored candidate with room.
        let enters: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::EnterOrIncrease)
            .collect();
        assert_eq!(enters.len(), 1);
        assert_eq!(enters[0].pool_address, "b");
        assert_eq!(enters[0].add_value_base, Some(5_000.0));
    }

    #[test]
    fn full_pools_are_skipped_not_trimmed() {
        let engine = engine(settings());
        let positions = vec![
            position("full", 40_000.0, Some(9.0)),
            position("hungry", 0.0, Some(5.0)),
        ];

        let actions = engine.plan_actions(&positions, &[]);
        let enters: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::EnterOrIncrease)
            .collect();
        assert_eq!(enters.len(), 1);
        assert_eq!(enters[0].pool_address, "hungry");
        assert_eq!(enters[0].add_value_base, Some(10_000.0));
    }

    #[test]
    fn discovery_candidates_receive_capital_after_held_pools() {
        let engine = engine(settings());
        let positions = vec![position("held", 0.0, Some(6.0))];
        let market = vec![
            market_row("held", 50_000.0, 100_000.0, 0.05),
            market_row("new", 50_000.0, 100_000.0, 0.0),
        ];

        let actions = engine.plan_actions(&positions, &market);
        let enters: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::EnterOrIncrease)
            .collect();

        assert_eq!(enters.len(), 2);
        assert_eq!(enters[0].pool_address, "held");
        assert_eq!(enters[1].pool_address, "new");
        assert_eq!(enters[1].current_value_base, 0.0);
        assert_eq!(enters[1].add_value_base, Some(10_000.0));
    }

    #[test]
    fn no_action_when_everything_is_capped() {
        let mut cfg = settings();
        cfg.max_total_value = 40_000.0;
        let engine = engine(cfg);
        let positions = vec![position("a", 40_000.0, Some(9.0))];

        let actions = engine.plan_actions(&positions, &[]);
        assert!(actions.is_empty());
    }
}

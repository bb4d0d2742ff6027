use common::{Direction, JournalError, MetricsIssue, Result, Trade, TradeMetrics};
use rayon::prelude::*;

/// Derives per-trade financial metrics from raw trade fields
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate metrics for one trade.
    ///
    /// Never fails: a field that cannot be used is reported in
    /// `TradeMetrics::issues` and every value depending on it is left `None`.
    pub fn calculate(trade: &Trade) -> TradeMetrics {
        let mut issues = Vec::new();

        let entry = Self::entry_price(trade, &mut issues);
        let quantity = Self::quantity(trade, &mut issues);
        let multiplier = Self::contract_multiplier(trade, &mut issues);

        let profit_loss = if trade.is_closed() {
            Self::closed_profit_loss(trade, entry, quantity, multiplier, &mut issues)
        } else {
            None
        };

        let risk_distance = entry.and_then(|e| Self::stop_price(trade).map(|s| (e - s).abs()));
        let reward_distance = entry.and_then(|e| {
            trade
                .take_profit
                .filter(|tp| tp.is_finite())
                .map(|tp| (tp - e).abs())
        });

        let risk_reward_ratio = match (risk_distance, reward_distance) {
            (Some(risk), Some(reward)) if risk > 0.0 => Some(reward / risk),
            _ => None,
        };

        let r_multiple = match (profit_loss, risk_distance, quantity, multiplier) {
            (Some(pnl), Some(risk), Some(qty), Some(mult)) if risk > 0.0 => {
                Some(pnl / (risk * qty * mult))
            }
            _ => None,
        };

        if !issues.is_empty() {
            log::debug!("trade {}: {} metrics issue(s)", trade.id, issues.len());
        }

        TradeMetrics {
            trade_id: trade.id.clone(),
            profit_loss,
            r_multiple,
            risk_reward_ratio,
            risk_distance,
            reward_distance,
            contract_multiplier: multiplier.unwrap_or(1.0),
            provisional: !trade.is_closed(),
            issues,
        }
    }

    /// Strict variant of [`calculate`](Self::calculate) that surfaces the
    /// first input problem as an error
    pub fn try_calculate(trade: &Trade) -> Result<TradeMetrics> {
        let metrics = Self::calculate(trade);
        match metrics.issues.first() {
            Some(issue) => Err(JournalError::InvalidMetricsInput {
                trade_id: trade.id.clone(),
                field: issue.field.clone(),
                reason: issue.reason.clone(),
            }),
            None => Ok(metrics),
        }
    }

    /// Calculate metrics for every trade, in input order
    pub fn calculate_batch(trades: &[Trade]) -> Vec<TradeMetrics> {
        trades.par_iter().map(Self::calculate).collect()
    }

    /// P&L of a single exit slice
    pub fn slice_profit_loss(
        direction: Direction,
        entry_price: f64,
        exit_price: f64,
        quantity: f64,
        multiplier: f64,
        fees: f64,
    ) -> f64 {
        (exit_price - entry_price) * quantity * direction.sign() * multiplier - fees
    }

    /// Stop used to measure initial risk; falls back to the working stop
    pub fn stop_price(trade: &Trade) -> Option<f64> {
        trade
            .initial_stop_loss
            .or(trade.stop_loss)
            .filter(|s| s.is_finite())
    }

    fn entry_price(trade: &Trade, issues: &mut Vec<MetricsIssue>) -> Option<f64> {
        match trade.entry_price {
            Some(price) if price.is_finite() && price > 0.0 => Some(price),
            Some(price) => {
                issues.push(issue("entry_price", format!("is not a valid price: {}", price)));
                None
            }
            None => {
                issues.push(issue("entry_price", "is missing"));
                None
            }
        }
    }

    fn quantity(trade: &Trade, issues: &mut Vec<MetricsIssue>) -> Option<f64> {
        if trade.quantity.is_finite() && trade.quantity > 0.0 {
            Some(trade.quantity)
        } else {
            issues.push(issue(
                "quantity",
                format!("must be positive, got {}", trade.quantity),
            ));
            None
        }
    }

    fn contract_multiplier(trade: &Trade, issues: &mut Vec<MetricsIssue>) -> Option<f64> {
        match &trade.contract {
            None => Some(1.0),
            Some(contract) => {
                let multiplier = contract.multiplier();
                if multiplier.is_none() {
                    issues.push(issue(
                        "contract",
                        format!(
                            "tick size {} / tick value {} do not define a multiplier",
                            contract.tick_size, contract.tick_value
                        ),
                    ));
                }
                multiplier
            }
        }
    }

    fn closed_profit_loss(
        trade: &Trade,
        entry: Option<f64>,
        quantity: Option<f64>,
        multiplier: Option<f64>,
        issues: &mut Vec<MetricsIssue>,
    ) -> Option<f64> {
        let exit_price = match trade.exit_price {
            Some(price) if price.is_finite() => Some(price),
            Some(price) => {
                issues.push(issue("exit_price", format!("is not a valid price: {}", price)));
                None
            }
            None => {
                issues.push(issue("exit_price", "is missing on a closed trade"));
                None
            }
        };

        if !trade.fees.is_finite() {
            issues.push(issue("fees", "is not a number"));
            return None;
        }

        let mut partial_ok = true;
        for (i, partial) in trade.partial_exits.iter().enumerate() {
            if !partial.exit_price.is_finite()
                || !partial.quantity.is_finite()
                || partial.quantity <= 0.0
                || !partial.fees.is_finite()
            {
                issues.push(issue(
                    &format!("partial_exits[{}]", i),
                    "has an invalid price, quantity or fee",
                ));
                partial_ok = false;
            }
        }
        if partial_ok && trade.partial_quantity() > trade.quantity + common::QUANTITY_EPSILON {
            issues.push(issue("partial_exits", "exit more than the trade quantity"));
            partial_ok = false;
        }

        let (entry, exit_price, multiplier) = match (entry, exit_price, quantity, multiplier) {
            (Some(e), Some(x), Some(_), Some(m)) if partial_ok => (e, x, m),
            _ => return None,
        };

        let partial_pnl: f64 = trade
            .partial_exits
            .iter()
            .map(|p| {
                Self::slice_profit_loss(
                    trade.direction,
                    entry,
                    p.exit_price,
                    p.quantity,
                    multiplier,
                    p.fees,
                )
            })
            .sum();

        let final_pnl = Self::slice_profit_loss(
            trade.direction,
            entry,
            exit_price,
            trade.remaining_quantity(),
            multiplier,
            trade.fees,
        );

        Some(partial_pnl + final_pnl)
    }
}

fn issue(field: &str, reason: impl Into<String>) -> MetricsIssue {
    MetricsIssue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

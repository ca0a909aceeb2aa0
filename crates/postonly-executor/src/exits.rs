//! Protective take-profit / stop-loss placement.
//!
//! Both legs are full-position-closing trigger orders on the side opposite
//! the position. Each leg is independent and best-effort: a failed leg is
//! reported, never retried or rolled back.

use postonly_core::{ExitLegOutcome, ExitReport, OrderIntent, OrderKind, OrderSide, Price};
use postonly_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::ExitPolicy;
use crate::session::SymbolSession;

/// Trigger price for `kind` protecting a position on `position_side`.
///
/// Long: TP above, SL below the reference. Short mirrored. Floored to tick.
pub fn trigger_price(
    kind: OrderKind,
    position_side: OrderSide,
    reference: Price,
    pct: Decimal,
    tick: Price,
) -> Price {
    let up = Decimal::ONE + pct;
    let down = Decimal::ONE - pct;
    let factor = match (kind, position_side) {
        (OrderKind::TakeProfit, OrderSide::Buy) | (OrderKind::StopLoss, OrderSide::Sell) => up,
        _ => down,
    };
    (reference * factor).floor_to_tick(tick)
}

/// Place both legs for a position on `position_side`.
///
/// Falls back to the book mid when no entry price is known.
pub(crate) async fn place_exit_orders(
    session: &SymbolSession<'_>,
    position_side: OrderSide,
    entry_price: Option<Price>,
    policy: &ExitPolicy,
) -> ExitReport {
    if !policy.take_profit_active() && !policy.stop_loss_active() {
        return record(ExitReport {
            reference_price: entry_price,
            take_profit: ExitLegOutcome::Disabled,
            stop_loss: ExitLegOutcome::Disabled,
        });
    }

    let reference = match entry_price {
        Some(p) if p.is_positive() => Some(p),
        _ => match session.quote().await {
            Ok(bbo) => bbo.mid_price(),
            Err(e) => {
                warn!(symbol = %session.symbol, error = %e, "No entry price and no book for exits");
                None
            }
        },
    };
    let Some(reference) = reference else {
        return record(ExitReport::skipped("no reference price"));
    };

    let take_profit = place_leg(
        session,
        OrderKind::TakeProfit,
        position_side,
        reference,
        policy.take_profit_active().then_some(policy.take_profit_pct),
    )
    .await;
    let stop_loss = place_leg(
        session,
        OrderKind::StopLoss,
        position_side,
        reference,
        policy.stop_loss_active().then_some(policy.stop_loss_pct),
    )
    .await;

    record(ExitReport {
        reference_price: Some(reference),
        take_profit,
        stop_loss,
    })
}

async fn place_leg(
    session: &SymbolSession<'_>,
    kind: OrderKind,
    position_side: OrderSide,
    reference: Price,
    pct: Option<Decimal>,
) -> ExitLegOutcome {
    let Some(pct) = pct else {
        return ExitLegOutcome::Disabled;
    };
    let trigger = trigger_price(kind, position_side, reference, pct, session.spec.tick_size);
    if !trigger.is_positive() {
        return ExitLegOutcome::Skipped {
            reason: format!("trigger price {trigger} not positive"),
        };
    }

    let close_side = position_side.opposite();
    let intent = OrderIntent::trigger_close(session.symbol.clone(), close_side, kind, trigger);
    match session.submit(&intent).await {
        Ok(()) => {
            info!(
                symbol = %session.symbol,
                %kind,
                %close_side,
                %reference,
                %trigger,
                "Protective order placed"
            );
            ExitLegOutcome::Placed {
                cloid: intent.cloid,
                trigger_price: trigger,
            }
        }
        Err(e) => {
            warn!(symbol = %session.symbol, %kind, %trigger, error = %e, "Protective order failed");
            ExitLegOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn record(report: ExitReport) -> ExitReport {
    Metrics::exit_leg("take_profit", report.take_profit.label());
    Metrics::exit_leg("stop_loss", report.stop_loss.label());
    report
}

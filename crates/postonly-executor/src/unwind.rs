//! Opposite-position unwind.
//!
//! Drives any position held against the requested direction to flat before
//! the opening leg starts. Reduce-only maker closes at the touch, escalated
//! to reduce-only market orders when the exchange says the close would
//! cross. Exhausting the budget is fatal for the execution.

use postonly_core::{OrderIntent, OrderSide, Size, UnwindReport};
use postonly_exchange::ExchangeError;
use postonly_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{ExecutorError, ExecutorResult};
use crate::quote::maker_price;
use crate::session::SymbolSession;

/// Flatten whatever is held against `entry_side`.
///
/// Closing orders trade in `entry_side` (a short is bought back before a
/// long opens). Returns immediately when nothing opposes the entry.
pub(crate) async fn close_opposite_if_any(
    session: &SymbolSession<'_>,
    entry_side: OrderSide,
) -> ExecutorResult<UnwindReport> {
    let symbol = session.symbol;
    let spec = session.spec;
    let max_retries = session.config.max_retries;

    let mut report = UnwindReport::default();
    let mut seen_position = false;
    let mut last_error = String::from("no attempt made");
    let mut remaining = Decimal::ZERO;

    for round in 1..=max_retries {
        let position = match session.position().await {
            Ok(p) => p,
            Err(e) => {
                warn!(%symbol, round, error = %e, "Unwind position read failed");
                last_error = e.to_string();
                session.pause().await;
                continue;
            }
        };

        let opposing = position.opposing(entry_side);
        remaining = opposing.inner();
        if !seen_position {
            seen_position = true;
            report.initial_opposite = opposing;
            if spec.is_flat(remaining) {
                return Ok(report);
            }
            info!(
                %symbol,
                side = %entry_side,
                opposite = %opposing,
                "Opposite position found, unwinding"
            );
        }
        if spec.is_flat(remaining) {
            info!(
                %symbol,
                side = %entry_side,
                attempts = report.attempts,
                escalations = report.market_escalations,
                "Opposite position flat"
            );
            return Ok(report);
        }

        let mut qty = spec.floor_qty(opposing);
        if qty.is_zero() {
            qty = spec.one_step();
        }

        let bbo = match session.quote().await {
            Ok(b) => b,
            Err(e) => {
                warn!(%symbol, round, error = %e, "Unwind quote failed");
                last_error = e.to_string();
                session.pause().await;
                continue;
            }
        };
        let price = maker_price(&bbo, entry_side, spec.tick_size);
        let close = OrderIntent::maker(symbol.clone(), entry_side, qty, price, true);
        report.attempts += 1;
        debug!(
            %symbol,
            side = %entry_side,
            attempt = report.attempts,
            %qty,
            %price,
            "Placing maker close"
        );

        match session.submit(&close).await {
            Ok(()) => {
                if wait_flat(session, entry_side, session.config.close_timeout()).await {
                    continue;
                }
                session.cancel_quietly(&close.cloid).await;
                last_error = format!("maker close {} not filled in time", close.cloid);
            }
            Err(ExchangeError::WouldImmediatelyMatch(_)) => {
                report.market_escalations += 1;
                Metrics::unwind_escalated(symbol.as_str());
                info!(
                    %symbol,
                    side = %entry_side,
                    attempt = report.attempts,
                    %qty,
                    "Maker close would cross, escalating to market"
                );
                let market = OrderIntent::market(symbol.clone(), entry_side, qty, true);
                match session.submit(&market).await {
                    Ok(()) => {
                        if wait_flat(session, entry_side, session.config.escalation_timeout()).await {
                            continue;
                        }
                        last_error = format!("market close {} left residue", market.cloid);
                    }
                    Err(e) => {
                        warn!(%symbol, attempt = report.attempts, error = %e, "Market close rejected");
                        last_error = e.to_string();
                    }
                }
            }
            Err(e) => {
                warn!(%symbol, attempt = report.attempts, error = %e, "Maker close rejected");
                last_error = e.to_string();
            }
        }
        session.pause().await;
    }

    // The last round may have ended flat without being observed.
    if let Ok(position) = session.position().await {
        remaining = position.opposing(entry_side).inner();
        if seen_position && spec.is_flat(remaining) {
            return Ok(report);
        }
        if !seen_position {
            report.initial_opposite = Size::new(remaining);
            if spec.is_flat(remaining) {
                return Ok(report);
            }
        }
    }

    Metrics::unwind_failed(symbol.as_str());
    warn!(
        %symbol,
        side = %entry_side,
        attempts = report.attempts,
        %remaining,
        last_error = %last_error,
        "Unwind exhausted"
    );
    Err(ExecutorError::UnwindExhausted {
        symbol: symbol.clone(),
        side: entry_side,
        attempts: report.attempts,
        remaining,
        last_error,
    })
}

async fn wait_flat(
    session: &SymbolSession<'_>,
    entry_side: OrderSide,
    timeout: std::time::Duration,
) -> bool {
    let spec = session.spec;
    let (_, flat) = session
        .poll_position(timeout, |p| spec.is_flat(p.opposing(entry_side).inner()))
        .await;
    flat
}

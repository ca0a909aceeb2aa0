//! Execution result types.
//!
//! Returned by the execution engine to the caller and serialized as-is into
//! HTTP responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::market::Symbol;
use crate::order::ClientOrderId;
use crate::signal::{SignalClass, SignalSide};
use crate::{Price, Size};

// ============================================================================
// Mode
// ============================================================================

/// How the opening leg was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Filled by post-only maker orders (or already held).
    Maker,
    /// Market-only because the signal was classified noisy.
    Market,
    /// Maker attempts exhausted; remainder topped up with a market order.
    MarketFallback,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maker => "maker",
            Self::Market => "market",
            Self::MarketFallback => "market_fallback",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Exit legs
// ============================================================================

/// Outcome of one protective trigger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitLegOutcome {
    /// Leg switched off in the exit policy.
    Disabled,
    /// Nothing to protect or no usable reference price.
    Skipped { reason: String },
    Placed {
        cloid: ClientOrderId,
        trigger_price: Price,
    },
    /// Submission failed. Logged, never rolled back.
    Failed { error: String },
}

impl ExitLegOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Skipped { .. } => "skipped",
            Self::Placed { .. } => "placed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Both protective legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    /// Price the triggers were computed from.
    pub reference_price: Option<Price>,
    pub take_profit: ExitLegOutcome,
    pub stop_loss: ExitLegOutcome,
}

impl ExitReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            reference_price: None,
            take_profit: ExitLegOutcome::Skipped {
                reason: reason.clone(),
            },
            stop_loss: ExitLegOutcome::Skipped { reason },
        }
    }
}

// ============================================================================
// Unwind + overall result
// ============================================================================

/// What the opposite-position unwind did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwindReport {
    /// Opposite quantity found before the unwind started.
    pub initial_opposite: Size,
    pub attempts: u32,
    /// Maker closes that were rejected as would-immediately-match and
    /// escalated to reduce-only market orders.
    pub market_escalations: u32,
}

impl UnwindReport {
    pub fn was_needed(&self) -> bool {
        self.initial_opposite.is_positive()
    }
}

/// Result of one `execute_signal` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub symbol: Symbol,
    pub side: SignalSide,
    pub class: SignalClass,
    pub mode: ExecutionMode,
    /// Target reached within the fill ratio.
    pub filled: bool,
    /// Opening-leg order submissions (maker attempts plus any market order).
    pub attempts: u32,
    pub target_quantity: Size,
    /// Signed position observed at the end of the opening leg.
    pub position_amount: Decimal,
    pub entry_price: Option<Price>,
    pub unwind: UnwindReport,
    pub exits: ExitReport,
}

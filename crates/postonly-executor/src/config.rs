//! Execution engine configuration (`[executor]` and `[exits]` TOML sections).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and sizing of the execution state machine.
///
/// All durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Quantity used when a signal carries none.
    #[serde(default = "default_quantity")]
    pub default_quantity: Decimal,
    /// Pause between retries.
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
    /// How long one maker entry attempt may rest before it is cancelled.
    #[serde(default = "default_open_attempt_timeout_ms")]
    pub open_attempt_timeout_ms: u64,
    /// How long one maker close may rest before it is cancelled.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
    /// Unwind budget.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Maker entry attempts before the market top-up.
    #[serde(default = "default_max_open_attempts")]
    pub max_open_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for the entry price to show up after a fill.
    #[serde(default = "default_entry_settle_timeout_ms")]
    pub entry_settle_timeout_ms: u64,
    /// Fraction of the target that counts as filled.
    #[serde(default = "default_fill_ratio")]
    pub fill_ratio: Decimal,
}

fn default_quantity() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_order_timeout_ms() -> u64 {
    200
}

fn default_open_attempt_timeout_ms() -> u64 {
    400
}

fn default_close_timeout_ms() -> u64 {
    2500
}

fn default_max_retries() -> u32 {
    25
}

fn default_max_open_attempts() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_entry_settle_timeout_ms() -> u64 {
    7000
}

fn default_fill_ratio() -> Decimal {
    Decimal::new(999, 3) // 0.999
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_quantity: default_quantity(),
            order_timeout_ms: default_order_timeout_ms(),
            open_attempt_timeout_ms: default_open_attempt_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            max_retries: default_max_retries(),
            max_open_attempts: default_max_open_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            entry_settle_timeout_ms: default_entry_settle_timeout_ms(),
            fill_ratio: default_fill_ratio(),
        }
    }
}

impl ExecutorConfig {
    pub(crate) fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    pub(crate) fn open_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.open_attempt_timeout_ms)
    }

    pub(crate) fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Wait after a market escalation during unwind.
    pub(crate) fn escalation_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms / 2)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub(crate) fn entry_settle_timeout(&self) -> Duration {
        Duration::from_millis(self.entry_settle_timeout_ms)
    }
}

/// Protective exit settings. Replaceable at runtime.
///
/// Percentages are fractions: 0.01 = 1 %. A non-positive percentage switches
/// its leg off just like the enabled flag does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPolicy {
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    #[serde(default = "default_leg_enabled")]
    pub take_profit_enabled: bool,
    #[serde(default = "default_leg_enabled")]
    pub stop_loss_enabled: bool,
}

fn default_take_profit_pct() -> Decimal {
    Decimal::new(1, 2) // 1%
}

fn default_stop_loss_pct() -> Decimal {
    Decimal::new(5, 3) // 0.5%
}

fn default_leg_enabled() -> bool {
    true
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_enabled: default_leg_enabled(),
            stop_loss_enabled: default_leg_enabled(),
        }
    }
}

impl ExitPolicy {
    /// Both legs off.
    pub fn disabled() -> Self {
        Self {
            take_profit_enabled: false,
            stop_loss_enabled: false,
            ..Self::default()
        }
    }

    pub fn take_profit_active(&self) -> bool {
        self.take_profit_enabled && self.take_profit_pct > Decimal::ZERO
    }

    pub fn stop_loss_active(&self) -> bool {
        self.stop_loss_enabled && self.stop_loss_pct > Decimal::ZERO
    }
}

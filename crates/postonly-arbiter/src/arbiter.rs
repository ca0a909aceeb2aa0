//! Sliding-window signal classifier.
//!
//! One arbiter is shared by every symbol in the process. All state sits
//! behind a single `parking_lot::Mutex`; `classify` registers and evaluates
//! under one acquisition so concurrent signals see a consistent window.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use postonly_core::{Clock, SignalClass, SignalSide, SystemClock};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ArbiterConfig;

/// Why a signal was classified noisy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoisyReason {
    Latched,
    SignalCount,
    Flips,
    FastReentry,
}

impl NoisyReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Latched => "latched",
            Self::SignalCount => "signal_count",
            Self::Flips => "flips",
            Self::FastReentry => "fast_reentry",
        }
    }
}

#[derive(Debug, Default)]
struct ArbiterState {
    /// (timestamp ms, side), oldest first.
    events: VecDeque<(u64, SignalSide)>,
    /// Noisy mode latched until this time. 0 = never latched.
    spam_until_ms: u64,
    last_open_ms: Option<u64>,
    last_side: Option<SignalSide>,
}

impl ArbiterState {
    fn purge(&mut self, now_ms: u64, window_ms: u64) {
        while let Some(&(ts, _)) = self.events.front() {
            if now_ms.saturating_sub(ts) > window_ms {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Adjacent event pairs with differing sides.
    fn flips(&self) -> usize {
        self.events
            .iter()
            .zip(self.events.iter().skip(1))
            .filter(|((_, a), (_, b))| a != b)
            .count()
    }
}

/// Point-in-time view for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbiterSnapshot {
    pub enabled: bool,
    pub window_signals: usize,
    pub flips: usize,
    /// Latch still active at snapshot time.
    pub latched: bool,
    pub spam_until_ms: Option<u64>,
    pub last_open_ms: Option<u64>,
    pub last_side: Option<SignalSide>,
}

/// Signal rate arbiter.
pub struct SignalArbiter {
    config: ArbiterConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ArbiterState>,
}

impl SignalArbiter {
    #[must_use]
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: ArbiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(ArbiterState::default()),
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Append a signal to the window.
    pub fn register(&self, side: SignalSide) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.register_locked(&mut state, now, side);
    }

    /// Whether execution should skip maker orders right now.
    ///
    /// Latches for `hysteresis_secs` when it first returns true.
    pub fn in_spam_mode(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.evaluate_locked(&mut state, now).is_some()
    }

    /// Record that a position was opened; feeds the minimum-hold check for
    /// the next signal.
    pub fn note_successful_open(&self) {
        let now = self.clock.now_ms();
        self.state.lock().last_open_ms = Some(now);
        debug!(now_ms = now, "Arbiter noted successful open");
    }

    /// Register `side` and classify it.
    pub fn classify(&self, side: SignalSide) -> SignalClass {
        if !self.config.enabled {
            return SignalClass::Calm;
        }
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        self.register_locked(&mut state, now, side);
        match self.evaluate_locked(&mut state, now) {
            Some(reason) => {
                warn!(
                    %side,
                    reason = reason.as_str(),
                    window_signals = state.events.len(),
                    spam_until_ms = state.spam_until_ms,
                    "Signal classified noisy"
                );
                SignalClass::Noisy
            }
            None => {
                debug!(%side, window_signals = state.events.len(), "Signal classified calm");
                SignalClass::Calm
            }
        }
    }

    pub fn snapshot(&self) -> ArbiterSnapshot {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.purge(now, self.config.window_ms());
        ArbiterSnapshot {
            enabled: self.config.enabled,
            window_signals: state.events.len(),
            flips: state.flips(),
            latched: now < state.spam_until_ms,
            spam_until_ms: (state.spam_until_ms > 0).then_some(state.spam_until_ms),
            last_open_ms: state.last_open_ms,
            last_side: state.last_side,
        }
    }

    fn register_locked(&self, state: &mut ArbiterState, now: u64, side: SignalSide) {
        state.events.push_back((now, side));
        state.purge(now, self.config.window_ms());
        state.last_side = Some(side);
    }

    fn evaluate_locked(&self, state: &mut ArbiterState, now: u64) -> Option<NoisyReason> {
        if !self.config.enabled {
            return None;
        }
        state.purge(now, self.config.window_ms());
        if now < state.spam_until_ms {
            return Some(NoisyReason::Latched);
        }

        let reason = if state.events.len() >= self.config.max_signals as usize {
            Some(NoisyReason::SignalCount)
        } else if state.flips() >= self.config.max_flips as usize {
            Some(NoisyReason::Flips)
        } else if state
            .last_open_ms
            .is_some_and(|open| now.saturating_sub(open) < self.config.min_hold_ms())
        {
            Some(NoisyReason::FastReentry)
        } else {
            None
        };

        if reason.is_some() {
            state.spam_until_ms = now + self.config.hysteresis_ms();
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postonly_core::ManualClock;

    const T0: u64 = 1_700_000_000_000;

    fn arbiter(config: ArbiterConfig) -> (SignalArbiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (SignalArbiter::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_single_signal_is_calm() {
        let (arb, _) = arbiter(ArbiterConfig::default());
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
    }

    #[test]
    fn test_n_same_direction_signals_are_noisy() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        for _ in 0..3 {
            assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
            clock.advance_secs(10);
        }
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Noisy);
    }

    #[test]
    fn test_old_signals_are_purged() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        for _ in 0..3 {
            arb.classify(SignalSide::Long);
        }
        clock.advance_secs(91);
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
        assert_eq!(arb.snapshot().window_signals, 1);
    }

    #[test]
    fn test_signal_exactly_at_window_edge_is_kept() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        arb.register(SignalSide::Long);
        clock.advance_secs(90);
        assert_eq!(arb.snapshot().window_signals, 1);
        clock.advance_ms(1);
        assert_eq!(arb.snapshot().window_signals, 0);
    }

    #[test]
    fn test_flips_trigger_noisy() {
        let config = ArbiterConfig {
            max_signals: 100,
            ..ArbiterConfig::default()
        };
        let (arb, clock) = arbiter(config);
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
        clock.advance_secs(1);
        assert_eq!(arb.classify(SignalSide::Short), SignalClass::Calm);
        clock.advance_secs(1);
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
        clock.advance_secs(1);
        assert_eq!(arb.classify(SignalSide::Short), SignalClass::Noisy);
        assert_eq!(arb.snapshot().flips, 3);
    }

    #[test]
    fn test_noisy_latches_for_hysteresis() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        for _ in 0..4 {
            arb.classify(SignalSide::Long);
        }
        assert!(arb.in_spam_mode());

        clock.advance_ms(59_999);
        assert!(arb.in_spam_mode());
        assert!(arb.snapshot().latched);

        // latch expired and window emptied
        clock.advance_secs(32);
        assert!(!arb.in_spam_mode());
        assert!(!arb.snapshot().latched);
    }

    #[test]
    fn test_fast_reentry_is_noisy() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        arb.note_successful_open();
        clock.advance_secs(29);
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Noisy);
    }

    #[test]
    fn test_reentry_after_min_hold_is_calm() {
        let (arb, clock) = arbiter(ArbiterConfig::default());
        arb.note_successful_open();
        clock.advance_secs(31);
        assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
    }

    #[test]
    fn test_disabled_is_always_calm() {
        let config = ArbiterConfig {
            enabled: false,
            ..ArbiterConfig::default()
        };
        let (arb, _) = arbiter(config);
        for _ in 0..10 {
            assert_eq!(arb.classify(SignalSide::Long), SignalClass::Calm);
        }
        assert!(!arb.in_spam_mode());
        assert!(!arb.snapshot().enabled);
    }

    #[test]
    fn test_snapshot_reports_state() {
        let (arb, _) = arbiter(ArbiterConfig::default());
        arb.classify(SignalSide::Long);
        arb.classify(SignalSide::Short);
        arb.note_successful_open();

        let snap = arb.snapshot();
        assert_eq!(snap.window_signals, 2);
        assert_eq!(snap.flips, 1);
        assert_eq!(snap.last_side, Some(SignalSide::Short));
        assert_eq!(snap.last_open_ms, Some(T0));
        assert_eq!(snap.spam_until_ms, None);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["last_side"], "short");
    }

    #[test]
    fn test_concurrent_registration() {
        let (arb, _) = arbiter(ArbiterConfig::default());
        let arb = Arc::new(arb);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let arb = Arc::clone(&arb);
                std::thread::spawn(move || {
                    let side = if i % 2 == 0 { SignalSide::Long } else { SignalSide::Short };
                    for _ in 0..10 {
                        arb.register(side);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(arb.snapshot().window_signals, 80);
    }
}

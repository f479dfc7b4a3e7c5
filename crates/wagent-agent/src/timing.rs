// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-like reply timing.
//!
//! A reply waits according to the account's [`ReplyTiming`] policy, then shows
//! a typing indicator for roughly as long as a person would need to type it.

use rand::Rng;
use wagent_config::model::TimingConfig;
use wagent_core::types::ReplyTiming;

#[derive(Debug, Clone)]
pub struct TimingSimulator {
    config: TimingConfig,
}

impl TimingSimulator {
    pub fn new(config: TimingConfig) -> Self {
        Self { config }
    }

    /// Seconds to wait before the reply starts.
    pub fn compute_wait<R: Rng + ?Sized>(&self, policy: &ReplyTiming, rng: &mut R) -> u64 {
        match *policy {
            ReplyTiming::Fixed { seconds } => seconds,
            ReplyTiming::Random {
                min_seconds,
                max_seconds,
            } => {
                let (lo, hi) = if min_seconds <= max_seconds {
                    (min_seconds, max_seconds)
                } else {
                    (max_seconds, min_seconds)
                };
                rng.gen_range(lo..=hi)
            }
        }
    }

    /// Seconds of typing for a reply of `reply_chars` characters.
    ///
    /// `chars / speed`, scaled by a uniform factor in `1 ± variance`, rounded,
    /// and never below `min_typing_secs`.
    pub fn compute_typing<R: Rng + ?Sized>(&self, reply_chars: usize, rng: &mut R) -> u64 {
        let floor = self.config.min_typing_secs;
        let speed = self.config.typing_chars_per_second;
        if speed <= 0.0 || reply_chars == 0 {
            return floor;
        }

        let variance = self.config.typing_variance.clamp(0.0, 1.0);
        let factor = if variance > 0.0 {
            1.0 + rng.gen_range(-variance..=variance)
        } else {
            1.0
        };

        let seconds = (reply_chars as f64 / speed * factor).round().max(0.0) as u64;
        seconds.max(floor)
    }
}

impl Default for TimingSimulator {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

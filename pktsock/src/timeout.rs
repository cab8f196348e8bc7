// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2024 Nathaniel Bennett <me[at]nathanielbennett[dotcom]>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Block and total timeouts for socket operations.
//!
//! Every socket carries two independent limits:
//!
//! - the *block* timeout bounds each individual wait for the descriptor to become ready;
//! - the *total* timeout bounds the whole operation, measured from the last call to
//!   [`mark_start()`](Timeout::mark_start).
//!
//! A limit of `None` means "wait forever". A block timeout of zero means "never wait":
//! operations that would block fail immediately with a timeout.

use std::str::FromStr;
use std::time::{Duration, Instant};

/// Selects which of the two limits [`Timeout::set()`] changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutMode {
    /// The per-wait limit (`"b"`).
    Block,
    /// The whole-operation limit (`"t"`, or `"r"` for compatibility).
    Total,
}

/// Error returned when a timeout mode string is not one of `"b"`, `"t"` or `"r"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid timeout mode")]
pub struct InvalidTimeoutMode;

impl FromStr for TimeoutMode {
    type Err = InvalidTimeoutMode;

    /// Only the first character is significant, so `"block"` and `"total"` are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes().first() {
            Some(b'b') => Ok(TimeoutMode::Block),
            Some(b't' | b'r') => Ok(TimeoutMode::Total),
            _ => Err(InvalidTimeoutMode),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Timeout {
    block: Option<Duration>,
    total: Option<Duration>,
    start: Instant,
}

impl Timeout {
    /// Creates a timeout with the given block and total limits.
    #[inline]
    pub fn new(block: Option<Duration>, total: Option<Duration>) -> Self {
        Self {
            block,
            total,
            start: Instant::now(),
        }
    }

    /// A timeout that never expires.
    #[inline]
    pub fn blocking() -> Self {
        Self::new(None, None)
    }

    #[inline]
    pub fn block(&self) -> Option<Duration> {
        self.block
    }

    #[inline]
    pub fn total(&self) -> Option<Duration> {
        self.total
    }

    /// Replaces one of the two limits.
    #[inline]
    pub fn set(&mut self, limit: Option<Duration>, mode: TimeoutMode) {
        match mode {
            TimeoutMode::Block => self.block = limit,
            TimeoutMode::Total => self.total = limit,
        }
    }

    /// Records the start of an operation; the total limit is measured from here.
    #[inline]
    pub fn mark_start(&mut self) {
        self.start = Instant::now();
    }

    /// Indicates whether operations must not wait at all.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.block == Some(Duration::ZERO)
    }

    /// How long the next wait may last, or `None` if it may wait forever.
    ///
    /// With only a block limit set, the budget is what remains of the block limit since
    /// [`mark_start()`](Self::mark_start). With a total limit set, it is what remains of the
    /// total limit, capped by the block limit if there is one.
    pub fn retry(&self) -> Option<Duration> {
        let elapsed = self.start.elapsed();

        match (self.block, self.total) {
            (None, None) => None,
            (None, Some(total)) => Some(total.saturating_sub(elapsed)),
            (Some(block), None) => Some(block.saturating_sub(elapsed)),
            (Some(block), Some(total)) => Some(block.min(total.saturating_sub(elapsed))),
        }
    }

    /// [`retry()`](Self::retry) expressed in whole milliseconds for `poll(2)`, where `-1`
    /// means "no limit".
    pub(crate) fn retry_millis(&self) -> libc::c_int {
        match self.retry() {
            None => -1,
            Some(budget) => libc::c_int::try_from(budget.as_millis()).unwrap_or(libc::c_int::MAX),
        }
    }
}

impl Default for Timeout {
    #[inline]
    fn default() -> Self {
        Self::blocking()
    }
}

/// Converts a script-level timeout in seconds into a limit; `None`, negative, NaN and
/// infinite values all mean "no limit".
pub fn limit_from_secs(secs: Option<f64>) -> Option<Duration> {
    secs.and_then(|s| Duration::try_from_secs_f64(s).ok())
}

/// Converts a limit back into seconds, with `-1` standing for "no limit".
pub fn limit_to_secs(limit: Option<Duration>) -> f64 {
    limit.map_or(-1.0, |d| d.as_secs_f64())
}

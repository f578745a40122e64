// Copyright (C) 2018-2019, Cloudflare, Inc.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above copyright
//       notice, this list of conditions and the following disclaimer in the
//       documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS
// IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO,
// THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! RACK time-based loss detection for reliable transport senders.
//!
//! RACK ("Recently ACKnowledged") infers loss from the time domain: once a
//! segment is delivered, every outstanding segment that was sent before it by
//! more than a small settling window is presumed lost. The settling window
//! absorbs benign reordering, and retransmissions are handled the same way as
//! original transmissions, which makes the detection robust to tail losses.
//!
//! The crate only decides *what* is lost and *when* to look again. The
//! application is responsible for decoding acknowledgments, for running the
//! congestion controller and for providing an event loop with timers.
//!
//! ## Setup
//!
//! ```
//! let mut config = rack::Config::new();
//! config.set_recovery_mode_name("enabled-adaptive-window")?;
//!
//! let recovery = rack::Recovery::new(&config, 0, "conn-1");
//! # Ok::<(), rack::Error>(())
//! ```
//!
//! ## Sending and acknowledgments
//!
//! Every transmitted segment is reported with [`on_segment_sent()`], and every
//! retransmission with [`on_segment_retransmitted()`]. Decoded
//! acknowledgments are handed to [`on_ack_received()`] together with the
//! congestion controller, which is consulted for the current congestion
//! state and asked to enter recovery when losses are found.
//!
//! ## Timers
//!
//! The application is expected to fire the timer returned by [`timeout()`]
//! by calling [`on_timeout()`]. When a reorder timeout fires, loss detection
//! runs again without a new acknowledgment.
//!
//! ## Events
//!
//! Lost segments, retransmission requests and timer changes are reported as
//! [`Event`]s, retrieved with [`poll_event()`].
//!
//! [`on_segment_sent()`]: struct.Recovery.html#method.on_segment_sent
//! [`on_segment_retransmitted()`]: struct.Recovery.html#method.on_segment_retransmitted
//! [`on_ack_received()`]: struct.Recovery.html#method.on_ack_received
//! [`timeout()`]: struct.Recovery.html#method.timeout
//! [`on_timeout()`]: struct.Recovery.html#method.on_timeout
//! [`poll_event()`]: struct.Recovery.html#method.poll_event
//! [`Event`]: enum.Event.html

#![warn(missing_debug_implementations)]

#[macro_use]
extern crate log;

use std::str::FromStr;
use std::time::Duration;

/// The default maximum ACK delay assumed for the peer.
const DEFAULT_MAX_ACK_DELAY: Duration = Duration::from_millis(25);

/// Stores configuration shared between multiple connections.
#[derive(Clone, Debug)]
pub struct Config {
    recovery_mode: RecoveryMode,

    max_ack_delay: Duration,
}

impl Config {
    /// Creates a config object with the default settings.
    ///
    /// ## Examples:
    ///
    /// ```
    /// let config = rack::Config::new();
    /// assert_eq!(config.recovery_mode(), rack::RecoveryMode::EnabledAdaptiveWindow);
    /// ```
    pub fn new() -> Self {
        Config {
            recovery_mode: RecoveryMode::default(),
            max_ack_delay: DEFAULT_MAX_ACK_DELAY,
        }
    }

    /// Sets the RACK loss detection mode.
    ///
    /// The default value is `RecoveryMode::EnabledAdaptiveWindow`.
    pub fn set_recovery_mode(&mut self, mode: RecoveryMode) {
        self.recovery_mode = mode;
    }

    /// Sets the RACK loss detection mode by name.
    ///
    /// The recognized names are `disabled`, `enabled-static-window` and
    /// `enabled-adaptive-window`.
    ///
    /// ## Examples:
    ///
    /// ```
    /// let mut config = rack::Config::new();
    /// config.set_recovery_mode_name("disabled")?;
    /// # Ok::<(), rack::Error>(())
    /// ```
    pub fn set_recovery_mode_name(&mut self, name: &str) -> Result<()> {
        self.recovery_mode = RecoveryMode::from_str(name)?;

        Ok(())
    }

    pub fn recovery_mode(&self) -> RecoveryMode {
        self.recovery_mode
    }

    /// Sets the maximum delay the peer applies to acknowledgments, used to
    /// discount ACK delays from RTT samples.
    ///
    /// The default value is 25 milliseconds.
    pub fn set_max_ack_delay(&mut self, v: Duration) {
        self.max_ack_delay = v;
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::recovery::Ack;
pub use crate::recovery::AdvanceOutcome;
pub use crate::recovery::CongestionControl;
pub use crate::recovery::CongestionState;
pub use crate::recovery::Event;
pub use crate::recovery::LossDetection;
pub use crate::recovery::RackState;
pub use crate::recovery::Recovery;
pub use crate::recovery::RecoveryMode;
pub use crate::recovery::Stats;
pub use crate::recovery::TimerKind;
pub use crate::segment::Segment;
pub use crate::segment::SegmentQueue;

#[cfg(test)]
mod tests;

mod error;
mod minmax;
mod recovery;
mod segment;

// Copyright (C) 2024, Cloudflare, Inc.
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

use std::cmp;
use std::time::Duration;
use std::time::Instant;

use super::REORDER_TIMEOUT_MIN;

/// Kinds of timers sharing the connection's retransmission timer slot, in
/// increasing priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    /// Retransmission timeout.
    Retransmission,

    /// RACK reordering timeout.
    ReorderTimeout,

    /// Zero window probe.
    Probe,
}

#[derive(Default)]
pub(crate) struct RecoveryTimer {
    armed: Option<(TimerKind, Instant)>,
}

impl RecoveryTimer {
    /// Arms the reorder timeout `delay` plus `REORDER_TIMEOUT_MIN` from now,
    /// capped at `rto`.
    ///
    /// Returns the effective delay, or `None` if a higher priority timer is
    /// pending and was left untouched.
    pub(crate) fn arm_reorder(
        &mut self, delay: Duration, rto: Duration, now: Instant,
    ) -> Option<Duration> {
        if self.kind() > Some(TimerKind::ReorderTimeout) {
            return None;
        }

        let delay = cmp::min(delay + REORDER_TIMEOUT_MIN, rto);

        self.armed = Some((TimerKind::ReorderTimeout, now + delay));

        Some(delay)
    }

    pub(crate) fn arm_retransmission(
        &mut self, rto: Duration, now: Instant,
    ) -> Option<Duration> {
        if self.kind() > Some(TimerKind::Retransmission) {
            return None;
        }

        self.armed = Some((TimerKind::Retransmission, now + rto));

        Some(rto)
    }

    pub(crate) fn arm_probe(&mut self, delay: Duration, now: Instant) {
        self.armed = Some((TimerKind::Probe, now + delay));
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = None;
    }

    /// Disarms and returns the timer kind if it expired at `now`.
    pub(crate) fn take_expired(&mut self, now: Instant) -> Option<TimerKind> {
        match self.armed {
            Some((kind, deadline)) if deadline <= now => {
                self.armed = None;

                Some(kind)
            },

            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> Option<TimerKind> {
        self.armed.map(|(kind, _)| kind)
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(_, deadline)| deadline)
    }
}

impl std::fmt::Debug for RecoveryTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.armed {
            Some((kind, v)) => {
                let now = Instant::now();

                if v > now {
                    let d = v.duration_since(now);
                    write!(f, "timer={kind:?}:{d:?} ")
                } else {
                    write!(f, "timer={kind:?}:exp ")
                }
            },

            None => write!(f, "timer=none "),
        }
    }
}

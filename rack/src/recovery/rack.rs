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

use std::time::Duration;
use std::time::Instant;

/// Outcome of [`RackState::advance()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The reference moved to the delivered segment.
    Accepted,

    /// The segment was not sent after the current reference.
    NotLater,

    /// The segment was retransmitted and delivered less than a min RTT after
    /// its last transmission, so the delivery may belong to an earlier one.
    Ambiguous,
}

/// Per-connection RACK state.
///
/// Tracks the most recently sent segment known to be delivered. Segments sent
/// before it that are still outstanding become loss candidates.
#[derive(Debug, Default)]
pub struct RackState {
    /// Transmit time of the most recently sent delivered segment.
    reference_time: Option<Instant>,

    /// End sequence of that segment.
    reference_end_seq: u64,

    /// RTT of that segment, from its transmission to the acknowledgment.
    rtt: Duration,

    /// Sticky: out-of-order delivery was seen on this connection.
    reordering_observed: bool,

    /// The reference moved since the last scan.
    needs_rescan: bool,
}

impl RackState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a newly delivered segment ("Step 3: Advance RACK.xmit_time and
    /// update RACK.RTT").
    ///
    /// Returns whether the reference moved forward, and if not, why. Samples
    /// from segments sent no later than the current reference are ignored. A
    /// segment that was retransmitted is ambiguous, since the delivery may
    /// belong to any of its transmissions, so it is only trusted once at least
    /// `min_rtt` went by since the last transmission. Without a min RTT
    /// estimate such samples are never trusted.
    pub fn advance(
        &mut self, retransmitted: bool, end_seq: u64, time_sent: Instant,
        min_rtt: Option<Duration>, now: Instant,
    ) -> AdvanceOutcome {
        if let Some(reference_time) = self.reference_time {
            if time_sent <= reference_time {
                return AdvanceOutcome::NotLater;
            }
        }

        let rtt = now.saturating_duration_since(time_sent);

        if retransmitted {
            match min_rtt {
                Some(min_rtt) if rtt >= min_rtt => (),

                _ => return AdvanceOutcome::Ambiguous,
            }
        }

        self.reference_time = Some(time_sent);
        self.reference_end_seq = end_seq;
        self.rtt = rtt;
        self.needs_rescan = true;

        AdvanceOutcome::Accepted
    }

    /// Consumes the pending rescan, returning whether there was one.
    pub fn take_rescan(&mut self) -> bool {
        std::mem::take(&mut self.needs_rescan)
    }

    pub fn set_reordering_observed(&mut self) {
        self.reordering_observed = true;
    }

    pub fn reordering_observed(&self) -> bool {
        self.reordering_observed
    }

    pub fn needs_rescan(&self) -> bool {
        self.needs_rescan
    }

    pub fn reference_time(&self) -> Option<Instant> {
        self.reference_time
    }

    pub fn reference_end_seq(&self) -> u64 {
        self.reference_end_seq
    }

    pub fn rtt(&self) -> Duration {
        self.rtt
    }

    /// Forgets everything, including the reordering history. Only meant for a
    /// connection level reset.
    pub fn reset(&mut self) {
        *self = RackState::default();
    }
}

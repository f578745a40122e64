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
use std::ops::Range;
use std::time::Duration;
use std::time::Instant;

use crate::segment::SegmentQueue;

use super::rack::RackState;
use super::RecoveryMode;
use super::REORDER_WINDOW_FLOOR;

/// Outcome of a loss detection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LossDetection {
    /// Packets whose outstanding retransmission was declared lost.
    pub lost_retransmissions: usize,

    /// Segments newly marked as lost.
    pub newly_lost: usize,

    /// Time after which the remaining candidates must be checked again.
    pub rescan_delay: Option<Duration>,
}

impl LossDetection {
    pub fn has_loss(&self) -> bool {
        self.newly_lost > 0 || self.lost_retransmissions > 0
    }
}

/// Returns the reordering settling window.
///
/// Reordering is usually a path property, so the window scales with the
/// minimum RTT rather than the smoothed one, which also depends on queueing
/// and delayed ACKs. It stays at the floor until reordering was actually seen.
pub fn reorder_window(
    mode: RecoveryMode, rack: &RackState, min_rtt: Option<Duration>,
) -> Duration {
    match (mode, min_rtt) {
        (RecoveryMode::EnabledAdaptiveWindow, Some(min_rtt))
            if rack.reordering_observed() =>
            cmp::max(min_rtt / 4, REORDER_WINDOW_FLOOR),

        _ => REORDER_WINDOW_FLOOR,
    }
}

/// Marks outstanding segments sent before the RACK reference as lost once
/// they fall out of the settling window.
///
/// The ranges of newly lost segments are appended to `lost`.
pub fn detect_loss(
    queue: &mut SegmentQueue, rack: &RackState, reo_wnd: Duration,
    now: Instant, lost: &mut Vec<Range<u64>>, trace_id: &str,
) -> LossDetection {
    let mut res = LossDetection::default();

    let reference_time = match rack.reference_time() {
        Some(v) => v,

        None => return res,
    };

    let (segments, counters) = queue.segments_mut();

    for seg in segments.iter_mut() {
        // Skip ones already delivered.
        if seg.range.end <= counters.snd_una || seg.is_delivered() {
            continue;
        }

        if seg.time_sent < reference_time {
            // Time since the segment was sent, minus the RTT of the reference.
            // When the acknowledgment just arrived this is the transmit time
            // delta to the reference, afterwards it keeps growing.
            let elapsed = now
                .saturating_duration_since(seg.time_sent)
                .saturating_sub(rack.rtt());

            if elapsed <= reo_wnd {
                let remaining = reo_wnd - elapsed;

                res.rescan_delay = Some(match res.rescan_delay {
                    Some(delay) => cmp::min(delay, remaining),

                    None => remaining,
                });

                continue;
            }

            if !seg.lost {
                seg.lost = true;
                *counters.lost_out += seg.packet_count;

                res.newly_lost += 1;
                lost.push(seg.range.clone());

                trace!("{} segment {:?} lost", trace_id, seg.range);
            }

            if seg.retransmitted {
                seg.retransmitted = false;
                *counters.retrans_out -= seg.packet_count;

                res.lost_retransmissions += seg.packet_count;

                trace!(
                    "{} retransmission of {:?} lost",
                    trace_id,
                    seg.range
                );
            }
        } else if !seg.is_retransmission() {
            // Original data is sent in order, the rest was sent after the
            // reference too.
            break;
        }
    }

    res
}

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

use std::collections::VecDeque;
use std::ops::Range;
use std::time::Instant;

use crate::Error;
use crate::Result;

/// An outstanding segment.
#[derive(Clone)]
pub struct Segment {
    /// Sequence range covered by the segment.
    pub range: Range<u64>,

    /// Time of the most recent (re)transmission.
    pub time_sent: Instant,

    /// Number of original packets represented by the segment.
    pub packet_count: usize,

    pub acked: bool,

    pub sacked: bool,

    /// A retransmission of this segment is currently in flight.
    pub retransmitted: bool,

    /// The segment was retransmitted at least once.
    pub ever_retransmitted: bool,

    pub lost: bool,
}

impl Segment {
    pub fn new(range: Range<u64>, packet_count: usize, now: Instant) -> Self {
        Segment {
            range,
            time_sent: now,
            packet_count,
            acked: false,
            sacked: false,
            retransmitted: false,
            ever_retransmitted: false,
            lost: false,
        }
    }

    /// Whether the segment content was ever sent more than once, which makes
    /// its acknowledgment ambiguous.
    pub fn is_retransmission(&self) -> bool {
        self.retransmitted || self.ever_retransmitted
    }

    pub fn is_delivered(&self) -> bool {
        self.acked || self.sacked
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "seq={:?} ", self.range)?;
        write!(f, "sent={:?} ", self.time_sent)?;
        write!(f, "pcount={} ", self.packet_count)?;
        write!(f, "acked={} ", self.acked)?;
        write!(f, "sacked={} ", self.sacked)?;
        write!(f, "retrans={} ", self.retransmitted)?;
        write!(f, "ever_retrans={} ", self.ever_retransmitted)?;
        write!(f, "lost={}", self.lost)?;

        Ok(())
    }
}

/// Newly delivered segment, as reported by [`SegmentQueue::on_ack`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivered {
    pub end_seq: u64,

    pub time_sent: Instant,

    pub retransmitted: bool,
}

/// Ordered queue of sent but not yet cumulatively acknowledged segments.
///
/// Segments are kept in sending order of their original transmission, which
/// is also sequence order.
#[derive(Debug, Default)]
pub struct SegmentQueue {
    segments: VecDeque<Segment>,

    /// Cumulative acknowledgment point.
    snd_una: u64,

    /// Next sequence number to be sent.
    snd_nxt: u64,

    /// Highest end sequence delivered by a selective acknowledgment.
    highest_sacked: Option<u64>,

    retrans_out: usize,

    lost_out: usize,

    sacked_out: usize,
}

impl SegmentQueue {
    pub fn new(initial_seq: u64) -> Self {
        SegmentQueue {
            snd_una: initial_seq,
            snd_nxt: initial_seq,
            ..Default::default()
        }
    }

    pub fn push(
        &mut self, range: Range<u64>, packet_count: usize, now: Instant,
    ) -> Result<()> {
        if range.is_empty() || range.start != self.snd_nxt {
            return Err(Error::InvalidSegment);
        }

        self.snd_nxt = range.end;
        self.segments.push_back(Segment::new(range, packet_count, now));

        Ok(())
    }

    /// Records a retransmission of the segment starting at `start`.
    pub fn retransmit(&mut self, start: u64, now: Instant) -> Result<&Segment> {
        let idx = self
            .segments
            .binary_search_by_key(&start, |s| s.range.start)
            .map_err(|_| Error::UnknownSegment(start))?;

        let seg = &mut self.segments[idx];

        if seg.is_delivered() {
            return Err(Error::UnknownSegment(start));
        }

        if !seg.retransmitted {
            self.retrans_out += seg.packet_count;
        }

        seg.time_sent = now;
        seg.retransmitted = true;
        seg.ever_retransmitted = true;

        Ok(&*seg)
    }

    /// Applies an acknowledgment: everything below `cumulative` is acked and
    /// each range in `sacked` is selectively acked.
    ///
    /// Segments are only considered selectively acked when fully covered by a
    /// range. Newly delivered segments are appended to `delivered` in queue
    /// order. Returns whether any newly sacked segment was delivered out of
    /// order, i.e. below a previously sacked one without having been
    /// retransmitted, whether it was sacked or cumulatively acked.
    pub fn on_ack(
        &mut self, cumulative: u64, sacked: &[Range<u64>],
        delivered: &mut Vec<Delivered>,
    ) -> Result<bool> {
        if cumulative > self.snd_nxt || sacked.iter().any(|r| r.end > self.snd_nxt)
        {
            return Err(Error::InvalidAckRange);
        }

        delivered.clear();

        let snd_una = self.snd_una.max(cumulative);
        let mut reordered = false;

        for seg in self.segments.iter_mut() {
            if seg.is_delivered() {
                continue;
            }

            let cum_acked = seg.range.end <= snd_una;

            let newly_sacked = !cum_acked &&
                sacked.iter().any(|r| {
                    r.start <= seg.range.start && seg.range.end <= r.end
                });

            if !cum_acked && !newly_sacked {
                continue;
            }

            // Original data delivered below a previously sacked segment, either
            // selectively or by filling the hole at the cumulative point.
            if !seg.is_retransmission() &&
                matches!(self.highest_sacked, Some(h) if seg.range.end <= h)
            {
                reordered = true;
            }

            if newly_sacked {
                if !matches!(self.highest_sacked, Some(h) if h >= seg.range.end)
                {
                    self.highest_sacked = Some(seg.range.end);
                }

                seg.sacked = true;
                self.sacked_out += seg.packet_count;
            } else {
                seg.acked = true;
            }

            if seg.lost {
                seg.lost = false;
                self.lost_out -= seg.packet_count;
            }

            if seg.retransmitted {
                seg.retransmitted = false;
                self.retrans_out -= seg.packet_count;
            }

            delivered.push(Delivered {
                end_seq: seg.range.end,
                time_sent: seg.time_sent,
                retransmitted: seg.ever_retransmitted,
            });
        }

        self.snd_una = snd_una;

        // Drop everything below the cumulative acknowledgment point.
        while let Some(seg) = self.segments.front() {
            if seg.range.end > self.snd_una {
                break;
            }

            if seg.sacked {
                self.sacked_out -= seg.packet_count;
            }

            self.segments.pop_front();
        }

        Ok(reordered)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Returns the sequence ranges of lost segments awaiting retransmission.
    pub fn lost_ranges(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.segments
            .iter()
            .filter(|s| s.lost && !s.retransmitted)
            .map(|s| s.range.clone())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn snd_una(&self) -> u64 {
        self.snd_una
    }

    pub fn snd_nxt(&self) -> u64 {
        self.snd_nxt
    }

    pub fn retrans_out(&self) -> usize {
        self.retrans_out
    }

    pub fn lost_out(&self) -> usize {
        self.lost_out
    }

    pub fn sacked_out(&self) -> usize {
        self.sacked_out
    }

    /// Mutable access for the loss detector, which only flips flags.
    pub(crate) fn segments_mut(
        &mut self,
    ) -> (&mut VecDeque<Segment>, SegmentCounters<'_>) {
        (
            &mut self.segments,
            SegmentCounters {
                snd_una: self.snd_una,
                retrans_out: &mut self.retrans_out,
                lost_out: &mut self.lost_out,
            },
        )
    }
}

/// Counters the loss detector keeps in sync while flagging segments.
pub(crate) struct SegmentCounters<'a> {
    pub(crate) snd_una: u64,

    pub(crate) retrans_out: &'a mut usize,

    pub(crate) lost_out: &'a mut usize,
}

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

use std::collections::VecDeque;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use smallvec::SmallVec;

use crate::segment::Delivered;
use crate::segment::SegmentQueue;
use crate::Config;
use crate::Result;

mod detect;
mod rack;
mod rtt;
mod timer;

pub use self::detect::LossDetection;
pub use self::rack::AdvanceOutcome;
pub use self::rack::RackState;
pub use self::timer::TimerKind;

use self::rtt::RttStats;
use self::timer::RecoveryTimer;

// Lower bound of the reordering settling window.
const REORDER_WINDOW_FLOOR: Duration = Duration::from_millis(1);

// Added to every reorder timeout so the timer never fires too eagerly.
const REORDER_TIMEOUT_MIN: Duration = Duration::from_millis(2);

const GRANULARITY: Duration = Duration::from_millis(1);

/// RACK loss detection modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub enum RecoveryMode {
    /// RACK never runs. `disabled` in a string form.
    Disabled              = 0,
    /// The settling window stays at its floor regardless of the RTT.
    /// `enabled-static-window` in a string form.
    EnabledStaticWindow   = 1,
    /// The settling window scales with the minimum RTT once reordering was
    /// observed (default). `enabled-adaptive-window` in a string form.
    #[default]
    EnabledAdaptiveWindow = 2,
}

impl RecoveryMode {
    pub fn is_enabled(self) -> bool {
        self != RecoveryMode::Disabled
    }
}

impl FromStr for RecoveryMode {
    type Err = crate::Error;

    /// Converts a string to `RecoveryMode`.
    ///
    /// If `name` is not valid, `Error::InvalidRecoveryMode` is returned.
    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "disabled" => Ok(RecoveryMode::Disabled),
            "enabled-static-window" => Ok(RecoveryMode::EnabledStaticWindow),
            "enabled-adaptive-window" => Ok(RecoveryMode::EnabledAdaptiveWindow),

            _ => Err(crate::Error::InvalidRecoveryMode),
        }
    }
}

/// Congestion state of the sender, as owned by the congestion controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CongestionState {
    /// No loss recovery in progress.
    Open,

    /// Window reduction and retransmission of lost segments in progress.
    Recovery,

    /// Retransmission timeout triggered full reset.
    Loss,
}

impl CongestionState {
    /// Whether the acknowledgment driven RACK scan may run.
    pub fn is_recovery_eligible(self) -> bool {
        self >= CongestionState::Recovery
    }
}

/// Congestion controller hooks used by loss recovery.
///
/// Returning to `Open` once recovery completes is up to the implementation.
pub trait CongestionControl {
    fn state(&self) -> CongestionState;

    /// Requests a transition from `Open` to `Recovery`.
    fn enter_recovery(&mut self, now: Instant);
}

/// Events produced for the transport sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The segment covering the range was presumed lost.
    SegmentLost(Range<u64>),

    /// Loss recovery was entered.
    EnterRecovery,

    /// The ranges should be retransmitted now.
    Retransmit(SmallVec<[Range<u64>; 4]>),

    /// The timer was (re)armed to fire after the delay.
    RearmTimer { kind: TimerKind, delay: Duration },

    /// A timer owned by the sender expired.
    TimerExpired(TimerKind),
}

/// Loss recovery statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// The number of segments presumed lost.
    pub lost: usize,

    /// The number of retransmitted packets that were presumed lost again.
    pub lost_retrans: usize,

    /// The number of segments retransmitted.
    pub retransmitted: usize,

    /// The number of reorder timeouts that fired.
    pub reorder_timeouts: usize,

    /// The number of ambiguous RACK samples that were ignored.
    pub ignored_rack_samples: usize,
}

/// Decoded acknowledgment information.
#[derive(Clone, Debug, Default)]
pub struct Ack {
    /// Everything below this sequence number was received.
    pub cumulative: u64,

    /// Selectively acknowledged ranges above the cumulative point.
    pub sacked: Vec<Range<u64>>,

    /// RTT sample for the minimum RTT estimator, if one was taken.
    pub rtt_sample: Option<Duration>,

    /// Delay reported by the receiver.
    pub ack_delay: Duration,
}

/// Per-connection RACK loss recovery.
pub struct Recovery {
    mode: RecoveryMode,

    rack: RackState,

    rtt_stats: RttStats,

    segments: SegmentQueue,

    timer: RecoveryTimer,

    stats: Stats,

    events: VecDeque<Event>,

    trace_id: String,

    // Reusable buffers.
    delivered: Vec<Delivered>,
    lost: Vec<Range<u64>>,
}

impl Recovery {
    pub fn new(config: &Config, initial_seq: u64, trace_id: &str) -> Self {
        Recovery {
            mode: config.recovery_mode,

            rack: RackState::new(),

            rtt_stats: RttStats::new(config.max_ack_delay),

            segments: SegmentQueue::new(initial_seq),

            timer: RecoveryTimer::default(),

            stats: Stats::default(),

            events: VecDeque::new(),

            trace_id: trace_id.to_string(),

            delivered: Vec::new(),

            lost: Vec::new(),
        }
    }

    /// Records a newly transmitted segment.
    pub fn on_segment_sent(
        &mut self, range: Range<u64>, packet_count: usize, now: Instant,
    ) -> Result<()> {
        self.segments.push(range, packet_count, now)?;

        if self.timer.kind().is_none() {
            self.arm_retransmission_timer(now);
        }

        trace!("{} {:?}", self.trace_id, self);

        Ok(())
    }

    /// Records the retransmission of the segment starting at `start`.
    pub fn on_segment_retransmitted(
        &mut self, start: u64, now: Instant,
    ) -> Result<()> {
        let seg = self.segments.retransmit(start, now)?;

        trace!("{} segment {:?} retransmitted", self.trace_id, seg.range);

        self.stats.retransmitted += 1;

        Ok(())
    }

    /// Processes an acknowledgment.
    ///
    /// Advances the RACK reference for every newly delivered segment and then
    /// runs loss detection, which only happens while in loss recovery.
    pub fn on_ack_received(
        &mut self, ack: &Ack, cc: &mut impl CongestionControl, now: Instant,
    ) -> Result<LossDetection> {
        let prior_snd_una = self.segments.snd_una();

        let reordered =
            self.segments
                .on_ack(ack.cumulative, &ack.sacked, &mut self.delivered)?;

        if let Some(rtt) = ack.rtt_sample {
            self.rtt_stats.update_rtt(rtt, ack.ack_delay, now);
        }

        if !self.mode.is_enabled() {
            self.update_timer_on_ack(prior_snd_una, None, now);

            return Ok(LossDetection::default());
        }

        if reordered && !self.rack.reordering_observed() {
            debug!("{} reordering observed", self.trace_id);

            self.rack.set_reordering_observed();
        }

        let min_rtt = self.rtt_stats.min_rtt();

        for d in &self.delivered {
            let outcome = self.rack.advance(
                d.retransmitted,
                d.end_seq,
                d.time_sent,
                min_rtt,
                now,
            );

            if outcome == AdvanceOutcome::Ambiguous {
                trace!(
                    "{} ambiguous sample for {} ignored",
                    self.trace_id,
                    d.end_seq
                );

                self.stats.ignored_rack_samples += 1;
            }
        }

        let loss = self.mark_lost(&*cc, now);

        self.on_loss_detected(&loss, cc, now);

        self.update_timer_on_ack(prior_snd_una, loss.rescan_delay, now);

        trace!("{} {:?}", self.trace_id, self);

        Ok(loss)
    }

    /// Handles expiry of the recovery timer.
    ///
    /// A reorder timeout runs loss detection again without any new
    /// acknowledgment. Other timers are reported as `Event::TimerExpired`.
    /// Returns `None` if no timer expired.
    pub fn on_timeout(
        &mut self, cc: &mut impl CongestionControl, now: Instant,
    ) -> Option<LossDetection> {
        let kind = self.timer.take_expired(now)?;

        if kind != TimerKind::ReorderTimeout {
            self.events.push_back(Event::TimerExpired(kind));

            return None;
        }

        self.stats.reorder_timeouts += 1;

        let loss = self.detect_loss(now);

        debug!("{} reorder timeout {:?}", self.trace_id, loss);

        self.on_loss_detected(&loss, cc, now);

        match loss.rescan_delay {
            Some(delay) => self.arm_reorder_timer(delay, now),

            None if !self.segments.is_empty() =>
                self.arm_retransmission_timer(now),

            None => (),
        }

        Some(loss)
    }

    /// Arms the zero window probe timer, which takes precedence over the
    /// other recovery timers.
    pub fn arm_probe_timer(&mut self, delay: Duration, now: Instant) {
        self.timer.arm_probe(delay, now);

        self.events.push_back(Event::RearmTimer {
            kind: TimerKind::Probe,
            delay,
        });
    }

    /// Returns the time the recovery timer fires at, if armed.
    pub fn timeout(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn timer_kind(&self) -> Option<TimerKind> {
        self.timer.kind()
    }

    /// Returns the next pending event, if any.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn stats(&self) -> Stats {
        self.stats.clone()
    }

    /// Records out-of-order delivery detected elsewhere, e.g. from DSACKs.
    pub fn set_reordering_observed(&mut self) {
        self.rack.set_reordering_observed();
    }

    pub fn reordering_observed(&self) -> bool {
        self.rack.reordering_observed()
    }

    pub fn rack(&self) -> &RackState {
        &self.rack
    }

    pub fn segments(&self) -> &SegmentQueue {
        &self.segments
    }

    /// Returns the current settling window.
    pub fn reorder_window(&self) -> Duration {
        detect::reorder_window(self.mode, &self.rack, self.rtt_stats.min_rtt())
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.rtt_stats.min_rtt()
    }

    pub fn rtt(&self) -> Duration {
        self.rtt_stats.rtt()
    }

    pub fn rto(&self) -> Duration {
        self.rtt_stats.rto()
    }

    pub fn retrans_out(&self) -> usize {
        self.segments.retrans_out()
    }

    pub fn lost_out(&self) -> usize {
        self.segments.lost_out()
    }

    pub fn outstanding(&self) -> usize {
        self.segments.len()
    }

    /// Connection level reset: forgets the RACK and RTT state and disarms the
    /// timer. Outstanding segments are kept.
    pub fn reset(&mut self) {
        debug!("{} recovery reset", self.trace_id);

        self.rack.reset();
        self.rtt_stats.reset();
        self.timer.disarm();
        self.events.clear();
    }

    fn mark_lost(
        &mut self, cc: &impl CongestionControl, now: Instant,
    ) -> LossDetection {
        if !cc.state().is_recovery_eligible() {
            return LossDetection::default();
        }

        // Reset the flag first, so that nothing is rescanned if no further
        // acknowledgment arrives.
        if !self.rack.take_rescan() {
            return LossDetection::default();
        }

        self.detect_loss(now)
    }

    fn detect_loss(&mut self, now: Instant) -> LossDetection {
        if !self.mode.is_enabled() {
            return LossDetection::default();
        }

        let reo_wnd = self.reorder_window();

        self.lost.clear();

        let loss = detect::detect_loss(
            &mut self.segments,
            &self.rack,
            reo_wnd,
            now,
            &mut self.lost,
            &self.trace_id,
        );

        self.stats.lost += loss.newly_lost;
        self.stats.lost_retrans += loss.lost_retransmissions;

        self.events
            .extend(self.lost.drain(..).map(Event::SegmentLost));

        loss
    }

    fn on_loss_detected(
        &mut self, loss: &LossDetection, cc: &mut impl CongestionControl,
        now: Instant,
    ) {
        if !loss.has_loss() {
            return;
        }

        if cc.state() == CongestionState::Open {
            debug!("{} entering recovery", self.trace_id);

            cc.enter_recovery(now);

            self.events.push_back(Event::EnterRecovery);
        }

        let ranges: SmallVec<[Range<u64>; 4]> =
            self.segments.lost_ranges().collect();

        if !ranges.is_empty() {
            self.events.push_back(Event::Retransmit(ranges));
        }
    }

    fn update_timer_on_ack(
        &mut self, prior_snd_una: u64, rescan_delay: Option<Duration>,
        now: Instant,
    ) {
        if self.segments.is_empty() {
            if self.timer.kind() != Some(TimerKind::Probe) {
                self.timer.disarm();
            }

            return;
        }

        if let Some(delay) = rescan_delay {
            self.arm_reorder_timer(delay, now);
            return;
        }

        // Restart the retransmission timer when new data was acknowledged.
        if self.segments.snd_una() > prior_snd_una ||
            self.timer.kind().is_none()
        {
            self.arm_retransmission_timer(now);
        }
    }

    fn arm_reorder_timer(&mut self, delay: Duration, now: Instant) {
        let rto = self.rtt_stats.rto();

        if let Some(delay) = self.timer.arm_reorder(delay, rto, now) {
            trace!("{} reorder timer armed in {:?}", self.trace_id, delay);

            self.events.push_back(Event::RearmTimer {
                kind: TimerKind::ReorderTimeout,
                delay,
            });
        }
    }

    fn arm_retransmission_timer(&mut self, now: Instant) {
        let rto = self.rtt_stats.rto();

        if let Some(delay) = self.timer.arm_retransmission(rto, now) {
            self.events.push_back(Event::RearmTimer {
                kind: TimerKind::Retransmission,
                delay,
            });
        }
    }
}

impl std::fmt::Debug for Recovery {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self.timer)?;
        write!(f, "{:?} ", self.rtt_stats)?;
        write!(f, "rack_time={:?} ", self.rack.reference_time())?;
        write!(f, "rack_end_seq={} ", self.rack.reference_end_seq())?;
        write!(f, "rack_rtt={:?} ", self.rack.rtt())?;
        write!(f, "reord={} ", self.rack.reordering_observed())?;
        write!(f, "snd_una={} ", self.segments.snd_una())?;
        write!(f, "snd_nxt={} ", self.segments.snd_nxt())?;
        write!(f, "outstanding={} ", self.segments.len())?;
        write!(f, "sacked_out={} ", self.segments.sacked_out())?;
        write!(f, "lost_out={} ", self.segments.lost_out())?;
        write!(f, "retrans_out={}", self.segments.retrans_out())?;

        Ok(())
    }
}

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

use super::*;

use std::ops::Range;
use std::time::Instant;

use rstest::rstest;

const MS: Duration = Duration::from_millis(1);

const SEGMENT_SIZE: u64 = 1000;

struct TestController {
    state: CongestionState,

    recovery_entries: usize,
}

impl TestController {
    fn new(state: CongestionState) -> Self {
        TestController {
            state,
            recovery_entries: 0,
        }
    }
}

impl CongestionControl for TestController {
    fn state(&self) -> CongestionState {
        self.state
    }

    fn enter_recovery(&mut self, _now: Instant) {
        self.state = CongestionState::Recovery;
        self.recovery_entries += 1;
    }
}

fn new_recovery(mode: RecoveryMode) -> Recovery {
    let mut config = Config::new();
    config.set_recovery_mode(mode);

    Recovery::new(&config, 0, "")
}

fn seg(i: u64) -> Range<u64> {
    i * SEGMENT_SIZE..(i + 1) * SEGMENT_SIZE
}

/// Sends one segment per transmit offset (in milliseconds from `t0`).
fn send_at(r: &mut Recovery, t0: Instant, offsets: &[u32]) {
    let first = r.segments().snd_nxt() / SEGMENT_SIZE;

    for (i, off) in offsets.iter().enumerate() {
        r.on_segment_sent(seg(first + i as u64), 1, t0 + *off * MS)
            .unwrap();
    }
}

fn sack(ranges: &[Range<u64>]) -> Ack {
    Ack {
        sacked: ranges.to_vec(),
        ..Default::default()
    }
}

fn drain_events(r: &mut Recovery) -> Vec<Event> {
    std::iter::from_fn(|| r.poll_event()).collect()
}

fn lost_flags(r: &Recovery) -> Vec<bool> {
    r.segments().iter().map(|s| s.lost).collect()
}

#[test]
fn recovery_mode_names() {
    assert_eq!(
        RecoveryMode::from_str("disabled"),
        Ok(RecoveryMode::Disabled)
    );
    assert_eq!(
        RecoveryMode::from_str("enabled-static-window"),
        Ok(RecoveryMode::EnabledStaticWindow)
    );
    assert_eq!(
        RecoveryMode::from_str("enabled-adaptive-window"),
        Ok(RecoveryMode::EnabledAdaptiveWindow)
    );
}

#[test]
fn recovery_mode_bad_name() {
    let mut config = Config::new();

    assert_eq!(
        config.set_recovery_mode_name("???"),
        Err(Error::InvalidRecoveryMode)
    );
    assert_eq!(config.recovery_mode(), RecoveryMode::EnabledAdaptiveWindow);
}

#[test]
fn loss_with_unknown_min_rtt() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20]);
    drain_events(&mut r);

    let loss = r
        .on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();

    assert_eq!(r.min_rtt(), None);
    assert_eq!(r.reorder_window(), MS);

    assert_eq!(loss.newly_lost, 2);
    assert_eq!(loss.lost_retransmissions, 0);
    assert_eq!(loss.rescan_delay, None);
    assert_eq!(lost_flags(&r), vec![true, true, false]);
    assert_eq!(r.lost_out(), 2);
    assert_eq!(r.stats().lost, 2);

    // Already in recovery, so only a retransmission is requested.
    assert_eq!(cc.recovery_entries, 0);
    assert_eq!(drain_events(&mut r), vec![
        Event::SegmentLost(seg(0)),
        Event::SegmentLost(seg(1)),
        Event::Retransmit(smallvec::smallvec![seg(0), seg(1)]),
    ]);
}

#[test]
fn deferred_loss_with_adaptive_window() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    r.set_reordering_observed();

    send_at(&mut r, t0, &[0, 10, 19, 20]);
    drain_events(&mut r);

    let ack = Ack {
        sacked: vec![seg(3)],
        rtt_sample: Some(8 * MS),
        ..Default::default()
    };

    let now = t0 + 20 * MS;
    let loss = r.on_ack_received(&ack, &mut cc, now).unwrap();

    assert_eq!(r.min_rtt(), Some(8 * MS));
    assert_eq!(r.reorder_window(), 2 * MS);

    // The segment sent 1ms before the reference is still in the window.
    assert_eq!(loss.newly_lost, 2);
    assert_eq!(loss.rescan_delay, Some(MS));
    assert_eq!(lost_flags(&r), vec![true, true, false, false]);

    assert_eq!(r.timer_kind(), Some(TimerKind::ReorderTimeout));
    assert_eq!(r.timeout(), Some(now + 3 * MS));

    assert_eq!(drain_events(&mut r), vec![
        Event::SegmentLost(seg(0)),
        Event::SegmentLost(seg(1)),
        Event::Retransmit(smallvec::smallvec![seg(0), seg(1)]),
        Event::RearmTimer {
            kind: TimerKind::ReorderTimeout,
            delay: 3 * MS,
        },
    ]);

    // Firing early does nothing.
    assert_eq!(r.on_timeout(&mut cc, now + MS), None);

    let now = r.timeout().unwrap();
    let loss = r.on_timeout(&mut cc, now).unwrap();

    assert_eq!(loss.newly_lost, 1);
    assert_eq!(loss.rescan_delay, None);
    assert_eq!(lost_flags(&r), vec![true, true, true, false]);
    assert_eq!(r.stats().reorder_timeouts, 1);

    // Data is still outstanding, so the retransmission timer takes over.
    assert_eq!(r.timer_kind(), Some(TimerKind::Retransmission));
    assert_eq!(r.timeout(), Some(now + r.rto()));

    assert_eq!(drain_events(&mut r), vec![
        Event::SegmentLost(seg(2)),
        Event::Retransmit(smallvec::smallvec![seg(0), seg(1), seg(2)]),
        Event::RearmTimer {
            kind: TimerKind::Retransmission,
            delay: r.rto(),
        },
    ]);
}

#[test]
fn ambiguous_retransmission_sample() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 0]);

    let ack = Ack {
        cumulative: SEGMENT_SIZE,
        rtt_sample: Some(10 * MS),
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 10 * MS).unwrap();

    assert_eq!(r.min_rtt(), Some(10 * MS));
    assert_eq!(r.rack().reference_time(), Some(t0));
    assert_eq!(r.rack().reference_end_seq(), SEGMENT_SIZE);

    // The retransmission is acked 2ms after being sent, with a 10ms min RTT.
    r.on_segment_retransmitted(SEGMENT_SIZE, t0 + 30 * MS).unwrap();

    let ack = Ack {
        cumulative: 2 * SEGMENT_SIZE,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 32 * MS).unwrap();

    assert_eq!(r.rack().reference_time(), Some(t0));
    assert_eq!(r.rack().reference_end_seq(), SEGMENT_SIZE);
    assert_eq!(r.rack().rtt(), 10 * MS);
    assert_eq!(r.stats().ignored_rack_samples, 1);
    assert_eq!(r.retrans_out(), 0);
}

#[test]
fn retransmission_after_reference_does_not_stop_scan() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20, 30]);

    // Retransmitted after the segment that ends up being the reference.
    r.on_segment_retransmitted(seg(0).start, t0 + 32 * MS).unwrap();

    let loss = r
        .on_ack_received(&sack(&[seg(3)]), &mut cc, t0 + 40 * MS)
        .unwrap();

    assert_eq!(r.rack().reference_time(), Some(t0 + 30 * MS));
    assert_eq!(loss.newly_lost, 2);
    assert_eq!(loss.lost_retransmissions, 0);
    assert_eq!(lost_flags(&r), vec![false, true, true, false]);
    assert_eq!(r.retrans_out(), 1);
}

#[test]
fn scan_stops_early() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20, 30]);
    r.on_segment_retransmitted(seg(3).start, t0 + 5 * MS).unwrap();

    // The retransmitted segment 3 (sent at 5ms) is old enough to be trusted.
    let ack = Ack {
        sacked: vec![seg(3)],
        rtt_sample: Some(MS),
        ..Default::default()
    };

    let loss = r.on_ack_received(&ack, &mut cc, t0 + 40 * MS).unwrap();

    // Segment 1 is an original sent after the reference, so segment 2 is
    // never looked at even though nothing was delivered after it either.
    assert_eq!(r.rack().reference_time(), Some(t0 + 5 * MS));
    assert_eq!(loss.newly_lost, 1);
    assert_eq!(lost_flags(&r), vec![true, false, false, false]);
}

#[test]
fn open_state_is_inert() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Open);

    send_at(&mut r, t0, &[0, 10, 20]);

    let loss = r
        .on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();

    assert_eq!(loss, LossDetection::default());
    assert_eq!(lost_flags(&r), vec![false, false, false]);

    // The reference still moved, and is consumed once recovery starts.
    assert_eq!(r.rack().reference_time(), Some(t0 + 20 * MS));
    assert!(r.rack().needs_rescan());

    cc.state = CongestionState::Recovery;

    let loss = r
        .on_ack_received(&Ack::default(), &mut cc, t0 + 22 * MS)
        .unwrap();

    assert_eq!(loss.newly_lost, 2);
    assert!(!r.rack().needs_rescan());
}

#[test]
fn second_scan_finds_nothing() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20, 30]);

    let loss = r
        .on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();
    assert_eq!(loss.newly_lost, 2);

    // Duplicate acknowledgment, nothing new was delivered.
    let loss = r
        .on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();
    assert_eq!(loss, LossDetection::default());
}

#[test]
fn sack_clears_presumed_loss() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20]);

    r.on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();
    assert_eq!(lost_flags(&r), vec![true, true, false]);

    // The "lost" segment 1 shows up after all.
    r.on_ack_received(&sack(&[seg(1), seg(2)]), &mut cc, t0 + 22 * MS)
        .unwrap();

    let s = r.segments().iter().nth(1).unwrap();
    assert!(s.sacked);
    assert!(!s.lost);
    assert_eq!(r.lost_out(), 1);

    // Segment 1 ended below the highest sacked sequence without being
    // retransmitted.
    assert!(r.reordering_observed());

    let ack = Ack {
        cumulative: seg(2).end,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 23 * MS).unwrap();
    assert_eq!(r.lost_out(), 0);
    assert_eq!(r.outstanding(), 0);
    assert_eq!(r.timeout(), None);
}

#[test]
fn lost_retransmissions_are_accounted() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 1, 2, 5]);

    let ack = Ack {
        sacked: vec![seg(3)],
        rtt_sample: Some(5 * MS),
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 10 * MS).unwrap();
    assert_eq!(r.lost_out(), 3);

    for i in 0..3 {
        r.on_segment_retransmitted(seg(i).start, t0 + 11 * MS).unwrap();
    }

    assert_eq!(r.retrans_out(), 3);
    assert_eq!(r.stats().retransmitted, 3);

    // New data sent after the retransmissions is delivered first.
    send_at(&mut r, t0, &[20]);

    let prior_retrans_out = r.retrans_out();

    let loss = r
        .on_ack_received(&sack(&[seg(3), seg(4)]), &mut cc, t0 + 30 * MS)
        .unwrap();

    assert_eq!(loss.lost_retransmissions, 3);
    assert_eq!(loss.newly_lost, 0);
    assert_eq!(r.retrans_out(), prior_retrans_out - loss.lost_retransmissions);
    assert_eq!(r.stats().lost_retrans, 3);

    // The lost retransmissions are requested again.
    let events = drain_events(&mut r);
    assert!(events.contains(&Event::Retransmit(smallvec::smallvec![
        seg(0),
        seg(1),
        seg(2)
    ])));
}

#[test]
fn reorder_timeout_enters_recovery() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 20]);

    // Segment 0 was sent 0.5ms before the reference.
    r.on_segment_retransmitted(seg(0).start, t0 + 19 * MS + MS / 2)
        .unwrap();

    let ack = Ack {
        sacked: vec![seg(1)],
        rtt_sample: Some(MS),
        ..Default::default()
    };

    let now = t0 + 21 * MS;
    let loss = r.on_ack_received(&ack, &mut cc, now).unwrap();

    assert_eq!(loss.newly_lost, 0);
    assert_eq!(loss.rescan_delay, Some(MS / 2));
    assert_eq!(r.timer_kind(), Some(TimerKind::ReorderTimeout));

    // Recovery completed in the meantime.
    cc.state = CongestionState::Open;
    drain_events(&mut r);

    let deadline = r.timeout().unwrap();
    let loss = r.on_timeout(&mut cc, deadline).unwrap();

    assert_eq!(loss.newly_lost, 1);
    assert_eq!(loss.lost_retransmissions, 1);
    assert_eq!(cc.recovery_entries, 1);
    assert_eq!(cc.state, CongestionState::Recovery);

    let events = drain_events(&mut r);
    assert_eq!(events[0], Event::SegmentLost(seg(0)));
    assert_eq!(events[1], Event::EnterRecovery);
    assert_eq!(events[2], Event::Retransmit(smallvec::smallvec![seg(0)]));
}

#[rstest]
#[case(RecoveryMode::EnabledStaticWindow, MS)]
#[case(RecoveryMode::EnabledAdaptiveWindow, 2 * MS)]
fn settling_window_by_mode(
    #[case] mode: RecoveryMode, #[case] window: Duration,
) {
    let t0 = Instant::now();
    let mut r = new_recovery(mode);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0]);

    let ack = Ack {
        cumulative: seg(0).end,
        rtt_sample: Some(8 * MS),
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 8 * MS).unwrap();

    assert_eq!(r.reorder_window(), MS);

    r.set_reordering_observed();
    assert_eq!(r.reorder_window(), window);
}

#[test]
fn disabled_never_detects() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::Disabled);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10, 20]);

    let loss = r
        .on_ack_received(&sack(&[seg(2)]), &mut cc, t0 + 21 * MS)
        .unwrap();

    assert_eq!(loss, LossDetection::default());
    assert_eq!(r.rack().reference_time(), None);
    assert_eq!(lost_flags(&r), vec![false; 3]);
    assert_eq!(r.stats(), Stats::default());
}

#[test]
fn retransmission_timer_expiry_is_reported() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Open);

    send_at(&mut r, t0, &[0]);

    assert_eq!(drain_events(&mut r), vec![Event::RearmTimer {
        kind: TimerKind::Retransmission,
        delay: r.rto(),
    }]);

    let deadline = r.timeout().unwrap();
    assert_eq!(deadline, t0 + r.rto());

    assert_eq!(r.on_timeout(&mut cc, deadline), None);
    assert_eq!(r.timeout(), None);
    assert_eq!(drain_events(&mut r), vec![Event::TimerExpired(
        TimerKind::Retransmission
    )]);
}

#[test]
fn probe_timer_is_not_replaced() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 19, 20]);
    r.arm_probe_timer(Duration::from_secs(1), t0 + 20 * MS);

    let ack = Ack {
        sacked: vec![seg(2)],
        ..Default::default()
    };

    let loss = r.on_ack_received(&ack, &mut cc, t0 + 20 * MS).unwrap();

    assert_eq!(loss.rescan_delay, Some(Duration::ZERO));
    assert_eq!(r.timer_kind(), Some(TimerKind::Probe));
    assert_eq!(r.timeout(), Some(t0 + 20 * MS + Duration::from_secs(1)));
}

#[test]
fn invalid_ack() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0]);

    let ack = Ack {
        cumulative: 2 * SEGMENT_SIZE,
        ..Default::default()
    };

    assert_eq!(
        r.on_ack_received(&ack, &mut cc, t0 + MS),
        Err(Error::InvalidAckRange)
    );
    assert_eq!(r.outstanding(), 1);
}

#[test]
fn reset_forgets_state() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Recovery);

    send_at(&mut r, t0, &[0, 10]);
    r.set_reordering_observed();

    r.on_ack_received(&sack(&[seg(1)]), &mut cc, t0 + 11 * MS)
        .unwrap();
    assert_eq!(r.rack().reference_time(), Some(t0 + 10 * MS));

    r.reset();

    assert_eq!(r.rack().reference_time(), None);
    assert!(!r.reordering_observed());
    assert_eq!(r.timeout(), None);
    assert_eq!(r.outstanding(), 2);
}

#[test]
fn max_ack_delay_limits_rtt_adjustment() {
    let t0 = Instant::now();
    let mut config = Config::new();
    config.set_max_ack_delay(Duration::ZERO);

    let mut r = Recovery::new(&config, 0, "");
    let mut cc = TestController::new(CongestionState::Open);

    send_at(&mut r, t0, &[0, 0]);

    let ack = Ack {
        cumulative: seg(0).end,
        rtt_sample: Some(100 * MS),
        ack_delay: 60 * MS,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 100 * MS).unwrap();

    let ack = Ack {
        cumulative: seg(1).end,
        rtt_sample: Some(200 * MS),
        ack_delay: 60 * MS,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 200 * MS).unwrap();

    // The reported ACK delay is ignored entirely.
    assert_eq!(
        r.rtt(),
        (100 * MS).mul_f64(7.0 / 8.0) + (200 * MS).mul_f64(1.0 / 8.0)
    );
    assert_eq!(r.min_rtt(), Some(100 * MS));
}

#[test]
fn cumulative_fill_widens_window() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Open);

    send_at(&mut r, t0, &[0, 10, 20]);

    let ack = Ack {
        sacked: vec![seg(1)],
        rtt_sample: Some(8 * MS),
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 18 * MS).unwrap();

    assert!(!r.reordering_observed());
    assert_eq!(r.reorder_window(), MS);

    // The original segment 0 arrives late and fills the hole.
    let ack = Ack {
        cumulative: seg(1).end,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 19 * MS).unwrap();

    assert!(r.reordering_observed());
    assert_eq!(r.reorder_window(), 2 * MS);
}

#[test]
fn stale_retransmission_sample_is_not_ambiguous() {
    let t0 = Instant::now();
    let mut r = new_recovery(RecoveryMode::EnabledAdaptiveWindow);
    let mut cc = TestController::new(CongestionState::Open);

    send_at(&mut r, t0, &[0]);
    r.on_segment_retransmitted(seg(0).start, t0 + 8 * MS).unwrap();
    send_at(&mut r, t0, &[10]);

    let ack = Ack {
        sacked: vec![seg(1)],
        rtt_sample: Some(10 * MS),
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 20 * MS).unwrap();
    assert_eq!(r.rack().reference_time(), Some(t0 + 10 * MS));

    // The retransmission was sent before the reference, which rules it out
    // regardless of the min RTT.
    let ack = Ack {
        cumulative: seg(1).end,
        ..Default::default()
    };

    r.on_ack_received(&ack, &mut cc, t0 + 30 * MS).unwrap();

    assert_eq!(r.rack().reference_time(), Some(t0 + 10 * MS));
    assert_eq!(r.stats().ignored_rack_samples, 0);
    assert!(!r.reordering_observed());
}

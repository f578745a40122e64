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

use crate::minmax::WindowedMin;

use super::GRANULARITY;

pub(crate) const INITIAL_RTT: Duration = Duration::from_millis(333);

pub(crate) const MIN_RTT_WINDOW: Duration = Duration::from_secs(300);

pub(crate) const MIN_RTO: Duration = Duration::from_millis(200);

pub(crate) const MAX_RTO: Duration = Duration::from_secs(120);

pub(crate) struct RttStats {
    pub(crate) latest_rtt: Duration,

    pub(crate) smoothed_rtt: Option<Duration>,

    pub(crate) rttvar: Duration,

    pub(crate) max_ack_delay: Duration,

    min_rtt: WindowedMin,
}

impl RttStats {
    pub(crate) fn new(max_ack_delay: Duration) -> Self {
        RttStats {
            latest_rtt: Duration::ZERO,

            // `None` until the first sample, `rtt()` falls back to
            // `INITIAL_RTT` meanwhile.
            smoothed_rtt: None,

            rttvar: INITIAL_RTT / 2,

            max_ack_delay,

            min_rtt: WindowedMin::new(MIN_RTT_WINDOW),
        }
    }

    pub(crate) fn update_rtt(
        &mut self, latest_rtt: Duration, ack_delay: Duration, now: Instant,
    ) {
        self.latest_rtt = latest_rtt;

        let min_rtt = self.min_rtt.update(now, latest_rtt);

        match self.smoothed_rtt {
            // First RTT sample.
            None => {
                self.smoothed_rtt = Some(latest_rtt);

                self.rttvar = latest_rtt / 2;
            },

            Some(srtt) => {
                let ack_delay = cmp::min(self.max_ack_delay, ack_delay);

                // Adjust for ack delay if plausible.
                let adjusted_rtt = if latest_rtt > min_rtt + ack_delay {
                    latest_rtt - ack_delay
                } else {
                    latest_rtt
                };

                let abs_difference = srtt
                    .saturating_sub(adjusted_rtt)
                    .max(adjusted_rtt.saturating_sub(srtt));

                self.rttvar = self.rttvar.mul_f64(3.0 / 4.0) +
                    abs_difference.mul_f64(1.0 / 4.0);

                self.smoothed_rtt = Some(
                    srtt.mul_f64(7.0 / 8.0) + adjusted_rtt.mul_f64(1.0 / 8.0),
                );
            },
        }
    }

    pub(crate) fn rtt(&self) -> Duration {
        self.smoothed_rtt.unwrap_or(INITIAL_RTT)
    }

    /// Windowed minimum RTT, `None` until the first sample.
    pub(crate) fn min_rtt(&self) -> Option<Duration> {
        self.min_rtt.get()
    }

    /// Retransmission timeout: srtt + max(4 * rttvar, granularity), bounded.
    pub(crate) fn rto(&self) -> Duration {
        let rto = self.rtt() + cmp::max(self.rttvar * 4, GRANULARITY);

        rto.clamp(MIN_RTO, MAX_RTO)
    }

    pub(crate) fn reset(&mut self) {
        *self = RttStats::new(self.max_ack_delay);
    }
}

impl std::fmt::Debug for RttStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "latest_rtt={:?} ", self.latest_rtt)?;
        write!(f, "srtt={:?} ", self.smoothed_rtt)?;
        write!(f, "min_rtt={:?} ", self.min_rtt())?;
        write!(f, "rttvar={:?}", self.rttvar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial() {
        let r = RttStats::new(Duration::from_millis(25));

        assert_eq!(r.rtt(), INITIAL_RTT);
        assert_eq!(r.min_rtt(), None);
        assert_eq!(r.rto(), INITIAL_RTT + INITIAL_RTT * 2);
    }

    #[test]
    fn first_sample() {
        let mut r = RttStats::new(Duration::from_millis(25));
        let now = Instant::now();

        r.update_rtt(Duration::from_millis(100), Duration::ZERO, now);

        assert_eq!(r.rtt(), Duration::from_millis(100));
        assert_eq!(r.rttvar, Duration::from_millis(50));
        assert_eq!(r.min_rtt(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn ack_delay_is_capped() {
        let mut r = RttStats::new(Duration::from_millis(25));
        let mut now = Instant::now();

        r.update_rtt(Duration::from_millis(100), Duration::ZERO, now);

        now += Duration::from_millis(100);

        // Only 25ms of the reported 60ms ack delay are discounted.
        r.update_rtt(Duration::from_millis(200), Duration::from_millis(60), now);

        assert_eq!(r.latest_rtt, Duration::from_millis(200));
        assert_eq!(
            r.smoothed_rtt,
            Some(
                Duration::from_millis(100).mul_f64(7.0 / 8.0) +
                    Duration::from_millis(175).mul_f64(1.0 / 8.0)
            )
        );
        assert_eq!(r.min_rtt(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn rto_is_bounded() {
        let mut r = RttStats::new(Duration::ZERO);
        let now = Instant::now();

        r.update_rtt(Duration::from_millis(1), Duration::ZERO, now);
        assert_eq!(r.rto(), MIN_RTO);

        r.reset();
        r.update_rtt(Duration::from_secs(100), Duration::ZERO, now);
        assert_eq!(r.rto(), MAX_RTO);
    }
}

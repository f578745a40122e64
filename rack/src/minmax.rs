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

//! Windowed minimum tracker for RTT samples.
//!
//! Kathleen Nichols' algorithm: keep the best, second best and third best
//! minimum seen within the window, each one measured no earlier than the one
//! before it, so that an expiring minimum can be replaced without keeping
//! every sample. A new minimum always restarts the estimate since it is both
//! the smallest and the most recent value.

use std::time::Duration;
use std::time::Instant;

#[derive(Copy, Clone, Debug)]
struct Sample {
    time: Instant,
    rtt: Duration,
}

#[derive(Debug)]
pub struct WindowedMin {
    window: Duration,

    // Ordered best to third best. `None` until the first sample.
    best: Option<[Sample; 3]>,
}

impl WindowedMin {
    pub fn new(window: Duration) -> Self {
        WindowedMin { window, best: None }
    }

    /// Returns the current minimum, if any sample was recorded.
    pub fn get(&self) -> Option<Duration> {
        self.best.map(|b| b[0].rtt)
    }

    /// Forgets all previous samples and restarts from `rtt`.
    pub fn reset(&mut self, time: Instant, rtt: Duration) -> Duration {
        self.best = Some([Sample { time, rtt }; 3]);

        rtt
    }

    /// Records a new sample and returns the windowed minimum.
    pub fn update(&mut self, time: Instant, rtt: Duration) -> Duration {
        let sample = Sample { time, rtt };

        let best = match self.best.as_mut() {
            Some(best) => best,

            None => return self.reset(time, rtt),
        };

        // Nothing left in the window, or a new minimum.
        if rtt <= best[0].rtt ||
            time.saturating_duration_since(best[2].time) > self.window
        {
            return self.reset(time, rtt);
        }

        if rtt <= best[1].rtt {
            best[1] = sample;
            best[2] = sample;
        } else if rtt <= best[2].rtt {
            best[2] = sample;
        }

        let elapsed = time.saturating_duration_since(best[0].time);

        if elapsed > self.window {
            // The best sample expired: promote the runners up. The second
            // best may be stale as well, in which case shift once more.
            best[0] = best[1];
            best[1] = best[2];
            best[2] = sample;

            if time.saturating_duration_since(best[0].time) > self.window {
                best[0] = best[1];
                best[1] = best[2];
                best[2] = sample;
            }
        } else if best[1].time == best[0].time && elapsed > self.window / 4 {
            // A quarter of the window went by without a new minimum, take a
            // second estimate from the second quarter.
            best[1] = sample;
            best[2] = sample;
        } else if best[2].time == best[1].time && elapsed > self.window / 2 {
            // Same for the third estimate over the second half.
            best[2] = sample;
        }

        best[0].rtt
    }
}

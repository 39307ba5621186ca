//! Playback progress handling
//!
//! `progress:` parameters carry three RTP timestamps, not wall-clock seconds; position
//! and duration are derived from them against the stream's sample rate.

/// Playback progress update
#[derive(Debug, Clone, Copy)]
pub struct PlaybackProgress {
    /// Start RTP timestamp
    pub start_rtptime: u32,
    /// Current RTP timestamp
    pub current_rtptime: u32,
    /// End RTP timestamp
    pub end_rtptime: u32,
}

impl PlaybackProgress {
    /// Position in milliseconds: `(cur - start) * 1000 / samplerate`, floored at 0 if
    /// `cur < start`.
    #[must_use]
    pub fn pos_ms(&self, samplerate: u32) -> u64 {
        rtp_delta_ms(self.start_rtptime, self.current_rtptime, samplerate)
    }

    /// Duration in milliseconds: `(end - start) * 1000 / samplerate`.
    #[must_use]
    pub fn dur_ms(&self, samplerate: u32) -> u64 {
        rtp_delta_ms(self.start_rtptime, self.end_rtptime, samplerate)
    }

    /// Progress as a fraction (0.0 to 1.0)
    #[must_use]
    pub fn fraction(&self, samplerate: u32) -> f64 {
        let dur = self.dur_ms(samplerate);
        if dur == 0 {
            return 0.0;
        }
        (self.pos_ms(samplerate) as f64 / dur as f64).clamp(0.0, 1.0)
    }
}

fn rtp_delta_ms(start: u32, mark: u32, samplerate: u32) -> u64 {
    if mark < start || samplerate == 0 {
        return 0;
    }
    u64::from(mark - start) * 1000 / u64::from(samplerate)
}

/// Parse progress from a `SET_PARAMETER` body
///
/// Format: `progress: start/current/end\r\n`, all three values are RTP timestamps.
#[must_use]
pub fn parse_progress(body: &str) -> Option<PlaybackProgress> {
    for line in body.lines() {
        let line = line.trim();

        if let Some(value) = line.strip_prefix("progress:") {
            let parts: Vec<&str> = value.trim().split('/').collect();

            if let [start, current, end] = parts[..] {
                let start_rtptime: u32 = start.parse().ok()?;
                let current_rtptime: u32 = current.parse().ok()?;
                let end_rtptime: u32 = end.parse().ok()?;

                return Some(PlaybackProgress {
                    start_rtptime,
                    current_rtptime,
                    end_rtptime,
                });
            }
        }
    }

    None
}

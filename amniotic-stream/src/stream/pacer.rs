//! Wall-clock pacing
//!
//! The pacer tracks how much audio a session has produced and blocks the
//! session thread whenever that runs ahead of real time. After every call to
//! [`Pacer::advance`] the emitted audio is at most one chunk ahead of the
//! elapsed wall-clock time.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Pacer {
    started: Instant,
    /// Seconds of audio emitted so far
    audio_time: f64,
    realtime: bool,
}

impl Pacer {
    /// Start the clock now. With `realtime == false` no sleeping happens.
    pub fn new(realtime: bool) -> Self {
        Self {
            started: Instant::now(),
            audio_time: 0.0,
            realtime,
        }
    }

    pub fn audio_time(&self) -> f64 {
        self.audio_time
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// How far emitted audio is ahead of the wall clock (zero if behind)
    pub fn ahead(&self) -> Duration {
        let ahead = self.audio_time - self.elapsed().as_secs_f64();
        if ahead > 0.0 {
            Duration::from_secs_f64(ahead)
        } else {
            Duration::ZERO
        }
    }

    /// Account for `seconds` of emitted audio and sleep off any lead.
    ///
    /// Returns how long it slept.
    pub fn advance(&mut self, seconds: f64) -> Duration {
        self.audio_time += seconds;
        if !self.realtime {
            return Duration::ZERO;
        }
        let ahead = self.ahead();
        if !ahead.is_zero() {
            std::thread::sleep(ahead);
        }
        ahead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpaced_never_sleeps() {
        let mut pacer = Pacer::new(false);
        for _ in 0..100 {
            assert_eq!(pacer.advance(0.5), Duration::ZERO);
        }
        assert_eq!(pacer.audio_time(), 50.0);
        assert!(pacer.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_paced_holds_to_wall_clock() {
        let mut pacer = Pacer::new(true);
        let frame = 0.02;
        for _ in 0..10 {
            pacer.advance(frame);
            let elapsed = pacer.elapsed().as_secs_f64();
            assert!(pacer.audio_time() <= elapsed + frame + 1e-3);
        }
        assert!(pacer.elapsed() >= Duration::from_millis(190));
    }

    #[test]
    fn test_behind_does_not_sleep() {
        let mut pacer = Pacer::new(true);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(pacer.advance(0.01), Duration::ZERO);
    }
}

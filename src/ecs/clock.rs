//! Frame clock.
//!
//! Measures wall time per frame, enforces a target FPS by sleeping, and
//! supplies `delta_time`. The time source itself is an external
//! collaborator; [`TimeSource`] is that contract, with [`SystemTimeSource`]
//! as the default real-clock implementation. Acquiring and releasing the
//! world lock around a frame is [`crate::ecs::world::World`]'s job, not
//! this module's — a clock has no world to lock.

use std::time::Duration;

use crate::error::{SchedulerError, SchedulerResult};
use crate::foundation::time::Stopwatch;

/// The time source the frame clock consumes. Abstracted so tests can
/// script exact deltas instead of racing the wall clock.
pub trait TimeSource: Send + Sync {
    /// Monotonic seconds since some arbitrary epoch. Only differences
    /// between two calls are meaningful.
    fn now_seconds(&self) -> f64;

    /// Sleep for approximately `seconds`. A no-op for `seconds <= 0.0`.
    fn sleep_seconds(&self, seconds: f32) {
        if seconds > 0.0 {
            std::thread::sleep(Duration::from_secs_f32(seconds));
        }
    }
}

/// The real wall clock, via a running [`Stopwatch`].
pub struct SystemTimeSource {
    stopwatch: Stopwatch,
}

impl SystemTimeSource {
    /// Start a new epoch now.
    #[must_use]
    pub fn new() -> Self {
        Self { stopwatch: Stopwatch::start_new() }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_seconds(&self) -> f64 {
        f64::from(self.stopwatch.elapsed_secs())
    }
}

/// Per-frame timing. Owned by a single world; single-writer.
pub struct FrameClock {
    time_source: Option<Box<dyn TimeSource>>,
    target_fps: Option<f32>,
    frame_start: Option<f64>,
    fps_sleep_carry: f32,
    frame_count_total: u64,
}

impl FrameClock {
    /// A clock backed by the real wall clock.
    #[must_use]
    pub fn new(target_fps: Option<f32>) -> Self {
        Self::with_time_source(Some(Box::new(SystemTimeSource::new())), target_fps)
    }

    /// A clock with no time source at all — `frame_begin(0.0)` will return
    /// `MissingTimeSource` on it.
    #[must_use]
    pub fn without_time_source(target_fps: Option<f32>) -> Self {
        Self::with_time_source(None, target_fps)
    }

    /// A clock backed by an arbitrary [`TimeSource`] (e.g. a scripted one
    /// in tests).
    #[must_use]
    pub fn with_time_source(time_source: Option<Box<dyn TimeSource>>, target_fps: Option<f32>) -> Self {
        Self {
            time_source,
            target_fps,
            frame_start: None,
            fps_sleep_carry: 0.0,
            frame_count_total: 0,
        }
    }

    fn fallback_delta(&self) -> f32 {
        self.target_fps.map_or(1.0 / 60.0, |fps| 1.0 / fps)
    }

    /// Begin a frame. Returns the effective delta time: `user_delta` if
    /// nonzero, else the measured time since the previous `frame_begin`
    /// (or the FPS-derived fallback, on the first frame). Retries the
    /// measurement until it is nonzero — a zero-length tick is never
    /// returned.
    pub fn frame_begin(&mut self, user_delta: f32) -> SchedulerResult<f32> {
        if user_delta != 0.0 {
            if let Some(time_source) = self.time_source.as_deref() {
                self.frame_start = Some(time_source.now_seconds());
            }
            return Ok(user_delta);
        }

        let time_source = self
            .time_source
            .as_deref()
            .ok_or(SchedulerError::MissingTimeSource)?;

        let delta = match self.frame_start {
            None => self.fallback_delta(),
            Some(previous) => loop {
                let now = time_source.now_seconds();
                let measured = (now - previous) as f32;
                if measured != 0.0 {
                    break measured;
                }
            },
        };

        self.frame_start = Some(time_source.now_seconds());
        Ok(delta)
    }

    /// End a frame. Increments the total frame count and, if a target FPS
    /// is set, sleeps to approximate it. `fps_sleep_carry` is the raw
    /// (possibly negative) sleep value from the previous call — a crude
    /// drift compensator, not a PID controller.
    pub fn frame_end(&mut self, delta_time: f32) {
        self.frame_count_total += 1;

        if let Some(target_fps) = self.target_fps {
            let Some(time_source) = self.time_source.as_deref() else {
                return;
            };
            let raw_sleep = (1.0 / target_fps) - delta_time + self.fps_sleep_carry;
            if raw_sleep > 0.0 {
                time_source.sleep_seconds(raw_sleep);
            }
            self.fps_sleep_carry = raw_sleep;
        }
    }

    /// Total frames ended so far.
    #[must_use]
    pub const fn frame_count_total(&self) -> u64 {
        self.frame_count_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A time source whose `now_seconds` advances by a scripted amount on
    /// every call, and whose `sleep_seconds` just records what it was
    /// asked to sleep for instead of actually sleeping. `TimeSource`
    /// requires `Sync`, so the scripted state lives behind a `Mutex`
    /// rather than a `Cell`.
    struct ScriptedClock {
        now: Mutex<f64>,
        step: f64,
        slept: Mutex<Vec<f32>>,
    }

    impl ScriptedClock {
        fn new(step: f64) -> Self {
            Self {
                now: Mutex::new(0.0),
                step,
                slept: Mutex::new(Vec::new()),
            }
        }
    }

    impl TimeSource for ScriptedClock {
        fn now_seconds(&self) -> f64 {
            let mut now = self.now.lock().unwrap();
            let current = *now;
            *now += self.step;
            current
        }

        fn sleep_seconds(&self, seconds: f32) {
            self.slept.lock().unwrap().push(seconds);
        }
    }

    #[test]
    fn first_frame_uses_target_fps_fallback() {
        let mut clock = FrameClock::with_time_source(Some(Box::new(ScriptedClock::new(0.0))), Some(30.0));
        let delta = clock.frame_begin(0.0).unwrap();
        assert!((delta - 1.0 / 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn first_frame_without_target_fps_falls_back_to_sixty() {
        let mut clock = FrameClock::with_time_source(Some(Box::new(ScriptedClock::new(0.0))), None);
        let delta = clock.frame_begin(0.0).unwrap();
        assert!((delta - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn user_delta_is_honored_when_nonzero() {
        let mut clock = FrameClock::with_time_source(Some(Box::new(ScriptedClock::new(0.1))), None);
        assert_eq!(clock.frame_begin(0.25).unwrap(), 0.25);
    }

    #[test]
    fn missing_time_source_with_zero_user_delta_is_an_error() {
        let mut clock = FrameClock::without_time_source(None);
        let result = clock.frame_begin(0.0);
        assert!(matches!(result, Err(SchedulerError::MissingTimeSource)));
    }

    #[test]
    fn measured_delta_is_never_zero() {
        let mut clock = FrameClock::with_time_source(Some(Box::new(ScriptedClock::new(0.016))), None);
        let _first = clock.frame_begin(0.0).unwrap();
        let second = clock.frame_begin(0.0).unwrap();
        assert!(second > 0.0);
    }

    #[test]
    fn frame_end_sleeps_roughly_the_remaining_budget() {
        let scripted = Box::new(ScriptedClock::new(0.0));
        let mut clock = FrameClock::with_time_source(Some(scripted), Some(60.0));
        clock.frame_begin(0.005).unwrap();
        clock.frame_end(0.005);
        assert_eq!(clock.frame_count_total(), 1);
    }
}

//! Frame scheduling for realtime mode.
//!
//! Ticks are scheduled one at a time: the next tick is only scheduled once the previous frame
//! finished, so frames never overlap or queue up. A tick that comes due after realtime mode was
//! switched off does nothing and schedules nothing.

use std::time::{Duration, Instant};

/// Delay between the end of one realtime frame and the next one (about 30 FPS).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Default)]
pub struct RealtimeClock {
    enabled: bool,
    started: Option<Instant>,
    next_tick: Option<Instant>,
    elapsed: f32,
}

impl RealtimeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns realtime mode on, restarting the elapsed time from zero.
    pub fn enable(&mut self, now: Instant) {
        self.enabled = true;
        self.started = Some(now);
        self.elapsed = 0.0;
        self.next_tick = Some(now + FRAME_INTERVAL);
    }

    /// Turns realtime mode off. An already scheduled tick stays scheduled but will be a no-op.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_enabled(&mut self, enabled: bool, now: Instant) {
        if enabled {
            self.enable(now);
        } else {
            self.disable();
        }
    }

    /// Consumes the scheduled tick if it is due. Returns whether a frame should be drawn.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(due) if now >= due => {
                self.next_tick = None;
                if !self.enabled {
                    return false;
                }
                if let Some(started) = self.started {
                    self.elapsed = now.saturating_duration_since(started).as_secs_f32();
                }
                true
            }
            _ => false,
        }
    }

    /// Schedules the next tick after a frame finished drawing.
    pub fn finish_tick(&mut self, now: Instant) {
        if self.enabled && self.next_tick.is_none() {
            self.next_tick = Some(now + FRAME_INTERVAL);
        }
    }

    /// Seconds since realtime mode was last enabled, as of the last honoured tick.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// How long until the scheduled tick is due, if one is scheduled.
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|due| due.saturating_duration_since(now))
    }
}

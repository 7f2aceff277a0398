//! Frame pacing: cycle accounting and the real-time busy-wait.

use std::num::NonZeroU32;
use std::time::Instant;

/// Source of wall-clock milliseconds.
///
/// `now_ms` must be monotonically non-decreasing. Injectable so tests can
/// simulate elapsed time instead of truly spinning.
pub trait TimeSource {
    /// Current time in milliseconds since some fixed origin.
    fn now_ms(&mut self) -> u64;
}

/// Real time, measured from construction.
#[derive(Debug)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now_ms(&mut self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Deterministic time source for tests and headless hosts.
///
/// Each query advances the reported time by a fixed step, so the frame
/// busy-wait always terminates without real sleeping.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: u64,
    step: u64,
}

impl ManualClock {
    /// Create a clock starting at 0 that advances `step_ms` per query.
    #[must_use]
    pub const fn new(step_ms: u64) -> Self {
        Self {
            now: 0,
            step: step_ms,
        }
    }

    /// Jump the clock forward.
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&mut self) -> u64 {
        let now = self.now;
        self.now += self.step;
        now
    }
}

/// Result of completing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FrameSignal {
    /// Still inside the current frame; the host loop stays responsive.
    Running,
    /// A frame's worth of cycles elapsed and real time has caught up.
    /// The host should do its per-frame work now.
    FrameDone,
}

impl FrameSignal {
    /// True when a frame boundary was reached.
    #[must_use]
    pub const fn is_frame(self) -> bool {
        matches!(self, Self::FrameDone)
    }
}

/// Cycle accumulator plus real-time frame pacing.
///
/// Cycles are added as instructions retire. Once a frame's worth has
/// accumulated, `finish_instruction` subtracts `cycles_per_frame` — the
/// overrun is retained, not zeroed, so long-run timing does not drift —
/// then busy-waits until the wall clock reaches the frame deadline. The
/// busy-wait is the only blocking point in the emulation core.
#[derive(Debug)]
pub struct FrameClock<T = WallClock> {
    /// Cycles consumed since the last frame boundary. Signed so the
    /// carry-over arithmetic mirrors the accumulator it models.
    cycles: i64,
    cycles_per_frame: i64,
    /// Milliseconds per frame (integer division of 1000, like the cycle
    /// count: the truncation is an accepted timing approximation).
    frame_ms: u64,
    next_sync: u64,
    time: T,
}

impl FrameClock<WallClock> {
    /// Pace `clock_hz` emulated cycles against real time at `frame_rate`.
    #[must_use]
    pub fn new(clock_hz: u32, frame_rate: NonZeroU32) -> Self {
        Self::with_time_source(clock_hz, frame_rate, WallClock::new())
    }
}

impl<T> FrameClock<T> {
    /// Like [`FrameClock::new`] but with an explicit time source.
    #[must_use]
    pub fn with_time_source(clock_hz: u32, frame_rate: NonZeroU32, time: T) -> Self {
        Self {
            cycles: 0,
            cycles_per_frame: i64::from(clock_hz / frame_rate),
            frame_ms: 1000 / u64::from(frame_rate.get()),
            next_sync: 0,
            time,
        }
    }

    /// Charge cycles to the accumulator.
    pub fn advance(&mut self, cycles: u32) {
        self.cycles += i64::from(cycles);
    }

    /// Cycles accumulated since the last frame boundary.
    #[must_use]
    pub const fn cycles(&self) -> i64 {
        self.cycles
    }

    /// Cycles in one frame (clock speed / frame rate, truncated).
    #[must_use]
    pub const fn cycles_per_frame(&self) -> i64 {
        self.cycles_per_frame
    }
}

impl<T: TimeSource> FrameClock<T> {
    /// Close out one instruction: check the frame boundary and, if it was
    /// crossed, block until real time catches up.
    pub fn finish_instruction(&mut self) -> FrameSignal {
        if self.cycles < self.cycles_per_frame {
            return FrameSignal::Running;
        }
        self.cycles -= self.cycles_per_frame;
        while self.time.now_ms() < self.next_sync {}
        self.next_sync = self.time.now_ms() + self.frame_ms;
        FrameSignal::FrameDone
    }
}

//! Core traits and frame pacing for instruction-level CPU emulation.
//!
//! CPU cores execute one instruction per `step()` call and throttle
//! themselves to real time once a frame's worth of cycles has elapsed.
//! Memory and I/O are always reached through a bus trait supplied by the
//! host; the cores never own the bus.

mod bus;
mod clock;
mod cpu;

pub use bus::{Bus, IoBus, NullBus};
pub use clock::{FrameClock, FrameSignal, ManualClock, TimeSource, WallClock};
pub use cpu::Cpu;

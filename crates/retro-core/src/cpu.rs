//! CPU core trait.

use crate::{Bus, FrameSignal};

/// An instruction-level CPU core.
///
/// The type parameter `B` is the bus this CPU operates on. The bus is
/// passed to each call, never owned, so the host can swap memory maps or
/// share the bus with other components between calls.
pub trait Cpu<B: Bus> {
    /// Plain snapshot of the architectural registers, including the
    /// packed status byte.
    type Registers;

    /// Execute one instruction and account its cycles.
    ///
    /// Returns [`FrameSignal::FrameDone`] when a frame's worth of cycles
    /// has elapsed — in that case the call has already blocked until real
    /// time caught up, and the host should do its per-frame work.
    fn step(&mut self, bus: &mut B) -> FrameSignal;

    /// Reset the CPU to its documented power-on state.
    ///
    /// Always succeeds; the flag exists for API symmetry with the
    /// interrupt triggers.
    fn reset(&mut self, bus: &mut B) -> bool;

    /// Request a maskable interrupt, serviced synchronously.
    ///
    /// Returns true if the interrupt was taken; false means the core has
    /// interrupts disabled and the host must re-assert later.
    fn interrupt(&mut self, bus: &mut B) -> bool;

    /// Snapshot of all architectural registers. Pure read.
    fn registers(&self) -> Self::Registers;

    /// Current program counter.
    fn pc(&self) -> u16;
}

//! Register snapshot for status queries.

/// Snapshot of the 6502 architectural registers.
///
/// Returned by `registers()`; the status byte is packed from the
/// individual flag fields at snapshot time. Used for monitoring only —
/// the execution path never reads one of these back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer (stack lives at $0100-$01FF).
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Packed status byte (NV-BDIZC, bit 5 set).
    pub p: u8,
}

//! Register snapshot for status queries.

/// Snapshot of the Z80 architectural registers.
///
/// Returned by `registers()`; F is packed from the individual flag
/// fields at snapshot time. The alternate set is reported as the 16-bit
/// pairs it is stored as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// Alternate AF' pair.
    pub af_alt: u16,
    /// Alternate BC' pair.
    pub bc_alt: u16,
    /// Alternate DE' pair.
    pub de_alt: u16,
    /// Alternate HL' pair.
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    /// Interrupt vector base.
    pub i: u8,
    /// Memory refresh counter (lightly modelled).
    pub r: u8,
    /// Interrupt enable (IFF).
    pub iff: bool,
}

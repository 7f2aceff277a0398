//! 6502 status register (P) as individual flag fields.
//!
//! The flags are tracked as separate booleans and only packed into the
//! status byte when something asks for it (pushes, `registers()`), and
//! unpacked when a byte is loaded (PLP, RTI). Byte layout is NV-BDIZC
//! with bit 5 always reading 1.

/// Carry (bit 0).
const C: u8 = 0x01;
/// Zero (bit 1).
const Z: u8 = 0x02;
/// Interrupt disable (bit 2).
const I: u8 = 0x04;
/// Decimal mode (bit 3).
const D: u8 = 0x08;
/// Break (bit 4) - a pseudo-flag, only meaningful in pushed status bytes.
const B: u8 = 0x10;
/// Unused (bit 5) - always reads 1.
const U: u8 = 0x20;
/// Overflow (bit 6).
const V: u8 = 0x40;
/// Negative (bit 7).
const N: u8 = 0x80;

/// The individual processor flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub carry: bool,
    pub zero: bool,
    pub irq_disable: bool,
    pub decimal: bool,
    pub brk: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Flags {
    /// Power-on state: I set, everything else clear.
    #[must_use]
    pub const fn power_on() -> Self {
        Self {
            carry: false,
            zero: false,
            irq_disable: true,
            decimal: false,
            brk: false,
            overflow: false,
            negative: false,
        }
    }

    /// Pack into the status byte. Bit 5 always reads 1.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let mut p = U;
        if self.carry {
            p |= C;
        }
        if self.zero {
            p |= Z;
        }
        if self.irq_disable {
            p |= I;
        }
        if self.decimal {
            p |= D;
        }
        if self.brk {
            p |= B;
        }
        if self.overflow {
            p |= V;
        }
        if self.negative {
            p |= N;
        }
        p
    }

    /// Status byte as pushed by BRK/PHP: B set.
    #[must_use]
    pub const fn to_byte_brk(self) -> u8 {
        self.to_byte() | B
    }

    /// Status byte as pushed during IRQ/NMI entry: B clear.
    #[must_use]
    pub const fn to_byte_irq(self) -> u8 {
        self.to_byte() & !B
    }

    /// Unpack a status byte into individual flags.
    #[must_use]
    pub const fn from_byte(p: u8) -> Self {
        Self {
            carry: p & C != 0,
            zero: p & Z != 0,
            irq_disable: p & I != 0,
            decimal: p & D != 0,
            brk: p & B != 0,
            overflow: p & V != 0,
            negative: p & N != 0,
        }
    }

    /// Update N and Z from a result value.
    pub const fn set_nz(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_round_trips_all_combinations() {
        // 7 flags -> 128 combinations
        for bits in 0..128u8 {
            let flags = Flags {
                carry: bits & 1 != 0,
                zero: bits & 2 != 0,
                irq_disable: bits & 4 != 0,
                decimal: bits & 8 != 0,
                brk: bits & 16 != 0,
                overflow: bits & 32 != 0,
                negative: bits & 64 != 0,
            };
            assert_eq!(Flags::from_byte(flags.to_byte()), flags);
        }
    }

    #[test]
    fn bit_five_always_reads_one() {
        assert_eq!(Flags::default().to_byte() & 0x20, 0x20);
        assert_eq!(Flags::from_byte(0x00).to_byte() & 0x20, 0x20);
    }

    #[test]
    fn push_variants_control_break_bit() {
        let flags = Flags::power_on();
        assert_eq!(flags.to_byte_brk() & 0x10, 0x10);
        assert_eq!(flags.to_byte_irq() & 0x10, 0x00);
    }

    #[test]
    fn power_on_packs_to_0x24() {
        assert_eq!(Flags::power_on().to_byte(), 0x24);
    }
}

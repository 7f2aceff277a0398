//! Z80 flag register (F) as individual flag fields.
//!
//! Packed into bits 7/6/4/2/1/0 of F on demand and unpacked when a byte
//! is loaded (POP AF, EX AF,AF'). The undocumented bits 3 and 5 read 0.

/// Carry (bit 0).
const C: u8 = 0x01;
/// Add/subtract (bit 1).
const N: u8 = 0x02;
/// Parity/overflow (bit 2).
const PV: u8 = 0x04;
/// Half-carry (bit 4).
const H: u8 = 0x10;
/// Zero (bit 6).
const Z: u8 = 0x40;
/// Sign (bit 7).
const S: u8 = 0x80;

/// The individual processor flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub sign: bool,
    pub zero: bool,
    pub half_carry: bool,
    pub parity_overflow: bool,
    pub add_sub: bool,
    pub carry: bool,
}

impl Flags {
    /// Pack into the F byte. Bits 3 and 5 read 0.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let mut f = 0;
        if self.sign {
            f |= S;
        }
        if self.zero {
            f |= Z;
        }
        if self.half_carry {
            f |= H;
        }
        if self.parity_overflow {
            f |= PV;
        }
        if self.add_sub {
            f |= N;
        }
        if self.carry {
            f |= C;
        }
        f
    }

    /// Unpack an F byte into individual flags.
    #[must_use]
    pub const fn from_byte(f: u8) -> Self {
        Self {
            sign: f & S != 0,
            zero: f & Z != 0,
            half_carry: f & H != 0,
            parity_overflow: f & PV != 0,
            add_sub: f & N != 0,
            carry: f & C != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f_byte_round_trips_all_combinations() {
        // 6 flags -> 64 combinations
        for bits in 0..64u8 {
            let flags = Flags {
                sign: bits & 1 != 0,
                zero: bits & 2 != 0,
                half_carry: bits & 4 != 0,
                parity_overflow: bits & 8 != 0,
                add_sub: bits & 16 != 0,
                carry: bits & 32 != 0,
            };
            assert_eq!(Flags::from_byte(flags.to_byte()), flags);
        }
    }

    #[test]
    fn undocumented_bits_read_zero() {
        let all = Flags {
            sign: true,
            zero: true,
            half_carry: true,
            parity_overflow: true,
            add_sub: true,
            carry: true,
        };
        assert_eq!(all.to_byte(), 0xD7);
        assert_eq!(all.to_byte() & 0x28, 0);
    }

    #[test]
    fn bit_positions_match_hardware_layout() {
        let flags = Flags {
            carry: true,
            ..Flags::default()
        };
        assert_eq!(flags.to_byte(), 0x01);

        let flags = Flags {
            sign: true,
            half_carry: true,
            ..Flags::default()
        };
        assert_eq!(flags.to_byte(), 0x90);
    }
}

//! Z80 ALU: 8-bit accumulator operations, 16-bit pair arithmetic,
//! rotates/shifts and the decimal adjust.
//!
//! Every helper sets the full documented flag effect of the operation it
//! implements; the dispatch only routes operands.

use crate::cpu::Z80;

impl<T> Z80<T> {
    /// Parity flag for a value: true when the number of set bits is even.
    /// Reads the table built at reset.
    pub(crate) fn parity(&self, value: u8) -> bool {
        self.parity_table[value as usize]
    }

    // =========================================================================
    // 8-bit accumulator group
    // =========================================================================

    pub(crate) fn add_a(&mut self, value: u8) {
        let a = self.a;
        let result = a.wrapping_add(value);

        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0F) + (value & 0x0F) > 0x0F;
        // Overflow: operand signs equal, result sign differs
        self.flags.parity_overflow = (a ^ value) & 0x80 == 0 && (a ^ result) & 0x80 != 0;
        self.flags.add_sub = false;
        self.flags.carry = u16::from(a) + u16::from(value) > 0xFF;

        self.a = result;
    }

    pub(crate) fn adc_a(&mut self, value: u8) {
        let a = self.a;
        let c = u8::from(self.flags.carry);
        let result = a.wrapping_add(value).wrapping_add(c);

        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0F) + (value & 0x0F) + c > 0x0F;
        self.flags.parity_overflow = (a ^ value) & 0x80 == 0 && (a ^ result) & 0x80 != 0;
        self.flags.add_sub = false;
        self.flags.carry = u16::from(a) + u16::from(value) + u16::from(c) > 0xFF;

        self.a = result;
    }

    pub(crate) fn sub_a(&mut self, value: u8) {
        let a = self.a;
        let result = a.wrapping_sub(value);

        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0F) < (value & 0x0F);
        self.flags.parity_overflow = (a ^ value) & 0x80 != 0 && (a ^ result) & 0x80 != 0;
        self.flags.add_sub = true;
        self.flags.carry = a < value;

        self.a = result;
    }

    pub(crate) fn sbc_a(&mut self, value: u8) {
        let a = self.a;
        let c = u8::from(self.flags.carry);
        let result = a.wrapping_sub(value).wrapping_sub(c);

        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0F) < (value & 0x0F) + c;
        self.flags.parity_overflow = (a ^ value) & 0x80 != 0 && (a ^ result) & 0x80 != 0;
        self.flags.add_sub = true;
        self.flags.carry = u16::from(a) < u16::from(value) + u16::from(c);

        self.a = result;
    }

    pub(crate) fn and_a(&mut self, value: u8) {
        self.a &= value;
        self.logic_flags(true);
    }

    pub(crate) fn or_a(&mut self, value: u8) {
        self.a |= value;
        self.logic_flags(false);
    }

    pub(crate) fn xor_a(&mut self, value: u8) {
        self.a ^= value;
        self.logic_flags(false);
    }

    /// Shared flag effect of AND/OR/XOR; only H differs.
    fn logic_flags(&mut self, half_carry: bool) {
        self.flags.sign = self.a & 0x80 != 0;
        self.flags.zero = self.a == 0;
        self.flags.half_carry = half_carry;
        self.flags.parity_overflow = self.parity(self.a);
        self.flags.add_sub = false;
        self.flags.carry = false;
    }

    /// CP: subtract without storing the result.
    pub(crate) fn cp_a(&mut self, value: u8) {
        let a = self.a;
        let result = a.wrapping_sub(value);

        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0F) < (value & 0x0F);
        self.flags.parity_overflow = (a ^ value) & 0x80 != 0 && (a ^ result) & 0x80 != 0;
        self.flags.add_sub = true;
        self.flags.carry = a < value;
    }

    /// INC r: carry is not affected; PV is true overflow (0x7F -> 0x80).
    pub(crate) fn inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = value & 0x0F == 0x0F;
        self.flags.parity_overflow = value == 0x7F;
        self.flags.add_sub = false;
        result
    }

    /// DEC r: carry is not affected; PV is true overflow (0x80 -> 0x7F).
    pub(crate) fn dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = value & 0x0F == 0;
        self.flags.parity_overflow = value == 0x80;
        self.flags.add_sub = true;
        result
    }

    /// NEG: A = 0 - A.
    pub(crate) fn neg(&mut self) {
        let value = self.a;
        self.a = 0;
        self.sub_a(value);
    }

    /// DAA: decimal-adjust the accumulator after a BCD add or subtract.
    pub(crate) fn daa(&mut self) {
        let a = self.a;
        let mut adjust = 0u8;
        let mut carry = self.flags.carry;

        if self.flags.half_carry || (a & 0x0F) > 9 {
            adjust |= 0x06;
        }
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }

        let result = if self.flags.add_sub {
            a.wrapping_sub(adjust)
        } else {
            a.wrapping_add(adjust)
        };

        self.flags.half_carry = if self.flags.add_sub {
            self.flags.half_carry && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };
        self.flags.carry = carry;
        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.parity_overflow = self.parity(result);
        self.a = result;
    }

    // =========================================================================
    // 16-bit pair arithmetic
    // =========================================================================

    /// ADD HL,rp (and ADD IX/IY,rp): only H, N and C are affected.
    pub(crate) fn add16(&mut self, a: u16, b: u16) -> u16 {
        let result = a.wrapping_add(b);
        self.flags.half_carry = (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF;
        self.flags.add_sub = false;
        self.flags.carry = u32::from(a) + u32::from(b) > 0xFFFF;
        result
    }

    /// ADC HL,rp: full flag effect, Z over all 16 bits.
    pub(crate) fn adc16(&mut self, a: u16, b: u16) -> u16 {
        let c = u16::from(self.flags.carry);
        let result = a.wrapping_add(b).wrapping_add(c);

        self.flags.sign = result & 0x8000 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0FFF) + (b & 0x0FFF) + c > 0x0FFF;
        self.flags.parity_overflow = (a ^ b) & 0x8000 == 0 && (a ^ result) & 0x8000 != 0;
        self.flags.add_sub = false;
        self.flags.carry = u32::from(a) + u32::from(b) + u32::from(c) > 0xFFFF;
        result
    }

    /// SBC HL,rp: full flag effect.
    pub(crate) fn sbc16(&mut self, a: u16, b: u16) -> u16 {
        let c = u16::from(self.flags.carry);
        let result = a.wrapping_sub(b).wrapping_sub(c);

        self.flags.sign = result & 0x8000 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (a & 0x0FFF) < (b & 0x0FFF) + c;
        self.flags.parity_overflow = (a ^ b) & 0x8000 != 0 && (a ^ result) & 0x8000 != 0;
        self.flags.add_sub = true;
        self.flags.carry = u32::from(a) < u32::from(b) + u32::from(c);
        result
    }

    // =========================================================================
    // Accumulator rotates (RLCA group: only H, N, C affected)
    // =========================================================================

    pub(crate) fn rlca(&mut self) {
        let carry = self.a & 0x80 != 0;
        self.a = self.a.rotate_left(1);
        self.flags.half_carry = false;
        self.flags.add_sub = false;
        self.flags.carry = carry;
    }

    pub(crate) fn rrca(&mut self) {
        let carry = self.a & 0x01 != 0;
        self.a = self.a.rotate_right(1);
        self.flags.half_carry = false;
        self.flags.add_sub = false;
        self.flags.carry = carry;
    }

    pub(crate) fn rla(&mut self) {
        let carry_in = u8::from(self.flags.carry);
        let carry = self.a & 0x80 != 0;
        self.a = (self.a << 1) | carry_in;
        self.flags.half_carry = false;
        self.flags.add_sub = false;
        self.flags.carry = carry;
    }

    pub(crate) fn rra(&mut self) {
        let carry_in = if self.flags.carry { 0x80 } else { 0 };
        let carry = self.a & 0x01 != 0;
        self.a = (self.a >> 1) | carry_in;
        self.flags.half_carry = false;
        self.flags.add_sub = false;
        self.flags.carry = carry;
    }

    // =========================================================================
    // CB-prefix rotates and shifts (full S/Z/P flag effect)
    // =========================================================================

    fn shift_flags(&mut self, result: u8, carry: bool) {
        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = false;
        self.flags.parity_overflow = self.parity(result);
        self.flags.add_sub = false;
        self.flags.carry = carry;
    }

    pub(crate) fn rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.shift_flags(result, value & 0x80 != 0);
        result
    }

    pub(crate) fn rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.shift_flags(result, value & 0x01 != 0);
        result
    }

    pub(crate) fn rl(&mut self, value: u8) -> u8 {
        let result = (value << 1) | u8::from(self.flags.carry);
        self.shift_flags(result, value & 0x80 != 0);
        result
    }

    pub(crate) fn rr(&mut self, value: u8) -> u8 {
        let carry_in = if self.flags.carry { 0x80 } else { 0 };
        let result = (value >> 1) | carry_in;
        self.shift_flags(result, value & 0x01 != 0);
        result
    }

    pub(crate) fn sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.shift_flags(result, value & 0x80 != 0);
        result
    }

    /// SRA: arithmetic right shift, bit 7 preserved.
    pub(crate) fn sra(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (value & 0x80);
        self.shift_flags(result, value & 0x01 != 0);
        result
    }

    /// SLL: undocumented shift left that sets bit 0.
    pub(crate) fn sll(&mut self, value: u8) -> u8 {
        let result = (value << 1) | 0x01;
        self.shift_flags(result, value & 0x80 != 0);
        result
    }

    pub(crate) fn srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.shift_flags(result, value & 0x01 != 0);
        result
    }

    /// BIT b,r: Z (and PV) report the tested bit being clear.
    pub(crate) fn bit_test(&mut self, bit: u8, value: u8) {
        let set = value & (1 << bit) != 0;
        self.flags.sign = bit == 7 && set;
        self.flags.zero = !set;
        self.flags.half_carry = true;
        self.flags.parity_overflow = !set;
        self.flags.add_sub = false;
    }

    /// Flag effect shared by IN r,(C), RRD and RLD.
    pub(crate) fn in_flags(&mut self, value: u8) {
        self.flags.sign = value & 0x80 != 0;
        self.flags.zero = value == 0;
        self.flags.half_carry = false;
        self.flags.parity_overflow = self.parity(value);
        self.flags.add_sub = false;
    }
}

//! 6502 addressing modes and stack plumbing.
//!
//! The 6502 addressing modes:
//! - Implied / Accumulator: no memory operand
//! - Immediate: #$nn
//! - Zero Page / Zero Page,X / Zero Page,Y ($nn, wraps within page zero)
//! - Absolute / Absolute,X / Absolute,Y ($nnnn, indexing may cross a page)
//! - Indirect: ($nnnn), JMP only, with the page-boundary hardware bug
//! - Indexed Indirect: ($nn,X) / Indirect Indexed: ($nn),Y
//! - Relative: signed branch offset

use crate::cpu::Mos6502;
use retro_core::Bus;

impl<T> Mos6502<T> {
    /// Fetch the next byte at PC and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian 16-bit word at PC.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a little-endian 16-bit word from memory.
    pub(crate) fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Read a word with the 6502 page-boundary bug: if `addr` is $xxFF the
    /// high byte comes from $xx00, not the next page. Indirect JMP only.
    pub(crate) fn read_word_page_bug(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack.
    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// Pull a byte from the stack.
    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.sp))
    }

    /// Push a 16-bit word (high byte first).
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    /// Pull a 16-bit word (low byte first).
    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    // =========================================================================
    // Effective-address computation
    // =========================================================================

    /// Zero Page: $nn
    pub(crate) fn addr_zero_page(&mut self, bus: &mut impl Bus) -> u16 {
        u16::from(self.fetch(bus))
    }

    /// Zero Page,X: $nn,X (wraps within page zero)
    pub(crate) fn addr_zero_page_x(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch(bus);
        u16::from(base.wrapping_add(self.x))
    }

    /// Zero Page,Y: $nn,Y (wraps within page zero)
    pub(crate) fn addr_zero_page_y(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch(bus);
        u16::from(base.wrapping_add(self.y))
    }

    /// Absolute: $nnnn
    pub(crate) fn addr_absolute(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch_word(bus)
    }

    /// Absolute,X. Returns (address, page_crossed); crossing costs reads
    /// one extra cycle.
    pub(crate) fn addr_absolute_x(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.x));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Absolute,Y. Returns (address, page_crossed).
    pub(crate) fn addr_absolute_y(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.y));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Indexed Indirect: ($nn,X). Pointer at (operand + X) in page zero,
    /// wrapping within the page.
    pub(crate) fn addr_indexed_indirect(&mut self, bus: &mut impl Bus) -> u16 {
        let ptr = self.fetch(bus).wrapping_add(self.x);
        let low = bus.read(u16::from(ptr));
        let high = bus.read(u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([low, high])
    }

    /// Indirect Indexed: ($nn),Y. Returns (address, page_crossed).
    pub(crate) fn addr_indirect_indexed(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let ptr = self.fetch(bus);
        let low = bus.read(u16::from(ptr));
        let high = bus.read(u16::from(ptr.wrapping_add(1)));
        let base = u16::from_le_bytes([low, high]);
        let addr = base.wrapping_add(u16::from(self.y));
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    /// Take a branch if `condition` holds. Returns the extra cycles:
    /// 1 if taken, 2 if taken across a page boundary.
    pub(crate) fn branch_if(&mut self, bus: &mut impl Bus, condition: bool) -> u32 {
        let offset = self.fetch(bus) as i8;
        if !condition {
            return 0;
        }
        let target = self.pc.wrapping_add(offset as u16);
        let page_crossed = (self.pc & 0xFF00) != (target & 0xFF00);
        self.pc = target;
        if page_crossed { 2 } else { 1 }
    }
}

//! Z80 execution core: dispatch (main, CB, ED, DD/FD, DDCB/FDCB),
//! interrupt entry and frame pacing.

use std::num::NonZeroU32;

use retro_core::{Bus, Cpu, FrameClock, FrameSignal, IoBus, TimeSource, WallClock};

use crate::flags::Flags;
use crate::registers::Registers;

/// The Zilog Z80 CPU.
///
/// One `step()` executes one complete instruction — prefixed forms
/// included — and charges its documented T-state cost to the owned
/// [`FrameClock`]. The bus is passed to every call that touches memory or
/// the port space; the core never owns it.
///
/// Maskable interrupts are serviced synchronously inside
/// [`Z80::trigger_int`], gated on IFF. The stored interrupt mode is
/// decoded but servicing always performs RST 38h.
pub struct Z80<T = WallClock> {
    /// Accumulator.
    pub(crate) a: u8,
    pub(crate) b: u8,
    pub(crate) c: u8,
    pub(crate) d: u8,
    pub(crate) e: u8,
    pub(crate) h: u8,
    pub(crate) l: u8,
    /// Individual flag fields, packed into F on demand.
    pub(crate) flags: Flags,

    /// Alternate register set, held as 16-bit pairs.
    af_alt: u16,
    bc_alt: u16,
    de_alt: u16,
    hl_alt: u16,

    ix: u16,
    iy: u16,
    sp: u16,
    pc: u16,

    /// Interrupt vector base.
    i: u8,
    /// Memory refresh counter: low 7 bits increment per opcode fetch.
    r: u8,

    /// Interrupt enable (single IFF; IFF2 is not modelled separately).
    iff: bool,
    /// Interrupt mode 0/1/2, stored but not dispatched on.
    im: u8,
    /// Set by HALT; cleared by a serviced interrupt.
    halted: bool,

    /// Parity lookup, built by `reset()` and immutable afterwards.
    pub(crate) parity_table: [bool; 256],

    /// Cycle accounting and real-time frame pacing.
    clock: FrameClock<T>,

    /// Opcodes that fell through the ED/DD/FD dispatch. They execute as
    /// no-ops and charge no cycles, but the count is observable.
    illegal_opcodes: u64,
}

impl Z80<WallClock> {
    /// Create a core paced against real time.
    ///
    /// `cycles_per_frame = clock_hz / frame_rate` (truncating division).
    #[must_use]
    pub fn new(clock_hz: u32, frame_rate: NonZeroU32) -> Self {
        Self::with_time_source(clock_hz, frame_rate, WallClock::new())
    }
}

impl<T: TimeSource> Z80<T> {
    /// Create a core with an explicit time source (deterministic tests).
    #[must_use]
    pub fn with_time_source(clock_hz: u32, frame_rate: NonZeroU32, time: T) -> Self {
        Self {
            a: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            flags: Flags::default(),
            af_alt: 0,
            bc_alt: 0,
            de_alt: 0,
            hl_alt: 0,
            ix: 0,
            iy: 0,
            sp: 0xFFFF,
            pc: 0,
            i: 0,
            r: 0,
            iff: false,
            im: 0,
            halted: false,
            parity_table: [false; 256],
            clock: FrameClock::with_time_source(clock_hz, frame_rate, time),
            illegal_opcodes: 0,
        }
    }

    /// Trigger a maskable interrupt.
    ///
    /// Serviced only while IFF is set; clears HALT, pushes PC, jumps to
    /// 0x0038 and disables further interrupts. Returns whether it was
    /// taken so the host knows to re-assert later.
    pub fn trigger_int(&mut self, bus: &mut impl Bus) -> bool {
        if !self.iff {
            return false;
        }
        self.halted = false;
        self.push_word(bus, self.pc);
        self.pc = 0x0038;
        self.iff = false;
        self.clock.advance(13);
        true
    }
}

impl<T> Z80<T> {
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Packed F byte.
    pub fn f(&self) -> u8 {
        self.flags.to_byte()
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.flags.to_byte()])
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn ix(&self) -> u16 {
        self.ix
    }

    pub fn iy(&self) -> u16 {
        self.iy
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn iff(&self) -> bool {
        self.iff
    }

    /// Stored interrupt mode (0, 1 or 2).
    pub fn im(&self) -> u8 {
        self.im
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Current program counter.
    ///
    /// Inherent so callers do not have to name a bus type just to read it;
    /// the [`Cpu`] impl delegates here.
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Snapshot of all architectural registers. Pure read; also inherent,
    /// like [`Z80::pc`].
    #[must_use]
    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            f: self.flags.to_byte(),
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            af_alt: self.af_alt,
            bc_alt: self.bc_alt,
            de_alt: self.de_alt,
            hl_alt: self.hl_alt,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff: self.iff,
        }
    }

    /// Cycles accumulated since the last frame boundary.
    pub fn cycles(&self) -> i64 {
        self.clock.cycles()
    }

    /// Number of unrecognised prefixed opcodes executed so far.
    pub fn illegal_opcodes(&self) -> u64 {
        self.illegal_opcodes
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    /// Load AF, unpacking F into the individual flags.
    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        self.flags = Flags::from_byte(f);
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    // =========================================================================
    // Fetch and stack plumbing
    // =========================================================================

    /// Fetch an opcode byte: advances PC and bumps the R counter.
    fn fetch_opcode(&mut self, bus: &mut impl Bus) -> u8 {
        self.bump_r();
        self.fetch(bus)
    }

    /// Refresh counter: the low 7 bits increment per opcode fetch, bit 7
    /// only changes through LD R,A.
    fn bump_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    /// Fetch an operand byte at PC and advance PC.
    fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian 16-bit word at PC.
    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    fn write_word(&self, bus: &mut impl Bus, addr: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        bus.write(addr, low);
        bus.write(addr.wrapping_add(1), high);
    }

    fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, high);
        self.sp = self.sp.wrapping_sub(1);
        bus.write(self.sp, low);
    }

    fn pop_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = bus.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        let high = bus.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        u16::from_le_bytes([low, high])
    }

    // =========================================================================
    // Encoding-field decode helpers
    // =========================================================================

    /// Read the register selected by a 3-bit encoding field
    /// (B C D E H L (HL) A).
    fn read_reg(&mut self, bus: &mut impl Bus, code: u8) -> u8 {
        match code & 7 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => bus.read(self.hl()),
            _ => self.a,
        }
    }

    /// Write the register selected by a 3-bit encoding field.
    fn write_reg(&mut self, bus: &mut impl Bus, code: u8, value: u8) {
        match code & 7 {
            0 => self.b = value,
            1 => self.c = value,
            2 => self.d = value,
            3 => self.e = value,
            4 => self.h = value,
            5 => self.l = value,
            6 => bus.write(self.hl(), value),
            _ => self.a = value,
        }
    }

    /// Register pair selected by a 2-bit field (BC DE HL SP).
    fn rp_get(&self, code: u8) -> u16 {
        match code & 3 {
            0 => self.bc(),
            1 => self.de(),
            2 => self.hl(),
            _ => self.sp,
        }
    }

    fn rp_set(&mut self, code: u8, value: u16) {
        match code & 3 {
            0 => self.set_bc(value),
            1 => self.set_de(value),
            2 => self.set_hl(value),
            _ => self.sp = value,
        }
    }

    /// Condition selected by a 3-bit field (NZ Z NC C PO PE P M).
    fn condition(&self, code: u8) -> bool {
        match code & 7 {
            0 => !self.flags.zero,
            1 => self.flags.zero,
            2 => !self.flags.carry,
            3 => self.flags.carry,
            4 => !self.flags.parity_overflow,
            5 => self.flags.parity_overflow,
            6 => !self.flags.sign,
            _ => self.flags.sign,
        }
    }

    /// ALU operation selected by a 3-bit field
    /// (ADD ADC SUB SBC AND XOR OR CP).
    fn alu_dispatch(&mut self, selector: u8, value: u8) {
        match selector & 7 {
            0 => self.add_a(value),
            1 => self.adc_a(value),
            2 => self.sub_a(value),
            3 => self.sbc_a(value),
            4 => self.and_a(value),
            5 => self.xor_a(value),
            6 => self.or_a(value),
            _ => self.cp_a(value),
        }
    }

    /// Rotate/shift selected by the CB-prefix 3-bit field
    /// (RLC RRC RL RR SLA SRA SLL SRL).
    fn rotate_shift(&mut self, selector: u8, value: u8) -> u8 {
        match selector & 7 {
            0 => self.rlc(value),
            1 => self.rrc(value),
            2 => self.rl(value),
            3 => self.rr(value),
            4 => self.sla(value),
            5 => self.sra(value),
            6 => self.sll(value),
            _ => self.srl(value),
        }
    }
}

impl<B: IoBus, T: TimeSource> Cpu<B> for Z80<T> {
    type Registers = Registers;

    fn step(&mut self, bus: &mut B) -> FrameSignal {
        if self.halted {
            // HALT executes NOPs until an interrupt; memory refresh and
            // frame pacing keep running
            self.bump_r();
            self.clock.advance(4);
            return self.clock.finish_instruction();
        }
        let opcode = self.fetch_opcode(bus);
        let cycles = self.execute(bus, opcode);
        self.clock.advance(cycles);
        self.clock.finish_instruction()
    }

    fn reset(&mut self, _bus: &mut B) -> bool {
        for (value, slot) in self.parity_table.iter_mut().enumerate() {
            *slot = (value as u8).count_ones() % 2 == 0;
        }
        self.pc = 0;
        self.iff = false;
        self.im = 0;
        self.halted = false;
        true
    }

    fn interrupt(&mut self, bus: &mut B) -> bool {
        self.trigger_int(bus)
    }

    fn registers(&self) -> Registers {
        Z80::registers(self)
    }

    fn pc(&self) -> u16 {
        Z80::pc(self)
    }
}

impl<T> Z80<T> {
    /// Execute one unprefixed instruction, returning its T-state cost.
    fn execute(&mut self, bus: &mut impl IoBus, opcode: u8) -> u32 {
        match opcode {
            0x00 => 4, // NOP

            0x76 => {
                // HALT
                self.halted = true;
                4
            }

            // =====================================================================
            // 8-bit loads
            // =====================================================================
            0x40..=0x7F => {
                // LD r,r'
                let value = self.read_reg(bus, opcode);
                self.write_reg(bus, opcode >> 3, value);
                if opcode & 7 == 6 || (opcode >> 3) & 7 == 6 {
                    7
                } else {
                    4
                }
            }
            op if op & 0xC7 == 0x06 => {
                // LD r,n
                let value = self.fetch(bus);
                self.write_reg(bus, op >> 3, value);
                if (op >> 3) & 7 == 6 { 10 } else { 7 }
            }
            0x02 => {
                // LD (BC),A
                bus.write(self.bc(), self.a);
                7
            }
            0x12 => {
                // LD (DE),A
                bus.write(self.de(), self.a);
                7
            }
            0x0A => {
                // LD A,(BC)
                self.a = bus.read(self.bc());
                7
            }
            0x1A => {
                // LD A,(DE)
                self.a = bus.read(self.de());
                7
            }
            0x32 => {
                // LD (nn),A
                let addr = self.fetch_word(bus);
                bus.write(addr, self.a);
                13
            }
            0x3A => {
                // LD A,(nn)
                let addr = self.fetch_word(bus);
                self.a = bus.read(addr);
                13
            }

            // =====================================================================
            // 16-bit loads
            // =====================================================================
            op if op & 0xCF == 0x01 => {
                // LD rp,nn
                let value = self.fetch_word(bus);
                self.rp_set(op >> 4, value);
                10
            }
            0x22 => {
                // LD (nn),HL
                let addr = self.fetch_word(bus);
                self.write_word(bus, addr, self.hl());
                16
            }
            0x2A => {
                // LD HL,(nn)
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_hl(value);
                16
            }
            0xF9 => {
                // LD SP,HL
                self.sp = self.hl();
                6
            }
            op if op & 0xCF == 0xC5 => {
                // PUSH rp2 (BC DE HL AF)
                let value = if (op >> 4) & 3 == 3 {
                    self.af()
                } else {
                    self.rp_get(op >> 4)
                };
                self.push_word(bus, value);
                11
            }
            op if op & 0xCF == 0xC1 => {
                // POP rp2
                let value = self.pop_word(bus);
                if (op >> 4) & 3 == 3 {
                    self.set_af(value);
                } else {
                    self.rp_set(op >> 4, value);
                }
                10
            }

            // =====================================================================
            // Exchanges
            // =====================================================================
            0x08 => {
                // EX AF,AF'
                let af = self.af();
                self.set_af(self.af_alt);
                self.af_alt = af;
                4
            }
            0xD9 => {
                // EXX
                let (bc, de, hl) = (self.bc(), self.de(), self.hl());
                self.set_bc(self.bc_alt);
                self.set_de(self.de_alt);
                self.set_hl(self.hl_alt);
                self.bc_alt = bc;
                self.de_alt = de;
                self.hl_alt = hl;
                4
            }
            0xEB => {
                // EX DE,HL
                let de = self.de();
                self.set_de(self.hl());
                self.set_hl(de);
                4
            }
            0xE3 => {
                // EX (SP),HL
                let mem = self.read_word(bus, self.sp);
                self.write_word(bus, self.sp, self.hl());
                self.set_hl(mem);
                19
            }

            // =====================================================================
            // 8-bit arithmetic and logic
            // =====================================================================
            0x80..=0xBF => {
                // ALU A,r
                let value = self.read_reg(bus, opcode);
                self.alu_dispatch(opcode >> 3, value);
                if opcode & 7 == 6 { 7 } else { 4 }
            }
            op if op & 0xC7 == 0xC6 => {
                // ALU A,n
                let value = self.fetch(bus);
                self.alu_dispatch(op >> 3, value);
                7
            }
            op if op & 0xC7 == 0x04 => {
                // INC r
                let code = (op >> 3) & 7;
                let value = self.read_reg(bus, code);
                let result = self.inc8(value);
                self.write_reg(bus, code, result);
                if code == 6 { 11 } else { 4 }
            }
            op if op & 0xC7 == 0x05 => {
                // DEC r
                let code = (op >> 3) & 7;
                let value = self.read_reg(bus, code);
                let result = self.dec8(value);
                self.write_reg(bus, code, result);
                if code == 6 { 11 } else { 4 }
            }
            0x27 => {
                self.daa();
                4
            }
            0x2F => {
                // CPL
                self.a = !self.a;
                self.flags.half_carry = true;
                self.flags.add_sub = true;
                4
            }
            0x37 => {
                // SCF
                self.flags.carry = true;
                self.flags.half_carry = false;
                self.flags.add_sub = false;
                4
            }
            0x3F => {
                // CCF - H takes the old carry
                self.flags.half_carry = self.flags.carry;
                self.flags.carry = !self.flags.carry;
                self.flags.add_sub = false;
                4
            }

            // =====================================================================
            // 16-bit arithmetic
            // =====================================================================
            op if op & 0xCF == 0x09 => {
                // ADD HL,rp
                let value = self.rp_get(op >> 4);
                let result = self.add16(self.hl(), value);
                self.set_hl(result);
                11
            }
            op if op & 0xCF == 0x03 => {
                // INC rp - no flags
                let value = self.rp_get(op >> 4).wrapping_add(1);
                self.rp_set(op >> 4, value);
                6
            }
            op if op & 0xCF == 0x0B => {
                // DEC rp - no flags
                let value = self.rp_get(op >> 4).wrapping_sub(1);
                self.rp_set(op >> 4, value);
                6
            }

            // =====================================================================
            // Accumulator rotates
            // =====================================================================
            0x07 => {
                self.rlca();
                4
            }
            0x0F => {
                self.rrca();
                4
            }
            0x17 => {
                self.rla();
                4
            }
            0x1F => {
                self.rra();
                4
            }

            // =====================================================================
            // Jumps, calls and returns
            // =====================================================================
            0xC3 => {
                // JP nn
                self.pc = self.fetch_word(bus);
                10
            }
            op if op & 0xC7 == 0xC2 => {
                // JP cc,nn - the operand is consumed either way
                let addr = self.fetch_word(bus);
                if self.condition(op >> 3) {
                    self.pc = addr;
                }
                10
            }
            0xE9 => {
                // JP (HL)
                self.pc = self.hl();
                4
            }
            0x18 => {
                // JR d
                let offset = self.fetch(bus) as i8;
                self.pc = self.pc.wrapping_add(offset as u16);
                12
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                // JR cc,d
                let offset = self.fetch(bus) as i8;
                if self.condition((opcode >> 3) & 3) {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    12
                } else {
                    7
                }
            }
            0x10 => {
                // DJNZ d
                let offset = self.fetch(bus) as i8;
                self.b = self.b.wrapping_sub(1);
                if self.b != 0 {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    13
                } else {
                    8
                }
            }
            0xCD => {
                // CALL nn
                let addr = self.fetch_word(bus);
                self.push_word(bus, self.pc);
                self.pc = addr;
                17
            }
            op if op & 0xC7 == 0xC4 => {
                // CALL cc,nn
                let addr = self.fetch_word(bus);
                if self.condition(op >> 3) {
                    self.push_word(bus, self.pc);
                    self.pc = addr;
                    17
                } else {
                    10
                }
            }
            0xC9 => {
                // RET
                self.pc = self.pop_word(bus);
                10
            }
            op if op & 0xC7 == 0xC0 => {
                // RET cc
                if self.condition(op >> 3) {
                    self.pc = self.pop_word(bus);
                    11
                } else {
                    5
                }
            }
            op if op & 0xC7 == 0xC7 => {
                // RST p
                self.push_word(bus, self.pc);
                self.pc = u16::from(op & 0x38);
                11
            }

            // =====================================================================
            // I/O
            // =====================================================================
            0xDB => {
                // IN A,(n) - port high byte from A, no flags
                let port = u16::from(self.a) << 8 | u16::from(self.fetch(bus));
                self.a = bus.read_io(port);
                11
            }
            0xD3 => {
                // OUT (n),A
                let port = u16::from(self.a) << 8 | u16::from(self.fetch(bus));
                bus.write_io(port, self.a);
                11
            }

            // =====================================================================
            // Interrupt control
            // =====================================================================
            0xF3 => {
                // DI
                self.iff = false;
                4
            }
            0xFB => {
                // EI
                self.iff = true;
                4
            }

            // =====================================================================
            // Prefixes
            // =====================================================================
            0xCB => self.execute_cb(bus),
            0xED => self.execute_ed(bus),
            0xDD => self.execute_indexed(bus, false),
            0xFD => self.execute_indexed(bus, true),

            // the arms above cover all 256 encodings
            _ => unreachable!("unprefixed opcode table is total"),
        }
    }

    /// CB prefix: rotates, shifts and bit operations on registers or (HL).
    fn execute_cb(&mut self, bus: &mut impl Bus) -> u32 {
        let op = self.fetch_opcode(bus);
        let code = op & 7;
        let bit = (op >> 3) & 7;

        match op >> 6 {
            0 => {
                let value = self.read_reg(bus, code);
                let result = self.rotate_shift(bit, value);
                self.write_reg(bus, code, result);
                if code == 6 { 15 } else { 8 }
            }
            1 => {
                // BIT b,r
                let value = self.read_reg(bus, code);
                self.bit_test(bit, value);
                if code == 6 { 12 } else { 8 }
            }
            2 => {
                // RES b,r
                let value = self.read_reg(bus, code) & !(1 << bit);
                self.write_reg(bus, code, value);
                if code == 6 { 15 } else { 8 }
            }
            _ => {
                // SET b,r
                let value = self.read_reg(bus, code) | (1 << bit);
                self.write_reg(bus, code, value);
                if code == 6 { 15 } else { 8 }
            }
        }
    }

    /// ED prefix: I/O through BC, 16-bit carry arithmetic, the interrupt
    /// plumbing and the block instructions.
    fn execute_ed(&mut self, bus: &mut impl IoBus) -> u32 {
        let op = self.fetch_opcode(bus);
        match op {
            0x47 => {
                // LD I,A
                self.i = self.a;
                9
            }
            0x4F => {
                // LD R,A
                self.r = self.a;
                9
            }
            0x57 => {
                // LD A,I - PV reports IFF
                self.a = self.i;
                self.iff_load_flags();
                9
            }
            0x5F => {
                // LD A,R
                self.a = self.r;
                self.iff_load_flags();
                9
            }
            0x67 => {
                // RRD - low nibble of A rotates through (HL)
                let mem = bus.read(self.hl());
                bus.write(self.hl(), (mem >> 4) | (self.a << 4));
                self.a = (self.a & 0xF0) | (mem & 0x0F);
                let a = self.a;
                self.in_flags(a);
                18
            }
            0x6F => {
                // RLD
                let mem = bus.read(self.hl());
                bus.write(self.hl(), (mem << 4) | (self.a & 0x0F));
                self.a = (self.a & 0xF0) | (mem >> 4);
                let a = self.a;
                self.in_flags(a);
                18
            }
            0x46 | 0x4E | 0x66 | 0x6E => {
                self.im = 0;
                8
            }
            0x56 | 0x76 => {
                self.im = 1;
                8
            }
            0x5E | 0x7E => {
                self.im = 2;
                8
            }

            op if op & 0xC7 == 0x40 => {
                // IN r,(C); ED70 tests the port and discards the value
                let value = bus.read_io(self.bc());
                self.in_flags(value);
                let code = (op >> 3) & 7;
                if code != 6 {
                    self.write_reg(bus, code, value);
                }
                12
            }
            op if op & 0xC7 == 0x41 => {
                // OUT (C),r; ED71 outputs zero
                let code = (op >> 3) & 7;
                let value = if code == 6 {
                    0
                } else {
                    self.read_reg(bus, code)
                };
                bus.write_io(self.bc(), value);
                12
            }
            op if op & 0xCF == 0x42 => {
                // SBC HL,rp
                let value = self.rp_get(op >> 4);
                let result = self.sbc16(self.hl(), value);
                self.set_hl(result);
                15
            }
            op if op & 0xCF == 0x4A => {
                // ADC HL,rp
                let value = self.rp_get(op >> 4);
                let result = self.adc16(self.hl(), value);
                self.set_hl(result);
                15
            }
            op if op & 0xCF == 0x43 => {
                // LD (nn),rp
                let addr = self.fetch_word(bus);
                self.write_word(bus, addr, self.rp_get(op >> 4));
                20
            }
            op if op & 0xCF == 0x4B => {
                // LD rp,(nn)
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.rp_set(op >> 4, value);
                20
            }
            op if op & 0xC7 == 0x44 => {
                // NEG (and its mirrors)
                self.neg();
                8
            }
            op if op & 0xC7 == 0x45 => {
                // RETN/RETI (and mirrors): pop the return address
                self.pc = self.pop_word(bus);
                14
            }

            // Block transfer and search
            0xA0 => {
                self.block_transfer(bus, 1);
                16
            }
            0xA8 => {
                self.block_transfer(bus, -1);
                16
            }
            0xB0 => {
                // LDIR
                self.block_transfer(bus, 1);
                self.block_repeat(self.bc() != 0)
            }
            0xB8 => {
                // LDDR
                self.block_transfer(bus, -1);
                self.block_repeat(self.bc() != 0)
            }
            0xA1 => {
                self.block_compare(bus, 1);
                16
            }
            0xA9 => {
                self.block_compare(bus, -1);
                16
            }
            0xB1 => {
                // CPIR
                self.block_compare(bus, 1);
                self.block_repeat(self.bc() != 0 && !self.flags.zero)
            }
            0xB9 => {
                // CPDR
                self.block_compare(bus, -1);
                self.block_repeat(self.bc() != 0 && !self.flags.zero)
            }

            _ => {
                self.illegal_opcodes += 1;
                0
            }
        }
    }

    /// Flag effect of LD A,I / LD A,R.
    fn iff_load_flags(&mut self) {
        self.flags.sign = self.a & 0x80 != 0;
        self.flags.zero = self.a == 0;
        self.flags.half_carry = false;
        self.flags.parity_overflow = self.iff;
        self.flags.add_sub = false;
    }

    /// LDI/LDD body: copy (HL) to (DE), step both, decrement BC.
    fn block_transfer(&mut self, bus: &mut impl Bus, delta: i16) {
        let value = bus.read(self.hl());
        bus.write(self.de(), value);
        self.set_hl(self.hl().wrapping_add(delta as u16));
        self.set_de(self.de().wrapping_add(delta as u16));
        self.set_bc(self.bc().wrapping_sub(1));
        self.flags.half_carry = false;
        self.flags.add_sub = false;
        self.flags.parity_overflow = self.bc() != 0;
    }

    /// CPI/CPD body: compare A with (HL) leaving carry alone, step HL,
    /// decrement BC.
    fn block_compare(&mut self, bus: &mut impl Bus, delta: i16) {
        let value = bus.read(self.hl());
        let result = self.a.wrapping_sub(value);
        self.flags.sign = result & 0x80 != 0;
        self.flags.zero = result == 0;
        self.flags.half_carry = (self.a & 0x0F) < (value & 0x0F);
        self.flags.add_sub = true;
        self.set_hl(self.hl().wrapping_add(delta as u16));
        self.set_bc(self.bc().wrapping_sub(1));
        self.flags.parity_overflow = self.bc() != 0;
    }

    /// Repeat step of LDIR/LDDR/CPIR/CPDR: rewind PC over the two prefix
    /// bytes while the loop continues.
    fn block_repeat(&mut self, again: bool) -> u32 {
        if again {
            self.pc = self.pc.wrapping_sub(2);
            21
        } else {
            16
        }
    }

    /// DD/FD prefix: the HL forms rerouted through IX or IY with a signed
    /// displacement for the memory operand.
    fn execute_indexed(&mut self, bus: &mut impl Bus, use_iy: bool) -> u32 {
        let op = self.fetch_opcode(bus);
        match op {
            0x21 => {
                // LD IX,nn
                let value = self.fetch_word(bus);
                self.index_set(use_iy, value);
                14
            }
            0x22 => {
                // LD (nn),IX
                let addr = self.fetch_word(bus);
                self.write_word(bus, addr, self.index(use_iy));
                20
            }
            0x2A => {
                // LD IX,(nn)
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.index_set(use_iy, value);
                20
            }
            0x23 => {
                let value = self.index(use_iy).wrapping_add(1);
                self.index_set(use_iy, value);
                10
            }
            0x2B => {
                let value = self.index(use_iy).wrapping_sub(1);
                self.index_set(use_iy, value);
                10
            }
            op if op & 0xCF == 0x09 => {
                // ADD IX,rp - rp code 2 names IX itself
                let value = if (op >> 4) & 3 == 2 {
                    self.index(use_iy)
                } else {
                    self.rp_get(op >> 4)
                };
                let result = self.add16(self.index(use_iy), value);
                self.index_set(use_iy, result);
                15
            }
            0x34 => {
                // INC (IX+d)
                let addr = self.index_addr(bus, use_iy);
                let value = bus.read(addr);
                let result = self.inc8(value);
                bus.write(addr, result);
                23
            }
            0x35 => {
                // DEC (IX+d)
                let addr = self.index_addr(bus, use_iy);
                let value = bus.read(addr);
                let result = self.dec8(value);
                bus.write(addr, result);
                23
            }
            0x36 => {
                // LD (IX+d),n - displacement precedes the immediate
                let addr = self.index_addr(bus, use_iy);
                let value = self.fetch(bus);
                bus.write(addr, value);
                19
            }
            op if op & 0xC7 == 0x46 && (op >> 3) & 7 != 6 => {
                // LD r,(IX+d)
                let addr = self.index_addr(bus, use_iy);
                let value = bus.read(addr);
                self.write_reg(bus, op >> 3, value);
                19
            }
            0x70..=0x75 | 0x77 => {
                // LD (IX+d),r
                let addr = self.index_addr(bus, use_iy);
                let value = self.read_reg_no_mem(op);
                bus.write(addr, value);
                19
            }
            op if op & 0xC7 == 0x86 => {
                // ALU A,(IX+d)
                let addr = self.index_addr(bus, use_iy);
                let value = bus.read(addr);
                self.alu_dispatch(op >> 3, value);
                19
            }
            0xE1 => {
                // POP IX
                let value = self.pop_word(bus);
                self.index_set(use_iy, value);
                14
            }
            0xE5 => {
                // PUSH IX
                self.push_word(bus, self.index(use_iy));
                15
            }
            0xE3 => {
                // EX (SP),IX
                let mem = self.read_word(bus, self.sp);
                self.write_word(bus, self.sp, self.index(use_iy));
                self.index_set(use_iy, mem);
                23
            }
            0xE9 => {
                // JP (IX)
                self.pc = self.index(use_iy);
                8
            }
            0xF9 => {
                // LD SP,IX
                self.sp = self.index(use_iy);
                10
            }
            0xCB => self.execute_indexed_cb(bus, use_iy),

            _ => {
                self.illegal_opcodes += 1;
                0
            }
        }
    }

    /// DDCB/FDCB: bit operations on (IX+d). The displacement byte sits
    /// between the prefix and the sub-opcode.
    fn execute_indexed_cb(&mut self, bus: &mut impl Bus, use_iy: bool) -> u32 {
        let addr = self.index_addr(bus, use_iy);
        let op = self.fetch(bus);
        let bit = (op >> 3) & 7;

        match op >> 6 {
            0 => {
                let value = bus.read(addr);
                let result = self.rotate_shift(bit, value);
                bus.write(addr, result);
                23
            }
            1 => {
                // BIT b,(IX+d)
                let value = bus.read(addr);
                self.bit_test(bit, value);
                20
            }
            2 => {
                // RES b,(IX+d)
                let value = bus.read(addr) & !(1 << bit);
                bus.write(addr, value);
                23
            }
            _ => {
                // SET b,(IX+d)
                let value = bus.read(addr) | (1 << bit);
                bus.write(addr, value);
                23
            }
        }
    }

    fn index(&self, use_iy: bool) -> u16 {
        if use_iy { self.iy } else { self.ix }
    }

    fn index_set(&mut self, use_iy: bool, value: u16) {
        if use_iy {
            self.iy = value;
        } else {
            self.ix = value;
        }
    }

    /// Fetch the displacement and form IX+d / IY+d.
    fn index_addr(&mut self, bus: &mut impl Bus, use_iy: bool) -> u16 {
        let offset = self.fetch(bus) as i8;
        self.index(use_iy).wrapping_add(offset as u16)
    }

    /// Source register for LD (IX+d),r — code 6 never reaches here.
    fn read_reg_no_mem(&self, code: u8) -> u8 {
        match code & 7 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            _ => self.a,
        }
    }
}

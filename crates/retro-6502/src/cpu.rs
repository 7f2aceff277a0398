//! 6502 execution core: dispatch, ALU and interrupt entry.

use std::num::NonZeroU32;

use retro_core::{Bus, Cpu, FrameClock, FrameSignal, TimeSource, WallClock};

use crate::flags::Flags;
use crate::registers::Registers;

/// Reset vector location ($FFFC/$FFFD).
const RESET_VECTOR: u16 = 0xFFFC;
/// NMI vector location ($FFFA/$FFFB).
const NMI_VECTOR: u16 = 0xFFFA;
/// IRQ/BRK vector location ($FFFE/$FFFF).
const IRQ_VECTOR: u16 = 0xFFFE;

/// The MOS 6502 CPU.
///
/// One `step()` executes one complete instruction and charges its
/// documented cycle cost to the owned [`FrameClock`], which paces the
/// emulation to real time. The bus is passed to every call that touches
/// memory; the core never owns it.
///
/// Interrupts are serviced synchronously inside [`Mos6502::trigger_nmi`]
/// and [`Mos6502::trigger_irq`] — the core does not poll a pending line
/// between instructions. The host decides when in its frame loop to raise
/// them.
pub struct Mos6502<T = WallClock> {
    /// Accumulator.
    pub(crate) a: u8,
    /// X index register.
    pub(crate) x: u8,
    /// Y index register.
    pub(crate) y: u8,
    /// Stack pointer.
    pub(crate) sp: u8,
    /// Program counter.
    pub(crate) pc: u16,
    /// Individual status flags.
    pub(crate) flags: Flags,

    /// Cycle accounting and real-time frame pacing.
    clock: FrameClock<T>,

    /// Opcodes that fell through the dispatch. Undocumented opcodes
    /// execute as no-ops and charge no cycles; the count lets hosts
    /// detect that a program strayed into them.
    illegal_opcodes: u64,
}

impl Mos6502<WallClock> {
    /// Create a core paced against real time.
    ///
    /// `cycles_per_frame = clock_hz / frame_rate` (truncating division).
    #[must_use]
    pub fn new(clock_hz: u32, frame_rate: NonZeroU32) -> Self {
        Self::with_time_source(clock_hz, frame_rate, WallClock::new())
    }
}

impl<T: TimeSource> Mos6502<T> {
    /// Create a core with an explicit time source (deterministic tests).
    #[must_use]
    pub fn with_time_source(clock_hz: u32, frame_rate: NonZeroU32, time: T) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            flags: Flags::power_on(),
            clock: FrameClock::with_time_source(clock_hz, frame_rate, time),
            illegal_opcodes: 0,
        }
    }

    /// Trigger the non-maskable interrupt. Always serviced.
    ///
    /// Pushes PC and status (B clear), sets I and loads PC from $FFFA.
    pub fn trigger_nmi(&mut self, bus: &mut impl Bus) -> bool {
        self.interrupt_entry(bus, NMI_VECTOR);
        true
    }

    /// Trigger a maskable interrupt.
    ///
    /// Serviced only while the I flag is clear; returns whether it was
    /// taken so the host knows to re-assert later.
    pub fn trigger_irq(&mut self, bus: &mut impl Bus) -> bool {
        if self.flags.irq_disable {
            return false;
        }
        self.interrupt_entry(bus, IRQ_VECTOR);
        true
    }

    /// Common interrupt entry: push PC and status, disable IRQs, load the
    /// vector. 7 cycles, same as BRK.
    fn interrupt_entry(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push_word(bus, self.pc);
        let p = self.flags.to_byte_irq();
        self.push(bus, p);
        self.flags.irq_disable = true;
        self.pc = self.read_word(bus, vector);
        self.clock.advance(7);
    }
}

impl<T> Mos6502<T> {
    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Packed status byte (bit 5 set).
    pub fn status(&self) -> u8 {
        self.flags.to_byte()
    }

    /// Current program counter.
    ///
    /// Inherent so callers do not have to name a bus type just to read it;
    /// the [`Cpu`] impl delegates here.
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Snapshot of all architectural registers. Pure read; also inherent,
    /// like [`Mos6502::pc`].
    #[must_use]
    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            p: self.flags.to_byte(),
        }
    }

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Load a packed status byte into the individual flags.
    pub fn set_status(&mut self, value: u8) {
        self.flags = Flags::from_byte(value);
    }

    /// Cycles accumulated since the last frame boundary.
    pub fn cycles(&self) -> i64 {
        self.clock.cycles()
    }

    /// Number of unrecognised opcodes executed so far.
    pub fn illegal_opcodes(&self) -> u64 {
        self.illegal_opcodes
    }

    // =========================================================================
    // ALU operations
    // =========================================================================

    /// ADC - add with carry, honouring decimal mode.
    fn adc(&mut self, value: u8) {
        if self.flags.decimal {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = u16::from(self.a);
        let v = u16::from(value);
        let c = u16::from(self.flags.carry);

        let result = a + v + c;
        let result8 = result as u8;

        self.flags.carry = result > 0xFF;
        self.flags.overflow = (self.a ^ result8) & (value ^ result8) & 0x80 != 0;
        self.flags.set_nz(result8);
        self.a = result8;
    }

    /// NMOS BCD add: Z comes from the binary sum, N/V from the
    /// intermediate high nibble.
    fn adc_decimal(&mut self, value: u8) {
        let a = u16::from(self.a);
        let v = u16::from(value);
        let c = u16::from(self.flags.carry);

        let mut low = (a & 0x0F) + (v & 0x0F) + c;
        if low > 9 {
            low += 6;
        }

        let mut high = (a >> 4) + (v >> 4) + u16::from(low > 0x0F);

        let binary = a + v + c;
        self.flags.zero = binary as u8 == 0;
        self.flags.negative = high & 0x08 != 0;
        self.flags.overflow = (a ^ binary) & (v ^ binary) & 0x80 != 0;

        if high > 9 {
            high += 6;
        }
        self.flags.carry = high > 0x0F;
        self.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    /// SBC - subtract with borrow, honouring decimal mode.
    fn sbc(&mut self, value: u8) {
        if self.flags.decimal {
            self.sbc_decimal(value);
        } else {
            self.sbc_binary(value);
        }
    }

    fn sbc_binary(&mut self, value: u8) {
        let a = u16::from(self.a);
        let v = u16::from(value);
        let borrow = u16::from(!self.flags.carry);

        let result = a.wrapping_sub(v).wrapping_sub(borrow);
        let result8 = result as u8;

        self.flags.carry = result < 0x100;
        self.flags.overflow = (self.a ^ value) & (self.a ^ result8) & 0x80 != 0;
        self.flags.set_nz(result8);
        self.a = result8;
    }

    /// NMOS BCD subtract: all flags come from the binary difference.
    fn sbc_decimal(&mut self, value: u8) {
        let a = i16::from(self.a);
        let v = i16::from(value);
        let borrow = i16::from(!self.flags.carry);

        let mut low = (a & 0x0F) - (v & 0x0F) - borrow;
        if low < 0 {
            low = ((low - 6) & 0x0F) - 0x10;
        }

        let mut high = (a >> 4) - (v >> 4) + if low < 0 { -1 } else { 0 };
        if high < 0 {
            high = (high - 6) & 0x0F;
        }

        let binary = a.wrapping_sub(v).wrapping_sub(borrow);
        self.flags.carry = binary >= 0;
        self.flags.zero = binary as u8 == 0;
        self.flags.negative = binary & 0x80 != 0;
        self.flags.overflow = (a ^ binary) & (!v ^ binary) & 0x80 != 0;

        self.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    /// CMP/CPX/CPY - compare a register against a value.
    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.flags.carry = reg >= value;
        self.flags.set_nz(result);
    }

    /// ASL - arithmetic shift left.
    fn asl(&mut self, value: u8) -> u8 {
        self.flags.carry = value & 0x80 != 0;
        let result = value << 1;
        self.flags.set_nz(result);
        result
    }

    /// LSR - logical shift right.
    fn lsr(&mut self, value: u8) -> u8 {
        self.flags.carry = value & 0x01 != 0;
        let result = value >> 1;
        self.flags.set_nz(result);
        result
    }

    /// ROL - rotate left through carry.
    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.flags.carry);
        self.flags.carry = value & 0x80 != 0;
        let result = (value << 1) | carry_in;
        self.flags.set_nz(result);
        result
    }

    /// ROR - rotate right through carry.
    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.flags.carry { 0x80 } else { 0 };
        self.flags.carry = value & 0x01 != 0;
        let result = (value >> 1) | carry_in;
        self.flags.set_nz(result);
        result
    }

    /// INC - increment a value.
    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.flags.set_nz(result);
        result
    }

    /// DEC - decrement a value.
    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.flags.set_nz(result);
        result
    }

    /// BIT - test bits: Z from A & value, N and V from the operand.
    fn bit(&mut self, value: u8) {
        self.flags.zero = self.a & value == 0;
        self.flags.negative = value & 0x80 != 0;
        self.flags.overflow = value & 0x40 != 0;
    }
}

impl<B: Bus, T: TimeSource> Cpu<B> for Mos6502<T> {
    type Registers = Registers;

    fn step(&mut self, bus: &mut B) -> FrameSignal {
        let opcode = self.fetch(bus);
        let cycles = self.execute(bus, opcode);
        self.clock.advance(cycles);
        self.clock.finish_instruction()
    }

    fn reset(&mut self, bus: &mut B) -> bool {
        // PC comes from the reset vector, read through the bus; against
        // the NullBus stub this yields PC = 0 rather than a fault.
        self.pc = self.read_word(bus, RESET_VECTOR);
        self.sp = 0xFD;
        self.flags = Flags::power_on();
        self.a = 0;
        self.x = 0;
        self.y = 0;
        true
    }

    fn interrupt(&mut self, bus: &mut B) -> bool {
        self.trigger_irq(bus)
    }

    fn registers(&self) -> Registers {
        Mos6502::registers(self)
    }

    fn pc(&self) -> u16 {
        Mos6502::pc(self)
    }
}

impl<T> Mos6502<T> {
    /// Read-modify-write against a memory operand.
    fn rmw(&mut self, bus: &mut impl Bus, addr: u16, op: fn(&mut Self, u8) -> u8) {
        let value = bus.read(addr);
        let result = op(self, value);
        bus.write(addr, result);
    }

    /// Execute one instruction, returning its cycle cost.
    fn execute(&mut self, bus: &mut impl Bus, opcode: u8) -> u32 {
        match opcode {
            // =====================================================================
            // Load/Store
            // =====================================================================

            // LDA
            0xA9 => {
                let value = self.fetch(bus);
                self.a = value;
                self.flags.set_nz(value);
                2
            }
            0xA5 => {
                let addr = self.addr_zero_page(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                3
            }
            0xB5 => {
                let addr = self.addr_zero_page_x(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0xAD => {
                let addr = self.addr_absolute(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0xBD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0xB9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0xA1 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                6
            }
            0xB1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a = bus.read(addr);
                self.flags.set_nz(self.a);
                5 + u32::from(crossed)
            }

            // LDX
            0xA2 => {
                let value = self.fetch(bus);
                self.x = value;
                self.flags.set_nz(value);
                2
            }
            0xA6 => {
                let addr = self.addr_zero_page(bus);
                self.x = bus.read(addr);
                self.flags.set_nz(self.x);
                3
            }
            0xB6 => {
                let addr = self.addr_zero_page_y(bus);
                self.x = bus.read(addr);
                self.flags.set_nz(self.x);
                4
            }
            0xAE => {
                let addr = self.addr_absolute(bus);
                self.x = bus.read(addr);
                self.flags.set_nz(self.x);
                4
            }
            0xBE => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.x = bus.read(addr);
                self.flags.set_nz(self.x);
                4 + u32::from(crossed)
            }

            // LDY
            0xA0 => {
                let value = self.fetch(bus);
                self.y = value;
                self.flags.set_nz(value);
                2
            }
            0xA4 => {
                let addr = self.addr_zero_page(bus);
                self.y = bus.read(addr);
                self.flags.set_nz(self.y);
                3
            }
            0xB4 => {
                let addr = self.addr_zero_page_x(bus);
                self.y = bus.read(addr);
                self.flags.set_nz(self.y);
                4
            }
            0xAC => {
                let addr = self.addr_absolute(bus);
                self.y = bus.read(addr);
                self.flags.set_nz(self.y);
                4
            }
            0xBC => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.y = bus.read(addr);
                self.flags.set_nz(self.y);
                4 + u32::from(crossed)
            }

            // STA
            0x85 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.a);
                3
            }
            0x95 => {
                let addr = self.addr_zero_page_x(bus);
                bus.write(addr, self.a);
                4
            }
            0x8D => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.a);
                4
            }
            0x9D => {
                let (addr, _) = self.addr_absolute_x(bus);
                bus.write(addr, self.a);
                5
            }
            0x99 => {
                let (addr, _) = self.addr_absolute_y(bus);
                bus.write(addr, self.a);
                5
            }
            0x81 => {
                let addr = self.addr_indexed_indirect(bus);
                bus.write(addr, self.a);
                6
            }
            0x91 => {
                let (addr, _) = self.addr_indirect_indexed(bus);
                bus.write(addr, self.a);
                6
            }

            // STX
            0x86 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.x);
                3
            }
            0x96 => {
                let addr = self.addr_zero_page_y(bus);
                bus.write(addr, self.x);
                4
            }
            0x8E => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.x);
                4
            }

            // STY
            0x84 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.y);
                3
            }
            0x94 => {
                let addr = self.addr_zero_page_x(bus);
                bus.write(addr, self.y);
                4
            }
            0x8C => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.y);
                4
            }

            // =====================================================================
            // Register transfers
            // =====================================================================
            0xAA => {
                // TAX
                self.x = self.a;
                self.flags.set_nz(self.x);
                2
            }
            0xA8 => {
                // TAY
                self.y = self.a;
                self.flags.set_nz(self.y);
                2
            }
            0x8A => {
                // TXA
                self.a = self.x;
                self.flags.set_nz(self.a);
                2
            }
            0x98 => {
                // TYA
                self.a = self.y;
                self.flags.set_nz(self.a);
                2
            }
            0xBA => {
                // TSX
                self.x = self.sp;
                self.flags.set_nz(self.x);
                2
            }
            0x9A => {
                // TXS - no flags
                self.sp = self.x;
                2
            }

            // =====================================================================
            // Stack
            // =====================================================================
            0x48 => {
                // PHA
                self.push(bus, self.a);
                3
            }
            0x08 => {
                // PHP - B reads set in the pushed byte
                let p = self.flags.to_byte_brk();
                self.push(bus, p);
                3
            }
            0x68 => {
                // PLA
                self.a = self.pull(bus);
                self.flags.set_nz(self.a);
                4
            }
            0x28 => {
                // PLP
                let p = self.pull(bus);
                self.flags = Flags::from_byte(p);
                4
            }

            // =====================================================================
            // Arithmetic
            // =====================================================================

            // ADC
            0x69 => {
                let value = self.fetch(bus);
                self.adc(value);
                2
            }
            0x65 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.adc(value);
                3
            }
            0x75 => {
                let addr = self.addr_zero_page_x(bus);
                let value = bus.read(addr);
                self.adc(value);
                4
            }
            0x6D => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.adc(value);
                4
            }
            0x7D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.adc(value);
                4 + u32::from(crossed)
            }
            0x79 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.adc(value);
                4 + u32::from(crossed)
            }
            0x61 => {
                let addr = self.addr_indexed_indirect(bus);
                let value = bus.read(addr);
                self.adc(value);
                6
            }
            0x71 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let value = bus.read(addr);
                self.adc(value);
                5 + u32::from(crossed)
            }

            // SBC
            0xE9 => {
                let value = self.fetch(bus);
                self.sbc(value);
                2
            }
            0xE5 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.sbc(value);
                3
            }
            0xF5 => {
                let addr = self.addr_zero_page_x(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4
            }
            0xED => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4
            }
            0xFD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4 + u32::from(crossed)
            }
            0xF9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4 + u32::from(crossed)
            }
            0xE1 => {
                let addr = self.addr_indexed_indirect(bus);
                let value = bus.read(addr);
                self.sbc(value);
                6
            }
            0xF1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let value = bus.read(addr);
                self.sbc(value);
                5 + u32::from(crossed)
            }

            // CMP
            0xC9 => {
                let value = self.fetch(bus);
                self.compare(self.a, value);
                2
            }
            0xC5 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                3
            }
            0xD5 => {
                let addr = self.addr_zero_page_x(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                4
            }
            0xCD => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                4
            }
            0xDD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                4 + u32::from(crossed)
            }
            0xD9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                4 + u32::from(crossed)
            }
            0xC1 => {
                let addr = self.addr_indexed_indirect(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                6
            }
            0xD1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let value = bus.read(addr);
                self.compare(self.a, value);
                5 + u32::from(crossed)
            }

            // CPX
            0xE0 => {
                let value = self.fetch(bus);
                self.compare(self.x, value);
                2
            }
            0xE4 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.compare(self.x, value);
                3
            }
            0xEC => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.compare(self.x, value);
                4
            }

            // CPY
            0xC0 => {
                let value = self.fetch(bus);
                self.compare(self.y, value);
                2
            }
            0xC4 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.compare(self.y, value);
                3
            }
            0xCC => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.compare(self.y, value);
                4
            }

            // =====================================================================
            // Increments and decrements
            // =====================================================================
            0xE6 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::inc);
                5
            }
            0xF6 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::inc);
                6
            }
            0xEE => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::inc);
                6
            }
            0xFE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::inc);
                7
            }
            0xC6 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::dec);
                5
            }
            0xD6 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::dec);
                6
            }
            0xCE => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::dec);
                6
            }
            0xDE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::dec);
                7
            }
            0xE8 => {
                // INX
                self.x = self.x.wrapping_add(1);
                self.flags.set_nz(self.x);
                2
            }
            0xC8 => {
                // INY
                self.y = self.y.wrapping_add(1);
                self.flags.set_nz(self.y);
                2
            }
            0xCA => {
                // DEX
                self.x = self.x.wrapping_sub(1);
                self.flags.set_nz(self.x);
                2
            }
            0x88 => {
                // DEY
                self.y = self.y.wrapping_sub(1);
                self.flags.set_nz(self.y);
                2
            }

            // =====================================================================
            // Shifts and rotates
            // =====================================================================
            0x0A => {
                // ASL A
                self.a = self.asl(self.a);
                2
            }
            0x06 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::asl);
                5
            }
            0x16 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::asl);
                6
            }
            0x0E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::asl);
                6
            }
            0x1E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::asl);
                7
            }
            0x4A => {
                // LSR A
                self.a = self.lsr(self.a);
                2
            }
            0x46 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::lsr);
                5
            }
            0x56 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::lsr);
                6
            }
            0x4E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::lsr);
                6
            }
            0x5E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::lsr);
                7
            }
            0x2A => {
                // ROL A
                self.a = self.rol(self.a);
                2
            }
            0x26 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::rol);
                5
            }
            0x36 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::rol);
                6
            }
            0x2E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::rol);
                6
            }
            0x3E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::rol);
                7
            }
            0x6A => {
                // ROR A
                self.a = self.ror(self.a);
                2
            }
            0x66 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::ror);
                5
            }
            0x76 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::ror);
                6
            }
            0x6E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::ror);
                6
            }
            0x7E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::ror);
                7
            }

            // =====================================================================
            // Logic
            // =====================================================================

            // AND
            0x29 => {
                let value = self.fetch(bus);
                self.a &= value;
                self.flags.set_nz(self.a);
                2
            }
            0x25 => {
                let addr = self.addr_zero_page(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                3
            }
            0x35 => {
                let addr = self.addr_zero_page_x(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x2D => {
                let addr = self.addr_absolute(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x3D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x39 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x21 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                6
            }
            0x31 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a &= bus.read(addr);
                self.flags.set_nz(self.a);
                5 + u32::from(crossed)
            }

            // ORA
            0x09 => {
                let value = self.fetch(bus);
                self.a |= value;
                self.flags.set_nz(self.a);
                2
            }
            0x05 => {
                let addr = self.addr_zero_page(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                3
            }
            0x15 => {
                let addr = self.addr_zero_page_x(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x0D => {
                let addr = self.addr_absolute(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x1D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x19 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x01 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                6
            }
            0x11 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a |= bus.read(addr);
                self.flags.set_nz(self.a);
                5 + u32::from(crossed)
            }

            // EOR
            0x49 => {
                let value = self.fetch(bus);
                self.a ^= value;
                self.flags.set_nz(self.a);
                2
            }
            0x45 => {
                let addr = self.addr_zero_page(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                3
            }
            0x55 => {
                let addr = self.addr_zero_page_x(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x4D => {
                let addr = self.addr_absolute(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                4
            }
            0x5D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x59 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                4 + u32::from(crossed)
            }
            0x41 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                6
            }
            0x51 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a ^= bus.read(addr);
                self.flags.set_nz(self.a);
                5 + u32::from(crossed)
            }

            // BIT
            0x24 => {
                let addr = self.addr_zero_page(bus);
                let value = bus.read(addr);
                self.bit(value);
                3
            }
            0x2C => {
                let addr = self.addr_absolute(bus);
                let value = bus.read(addr);
                self.bit(value);
                4
            }

            // =====================================================================
            // Jumps and subroutines
            // =====================================================================
            0x4C => {
                // JMP abs
                self.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                // JMP (ind) - with the page-boundary bug
                let ptr = self.fetch_word(bus);
                self.pc = self.read_word_page_bug(bus, ptr);
                5
            }
            0x20 => {
                // JSR - pushes the address of the last byte of the operand
                let target = self.fetch_word(bus);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
                6
            }
            0x60 => {
                // RTS
                self.pc = self.pull_word(bus).wrapping_add(1);
                6
            }
            0x40 => {
                // RTI - pull status then PC
                let p = self.pull(bus);
                self.flags = Flags::from_byte(p);
                self.pc = self.pull_word(bus);
                6
            }
            0x00 => {
                // BRK - software interrupt. Two-byte opcode: the padding
                // byte is skipped, B reads set in the pushed status.
                let _ = self.fetch(bus);
                self.push_word(bus, self.pc);
                let p = self.flags.to_byte_brk();
                self.push(bus, p);
                self.flags.irq_disable = true;
                self.pc = self.read_word(bus, IRQ_VECTOR);
                7
            }

            // =====================================================================
            // Branches - 2 cycles, +1 taken, +1 more across a page
            // =====================================================================
            0x10 => 2 + self.branch_if(bus, !self.flags.negative), // BPL
            0x30 => 2 + self.branch_if(bus, self.flags.negative),  // BMI
            0x50 => 2 + self.branch_if(bus, !self.flags.overflow), // BVC
            0x70 => 2 + self.branch_if(bus, self.flags.overflow),  // BVS
            0x90 => 2 + self.branch_if(bus, !self.flags.carry),    // BCC
            0xB0 => 2 + self.branch_if(bus, self.flags.carry),     // BCS
            0xD0 => 2 + self.branch_if(bus, !self.flags.zero),     // BNE
            0xF0 => 2 + self.branch_if(bus, self.flags.zero),      // BEQ

            // =====================================================================
            // Flag operations
            // =====================================================================
            0x18 => {
                self.flags.carry = false; // CLC
                2
            }
            0x38 => {
                self.flags.carry = true; // SEC
                2
            }
            0x58 => {
                self.flags.irq_disable = false; // CLI
                2
            }
            0x78 => {
                self.flags.irq_disable = true; // SEI
                2
            }
            0xB8 => {
                self.flags.overflow = false; // CLV
                2
            }
            0xD8 => {
                self.flags.decimal = false; // CLD
                2
            }
            0xF8 => {
                self.flags.decimal = true; // SED
                2
            }

            // NOP
            0xEA => 2,

            // Unrecognised opcode: no architectural effect, no cycles —
            // the dispatch gap is preserved but made observable.
            _ => {
                self.illegal_opcodes += 1;
                0
            }
        }
    }
}

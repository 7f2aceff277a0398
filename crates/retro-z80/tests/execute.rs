//! Instruction execution tests against a flat 64K RAM bus with a
//! recording port space.

use std::num::NonZeroU32;

use retro_core::{Bus, Cpu, FrameSignal, IoBus, ManualClock};
use retro_z80::Z80;

struct TestBus {
    ram: Vec<u8>,
    ports: Vec<u8>,
    out_log: Vec<(u16, u8)>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
            ports: vec![0; 0x10000],
            out_log: Vec::new(),
        }
    }

    fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.ram[addr as usize + i] = b;
        }
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }
}

impl IoBus for TestBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.ports[port as usize]
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.ports[port as usize] = value;
        self.out_log.push((port, value));
    }
}

fn fps(rate: u32) -> NonZeroU32 {
    NonZeroU32::new(rate).expect("nonzero")
}

/// 1 MHz at 50 fps (20_000 cycles per frame), deterministic time.
fn cpu() -> Z80<ManualClock> {
    Z80::with_time_source(1_000_000, fps(50), ManualClock::new(1))
}

/// Reset (PC forced to 0) with the given program at address 0.
fn cpu_with_program(bus: &mut TestBus, program: &[u8]) -> Z80<ManualClock> {
    bus.load(0, program);
    let mut cpu = cpu();
    assert!(cpu.reset(bus));
    cpu
}

/// Step once and return the instruction's T-state cost, read back from
/// the frame accumulator. Only valid below the frame threshold.
fn step_cycles(cpu: &mut Z80<ManualClock>, bus: &mut TestBus) -> i64 {
    let before = cpu.cycles();
    let signal = cpu.step(bus);
    assert_eq!(signal, FrameSignal::Running);
    cpu.cycles() - before
}

#[test]
fn reset_forces_pc_and_interrupt_state() {
    let mut bus = TestBus::new();
    let mut cpu = cpu();
    cpu.set_pc(0x1234);
    assert!(cpu.reset(&mut bus));
    assert_eq!(cpu.pc(), 0);
    assert!(!cpu.iff());
    assert!(!cpu.halted());
}

#[test]
fn snapshot_reads_need_no_bus_in_scope() {
    // pc() and registers() are pure reads; they must resolve without a
    // bus type anywhere in the calling scope.
    let mut cpu = cpu();
    cpu.set_pc(0x4000);
    assert_eq!(cpu.pc(), 0x4000);
    let regs = cpu.registers();
    assert_eq!(regs.pc, 0x4000);
    assert!(!regs.iff);
}

#[test]
fn parity_table_drives_the_pv_flag() {
    let mut bus = TestBus::new();
    // LD A,$03; AND A (even parity); LD A,$01; AND A (odd parity)
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0x03, 0xA7, 0x3E, 0x01, 0xA7]);

    let _ = cpu.step(&mut bus);
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.f() & 0x04, 0x04);

    let _ = cpu.step(&mut bus);
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.f() & 0x04, 0x00);
}

#[test]
fn register_loads_and_hl_indirection() {
    let mut bus = TestBus::new();
    bus.ram[0x4000] = 0x99;
    // LD HL,$4000; LD A,(HL); LD B,A; LD (HL),B
    let mut cpu = cpu_with_program(&mut bus, &[0x21, 0x00, 0x40, 0x7E, 0x47, 0x70]);

    assert_eq!(step_cycles(&mut cpu, &mut bus), 10);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a(), 0x99);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 4);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 7);
    assert_eq!(bus.ram[0x4000], 0x99);
}

#[test]
fn alu_add_sets_carry_and_overflow() {
    let mut bus = TestBus::new();
    // LD A,$7F; LD B,$01; ADD A,B
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0x7F, 0x06, 0x01, 0x80]);
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(cpu.a(), 0x80);
    let f = cpu.f();
    assert_eq!(f & 0x80, 0x80); // S
    assert_eq!(f & 0x04, 0x04); // PV overflow
    assert_eq!(f & 0x10, 0x10); // H
    assert_eq!(f & 0x01, 0x00); // no carry
}

#[test]
fn sub_sets_add_sub_and_borrow() {
    let mut bus = TestBus::new();
    // LD A,$10; SUB $20
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0x10, 0xD6, 0x20]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.a(), 0xF0);
    let f = cpu.f();
    assert_eq!(f & 0x02, 0x02); // N
    assert_eq!(f & 0x01, 0x01); // borrow
}

#[test]
fn inc_dec_leave_carry_alone() {
    let mut bus = TestBus::new();
    // SCF; LD A,$FF; INC A
    let mut cpu = cpu_with_program(&mut bus, &[0x37, 0x3E, 0xFF, 0x3C]);
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(cpu.a(), 0x00);
    let f = cpu.f();
    assert_eq!(f & 0x40, 0x40); // Z
    assert_eq!(f & 0x01, 0x01); // carry untouched
}

#[test]
fn daa_adjusts_bcd_addition() {
    let mut bus = TestBus::new();
    // LD A,$15; ADD A,$27; DAA -> $42
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0x15, 0xC6, 0x27, 0x27]);
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(cpu.a(), 0x42);
    assert_eq!(cpu.f() & 0x01, 0x00);
}

#[test]
fn shadow_exchanges_swap_both_directions() {
    let mut bus = TestBus::new();
    // LD A,$AA; EX AF,AF'; EX AF,AF'
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0xAA, 0x08, 0x08]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.a(), 0x00); // alternate set starts zeroed
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.a(), 0xAA);
}

#[test]
fn exx_swaps_the_three_pairs() {
    let mut bus = TestBus::new();
    // LD BC,$1122; LD DE,$3344; LD HL,$5566; EXX; EXX
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0x01, 0x22, 0x11, 0x11, 0x44, 0x33, 0x21, 0x66, 0x55, 0xD9, 0xD9],
    );
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(step_cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.de(), 0);
    assert_eq!(cpu.hl(), 0);
    let regs = cpu.registers();
    assert_eq!(regs.bc_alt, 0x1122);
    assert_eq!(regs.de_alt, 0x3344);
    assert_eq!(regs.hl_alt, 0x5566);

    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.bc(), 0x1122);
    assert_eq!(cpu.de(), 0x3344);
    assert_eq!(cpu.hl(), 0x5566);
}

#[test]
fn djnz_loops_with_differing_costs() {
    let mut bus = TestBus::new();
    // LD B,$02; DJNZ -2 (spins on itself)
    let mut cpu = cpu_with_program(&mut bus, &[0x06, 0x02, 0x10, 0xFE]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 13); // taken
    assert_eq!(cpu.pc(), 0x0002);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 8); // B hits zero
    assert_eq!(cpu.pc(), 0x0004);
}

#[test]
fn call_and_ret_roundtrip() {
    let mut bus = TestBus::new();
    bus.load(0x4000, &[0xC9]); // RET
    // LD SP,$8000; CALL $4000; NOP
    let mut cpu = cpu_with_program(&mut bus, &[0x31, 0x00, 0x80, 0xCD, 0x00, 0x40, 0x00]);

    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 17);
    assert_eq!(cpu.pc(), 0x4000);
    assert_eq!(cpu.sp(), 0x7FFE);
    // return address little-endian on the stack
    assert_eq!(bus.ram[0x7FFE], 0x06);
    assert_eq!(bus.ram[0x7FFF], 0x00);

    assert_eq!(step_cycles(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.pc(), 0x0006);
    assert_eq!(cpu.sp(), 0x8000);
}

#[test]
fn conditional_return_costs() {
    let mut bus = TestBus::new();
    bus.load(0x4000, &[0xC0, 0xC8]); // RET NZ (not taken); RET Z (taken)
    // LD SP,$8000; LD A,$00; AND A (sets Z); CALL $4000
    let mut cpu =
        cpu_with_program(&mut bus, &[0x31, 0x00, 0x80, 0x3E, 0x00, 0xA7, 0xCD, 0x00, 0x40]);
    for _ in 0..4 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(cpu.pc(), 0x4000);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 5); // refused
    assert_eq!(step_cycles(&mut cpu, &mut bus), 11); // taken
    assert_eq!(cpu.pc(), 0x0009);
}

#[test]
fn push_pop_af_round_trips_flags() {
    let mut bus = TestBus::new();
    // LD SP,$8000; LD A,$00; AND A; PUSH AF; LD A,$FF; OR A; POP AF
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0x31, 0x00, 0x80, 0x3E, 0x00, 0xA7, 0xF5, 0x3E, 0xFF, 0xB7, 0xF1],
    );
    for _ in 0..6 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(cpu.f() & 0x40, 0x00); // Z cleared by OR
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.a(), 0x00);
    assert_eq!(cpu.f() & 0x40, 0x40); // Z restored
}

#[test]
fn sbc_hl_full_flag_effect() {
    let mut bus = TestBus::new();
    // LD HL,$1000; LD BC,$1000; AND A (clear carry); SBC HL,BC
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0x21, 0x00, 0x10, 0x01, 0x00, 0x10, 0xA7, 0xED, 0x42],
    );
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(step_cycles(&mut cpu, &mut bus), 15);
    assert_eq!(cpu.hl(), 0);
    let f = cpu.f();
    assert_eq!(f & 0x40, 0x40); // Z over all 16 bits
    assert_eq!(f & 0x02, 0x02); // N
}

#[test]
fn ldir_copies_and_repeats() {
    let mut bus = TestBus::new();
    bus.load(0x4000, &[0xDE, 0xAD, 0xBE]);
    // LD HL,$4000; LD DE,$5000; LD BC,$0003; LDIR
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0x21, 0x00, 0x40, 0x11, 0x00, 0x50, 0x01, 0x03, 0x00, 0xED, 0xB0],
    );
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    assert_eq!(step_cycles(&mut cpu, &mut bus), 21);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 21);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 16); // final iteration
    assert_eq!(&bus.ram[0x5000..0x5003], &[0xDE, 0xAD, 0xBE]);
    assert_eq!(cpu.bc(), 0);
    assert_eq!(cpu.hl(), 0x4003);
    assert_eq!(cpu.de(), 0x5003);
    assert_eq!(cpu.f() & 0x04, 0x00); // PV clear once BC exhausted
    assert_eq!(cpu.pc(), 0x000B);
}

#[test]
fn cpir_stops_on_match() {
    let mut bus = TestBus::new();
    bus.load(0x4000, &[0x11, 0x22, 0x33, 0x44]);
    // LD HL,$4000; LD BC,$0004; LD A,$33; CPIR
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0x21, 0x00, 0x40, 0x01, 0x04, 0x00, 0x3E, 0x33, 0xED, 0xB1],
    );
    for _ in 0..3 {
        let _ = cpu.step(&mut bus);
    }
    let _ = cpu.step(&mut bus); // 0x11
    let _ = cpu.step(&mut bus); // 0x22
    assert_eq!(step_cycles(&mut cpu, &mut bus), 16); // match on 0x33
    assert_eq!(cpu.f() & 0x40, 0x40); // Z
    assert_eq!(cpu.hl(), 0x4003);
    assert_eq!(cpu.bc(), 1);
    assert_eq!(cpu.f() & 0x04, 0x04); // PV: BC still nonzero
}

#[test]
fn halt_idles_at_nop_cost_until_interrupt() {
    let mut bus = TestBus::new();
    // EI; HALT
    let mut cpu = cpu_with_program(&mut bus, &[0xFB, 0x76]);
    let _ = cpu.step(&mut bus);
    let _ = cpu.step(&mut bus);
    assert!(cpu.halted());

    let pc = cpu.pc();
    assert_eq!(step_cycles(&mut cpu, &mut bus), 4);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc(), pc); // spinning in place

    assert!(cpu.trigger_int(&mut bus));
    assert!(!cpu.halted());
    assert_eq!(cpu.pc(), 0x0038);
}

#[test]
fn refresh_counter_keeps_counting_while_halted() {
    let mut bus = TestBus::new();
    // EI; HALT
    let mut cpu = cpu_with_program(&mut bus, &[0xFB, 0x76]);
    let _ = cpu.step(&mut bus);
    let _ = cpu.step(&mut bus);
    assert!(cpu.halted());

    // The halted core keeps refreshing memory even though PC is parked.
    let r = cpu.registers().r;
    let _ = cpu.step(&mut bus);
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.registers().r, r + 2);
}

#[test]
fn trigger_int_respects_iff() {
    let mut bus = TestBus::new();
    // DI; EI
    let mut cpu = cpu_with_program(&mut bus, &[0xF3, 0xFB]);
    cpu.set_sp(0x8000);

    let _ = cpu.step(&mut bus);
    let pc = cpu.pc();
    assert!(!cpu.trigger_int(&mut bus));
    assert_eq!(cpu.pc(), pc);
    assert_eq!(cpu.sp(), 0x8000);

    let _ = cpu.step(&mut bus);
    let before = cpu.cycles();
    assert!(cpu.trigger_int(&mut bus));
    assert_eq!(cpu.cycles() - before, 13);
    assert_eq!(cpu.pc(), 0x0038);
    assert!(!cpu.iff());
    // interrupted PC pushed little-endian
    assert_eq!(cpu.sp(), 0x7FFE);
    assert_eq!(bus.ram[0x7FFE], 0x02);
    assert_eq!(bus.ram[0x7FFF], 0x00);
}

#[test]
fn io_goes_through_the_port_space() {
    let mut bus = TestBus::new();
    bus.ports[0x12FE] = 0x5C;
    // LD A,$12; IN A,($FE); OUT ($7F),A
    let mut cpu = cpu_with_program(&mut bus, &[0x3E, 0x12, 0xDB, 0xFE, 0xD3, 0x7F]);

    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.a(), 0x5C);

    assert_eq!(step_cycles(&mut cpu, &mut bus), 11);
    assert_eq!(bus.out_log, vec![(0x5C7F, 0x5C)]);
}

#[test]
fn in_r_c_sets_flags_from_the_value() {
    let mut bus = TestBus::new();
    bus.ports[0x2001] = 0x80;
    // LD BC,$2001; IN D,(C)
    let mut cpu = cpu_with_program(&mut bus, &[0x01, 0x01, 0x20, 0xED, 0x50]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.de() >> 8, 0x80);
    assert_eq!(cpu.f() & 0x80, 0x80); // S
    assert_eq!(cpu.f() & 0x02, 0x00); // N clear
}

#[test]
fn indexed_memory_operand_forms() {
    let mut bus = TestBus::new();
    // LD IX,$4000; LD (IX+$05),$77; INC (IX+$05)
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0xDD, 0x21, 0x00, 0x40, 0xDD, 0x36, 0x05, 0x77, 0xDD, 0x34, 0x05],
    );
    assert_eq!(step_cycles(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.ix(), 0x4000);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 19);
    assert_eq!(bus.ram[0x4005], 0x77);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 23);
    assert_eq!(bus.ram[0x4005], 0x78);
}

#[test]
fn indexed_negative_displacement() {
    let mut bus = TestBus::new();
    bus.ram[0x3FFE] = 0x21;
    // LD IY,$4000; LD A,(IY-$02)
    let mut cpu = cpu_with_program(&mut bus, &[0xFD, 0x21, 0x00, 0x40, 0xFD, 0x7E, 0xFE]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 19);
    assert_eq!(cpu.a(), 0x21);
}

#[test]
fn indexed_cb_bit_operations() {
    let mut bus = TestBus::new();
    bus.ram[0x4003] = 0x01;
    // LD IX,$4000; BIT 0,(IX+$03); SET 7,(IX+$03)
    let mut cpu = cpu_with_program(
        &mut bus,
        &[0xDD, 0x21, 0x00, 0x40, 0xDD, 0xCB, 0x03, 0x46, 0xDD, 0xCB, 0x03, 0xFE],
    );
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 20);
    assert_eq!(cpu.f() & 0x40, 0x00); // bit set -> Z clear

    assert_eq!(step_cycles(&mut cpu, &mut bus), 23);
    assert_eq!(bus.ram[0x4003], 0x81);
}

#[test]
fn cb_rotates_and_bit_tests() {
    let mut bus = TestBus::new();
    // LD B,$81; RLC B; BIT 7,B
    let mut cpu = cpu_with_program(&mut bus, &[0x06, 0x81, 0xCB, 0x00, 0xCB, 0x78]);
    let _ = cpu.step(&mut bus);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.bc() >> 8, 0x03);
    assert_eq!(cpu.f() & 0x01, 0x01); // carry from bit 7

    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.f() & 0x40, 0x40); // bit 7 clear -> Z
}

#[test]
fn unknown_ed_opcode_is_counted_and_free() {
    let mut bus = TestBus::new();
    // ED $00 is not an instruction
    let mut cpu = cpu_with_program(&mut bus, &[0xED, 0x00, 0x3E, 0x42]);
    assert_eq!(step_cycles(&mut cpu, &mut bus), 0);
    assert_eq!(cpu.illegal_opcodes(), 1);
    let _ = cpu.step(&mut bus);
    assert_eq!(cpu.a(), 0x42);
    assert_eq!(cpu.illegal_opcodes(), 1);
}

#[test]
fn frame_boundary_lands_exactly_on_cycle_budget() {
    let mut bus = TestBus::new();
    // JP $0000 spinning in place, 10 cycles per step.
    // 20_000 cycles per frame: boundary on step 2000, residual 0.
    let mut cpu = cpu_with_program(&mut bus, &[0xC3, 0x00, 0x00]);

    for step in 1..=2000u32 {
        let signal = cpu.step(&mut bus);
        if step < 2000 {
            assert_eq!(signal, FrameSignal::Running, "early boundary at {step}");
        } else {
            assert_eq!(signal, FrameSignal::FrameDone);
        }
    }
    assert_eq!(cpu.cycles(), 0);

    // One more instruction starts the next frame
    assert_eq!(step_cycles(&mut cpu, &mut bus), 10);
}

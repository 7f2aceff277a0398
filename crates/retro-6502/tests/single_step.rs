//! Per-opcode state tests using Tom Harte's `SingleStepTests` corpus.
//!
//! Each JSON file holds 10,000 cases for one opcode: initial register and
//! RAM state, final state after one instruction. Only the documented
//! opcodes are exercised; this core treats the rest as counted no-ops.
//!
//! Test data lives in `test-data/65x02/6502/v1/XX.json`.

use std::fs;
use std::num::NonZeroU32;
use std::path::Path;

use retro_6502::Mos6502;
use retro_core::{Bus, Cpu, ManualClock};
use serde::Deserialize;

/// Flat 64KB RAM bus.
struct TestBus {
    ram: Vec<u8>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
        }
    }

    fn load_ram(&mut self, entries: &[(u16, u8)]) {
        for &(addr, value) in entries {
            self.ram[addr as usize] = value;
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
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

/// JSON test case format.
#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
}

/// JSON CPU state format.
#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    s: u8,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    ram: Vec<(u16, u8)>,
}

/// The 151 documented opcodes.
const DOCUMENTED: [u8; 151] = [
    0x00, 0x01, 0x05, 0x06, 0x08, 0x09, 0x0A, 0x0D, 0x0E, 0x10, 0x11, 0x15, 0x16, 0x18, 0x19,
    0x1D, 0x1E, 0x20, 0x21, 0x24, 0x25, 0x26, 0x28, 0x29, 0x2A, 0x2C, 0x2D, 0x2E, 0x30, 0x31,
    0x35, 0x36, 0x38, 0x39, 0x3D, 0x3E, 0x40, 0x41, 0x45, 0x46, 0x48, 0x49, 0x4A, 0x4C, 0x4D,
    0x4E, 0x50, 0x51, 0x55, 0x56, 0x58, 0x59, 0x5D, 0x5E, 0x60, 0x61, 0x65, 0x66, 0x68, 0x69,
    0x6A, 0x6C, 0x6D, 0x6E, 0x70, 0x71, 0x75, 0x76, 0x78, 0x79, 0x7D, 0x7E, 0x81, 0x84, 0x85,
    0x86, 0x88, 0x8A, 0x8C, 0x8D, 0x8E, 0x90, 0x91, 0x94, 0x95, 0x96, 0x98, 0x99, 0x9A, 0x9D,
    0xA0, 0xA1, 0xA2, 0xA4, 0xA5, 0xA6, 0xA8, 0xA9, 0xAA, 0xAC, 0xAD, 0xAE, 0xB0, 0xB1, 0xB4,
    0xB5, 0xB6, 0xB8, 0xB9, 0xBA, 0xBC, 0xBD, 0xBE, 0xC0, 0xC1, 0xC4, 0xC5, 0xC6, 0xC8, 0xC9,
    0xCA, 0xCC, 0xCD, 0xCE, 0xD0, 0xD1, 0xD5, 0xD6, 0xD8, 0xD9, 0xDD, 0xDE, 0xE0, 0xE1, 0xE4,
    0xE5, 0xE6, 0xE8, 0xE9, 0xEA, 0xEC, 0xED, 0xEE, 0xF0, 0xF1, 0xF5, 0xF6, 0xF8, 0xF9, 0xFD,
    0xFE,
];

fn fresh_cpu() -> Mos6502<ManualClock> {
    let rate = NonZeroU32::new(50).expect("nonzero");
    Mos6502::with_time_source(1_000_000, rate, ManualClock::new(1))
}

/// Set up the CPU and bus from the initial test state.
fn setup(cpu: &mut Mos6502<ManualClock>, bus: &mut TestBus, state: &CpuState) {
    bus.load_ram(&state.ram);
    cpu.set_pc(state.pc);
    cpu.set_sp(state.s);
    cpu.set_a(state.a);
    cpu.set_x(state.x);
    cpu.set_y(state.y);
    cpu.set_status(state.p);
}

/// Compare the CPU/bus state against expected, returning mismatches.
fn compare(cpu: &Mos6502<ManualClock>, bus: &TestBus, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();

    if cpu.pc() != expected.pc {
        errors.push(format!("PC: got ${:04X}, want ${:04X}", cpu.pc(), expected.pc));
    }
    if cpu.sp() != expected.s {
        errors.push(format!("S: got ${:02X}, want ${:02X}", cpu.sp(), expected.s));
    }
    if cpu.a() != expected.a {
        errors.push(format!("A: got ${:02X}, want ${:02X}", cpu.a(), expected.a));
    }
    if cpu.x() != expected.x {
        errors.push(format!("X: got ${:02X}, want ${:02X}", cpu.x(), expected.x));
    }
    if cpu.y() != expected.y {
        errors.push(format!("Y: got ${:02X}, want ${:02X}", cpu.y(), expected.y));
    }

    // Packed status always reads bit 5 as 1; mask B out of both sides,
    // it only matters inside pushed bytes.
    let actual_p = cpu.status() & !0x10;
    let expected_p = (expected.p | 0x20) & !0x10;
    if actual_p != expected_p {
        errors.push(format!(
            "P: got ${actual_p:02X} ({actual_p:08b}), want ${expected_p:02X} ({expected_p:08b})"
        ));
    }

    for &(addr, expected_val) in &expected.ram {
        let actual_val = bus.peek(addr);
        if actual_val != expected_val {
            errors.push(format!(
                "RAM[${addr:04X}]: got ${actual_val:02X}, want ${expected_val:02X}"
            ));
        }
    }

    errors
}

#[test]
#[ignore = "requires test-data/65x02 — run with --ignored"]
fn run_documented_opcodes() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("parent of crate dir")
        .parent()
        .expect("workspace root")
        .join("test-data/65x02/6502/v1");

    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        eprintln!("Skipping SingleStepTests.");
        return;
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;
    let mut total_files = 0u32;

    for opcode in DOCUMENTED {
        let filename = format!("{opcode:02x}.json");
        let path = test_dir.join(&filename);
        if !path.exists() {
            continue;
        }

        let data = fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("Failed to read {}: {e}", path.display());
        });
        let tests: Vec<TestCase> = serde_json::from_str(&data).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {e}", path.display());
        });

        let mut file_pass = 0u32;
        let mut file_fail = 0u32;
        let mut first_failures: Vec<String> = Vec::new();

        for test in &tests {
            let mut cpu = fresh_cpu();
            let mut bus = TestBus::new();

            setup(&mut cpu, &mut bus, &test.initial);
            let _ = cpu.step(&mut bus);

            let errors = compare(&cpu, &bus, &test.final_state);
            if errors.is_empty() {
                file_pass += 1;
            } else {
                file_fail += 1;
                if first_failures.len() < 5 {
                    first_failures.push(format!("  FAIL [{}]: {}", test.name, errors.join(", ")));
                }
            }
        }

        let status = if file_fail == 0 { "PASS" } else { "FAIL" };
        println!(
            "Opcode ${opcode:02X} ({filename}): {status} — {file_pass}/{} passed",
            file_pass + file_fail
        );
        for msg in &first_failures {
            println!("{msg}");
        }

        total_pass += u64::from(file_pass);
        total_fail += u64::from(file_fail);
        total_files += 1;
    }

    println!();
    println!("=== SingleStepTests Summary ===");
    println!("Files: {total_files}, Pass: {total_pass}, Fail: {total_fail}");

    assert_eq!(total_fail, 0, "{total_fail} tests failed");
}

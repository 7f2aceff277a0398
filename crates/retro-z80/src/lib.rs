//! Frame-paced Zilog Z80 CPU emulator.
//!
//! Instruction-level emulation: one `step()` executes one complete
//! instruction (prefixed forms included), charges its documented T-state
//! cost, and paces the emulation to real time once a frame's worth of
//! cycles has elapsed.
//!
//! Covers the documented instruction set: the CB rotate/shift/bit group,
//! the ED group with the block transfer/search instructions, and the
//! DD/FD indexed forms including DDCB/FDCB. Interrupt mode is decoded and
//! stored but servicing always performs RST 38h (mode 1 behaviour), and
//! NMI is not modelled. Unrecognised ED/DD/FD opcodes execute as no-ops
//! and are tallied in a counter the host can inspect.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::Z80;
pub use flags::Flags;
pub use registers::Registers;

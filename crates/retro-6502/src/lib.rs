//! Frame-paced MOS 6502 CPU emulator.
//!
//! Instruction-level emulation of the NMOS 6502: one `step()` executes one
//! complete instruction, charges its documented cycle cost, and paces the
//! emulation to real time once a frame's worth of cycles has elapsed.
//!
//! Decimal mode (BCD ADC/SBC), the indirect-JMP page-wrap bug, zero-page
//! index wrap-around and page-crossing cycle penalties are all modelled.
//! Undocumented opcodes execute as no-ops and are tallied in a counter the
//! host can inspect.

mod addressing;
mod cpu;
mod flags;
mod registers;

pub use cpu::Mos6502;
pub use flags::Flags;
pub use registers::Registers;

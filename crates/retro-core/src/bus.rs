//! Memory and I/O bus traits.

/// A bus that supports memory read/write operations.
///
/// The CPU cores never access memory directly; every access goes through
/// this trait, so the host decides the memory map, ROM shadowing and
/// memory-mapped peripherals. Memory-mapped I/O systems (6502 machines)
/// use this directly.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 16-bit I/O address space accessed via IN and
/// OUT instructions. Z80-based systems implement this trait.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);
}

/// The unconfigured bus: reads return 0, writes are discarded.
///
/// A core driven against this bus never faults, so hosts may call `reset`
/// or `step` before wiring up a real memory map.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBus;

impl Bus for NullBus {
    fn read(&mut self, _address: u16) -> u8 {
        0
    }

    fn write(&mut self, _address: u16, _value: u8) {}
}

impl IoBus for NullBus {
    fn read_io(&mut self, _port: u16) -> u8 {
        0
    }

    fn write_io(&mut self, _port: u16, _value: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bus_reads_zero_and_discards_writes() {
        let mut bus = NullBus;
        bus.write(0x1234, 0xAB);
        bus.write_io(0x00FE, 0xCD);
        assert_eq!(bus.read(0x1234), 0);
        assert_eq!(bus.read_io(0x00FE), 0);
    }
}

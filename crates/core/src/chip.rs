//! Coprocessor chip trait.
//!
//! A host system drives a coprocessor through a narrow interface: it loads
//! a program, hands it a cycle budget, and exchanges words through a few
//! host-visible ports.

/// A coprocessor clocked by its host system
pub trait Chip {
    /// Reset to power-on state. Loaded program memory is kept.
    fn reset(&mut self);

    /// Load a program image at address 0 and reset
    fn init(&mut self, program: &[u16]);

    /// Run for at least `cycles` cycles, returning the cycles actually spent.
    /// The last instruction may overshoot the budget.
    fn update(&mut self, cycles: u32) -> u32;

    /// Write a host-visible port
    fn write(&mut self, port: u16, value: u16);

    /// Read a host-visible port (if supported)
    fn read(&self, port: u16) -> u16 {
        let _ = port;
        0xFFFF // Default: open bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        program: Vec<u16>,
        cycles: u32,
        port: u16,
    }

    impl Chip for Counter {
        fn reset(&mut self) {
            self.cycles = 0;
        }

        fn init(&mut self, program: &[u16]) {
            self.program = program.to_vec();
            self.reset();
        }

        fn update(&mut self, cycles: u32) -> u32 {
            // Two-cycle instructions
            let spent = cycles.div_ceil(2) * 2;
            self.cycles += spent;
            spent
        }

        fn write(&mut self, _port: u16, value: u16) {
            self.port = value;
        }
    }

    #[test]
    fn test_chip_defaults() {
        let mut chip = Counter {
            program: Vec::new(),
            cycles: 0,
            port: 0,
        };
        chip.init(&[1, 2, 3]);
        assert_eq!(chip.program.len(), 3);
        assert_eq!(chip.update(5), 6);
        chip.write(0, 0x1234);
        assert_eq!(chip.port, 0x1234);
        assert_eq!(chip.read(0), 0xFFFF);
        chip.reset();
        assert_eq!(chip.cycles, 0);
    }
}

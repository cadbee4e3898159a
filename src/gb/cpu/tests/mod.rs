mod cpu;
mod ops;

use crate::gb::cpu::CPU;
use crate::gb::tests::MockBus;

/// Builds a CPU at address 0 together with a bus holding the given program.
pub fn setup(program: &[u8]) -> (CPU, MockBus) {
    (CPU::default(), MockBus::new(program.to_vec()))
}

use crate::gb::SubSystem;
use crate::gb::bus::InterruptRegister;
use crate::gb::constants::*;

/// T-cycles for a full byte transfer with the internal 8192 Hz clock.
const TRANSFER_CYCLES: u16 = 8 * 512;

bitflags! {
    /// Represents the Serial transfer control register at 0xFF02
    #[derive(Copy, Clone, Default)]
    pub struct Control: u8 {
        // 0 = External clock, 1 = Internal clock.
        const CLOCK_SELECT    = 0b0000_0001;
        // If set to 1, enable high speed serial clock (~256 kHz in
        // single-speed mode), this bit is only used in CGB Mode.
        const CLOCK_SPEED     = 0b0000_0010;
        // If 1, a transfer is either requested or in progress.
        const TRANSFER_ENABLE = 0b1000_0000;
    }
}

/// The serial link port. Without a partner every transfer shifts in 0xFF.
/// All outgoing bytes are recorded, the community test ROMs report their
/// verdict through this port.
#[derive(Clone, Default)]
pub struct SerialTransfer {
    /// The transfer control register.
    pub control: Control,
    /// The transfer data register.
    pub data: u8,
    /// T-cycles into the currently running transfer.
    counter: u16,
    /// Every byte the machine has sent so far.
    output: Vec<u8>,
    /// Prints the serial data to stdout.
    print_serial: bool,
}

impl SerialTransfer {
    #[inline]
    pub fn new(print_serial: bool) -> Self {
        Self {
            print_serial,
            ..Default::default()
        }
    }

    /// Advances a running transfer. Once all 8 bits are shifted the data
    /// register holds 0xFF (there is no link partner), the enable bit is
    /// cleared and the Serial interrupt is raised.
    pub fn step(&mut self, t_cycles: u8, int_reg: &mut InterruptRegister) {
        if !self.control.contains(Control::TRANSFER_ENABLE)
            || !self.control.contains(Control::CLOCK_SELECT)
        {
            return;
        }
        self.counter += u16::from(t_cycles);
        if self.counter >= TRANSFER_CYCLES {
            self.counter = 0;
            self.data = UNDEFINED_READ;
            self.control.remove(Control::TRANSFER_ENABLE);
            int_reg.insert(InterruptRegister::SERIAL);
        }
    }

    /// Returns all bytes sent so far, decoded as ASCII where possible.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .map(|&byte| {
                if byte.is_ascii() {
                    char::from(byte)
                } else {
                    '?'
                }
            })
            .collect()
    }

    #[inline]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    fn set_ctrl(&mut self, value: u8) {
        self.control = Control::from_bits_truncate(value);
        if self.control.contains(Control::TRANSFER_ENABLE) {
            self.counter = 0;
            self.output.push(self.data);
            if self.print_serial {
                let byte = char::from(self.data);
                if byte.is_ascii() {
                    print!("{byte}");
                } else {
                    print!("?");
                }
            }
        }
    }
}

impl SubSystem for SerialTransfer {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            SERIAL_TRANSFER_DATA => self.data = value,
            SERIAL_TRANSFER_CTRL => self.set_ctrl(value),
            _ => panic!("Attempt to write to unmapped serial register: {address:#06x}"),
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            SERIAL_TRANSFER_DATA => self.data,
            // Undocumented bits should be 1
            SERIAL_TRANSFER_CTRL => self.control.bits() | 0b0111_1110,
            _ => panic!("Attempt to read from unmapped serial register: {address:#06x}"),
        }
    }
}

use crate::gb::SubSystem;
use crate::gb::bus::InterruptRegister;
use crate::gb::constants::*;

/// T-cycles between a TIMA overflow and the reload from TMA.
const RELOAD_DELAY: u8 = 4;

bitflags! {
    /// Represents the Timer control register TAC at 0xFF07
    #[derive(Copy, Clone, Default, Debug)]
    pub struct TimerControl: u8 {
        // Selects the divider bit used to clock TIMA.
        const CLOCK_SELECT = 0b0000_0011;
        // If 0, TIMA does not tick, DIV keeps counting regardless.
        const ENABLE       = 0b0000_0100;
    }
}

impl TimerControl {
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.contains(TimerControl::ENABLE)
    }

    /// Returns the divider bit which clocks TIMA. A falling edge of this bit
    /// (after masking with the enable bit) increments the counter.
    #[inline]
    pub const fn divider_bit(&self) -> u16 {
        match self.bits() & 0b11 {
            0b00 => 9,
            0b01 => 3,
            0b10 => 5,
            _ => 7,
        }
    }
}

/// The programmable timer. Internally a single 16-bit divider counts every
/// T-cycle, DIV is its high byte. TIMA increments on every falling edge of
/// the TAC selected divider bit, which makes the DIV-write and TAC-write
/// edge cases fall out of the model for free.
#[derive(Clone, Default)]
pub struct Timer {
    pub divider: u16,
    pub counter: u8,
    pub modulo: u8,
    pub control: TimerControl,
    /// Set while a TIMA overflow waits for its delayed reload.
    reload_countdown: Option<u8>,
}

impl Timer {
    /// The input to the falling edge detector: the selected divider bit
    /// masked with the enable bit.
    #[inline]
    const fn edge(&self) -> bool {
        self.control.is_enabled() && (self.divider >> self.control.divider_bit()) & 0b1 != 0
    }

    /// Advances the timer by the given number of T-cycles.
    pub fn step(&mut self, t_cycles: u8, int_reg: &mut InterruptRegister) {
        for _ in 0..t_cycles {
            self.tick(int_reg);
        }
    }

    /// Advances the divider by a single T-cycle.
    fn tick(&mut self, int_reg: &mut InterruptRegister) {
        if let Some(remaining) = self.reload_countdown {
            match remaining - 1 {
                0 => {
                    self.counter = self.modulo;
                    self.reload_countdown = None;
                    int_reg.insert(InterruptRegister::TIMER);
                }
                n => self.reload_countdown = Some(n),
            }
        }
        let edge = self.edge();
        self.divider = self.divider.wrapping_add(1);
        if edge && !self.edge() {
            self.increment_counter();
        }
    }

    /// Increments TIMA. An overflow leaves the counter at 0 and schedules the
    /// delayed reload from TMA together with the interrupt.
    fn increment_counter(&mut self) {
        let (counter, overflow) = self.counter.overflowing_add(1);
        self.counter = counter;
        if overflow {
            self.reload_countdown = Some(RELOAD_DELAY);
        }
    }
}

impl SubSystem for Timer {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            // Resetting the divider can produce a falling edge of the
            // selected bit, which clocks TIMA like any other edge.
            TIMER_DIVIDER => {
                let edge = self.edge();
                self.divider = 0;
                if edge {
                    self.increment_counter();
                }
            }
            // Writing TIMA during the overflow delay aborts the reload.
            TIMER_COUNTER => {
                self.counter = value;
                self.reload_countdown = None;
            }
            TIMER_MODULO => self.modulo = value,
            TIMER_CTRL => {
                let edge = self.edge();
                self.control = TimerControl::from_bits_truncate(value);
                if edge && !self.edge() {
                    self.increment_counter();
                }
            }
            _ => panic!("Attempt to write to unmapped timer register: {address:#06x}"),
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            TIMER_DIVIDER => (self.divider >> 8) as u8,
            TIMER_COUNTER => self.counter,
            TIMER_MODULO => self.modulo,
            // Undocumented bits should be 1
            TIMER_CTRL => self.control.bits() | 0b1111_1000,
            _ => panic!("Attempt to read from unmapped timer register: {address:#06x}"),
        }
    }
}

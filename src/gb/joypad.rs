use crate::gb::utils;

bitflags! {
    /// A snapshot of all pressed buttons as delivered by the host,
    /// a set bit means the button is currently held down.
    #[derive(Copy, Clone, Default, PartialEq, Debug)]
    pub struct ButtonState: u8 {
        const RIGHT  = 0b0000_0001;
        const LEFT   = 0b0000_0010;
        const UP     = 0b0000_0100;
        const DOWN   = 0b0000_1000;
        const A      = 0b0001_0000;
        const B      = 0b0010_0000;
        const SELECT = 0b0100_0000;
        const START  = 0b1000_0000;
    }
}

/// Represents the Joypad at register 0xFF00.
/// The eight Game Boy action/direction buttons are arranged as a 2×4 matrix.
/// Select either action or direction buttons by writing to bits 4-5,
/// then read out the bits 0-3. The lower nibble is read-only.
/// Note that, rather unconventionally for the Game Boy,
/// a button being pressed is seen as the corresponding bit being 0, not 1.
#[derive(Copy, Clone, Debug)]
pub struct Joypad {
    buttons: ButtonState,
    select_dpad: bool,
    select_action: bool,
    /// Previous state of the matrix lines, used for edge detection.
    lines: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            buttons: ButtonState::empty(),
            select_dpad: false,
            select_action: false,
            lines: 0,
        }
    }
}

impl Joypad {
    /// Returns the pressed state of the four matrix lines for the current
    /// selection, a set bit means the line is grounded (button down).
    const fn pressed_lines(&self) -> u8 {
        let mut lines = 0;
        if self.select_dpad {
            lines |= self.buttons.bits() & 0b1111;
        }
        if self.select_action {
            lines |= self.buttons.bits() >> 4;
        }
        lines
    }

    /// Updates the pressed buttons with a host snapshot.
    /// Returns true if a selected line transitioned from high to low,
    /// which raises the Joypad interrupt.
    pub fn set_buttons(&mut self, buttons: ButtonState) -> bool {
        self.buttons = buttons;
        self.refresh_lines()
    }

    /// Indicates whether any button is held down, regardless of the
    /// current matrix selection. Used to leave STOP mode.
    #[inline]
    pub const fn any_pressed(&self) -> bool {
        !self.buttons.is_empty()
    }

    /// Reads the Joypad register, bits 6-7 are unused and read as 1.
    pub const fn read(&self) -> u8 {
        let mut value = 0b1100_0000 | (!self.pressed_lines() & 0b1111);
        value = utils::set_bit(value, 4, !self.select_dpad);
        value = utils::set_bit(value, 5, !self.select_action);
        value
    }

    /// Writes the matrix selection bits. In the joypad register the bit
    /// values are inverted, 0 means selected and 1 means not selected.
    /// Returns true if the new selection grounds a line, which raises the
    /// Joypad interrupt.
    pub fn write(&mut self, value: u8) -> bool {
        self.select_dpad = !utils::bit_at(value, 4);
        self.select_action = !utils::bit_at(value, 5);
        self.refresh_lines()
    }

    /// Recomputes the matrix lines and reports any high-to-low transition.
    fn refresh_lines(&mut self) -> bool {
        let lines = self.pressed_lines();
        let newly_grounded = lines & !self.lines != 0;
        self.lines = lines;
        newly_grounded
    }
}

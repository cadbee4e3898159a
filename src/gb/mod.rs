pub mod audio;
pub mod bus;
pub mod cartridge;
pub mod constants;
pub mod cpu;
pub mod joypad;
pub mod oam;
pub mod ppu;
pub mod serial;
pub mod timer;
pub mod utils;

#[cfg(test)]
mod tests;

use crate::gb::bus::{InterruptRegister, MainBus};
use crate::gb::cartridge::Cartridge;
use crate::gb::cpu::{CPU, ImeState, interrupt};
use crate::gb::joypad::ButtonState;
use crate::gb::ppu::buffer::FrameBuffer;
use std::sync::Arc;
use thiserror::Error;

pub const SCREEN_WIDTH: u8 = 160;
pub const SCREEN_HEIGHT: u8 = 144;
pub const VERTICAL_BLANK_SCAN_LINE_MAX: u8 = 153;

/// The DMG master clock in T-cycles per second, all timings are derived from it.
pub const CPU_CLOCK_SPEED: u32 = 4_194_304;

/// The hardware revision the machine emulates. It is usually derived from the
/// CGB flag in the cartridge header, but can be forced via `EmulatorConfig`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum HardwareMode {
    #[default]
    DMG,
    CGB,
}

impl HardwareMode {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, HardwareMode::CGB)
    }
}

/// Errors which can be reported to the host. The emulated machine itself never
/// fails, hardware misbehavior is modeled as undefined reads and dead writes.
#[derive(Debug, Error)]
pub enum GBError {
    #[error("unsupported cartridge: {0}")]
    UnsupportedCartridge(String),
    #[error("invalid ROM image: {0}")]
    InvalidRomImage(String),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type GBResult<T> = Result<T, GBError>;

/// This trait defines a common interface for all byte addressable units.
pub trait SubSystem {
    fn write(&mut self, address: u16, value: u8);
    fn read(&mut self, address: u16) -> u8;
}

/// The memory bus as seen from the CPU. Every `SubSystem` access through this
/// trait costs one machine cycle, `cycle` advances all clocked devices once.
pub trait Bus: SubSystem {
    /// Advances all clocked devices by one machine cycle (4 T-cycles).
    fn cycle(&mut self);

    /// Indicates whether an enabled interrupt is pending.
    fn has_irq(&self) -> bool;

    fn set_ie(&mut self, r: InterruptRegister);
    fn get_ie(&self) -> InterruptRegister;
    fn set_if(&mut self, r: InterruptRegister);
    fn get_if(&self) -> InterruptRegister;

    /// Debugger notification, invoked once per fetched opcode.
    fn before_instruction(&mut self, _address: u16, _opcode: u8) {}

    /// Debugger notification, invoked once per retired instruction.
    fn after_step(&mut self) {}

    /// Consumes a pending KEY1 speed switch request on STOP (CGB only).
    /// Returns true if the clock speed has been toggled.
    fn take_speed_switch_request(&mut self) -> bool {
        false
    }
}

/// Receives one complete frame per vertical blank. The passed reference is
/// only valid until the next vertical blank, the sink has to copy the buffer
/// if it needs it for longer.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &FrameBuffer);
}

/// Receives one stereo sample pair at a time, both values are within ±1.0.
/// The sink must not block, it is called from the emulator thread.
pub trait AudioSink {
    fn add_sample(&mut self, left: f64, right: f64);
}

/// Optional debugger callbacks, all default to no-ops.
pub trait DebugHooks {
    fn before_instruction(&mut self, _address: u16, _opcode: u8) {}
    fn after_step(&mut self) {}
    fn on_memory_read(&mut self, _address: u16, _value: u8) {}
    fn on_memory_write(&mut self, _address: u16, _value: u8) {}
}

/// Host side configuration, passed once at machine construction.
#[derive(Clone, Default)]
pub struct EmulatorConfig {
    /// Forces the hardware revision instead of deriving it from the header.
    pub mode: Option<HardwareMode>,
    /// Executes the embedded DMG boot ROM instead of starting from the
    /// post-boot state. Ignored when a custom boot image is given.
    pub use_boot_rom: bool,
    /// A custom boot image, overlaid at 0x0000-0x00FF (and 0x0200-0x08FF
    /// for CGB sized images) until 0xFF50 is written.
    pub boot_rom: Option<Arc<[u8]>>,
    /// Prints all serial output to stdout.
    pub print_serial: bool,
}

/// Owns the whole emulated machine and drives it instruction by instruction.
pub struct Emulator {
    pub cpu: CPU,
    pub bus: MainBus,
}

impl Emulator {
    pub fn new(cartridge: Cartridge, config: EmulatorConfig) -> Self {
        let mode = config.mode.unwrap_or(cartridge.header.mode);
        let mut bus = MainBus::with_cartridge(cartridge, mode, &config);
        let mut cpu = CPU::default();
        if !bus.is_boot_rom_active {
            cpu.set_post_boot_state(mode);
            bus.set_post_boot_state();
        }
        Self { cpu, bus }
    }

    /// Executes a single CPU step. Depending on the current machine state this
    /// either idles for one machine cycle (halted, stopped, frozen or
    /// bus-stalled by OAM DMA), services an interrupt, or runs one instruction.
    pub fn step(&mut self) {
        if self.cpu.is_frozen {
            // An illegal opcode has been executed, the CPU is wedged for good.
            self.bus.cycle();
            return;
        }
        if self.cpu.is_stopped {
            self.bus.cycle();
            if self.bus.any_button_pressed() {
                self.cpu.is_stopped = false;
            }
            return;
        }
        if self.cpu.is_halted {
            if !self.bus.has_pending_interrupt() {
                self.bus.cycle();
                return;
            }
            // CPU should be always woken up from HALT if there is a pending
            // interrupt, even while IME is disabled.
            self.cpu.is_halted = false;
        }
        if self.bus.dma_active() {
            // The bus is stalled, no opcode fetches are possible. The cycle
            // still advances the transfer by one byte.
            self.bus.cycle();
            return;
        }
        if self.cpu.ime == ImeState::Enabled && self.bus.has_irq() {
            interrupt::handle(&mut self.cpu, &mut self.bus);
            return;
        }
        self.cpu.step(&mut self.bus);
    }

    /// Steps the machine until the PPU has finished the current frame.
    pub fn step_frame(&mut self) {
        let frame = self.bus.frames_rendered();
        while self.bus.frames_rendered() == frame {
            self.step();
        }
    }

    /// Updates the currently pressed buttons with the given host snapshot.
    #[inline]
    pub fn set_buttons(&mut self, buttons: ButtonState) {
        self.bus.set_buttons(buttons);
    }

    #[inline]
    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.bus.set_frame_sink(sink);
    }

    #[inline]
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.bus.set_audio_sink(sink);
    }

    #[inline]
    pub fn set_debug_hooks(&mut self, hooks: Box<dyn DebugHooks>) {
        self.bus.set_debug_hooks(hooks);
    }

    /// Creates an opaque snapshot of the battery backed cartridge RAM.
    #[inline]
    pub fn save_ram(&self) -> GBResult<Arc<[u8]>> {
        self.bus.cartridge.save_ram()
    }

    /// Restores a snapshot previously created with `save_ram`.
    #[inline]
    pub fn load_ram(&mut self, snapshot: &[u8]) -> GBResult<()> {
        self.bus.cartridge.load_ram(snapshot)
    }
}

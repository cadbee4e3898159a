use crate::gb::audio::AudioProcessor;
use crate::gb::cartridge::Cartridge;
use crate::gb::constants::*;
use crate::gb::joypad::{ButtonState, Joypad};
use crate::gb::oam::OamDmaController;
use crate::gb::ppu::PPU;
use crate::gb::serial::SerialTransfer;
use crate::gb::timer::Timer;
use crate::gb::{
    AudioSink, Bus, DebugHooks, EmulatorConfig, FrameSink, HardwareMode, SubSystem,
};
use std::sync::Arc;

/// OAM DMA sources above the echo area would read from device registers,
/// such writes only update the register read-back.
const DMA_MAX_SOURCE_PAGE: u8 = 0xDF;

bitflags! {
    /// Represents interrupt registers IE at 0xFFFF and IF at 0xFF0F
    #[derive(Copy, Clone, PartialEq, Debug)]
    pub struct InterruptRegister: u8 {
        const VBLANK = 0b00000001; // V-Blank Interrupt
        const STAT   = 0b00000010; // LCD STAT Interrupt
        const TIMER  = 0b00000100; // Timer Overflow Interrupt
        const SERIAL = 0b00001000; // Serial Transfer Completion Interrupt
        const JOYPAD = 0b00010000; // Joypad Input Interrupt
    }
}

/// Defines the global bus, all processing units access memory through it.
/// Every CPU visible read or write advances the machine by one M-cycle,
/// which ticks OAM DMA, timer, PPU, APU and serial port in that order.
pub struct MainBus {
    pub cartridge: Cartridge,
    pub is_boot_rom_active: bool,
    boot_rom: Option<Arc<[u8]>>,
    mode: HardwareMode,
    ppu: PPU,
    audio: AudioProcessor,
    timer: Timer,
    serial: SerialTransfer,
    joypad: Joypad,
    dma: OamDmaController,
    pub interrupt_enable: InterruptRegister,
    pub interrupt_flag: InterruptRegister,
    /// All eight WRAM banks, DMG only ever uses the first two.
    wram: Box<[u8; WRAM_BANK_SIZE * WRAM_BANK_COUNT]>,
    /// Selected WRAM bank for 0xD000-0xDFFF, CGB only.
    wram_bank: u8,
    hram: [u8; HRAM_SIZE],
    /// Monotonic T-cycle counter since power on.
    t_cycles: u64,
    double_speed: bool,
    speed_switch_armed: bool,
    hooks: Option<Box<dyn DebugHooks>>,
}

impl MainBus {
    pub fn with_cartridge(cartridge: Cartridge, mode: HardwareMode, config: &EmulatorConfig) -> Self {
        // Without a usable boot image the machine starts from the
        // documented post-boot state instead.
        let boot_rom = match (&config.boot_rom, mode) {
            (Some(image), _) => Some(image.clone()),
            (None, HardwareMode::DMG) if config.use_boot_rom => Some(Arc::from(BOOT_ROM.as_slice())),
            _ => None,
        };
        Self {
            cartridge,
            is_boot_rom_active: boot_rom.is_some(),
            boot_rom,
            mode,
            ppu: PPU::new(mode),
            audio: AudioProcessor::new(mode),
            timer: Timer::default(),
            serial: SerialTransfer::new(config.print_serial),
            joypad: Joypad::default(),
            dma: OamDmaController::default(),
            interrupt_enable: InterruptRegister::empty(),
            interrupt_flag: InterruptRegister::empty(),
            wram: Box::new([0; WRAM_BANK_SIZE * WRAM_BANK_COUNT]),
            wram_bank: 1,
            hram: [0; HRAM_SIZE],
            t_cycles: 0,
            double_speed: false,
            speed_switch_armed: false,
            hooks: None,
        }
    }

    /// Applies the documented IO register state after a skipped boot ROM.
    pub fn set_post_boot_state(&mut self) {
        const POST_BOOT_IO: &[(u16, u8)] = &[
            (JOYPAD, 0xCF),
            (SERIAL_TRANSFER_CTRL, 0x7E),
            (TIMER_COUNTER, 0x00),
            (TIMER_MODULO, 0x00),
            (TIMER_CTRL, 0xF8),
            (crate::gb::audio::AUDIO_MASTER_CONTROL, 0xF1),
            (0xFF10, 0x80),
            (0xFF11, 0xBF),
            (0xFF12, 0xF3),
            (0xFF14, 0xBF),
            (0xFF16, 0x3F),
            (0xFF19, 0xBF),
            (0xFF1A, 0x7F),
            (0xFF1B, 0xFF),
            (0xFF1C, 0x9F),
            (0xFF1E, 0xBF),
            (0xFF20, 0xFF),
            (0xFF23, 0xBF),
            (0xFF24, 0x77),
            (0xFF25, 0xF3),
            (PPU_LCDC, 0x91),
            (PPU_BGP, 0xFC),
            (PPU_OBP0, 0xFF),
            (PPU_OBP1, 0xFF),
        ];

        for &(address, value) in POST_BOOT_IO {
            self.write_raw(address, value);
        }
        // The boot ROM hands over with a running divider and VBlank flagged
        self.timer.divider = 0xAB00;
        self.interrupt_flag = InterruptRegister::VBLANK;
    }

    /// Indicates whether an interrupt is pending, regardless of IME.
    #[inline]
    pub fn has_pending_interrupt(&self) -> bool {
        self.has_irq()
    }

    /// Indicates whether an OAM DMA transfer is stalling the CPU.
    #[inline]
    pub const fn dma_active(&self) -> bool {
        self.dma.is_running()
    }

    #[inline]
    pub const fn clock_ticks(&self) -> u64 {
        self.t_cycles
    }

    #[inline]
    pub const fn double_speed(&self) -> bool {
        self.double_speed
    }

    #[inline]
    pub const fn hardware_mode(&self) -> HardwareMode {
        self.mode
    }

    /// Updates the pressed buttons with a host snapshot.
    pub fn set_buttons(&mut self, buttons: ButtonState) {
        if self.joypad.set_buttons(buttons) {
            self.interrupt_flag.insert(InterruptRegister::JOYPAD);
        }
    }

    #[inline]
    pub const fn any_button_pressed(&self) -> bool {
        self.joypad.any_pressed()
    }

    #[inline]
    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.ppu.set_sink(sink);
    }

    #[inline]
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.audio.set_sink(sink);
    }

    #[inline]
    pub fn set_debug_hooks(&mut self, hooks: Box<dyn DebugHooks>) {
        self.hooks = Some(hooks);
    }

    #[inline]
    pub const fn frames_rendered(&self) -> u64 {
        self.ppu.frames_rendered()
    }

    #[inline]
    pub const fn ppu(&self) -> &PPU {
        &self.ppu
    }

    #[inline]
    pub const fn serial(&self) -> &SerialTransfer {
        &self.serial
    }

    /// Reads value from boot ROM or cartridge depending on the overlay
    /// state. The CGB boot image additionally covers 0x0200-0x08FF,
    /// leaving the cartridge header visible in between.
    fn read_cartridge(&mut self, address: u16) -> u8 {
        if self.is_boot_rom_active {
            if let Some(boot) = &self.boot_rom {
                match address {
                    BOOT_BEGIN..=BOOT_END => return boot[address as usize],
                    BOOT_UPPER_BEGIN..=BOOT_UPPER_END if boot.len() > BOOT_UPPER_BEGIN as usize => {
                        return boot[address as usize];
                    }
                    _ => {}
                }
            }
        }
        self.cartridge.read(address)
    }

    /// Advances the OAM DMA engine by one M-cycle and copies the byte it
    /// hands out, if the transfer has taken the bus already.
    fn cycle_dma(&mut self) {
        if let Some(address) = self.dma.advance() {
            let value = self.read_raw(address);
            self.ppu.write_oam(address as u8, value);
        }
    }

    /// Resolves a WRAM address to an offset into the bank array,
    /// the echo area mirrors 0xC000-0xDDFF.
    fn wram_offset(&self, address: u16) -> usize {
        let address = match address {
            ERAM_BEGIN..=ERAM_END => address - 0x2000,
            _ => address,
        };
        match address {
            WRAM_BANK_BEGIN.. => {
                self.wram_bank as usize * WRAM_BANK_SIZE + (address - WRAM_BANK_BEGIN) as usize
            }
            _ => (address - WRAM_BEGIN) as usize,
        }
    }

    /// Handles all writes to the I/O registers (0xFF00-0xFF7F)
    fn write_io(&mut self, address: u16, value: u8) {
        match address {
            JOYPAD => {
                if self.joypad.write(value) {
                    self.interrupt_flag.insert(InterruptRegister::JOYPAD);
                }
            }
            SERIAL_TRANSFER_DATA..=SERIAL_TRANSFER_CTRL => self.serial.write(address, value),
            0xFF03 => {} // undocumented
            TIMER_DIVIDER..=TIMER_CTRL => self.timer.write(address, value),
            0xFF08..=0xFF0E => {} // undocumented
            INTERRUPT_FLAG => self.interrupt_flag = InterruptRegister::from_bits_truncate(value),
            AUDIO_REGISTERS_START..=AUDIO_REGISTERS_END => self.audio.write(address, value),
            PPU_DMA => {
                self.dma.register = value;
                // Source pages above the echo area never start a transfer
                if value <= DMA_MAX_SOURCE_PAGE {
                    self.dma.request(value);
                }
            }
            PPU_REGISTER_START..=PPU_REGISTER_END => self.ppu.write(address, value),
            0xFF4C => {} // undocumented
            CGB_PREPARE_SPEED_SWITCH => {
                if self.mode.is_cgb() {
                    self.speed_switch_armed = value & 0b1 != 0;
                }
            }
            0xFF4E => {} // undocumented
            CGB_VRAM_BANK => self.ppu.write(address, value),
            BOOT_ROM_OFF => {
                if value > 0 {
                    self.is_boot_rom_active = false;
                }
            }
            0xFF51..=0xFF56 => {} // CGB HDMA, not modeled
            0xFF57..=0xFF67 => {} // undocumented
            CGB_BG_PALETTE_INDEX..=CGB_OBJ_PALETTE_DATA => self.ppu.write(address, value),
            0xFF6C..=0xFF6F => {} // undocumented
            CGB_WRAM_BANK => {
                if self.mode.is_cgb() {
                    // Bank 0 cannot be mapped into the switchable window
                    self.wram_bank = match value & 0b111 {
                        0 => 1,
                        bank => bank,
                    };
                }
            }
            0xFF71..=0xFF75 => {}  // undocumented
            PCM_AMPLITUDES12 => {} // read-only
            PCM_AMPLITUDES34 => {} // read-only
            0xFF78..=0xFF7F => {}  // undocumented
            _ => panic!("Attempt to write to unmapped I/O register: {address:#06x}"),
        }
    }

    /// Handles all reads from the I/O registers (0xFF00-0xFF7F)
    fn read_io(&mut self, address: u16) -> u8 {
        match address {
            JOYPAD => self.joypad.read(),
            SERIAL_TRANSFER_DATA..=SERIAL_TRANSFER_CTRL => self.serial.read(address),
            0xFF03 => UNDEFINED_READ, // undocumented
            TIMER_DIVIDER..=TIMER_CTRL => self.timer.read(address),
            0xFF08..=0xFF0E => UNDEFINED_READ, // undocumented
            // Undocumented bits should be 1
            INTERRUPT_FLAG => self.interrupt_flag.bits() | 0b1110_0000,
            AUDIO_REGISTERS_START..=AUDIO_REGISTERS_END => self.audio.read(address),
            PPU_DMA => self.dma.register,
            PPU_REGISTER_START..=PPU_REGISTER_END => self.ppu.read(address),
            0xFF4C => UNDEFINED_READ, // undocumented
            CGB_PREPARE_SPEED_SWITCH => match self.mode.is_cgb() {
                true => {
                    0b0111_1110
                        | ((self.double_speed as u8) << 7)
                        | (self.speed_switch_armed as u8)
                }
                false => UNDEFINED_READ,
            },
            0xFF4E => UNDEFINED_READ, // undocumented
            CGB_VRAM_BANK => self.ppu.read(address),
            // When read, this register is always 0xFF
            BOOT_ROM_OFF => UNDEFINED_READ,
            0xFF51..=0xFF56 => UNDEFINED_READ, // CGB HDMA, not modeled
            0xFF57..=0xFF67 => UNDEFINED_READ, // undocumented
            CGB_BG_PALETTE_INDEX..=CGB_OBJ_PALETTE_DATA => self.ppu.read(address),
            0xFF6C..=0xFF6F => UNDEFINED_READ, // undocumented
            CGB_WRAM_BANK => match self.mode.is_cgb() {
                true => 0b1111_1000 | self.wram_bank,
                false => UNDEFINED_READ,
            },
            0xFF71..=0xFF75 => UNDEFINED_READ,  // undocumented
            PCM_AMPLITUDES12 => UNDEFINED_READ, // not modeled
            PCM_AMPLITUDES34 => UNDEFINED_READ, // not modeled
            0xFF78..=0xFF7F => UNDEFINED_READ,  // undocumented
            _ => panic!("Attempt to read from unmapped I/O register: {address:#06x}"),
        }
    }

    /// Reads without advancing the clock, used by DMA and debug frontends.
    pub fn read_raw(&mut self, address: u16) -> u8 {
        match address {
            ROM_LOW_BANK_BEGIN..=ROM_HIGH_BANK_END => self.read_cartridge(address),
            VRAM_BEGIN..=VRAM_END => self.ppu.read(address),
            CRAM_BANK_BEGIN..=CRAM_BANK_END => self.cartridge.read(address),
            WRAM_BEGIN..=WRAM_END | ERAM_BEGIN..=ERAM_END => self.wram[self.wram_offset(address)],
            OAM_BEGIN..=OAM_END => self.ppu.read(address),
            UNUSED_BEGIN..=UNUSED_END => UNDEFINED_READ,
            IO_BEGIN..=IO_END => self.read_io(address),
            HRAM_BEGIN..=HRAM_END => self.hram[(address - HRAM_BEGIN) as usize],
            INTERRUPT_ENABLE => self.interrupt_enable.bits(),
        }
    }

    /// Writes without advancing the clock, used by debug frontends.
    pub fn write_raw(&mut self, address: u16, value: u8) {
        match address {
            ROM_LOW_BANK_BEGIN..=ROM_HIGH_BANK_END => self.cartridge.write(address, value),
            VRAM_BEGIN..=VRAM_END => self.ppu.write(address, value),
            CRAM_BANK_BEGIN..=CRAM_BANK_END => self.cartridge.write(address, value),
            WRAM_BEGIN..=WRAM_END | ERAM_BEGIN..=ERAM_END => {
                self.wram[self.wram_offset(address)] = value;
            }
            OAM_BEGIN..=OAM_END => self.ppu.write(address, value),
            UNUSED_BEGIN..=UNUSED_END => {}
            IO_BEGIN..=IO_END => self.write_io(address, value),
            HRAM_BEGIN..=HRAM_END => self.hram[(address - HRAM_BEGIN) as usize] = value,
            INTERRUPT_ENABLE => self.interrupt_enable = InterruptRegister::from_bits_truncate(value),
        }
    }
}

impl SubSystem for MainBus {
    fn write(&mut self, address: u16, value: u8) {
        self.cycle();
        // While OAM DMA owns the bus only IO registers, HRAM and IE are
        // reachable for the CPU.
        if self.dma_active() && address < HRAM_BEGIN && !(IO_BEGIN..=IO_END).contains(&address) {
            return;
        }
        if let Some(hooks) = self.hooks.as_deref_mut() {
            hooks.on_memory_write(address, value);
        }
        self.write_raw(address, value);
    }

    fn read(&mut self, address: u16) -> u8 {
        self.cycle();
        // While OAM DMA owns the bus all reads below HRAM return 0xFF
        if self.dma_active() && address < HRAM_BEGIN {
            return UNDEFINED_READ;
        }
        let value = self.read_raw(address);
        if let Some(hooks) = self.hooks.as_deref_mut() {
            hooks.on_memory_read(address, value);
        }
        value
    }
}

impl Bus for MainBus {
    /// Advances the machine by one M-cycle. In double speed mode the PPU,
    /// APU and serial port receive only half their usual T-cycles.
    fn cycle(&mut self) {
        self.t_cycles += 4;
        let device_cycles: u8 = match self.double_speed {
            true => 2,
            false => 4,
        };
        self.cycle_dma();
        self.timer.step(4, &mut self.interrupt_flag);
        self.ppu.step(u16::from(device_cycles), &mut self.interrupt_flag);
        self.audio.step(device_cycles);
        self.serial.step(device_cycles, &mut self.interrupt_flag);
    }

    #[inline]
    fn has_irq(&self) -> bool {
        let enabled = self.interrupt_enable.bits() & 0b0001_1111;
        let flag = self.interrupt_flag.bits() & 0b0001_1111;
        enabled & flag != 0
    }

    #[inline]
    fn set_ie(&mut self, r: InterruptRegister) {
        self.interrupt_enable = r;
    }

    #[inline]
    fn get_ie(&self) -> InterruptRegister {
        self.interrupt_enable
    }

    #[inline]
    fn set_if(&mut self, r: InterruptRegister) {
        self.interrupt_flag = r;
    }

    #[inline]
    fn get_if(&self) -> InterruptRegister {
        self.interrupt_flag
    }

    fn before_instruction(&mut self, address: u16, opcode: u8) {
        if let Some(hooks) = self.hooks.as_deref_mut() {
            hooks.before_instruction(address, opcode);
        }
    }

    fn after_step(&mut self) {
        if let Some(hooks) = self.hooks.as_deref_mut() {
            hooks.after_step();
        }
    }

    fn take_speed_switch_request(&mut self) -> bool {
        if !self.speed_switch_armed {
            return false;
        }
        self.speed_switch_armed = false;
        self.double_speed = !self.double_speed;
        true
    }
}

use crate::gb::bus::InterruptRegister;
use crate::gb::constants::*;
use crate::gb::ppu::buffer::{FrameBuffer, FrameFormat};
use crate::gb::ppu::palette::{ColorPaletteRam, Palette};
use crate::gb::ppu::registers::{LCDControl, LCDState, PPUMode, Registers};
use crate::gb::ppu::sprite::{OamEntry, TileAttributes};
use crate::gb::{
    FrameSink, HardwareMode, SCREEN_HEIGHT, SCREEN_WIDTH, SubSystem,
    VERTICAL_BLANK_SCAN_LINE_MAX,
};
use bitvec::prelude::*;
use itertools::Itertools;

pub mod buffer;
pub mod palette;
pub mod registers;
pub mod sprite;

/// The per-scanline T-cycle budget of the three visible modes,
/// they always sum up to 456.
pub const OAM_SCAN_CYCLES: u16 = 80;
pub const PIXEL_TRANSFER_CYCLES: u16 = 172;
pub const HBLANK_CYCLES: u16 = 204;
pub const SCANLINE_CYCLES: u16 = 456;

/// VBlank consists of ten full idle scanlines.
pub const VBLANK_CYCLES: u16 = SCANLINE_CYCLES;

const OAM_ENTRY_COUNT: usize = 40;
const MAX_SPRITES_PER_LINE: usize = 10;

/// One background or window pixel before palette resolution.
#[derive(Copy, Clone, Default)]
struct BgPixel {
    color: u8,      // raw 2-bit color index
    palette: u8,    // CGB palette index, unused on DMG
    priority: bool, // CGB per-tile priority bit
}

/// One sprite pixel before palette resolution.
#[derive(Copy, Clone)]
struct ObjPixel {
    color: u8,       // raw 2-bit color index, never 0
    palette: u8,     // OBP number on DMG, palette index on CGB
    behind_bg: bool, // OAM priority bit
}

/// The Pixel Processing Unit. Owns VRAM and OAM and renders one scanline at
/// a time while walking the OAMScan -> PixelTransfer -> HBlank state machine,
/// interleaved with ten VBlank lines per frame.
pub struct PPU {
    pub r: Registers,
    mode: HardwareMode,
    vram: Box<[[u8; VRAM_BANK_SIZE]; 2]>,
    vram_bank: u8,
    oam: [u8; OAM_SIZE],
    bg_palettes: ColorPaletteRam,
    obj_palettes: ColorPaletteRam,
    /// OAM indices collected during the last OAMScan, at most ten.
    line_sprites: Vec<usize>,
    frame: FrameBuffer,
    frames_rendered: u64,
    sink: Option<Box<dyn FrameSink>>,
    /// T-cycles into the current scanline.
    dot: u16,
    /// The window keeps its own line counter, it only advances on lines
    /// which actually showed window pixels.
    window_line: u8,
    /// Composite STAT interrupt line for rising edge detection.
    stat_line: bool,
    stat_interrupt_pending: bool,
    /// Set while the LCD is disabled, the first frame after re-enabling
    /// is not delivered to the sink.
    lcd_was_off: bool,
}

impl PPU {
    pub fn new(mode: HardwareMode) -> Self {
        let format = match mode {
            HardwareMode::DMG => FrameFormat::Grey,
            HardwareMode::CGB => FrameFormat::Rgba,
        };
        Self {
            r: Registers::default(),
            mode,
            vram: Box::new([[0; VRAM_BANK_SIZE]; 2]),
            vram_bank: 0,
            oam: [0; OAM_SIZE],
            bg_palettes: ColorPaletteRam::default(),
            obj_palettes: ColorPaletteRam::default(),
            line_sprites: Vec::with_capacity(MAX_SPRITES_PER_LINE),
            frame: FrameBuffer::new(format),
            frames_rendered: 0,
            sink: None,
            dot: 0,
            window_line: 0,
            stat_line: false,
            stat_interrupt_pending: false,
            lcd_was_off: false,
        }
    }

    #[inline]
    pub fn set_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    #[inline]
    pub const fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The most recently completed frame.
    #[inline]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Advances the PPU by the given number of T-cycles and walks the
    /// scanline state machine.
    pub fn step(&mut self, t_cycles: u16, int_reg: &mut InterruptRegister) {
        if !self.r.lcd_control.contains(LCDControl::LCD_EN) {
            return;
        }
        self.dot += t_cycles;

        match self.r.lcd_stat.mode() {
            PPUMode::OAMScan if self.dot >= PPUMode::OAMScan.cycles() => {
                self.collect_sprites();
                self.set_mode(PPUMode::PixelTransfer);
            }
            PPUMode::PixelTransfer
                if self.dot >= PPUMode::OAMScan.cycles() + PPUMode::PixelTransfer.cycles() =>
            {
                self.render_scanline();
                self.set_mode(PPUMode::HBlank);
            }
            PPUMode::HBlank if self.dot >= SCANLINE_CYCLES => {
                self.dot -= SCANLINE_CYCLES;
                self.r.ly += 1;
                if self.r.ly == SCREEN_HEIGHT {
                    int_reg.insert(InterruptRegister::VBLANK);
                    self.finish_frame();
                    self.set_mode(PPUMode::VBlank);
                } else {
                    self.set_mode(PPUMode::OAMScan);
                }
                self.refresh_stat_line();
            }
            PPUMode::VBlank if self.dot >= SCANLINE_CYCLES => {
                self.dot -= SCANLINE_CYCLES;
                self.r.ly += 1;
                if self.r.ly > VERTICAL_BLANK_SCAN_LINE_MAX {
                    self.r.ly = 0;
                    self.window_line = 0;
                    self.set_mode(PPUMode::OAMScan);
                }
                self.refresh_stat_line();
            }
            _ => {}
        }

        if self.stat_interrupt_pending {
            self.stat_interrupt_pending = false;
            int_reg.insert(InterruptRegister::STAT);
        }
    }

    /// Delivers the finished frame to the sink. The first frame after the
    /// LCD has been re-enabled is withheld, its content is garbage.
    fn finish_frame(&mut self) {
        self.frames_rendered += 1;
        if self.lcd_was_off {
            self.lcd_was_off = false;
            return;
        }
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.push_frame(&self.frame);
        }
    }

    /// Updates the mode bits in STAT and re-evaluates the interrupt line.
    fn set_mode(&mut self, mode: PPUMode) {
        self.r.lcd_stat.set_mode(mode);
        self.refresh_stat_line();
    }

    /// Recomputes the composite STAT interrupt line, a rising edge
    /// schedules the STAT interrupt.
    fn refresh_stat_line(&mut self) {
        let coincidence = self.r.ly == self.r.lyc;
        self.r.lcd_stat.set(LCDState::LYC_STAT, coincidence);
        if !self.r.lcd_control.contains(LCDControl::LCD_EN) {
            self.stat_line = false;
            return;
        }
        let stat = self.r.lcd_stat;
        let line = match stat.mode() {
            PPUMode::HBlank => stat.contains(LCDState::H_BLANK_INT),
            PPUMode::VBlank => stat.contains(LCDState::V_BLANK_INT),
            PPUMode::OAMScan => stat.contains(LCDState::OAM_INT),
            PPUMode::PixelTransfer => false,
        } || (stat.contains(LCDState::LY_INT) && coincidence);
        if line && !self.stat_line {
            self.stat_interrupt_pending = true;
        }
        self.stat_line = line;
    }

    /// Walks all 40 OAM entries in address order and selects the first ten
    /// covering the current scanline.
    fn collect_sprites(&mut self) {
        let height = self.r.lcd_control.obj_height();
        let ly = self.r.ly;
        let sprites = (0..OAM_ENTRY_COUNT)
            .filter(|&index| self.oam_entry(index).covers_line(ly, height))
            .take(MAX_SPRITES_PER_LINE)
            .collect_vec();
        self.line_sprites = sprites;
    }

    #[inline]
    fn oam_entry(&self, index: usize) -> OamEntry {
        OamEntry::from_bytes(&self.oam[index * 4..index * 4 + 4])
    }

    #[inline]
    fn vram_byte(&self, high_bank: bool, address: u16) -> u8 {
        self.vram[high_bank as usize][(address - VRAM_BEGIN) as usize]
    }

    /// Resolves a tile index into the start address of its data,
    /// honoring the signed 0x8800 addressing mode.
    fn tile_data_address(&self, index: u8) -> u16 {
        match self.r.lcd_control.contains(LCDControl::TILE_SEL) {
            true => 0x8000 + u16::from(index) * 16,
            false => (0x9000 + i32::from(index as i8) * 16) as u16,
        }
    }

    /// Fetches one pixel from the given tile map position. On CGB the
    /// attribute byte from VRAM bank 1 selects palette, bank, flips and
    /// the per-tile priority.
    fn fetch_map_pixel(&self, map_base: u16, src_x: u8, src_y: u8) -> BgPixel {
        let map_address = map_base + u16::from(src_y / 8) * 32 + u16::from(src_x / 8);
        let tile_index = self.vram_byte(false, map_address);
        let attributes = match self.mode.is_cgb() {
            true => TileAttributes::from_bits_retain(self.vram_byte(true, map_address)),
            false => TileAttributes::empty(),
        };

        let row = match attributes.contains(TileAttributes::FLIP_Y) {
            true => 7 - src_y % 8,
            false => src_y % 8,
        };
        let data_address = self.tile_data_address(tile_index) + u16::from(row) * 2;
        let high_bank = attributes.contains(TileAttributes::VRAM_BANK);
        let low = self.vram_byte(high_bank, data_address);
        let high = self.vram_byte(high_bank, data_address + 1);

        let pixel = match attributes.contains(TileAttributes::FLIP_X) {
            true => 7 - src_x % 8,
            false => src_x % 8,
        };
        BgPixel {
            color: tile_color(low, high, pixel),
            palette: (attributes & TileAttributes::CGB_PALETTE).bits(),
            priority: attributes.contains(TileAttributes::BEHIND_BG),
        }
    }

    /// Renders all 160 pixels of the current scanline into the frame buffer.
    fn render_scanline(&mut self) {
        let ly = self.r.ly;
        let cgb = self.mode.is_cgb();
        // On DMG a cleared BG_EN blanks background and window to color 0,
        // on CGB it only demotes their priority over sprites.
        let bg_enabled = cgb || self.r.lcd_control.contains(LCDControl::BG_EN);

        let mut bg_line = [BgPixel::default(); SCREEN_WIDTH as usize];
        if bg_enabled {
            let map_base = self.r.lcd_control.bg_tile_map_area();
            for x in 0..SCREEN_WIDTH {
                let src_x = self.r.scx.wrapping_add(x);
                let src_y = self.r.scy.wrapping_add(ly);
                bg_line[x as usize] = self.fetch_map_pixel(map_base, src_x, src_y);
            }
        }

        // The window replaces the background from WX-7 onward once WY has
        // been reached, with its own unscrolled line counter.
        let window_active = bg_enabled
            && self.r.lcd_control.contains(LCDControl::WIN_EN)
            && self.r.wx <= 166
            && self.r.wy <= ly;
        if window_active {
            let map_base = self.r.lcd_control.window_tile_map_area();
            let origin = i16::from(self.r.wx) - 7;
            let mut drawn = false;
            for x in origin.max(0)..i16::from(SCREEN_WIDTH) {
                let src_x = (x - origin) as u8;
                bg_line[x as usize] = self.fetch_map_pixel(map_base, src_x, self.window_line);
                drawn = true;
            }
            if drawn {
                self.window_line += 1;
            }
        }

        let obj_line = self.render_sprites(ly);

        for x in 0..SCREEN_WIDTH {
            let bg = bg_line[x as usize];
            let obj = obj_line[x as usize].filter(|obj| self.sprite_wins(obj, &bg));
            match cgb {
                true => {
                    let rgba = match obj {
                        Some(obj) => self.obj_palettes.rgba(obj.palette, obj.color),
                        None => self.bg_palettes.rgba(bg.palette, bg.color),
                    };
                    self.frame.set_rgba(x, ly, rgba);
                }
                false => {
                    let shade = match obj {
                        Some(obj) => self.obj_palette(obj.palette).colorize(obj.color),
                        None => self.r.bg_palette.colorize(bg.color),
                    };
                    self.frame.set_shade(x, ly, shade);
                }
            }
        }
    }

    /// Resolves the sprite-over-background priority for one pixel.
    fn sprite_wins(&self, obj: &ObjPixel, bg: &BgPixel) -> bool {
        if self.mode.is_cgb() {
            // A cleared BG_EN is the master override: sprites always win.
            // Otherwise both the OAM priority bit and the per-tile priority
            // bit can put a non-transparent background pixel on top.
            if !self.r.lcd_control.contains(LCDControl::BG_EN) {
                return true;
            }
            !(bg.color != 0 && (obj.behind_bg || bg.priority))
        } else {
            !(obj.behind_bg && bg.color != 0)
        }
    }

    #[inline]
    fn obj_palette(&self, number: u8) -> Palette {
        match number {
            0 => self.r.obj_palette0,
            _ => self.r.obj_palette1,
        }
    }

    /// Mixes the selected sprites into a scanline overlay. Entries earlier
    /// in OAM win overlapping pixels, transparent pixels never land.
    fn render_sprites(&self, ly: u8) -> [Option<ObjPixel>; SCREEN_WIDTH as usize] {
        let mut obj_line = [None; SCREEN_WIDTH as usize];
        if !self.r.lcd_control.contains(LCDControl::OBJ_EN) {
            return obj_line;
        }
        let height = self.r.lcd_control.obj_height();
        let cgb = self.mode.is_cgb();

        for &index in &self.line_sprites {
            let sprite = self.oam_entry(index);
            let mut row = sprite.row_for_line(ly, height);
            let tile = match height {
                // 8x16 sprites pair an even tile with the following odd one
                16 => (sprite.tile & 0xFE) | u8::from(row >= 8),
                _ => sprite.tile,
            };
            row %= 8;

            // Sprites always use the unsigned 0x8000 tile addressing
            let data_address = 0x8000 + u16::from(tile) * 16 + u16::from(row) * 2;
            let high_bank = cgb && sprite.attributes.contains(TileAttributes::VRAM_BANK);
            let low = self.vram_byte(high_bank, data_address);
            let high = self.vram_byte(high_bank, data_address + 1);

            for pixel in 0..8u8 {
                let screen_x = i16::from(sprite.x) - 8 + i16::from(pixel);
                if !(0..i16::from(SCREEN_WIDTH)).contains(&screen_x) {
                    continue;
                }
                let slot = &mut obj_line[screen_x as usize];
                if slot.is_some() {
                    continue;
                }
                let bit = match sprite.attributes.contains(TileAttributes::FLIP_X) {
                    true => 7 - pixel,
                    false => pixel,
                };
                let color = tile_color(low, high, bit);
                if color == 0 {
                    continue;
                }
                let palette = match cgb {
                    true => (sprite.attributes & TileAttributes::CGB_PALETTE).bits(),
                    false => sprite.attributes.contains(TileAttributes::DMG_PALETTE) as u8,
                };
                *slot = Some(ObjPixel {
                    color,
                    palette,
                    behind_bg: sprite.attributes.contains(TileAttributes::BEHIND_BG),
                });
            }
        }
        obj_line
    }

    /// Direct OAM write used by the OAM DMA engine.
    #[inline]
    pub fn write_oam(&mut self, offset: u8, value: u8) {
        self.oam[offset as usize] = value;
    }
}

/// Combines the two tile data planes into a 2-bit color index.
/// Pixel 0 is the leftmost pixel and lives in the most significant bit.
#[inline]
fn tile_color(low: u8, high: u8, pixel: u8) -> u8 {
    let low_bits = low.view_bits::<Msb0>();
    let high_bits = high.view_bits::<Msb0>();
    let index = pixel as usize;
    (u8::from(high_bits[index]) << 1) | u8::from(low_bits[index])
}

impl SubSystem for PPU {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            VRAM_BEGIN..=VRAM_END => {
                self.vram[self.vram_bank as usize][(address - VRAM_BEGIN) as usize] = value;
            }
            OAM_BEGIN..=OAM_END => self.oam[(address - OAM_BEGIN) as usize] = value,
            PPU_LCDC => {
                let was_enabled = self.r.lcd_control.contains(LCDControl::LCD_EN);
                self.r.lcd_control = LCDControl::from_bits_retain(value);
                let enabled = self.r.lcd_control.contains(LCDControl::LCD_EN);
                if was_enabled && !enabled {
                    // Turning the LCD off resets the whole line state,
                    // no frames and no STAT interrupts are produced.
                    self.r.ly = 0;
                    self.dot = 0;
                    self.r.lcd_stat.set_mode(PPUMode::HBlank);
                    self.stat_line = false;
                    self.stat_interrupt_pending = false;
                    self.lcd_was_off = true;
                } else if !was_enabled && enabled {
                    self.dot = 0;
                    self.set_mode(PPUMode::OAMScan);
                }
            }
            // The mode and coincidence bits are read-only
            PPU_STAT => {
                let writable = LCDState::from_bits_truncate(value & 0b0111_1000);
                let read_only = self.r.lcd_stat
                    & (LCDState::PPU_MODE1 | LCDState::PPU_MODE2 | LCDState::LYC_STAT);
                self.r.lcd_stat = writable | read_only;
                self.refresh_stat_line();
            }
            PPU_SCY => self.r.scy = value,
            PPU_SCX => self.r.scx = value,
            // LY is read-only, writing resets the line counter
            PPU_LY => {
                self.r.ly = 0;
                self.dot = 0;
                self.refresh_stat_line();
            }
            PPU_LYC => {
                self.r.lyc = value;
                self.refresh_stat_line();
            }
            PPU_BGP => self.r.bg_palette = Palette::from(value),
            PPU_OBP0 => self.r.obj_palette0 = Palette::from(value),
            PPU_OBP1 => self.r.obj_palette1 = Palette::from(value),
            PPU_WY => self.r.wy = value,
            PPU_WX => self.r.wx = value,
            CGB_VRAM_BANK if self.mode.is_cgb() => self.vram_bank = value & 0b1,
            CGB_BG_PALETTE_INDEX if self.mode.is_cgb() => self.bg_palettes.write_index(value),
            CGB_BG_PALETTE_DATA if self.mode.is_cgb() => self.bg_palettes.write_data(value),
            CGB_OBJ_PALETTE_INDEX if self.mode.is_cgb() => self.obj_palettes.write_index(value),
            CGB_OBJ_PALETTE_DATA if self.mode.is_cgb() => self.obj_palettes.write_data(value),
            CGB_VRAM_BANK | CGB_BG_PALETTE_INDEX..=CGB_OBJ_PALETTE_DATA => {} // DMG ignores
            _ => panic!("Attempt to write to unmapped PPU register: {address:#06x}"),
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            VRAM_BEGIN..=VRAM_END => {
                self.vram[self.vram_bank as usize][(address - VRAM_BEGIN) as usize]
            }
            OAM_BEGIN..=OAM_END => self.oam[(address - OAM_BEGIN) as usize],
            PPU_LCDC => self.r.lcd_control.bits(),
            // Undocumented bits should be 1
            PPU_STAT => self.r.lcd_stat.bits() | 0b1000_0000,
            PPU_SCY => self.r.scy,
            PPU_SCX => self.r.scx,
            PPU_LY => self.r.ly,
            PPU_LYC => self.r.lyc,
            PPU_BGP => self.r.bg_palette.into(),
            PPU_OBP0 => self.r.obj_palette0.into(),
            PPU_OBP1 => self.r.obj_palette1.into(),
            PPU_WY => self.r.wy,
            PPU_WX => self.r.wx,
            CGB_VRAM_BANK if self.mode.is_cgb() => 0b1111_1110 | self.vram_bank,
            CGB_BG_PALETTE_INDEX if self.mode.is_cgb() => self.bg_palettes.read_index(),
            CGB_BG_PALETTE_DATA if self.mode.is_cgb() => self.bg_palettes.read_data(),
            CGB_OBJ_PALETTE_INDEX if self.mode.is_cgb() => self.obj_palettes.read_index(),
            CGB_OBJ_PALETTE_DATA if self.mode.is_cgb() => self.obj_palettes.read_data(),
            CGB_VRAM_BANK | CGB_BG_PALETTE_INDEX..=CGB_OBJ_PALETTE_DATA => UNDEFINED_READ,
            _ => panic!("Attempt to read from unmapped PPU register: {address:#06x}"),
        }
    }
}

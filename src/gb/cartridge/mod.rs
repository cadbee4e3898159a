use crate::gb::cartridge::controller::BankController;
use crate::gb::{GBError, GBResult, HardwareMode, SubSystem};
use std::path::Path;
use std::sync::Arc;
use std::{fmt, fs};

mod controller;
mod mbc1;
mod mbc3;
mod mbc5;
mod nombc;
pub mod rtc;

/// This area of memory contains the cartridge title
const CARTRIDGE_TITLE_BEGIN: u16 = 0x0134;
const CARTRIDGE_TITLE_END: u16 = 0x0142;

/// When using any CGB registers (including those in the Video/Link chapters),
/// you must first unlock CGB features by changing byte 0143h in the cartridge
/// header. Typically, use a value of 80h for games which support both CGB and
/// monochrome Game Boys, and C0h for games which work on CGBs only. Otherwise,
/// the CGB will operate in monochrome "Non CGB" compatibility mode.
const CARTRIDGE_CGB_FLAG: u16 = 0x0143;

/// This address contains the cartridge type and what kind of hardware is
/// present. See https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
const CARTRIDGE_TYPE: u16 = 0x0147;

/// This byte indicates how much ROM is present on the cartridge.
/// In most cases, the ROM size is given by 32KiB * (1 << value).
const CARTRIDGE_ROM_SIZE: u16 = 0x0148;

/// This byte indicates how much RAM is present on the cartridge.
const CARTRIDGE_RAM_SIZE: u16 = 0x0149;

/// These bytes contain a 16-bit (big-endian) checksum simply computed as the
/// sum of all the bytes of the cartridge ROM (except these two checksum bytes).
const CARTRIDGE_GLOBAL_CHECKSUM1: u16 = 0x014E;
const CARTRIDGE_GLOBAL_CHECKSUM2: u16 = 0x014F;

const ROM_BANK_SIZE: usize = 16384;
const RAM_BANK_SIZE: usize = 8192;

/// The controller type of the cartridge, with the presence of battery backed
/// RAM and a real time clock where applicable.
/// See https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum ControllerType {
    NoMBC { battery: bool },
    MBC1 { battery: bool },
    MBC3 { battery: bool, clock: bool },
    MBC5 { battery: bool },
}

impl TryFrom<u8> for ControllerType {
    type Error = GBError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let mode = match value {
            0x00 | 0x08 => ControllerType::NoMBC { battery: false },
            0x09 => ControllerType::NoMBC { battery: true },
            0x01 | 0x02 => ControllerType::MBC1 { battery: false },
            0x03 => ControllerType::MBC1 { battery: true },
            0x0F | 0x10 => ControllerType::MBC3 {
                battery: true,
                clock: true,
            },
            0x11 | 0x12 => ControllerType::MBC3 {
                battery: false,
                clock: false,
            },
            0x13 => ControllerType::MBC3 {
                battery: true,
                clock: false,
            },
            0x19 | 0x1A | 0x1C | 0x1D => ControllerType::MBC5 { battery: false },
            0x1B | 0x1E => ControllerType::MBC5 { battery: true },
            0x05 | 0x06 | 0x20 | 0x22 => {
                return Err(GBError::UnsupportedCartridge(format!(
                    "controller type {value:#04x} is not implemented"
                )));
            }
            // Unknown controller bytes behave like a plain 32 KiB board
            _ => ControllerType::NoMBC { battery: false },
        };
        Ok(mode)
    }
}

impl ControllerType {
    #[inline]
    pub const fn has_battery(&self) -> bool {
        match self {
            ControllerType::NoMBC { battery } => *battery,
            ControllerType::MBC1 { battery } => *battery,
            ControllerType::MBC3 { battery, .. } => *battery,
            ControllerType::MBC5 { battery } => *battery,
        }
    }

    #[inline]
    pub const fn has_clock(&self) -> bool {
        matches!(self, ControllerType::MBC3 { clock: true, .. })
    }
}

impl fmt::Display for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerType::NoMBC { .. } => "NoMBC",
            ControllerType::MBC1 { .. } => "MBC1",
            ControllerType::MBC3 { clock: true, .. } => "MBC3+RTC",
            ControllerType::MBC3 { .. } => "MBC3",
            ControllerType::MBC5 { .. } => "MBC5",
        };
        write!(f, "{name}")
    }
}

/// Contains the configuration of the cartridge. This includes the controller
/// type, ROM size, RAM size, and the number of banks.
#[derive(Copy, Clone, Debug)]
pub struct CartridgeConfig {
    pub controller: ControllerType,
    pub rom_banks: u16,
    pub ram_banks: u16,
}

impl CartridgeConfig {
    pub fn new(controller: ControllerType, rom_size: u8, ram_size: u8) -> GBResult<Self> {
        let ram_banks = match ram_size {
            0x00 | 0x01 => 0,
            0x02 => 1,
            0x03 => 4,
            0x04 => 16,
            0x05 => 8,
            value => {
                return Err(GBError::UnsupportedCartridge(format!(
                    "unsupported RAM size: {value:#04x}"
                )));
            }
        };

        // The bank count doubles with every size code, up to 8 MiB.
        let rom_banks = match rom_size {
            0x00..=0x08 => 2 << rom_size,
            value => {
                return Err(GBError::UnsupportedCartridge(format!(
                    "unsupported ROM size: {value:#04x}"
                )));
            }
        };

        Ok(Self {
            controller,
            rom_banks,
            ram_banks,
        })
    }

    #[inline(always)]
    pub const fn ram_size(&self) -> usize {
        self.ram_banks as usize * RAM_BANK_SIZE
    }

    #[inline(always)]
    pub const fn rom_size(&self) -> usize {
        self.rom_banks as usize * ROM_BANK_SIZE
    }

    #[inline]
    pub const fn is_savable(&self) -> bool {
        self.controller.has_battery() && (self.ram_banks > 0 || self.controller.has_clock())
    }
}

/// Contains the cartridge header information.
/// See https://gbdev.io/pandocs/The_Cartridge_Header.html
#[derive(Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub mode: HardwareMode,
    pub config: CartridgeConfig,
}

impl TryFrom<&[u8]> for CartridgeHeader {
    type Error = GBError;
    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        if buf.len() <= CARTRIDGE_GLOBAL_CHECKSUM2 as usize {
            return Err(GBError::InvalidRomImage(
                "image is too small to contain a header".to_string(),
            ));
        }
        let controller = ControllerType::try_from(buf[CARTRIDGE_TYPE as usize])?;
        let config = CartridgeConfig::new(
            controller,
            buf[CARTRIDGE_ROM_SIZE as usize],
            buf[CARTRIDGE_RAM_SIZE as usize],
        )?;
        // Both 0x80 (dual compatible) and 0xC0 (CGB only) unlock CGB features
        let mode = match buf[CARTRIDGE_CGB_FLAG as usize] & 0x80 != 0 {
            true => HardwareMode::CGB,
            false => HardwareMode::DMG,
        };
        let title = CartridgeHeader::parse_title(buf);
        Ok(Self {
            title,
            mode,
            config,
        })
    }
}

impl CartridgeHeader {
    /// Returns the cartridge title from the cartridge header.
    fn parse_title(buf: &[u8]) -> String {
        let title = buf[CARTRIDGE_TITLE_BEGIN as usize..=CARTRIDGE_TITLE_END as usize]
            .iter()
            .filter_map(|b| b.is_ascii_alphanumeric().then_some(char::from(*b)))
            .collect::<String>();
        match title.is_empty() {
            true => "Unnamed".to_string(),
            false => title,
        }
    }
}

impl fmt::Display for CartridgeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.config.controller)
    }
}

/// Holds all relevant cartridge information data.
#[derive(Clone)]
pub struct Cartridge {
    pub header: CartridgeHeader,
    controller: Box<dyn BankController>,
}

impl Cartridge {
    /// Creates an opaque snapshot of the battery backed RAM,
    /// including the RTC record for clock equipped cartridges.
    #[inline]
    pub fn save_ram(&self) -> GBResult<Arc<[u8]>> {
        self.controller.save_ram()
    }

    /// Restores a snapshot created with `save_ram`, any prefix of the
    /// snapshot layout is accepted.
    #[inline]
    pub fn load_ram(&mut self, snapshot: &[u8]) -> GBResult<()> {
        self.controller.load_ram(snapshot)
    }
}

impl TryFrom<Arc<[u8]>> for Cartridge {
    type Error = GBError;

    fn try_from(rom: Arc<[u8]>) -> Result<Self, Self::Error> {
        if let Err(msg) = verify_checksum(rom.as_ref()) {
            eprintln!("WARNING: {msg}");
        }
        let header = CartridgeHeader::try_from(rom.as_ref())?;
        if rom.len() < header.config.rom_size() {
            return Err(GBError::InvalidRomImage(format!(
                "header declares {} banks but the image holds {} bytes",
                header.config.rom_banks,
                rom.len()
            )));
        }
        let controller = controller::new(header.config, rom);
        Ok(Self { controller, header })
    }
}

impl TryFrom<&Path> for Cartridge {
    type Error = GBError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let rom = fs::read(path)?;
        Cartridge::try_from(Arc::from(rom.into_boxed_slice()))
    }
}

impl fmt::Display for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)
    }
}

impl SubSystem for Cartridge {
    #[inline]
    fn write(&mut self, address: u16, value: u8) {
        self.controller.write(address, value);
    }

    #[inline]
    fn read(&mut self, address: u16) -> u8 {
        self.controller.read(address)
    }
}

/// Validates the global checksum of the given buffer containing the whole
/// cartridge. A mismatch only produces a warning, real hardware does not
/// verify it either.
fn verify_checksum(buf: &[u8]) -> Result<(), String> {
    if buf.len() < CARTRIDGE_GLOBAL_CHECKSUM2 as usize {
        return Err("Cartridge is too small to calculate the checksum".to_string());
    }

    let byte1 = buf[CARTRIDGE_GLOBAL_CHECKSUM1 as usize];
    let byte2 = buf[CARTRIDGE_GLOBAL_CHECKSUM2 as usize];
    let checksum = u16::from(byte1) << 8 | u16::from(byte2);
    let calculated_checksum = calculate_global_checksum(buf);

    if checksum == calculated_checksum {
        return Ok(());
    }

    Err(format!(
        "Global checksum mismatch! Expected: {calculated_checksum:#06x} Got: {checksum:#06x}"
    ))
}

/// Calculates the global checksum by adding all bytes from the given cartridge
/// buffer except the two checksum bytes. The comparison has to stay in
/// `usize`: ROMs are larger than 64 KiB and higher addresses must not alias
/// onto the checksum bytes.
fn calculate_global_checksum(buf: &[u8]) -> u16 {
    buf.iter()
        .enumerate()
        .filter(|(address, _)| {
            *address != CARTRIDGE_GLOBAL_CHECKSUM1 as usize
                && *address != CARTRIDGE_GLOBAL_CHECKSUM2 as usize
        })
        .fold(0u16, |sum, (_, &byte)| sum.wrapping_add(u16::from(byte)))
}

/// This function masks the ROM Bank Number to the number of banks in the
/// cartridge. Bank counts are always powers of two, so the mask is an exact
/// modulo reduction.
#[inline]
const fn bank_mask(rom_banks: u16) -> u16 {
    rom_banks - 1
}

use crate::gb::GBResult;
use crate::gb::cartridge::controller::{BankController, ensure_savable, restore_ram_prefix};
use crate::gb::cartridge::{CartridgeConfig, RAM_BANK_SIZE, ROM_BANK_SIZE, bank_mask};
use crate::gb::constants::*;
use std::sync::Arc;

/// Before external RAM can be read or written,
/// it must be enabled by writing 0x0A to anywhere in this address space.
/// Any value with 0x0A in the lower 4 bits enables the RAM attached to the
/// MBC, and any other value disables the RAM.
const RAM_ENABLE_BEGIN: u16 = 0x0000;
const RAM_ENABLE_END: u16 = 0x1FFF;

/// This 5-bit register (range $01-$1F) selects the ROM bank number for the
/// 4000–7FFF region. Higher bits are discarded — writing $E1 (binary
/// 11100001) to this register would select bank $01.
/// If this register is set to $00, it behaves as if it is set to $01.
const ROM_BANK_NUMBER_BEGIN: u16 = 0x2000;
const ROM_BANK_NUMBER_END: u16 = 0x3FFF;

/// This 2-bit register range can be used to select a RAM Bank in range from
/// $00–$03 (32 KiB ram carts only), or to specify the upper two bits
/// (bits 5-6) of the ROM Bank number (1 MiB ROM or larger carts only).
/// If neither ROM nor RAM is large enough, setting this register does nothing.
const RAM_BANK_NUMBER_BEGIN: u16 = 0x4000;
const RAM_BANK_NUMBER_END: u16 = 0x5FFF;

/// This 1-bit register selects between the two MBC1 banking modes,
/// controlling the behaviour of the secondary 2-bit banking register (above).
/// If the cart is not large enough to use the 2-bit register (≤ 8 KiB RAM and
/// ≤ 512 KiB ROM) this mode select has no observable effect. The program may
/// freely switch between the two modes at any time.
const BANKING_MODE_SELECT_BEGIN: u16 = 0x6000;
const BANKING_MODE_SELECT_END: u16 = 0x7FFF;

/// The two MBC1 banking modes. In `Simple` mode the lower region is pinned to
/// bank 0 and RAM to bank 0, in `Advanced` mode the secondary register also
/// banks the lower ROM region and the RAM.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum BankingMode {
    Simple,
    Advanced,
}

/// In its default configuration, MBC1 supports up to 512 KiB ROM with up to
/// 32 KiB of banked RAM. Some cartridges wire the MBC differently, where the
/// 2-bit RAM banking register is wired as an extension of the ROM banking
/// register (instead of to RAM) in order to support up to 2 MiB ROM, at the
/// cost of only supporting a fixed 8 KiB of cartridge RAM. All MBC1
/// cartridges with 1 MiB of ROM or more use this alternate wiring.
#[derive(Clone)]
pub struct MBC1 {
    config: CartridgeConfig,
    rom: Arc<[u8]>,
    ram: Vec<u8>,
    low_rom_bank_offset: usize, // current selected ROM bank offset for 0x0000 - 0x3FFF
    high_rom_bank_offset: usize, // current selected ROM bank offset for 0x4000 - 0x7FFF
    ram_bank_offset: usize,     // current selected RAM bank offset for 0xA000 - 0xBFFF
    has_ram_access: bool,
    bank_low_bits: u8,  // lower 5 bits of the ROM bank number
    bank_high_bits: u8, // RAM bank number or upper 2 bits of the ROM bank number
    banking_mode: BankingMode,
}

impl MBC1 {
    pub fn new(config: CartridgeConfig, rom: Arc<[u8]>) -> Self {
        Self {
            ram: vec![0; config.ram_size()],
            low_rom_bank_offset: 0,
            high_rom_bank_offset: ROM_BANK_SIZE,
            ram_bank_offset: 0,
            has_ram_access: false,
            banking_mode: BankingMode::Simple,
            bank_low_bits: 0b0000_0001,
            bank_high_bits: 0b0000_0000,
            rom,
            config,
        }
    }

    /// Updates the ROM bank offsets from the bank registers and the banking
    /// mode. The combined bank number is reduced modulo the bank count.
    const fn update_rom_offsets(&mut self) {
        let mask = bank_mask(self.config.rom_banks) as usize;
        let low_bank_nr = match self.banking_mode {
            BankingMode::Simple => 0,
            BankingMode::Advanced => ((self.bank_high_bits as usize) << 5) & mask,
        };
        self.low_rom_bank_offset = ROM_BANK_SIZE * low_bank_nr;

        let high_bank_nr =
            (((self.bank_high_bits as usize) << 5) | self.bank_low_bits as usize) & mask;
        self.high_rom_bank_offset = ROM_BANK_SIZE * high_bank_nr;
    }

    /// Updates the RAM bank offset based on the current banking mode.
    /// Only cartridges with 4 banks support RAM banking.
    fn update_ram_offset(&mut self) {
        if self.config.ram_banks == 4 && self.banking_mode == BankingMode::Advanced {
            self.ram_bank_offset = RAM_BANK_SIZE * self.bank_high_bits as usize;
        } else {
            self.ram_bank_offset = 0;
        }
    }
}

impl BankController for MBC1 {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            ROM_LOW_BANK_BEGIN..=ROM_LOW_BANK_END => {
                self.rom[self.low_rom_bank_offset + (address - ROM_LOW_BANK_BEGIN) as usize]
            }
            ROM_HIGH_BANK_BEGIN..=ROM_HIGH_BANK_END => {
                self.rom[self.high_rom_bank_offset + (address - ROM_HIGH_BANK_BEGIN) as usize]
            }
            CRAM_BANK_BEGIN..=CRAM_BANK_END => {
                if self.has_ram_access && !self.ram.is_empty() {
                    self.ram[self.ram_bank_offset + (address - CRAM_BANK_BEGIN) as usize]
                } else {
                    UNDEFINED_READ
                }
            }
            _ => panic!("MBC1: Invalid address for read: {address:#06x}"),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            // Any value with 0x0A in the lower 4 bits enables ram, any other
            // value disables it.
            RAM_ENABLE_BEGIN..=RAM_ENABLE_END => {
                self.has_ram_access = value & 0b1111 == 0b1010;
            }
            // Sets the lower 5 bits of the ROM bank number.
            ROM_BANK_NUMBER_BEGIN..=ROM_BANK_NUMBER_END => {
                self.bank_low_bits = match value & 0b0001_1111 {
                    0 => 1,
                    n => n,
                };
                self.update_rom_offsets();
            }
            // Sets the upper 2 bits of the ROM bank number or the RAM bank
            // number, depending on the current banking mode.
            RAM_BANK_NUMBER_BEGIN..=RAM_BANK_NUMBER_END => {
                self.bank_high_bits = value & 0b11;
                self.update_rom_offsets();
                self.update_ram_offset();
            }
            // Selects the banking mode.
            BANKING_MODE_SELECT_BEGIN..=BANKING_MODE_SELECT_END => {
                self.banking_mode = match value & 0b1 {
                    0b0 => BankingMode::Simple,
                    _ => BankingMode::Advanced,
                };
                self.update_rom_offsets();
                self.update_ram_offset();
            }
            CRAM_BANK_BEGIN..=CRAM_BANK_END => {
                if self.has_ram_access && !self.ram.is_empty() {
                    self.ram[self.ram_bank_offset + (address - CRAM_BANK_BEGIN) as usize] = value;
                }
            }
            _ => {}
        }
    }

    fn load_ram(&mut self, snapshot: &[u8]) -> GBResult<()> {
        restore_ram_prefix(&mut self.ram, snapshot)
    }

    fn save_ram(&self) -> GBResult<Arc<[u8]>> {
        ensure_savable(&self.config)?;
        Ok(self.ram.clone().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gb::cartridge::ControllerType;

    fn config(rom_size: u8, ram_size: u8) -> CartridgeConfig {
        CartridgeConfig::new(ControllerType::MBC1 { battery: true }, rom_size, ram_size).unwrap()
    }

    /// A ROM where each bank is filled with its own index.
    fn numbered_rom(banks: u8) -> Arc<[u8]> {
        (0..banks).flat_map(|i| vec![i; ROM_BANK_SIZE]).collect()
    }

    #[test]
    fn test_ram_state() {
        let mut controller = MBC1::new(config(0x03, 0x02), Arc::new([0; ROM_BANK_SIZE * 16]));

        let addr = CRAM_BANK_BEGIN + 0x10;
        controller.write(addr, 0x42);
        assert_eq!(controller.read(addr), 0xFF, "RAM should be disabled");

        controller.write(RAM_ENABLE_BEGIN, 0x0A);
        assert_eq!(
            controller.read(addr),
            0x00,
            "First write should have been ignored"
        );

        controller.write(addr, 0x42);
        assert_eq!(controller.read(addr), 0x42, "RAM should be enabled");

        controller.write(RAM_ENABLE_BEGIN, 0xFF);
        assert_eq!(controller.read(addr), 0xFF, "RAM should be disabled");
    }

    #[test]
    fn test_rom_bank_lower_bits() {
        let mut ctrl = MBC1::new(config(0x04, 0x02), numbered_rom(32));

        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0x01);
        assert_eq!(ctrl.bank_low_bits, 0x01);
        assert_eq!(ctrl.high_rom_bank_offset, ROM_BANK_SIZE);

        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0x00);
        assert_eq!(ctrl.bank_low_bits, 0x01);
        assert_eq!(
            ctrl.high_rom_bank_offset, ROM_BANK_SIZE,
            "0x00 should be treated as 0x01"
        );

        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0x02);
        assert_eq!(ctrl.bank_low_bits, 0x02);
        assert_eq!(ctrl.high_rom_bank_offset, ROM_BANK_SIZE * 2);

        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0xFF);
        assert_eq!(
            ctrl.high_rom_bank_offset,
            ROM_BANK_SIZE * 0x1F,
            "Only first 5 bits should be used"
        );
    }

    #[test]
    fn test_rom_bank_upper_bits() {
        let mut ctrl = MBC1::new(config(0x03, 0x03), numbered_rom(16));

        ctrl.write(RAM_BANK_NUMBER_BEGIN, 0b11);
        assert_eq!(ctrl.bank_high_bits, 0b11);
        assert_eq!(
            ctrl.ram_bank_offset, 0,
            "RAM bank should be 0, because of banking mode simple"
        );
        assert_eq!(
            ctrl.high_rom_bank_offset, ROM_BANK_SIZE,
            "Upper bits fall outside the 16 bank cartridge"
        );

        // Switch to advanced mode
        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b1);

        ctrl.write(RAM_BANK_NUMBER_BEGIN, 0b11);
        assert_eq!(ctrl.bank_high_bits, 0b11);
        assert_eq!(ctrl.ram_bank_offset, RAM_BANK_SIZE * 3);

        ctrl.write(RAM_BANK_NUMBER_BEGIN, 0xFF);
        assert_eq!(
            ctrl.bank_high_bits, 0b11,
            "Only first 2 bits should be used"
        );
    }

    #[test]
    fn test_change_banking_mode() {
        let mut ctrl = MBC1::new(config(0x03, 0x02), Arc::new([0; ROM_BANK_SIZE * 16]));

        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b1);
        assert_eq!(ctrl.banking_mode, BankingMode::Advanced);

        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b1111);
        assert_eq!(ctrl.banking_mode, BankingMode::Advanced);

        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b1000);
        assert_eq!(ctrl.banking_mode, BankingMode::Simple);

        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b0000);
        assert_eq!(ctrl.banking_mode, BankingMode::Simple);
    }

    #[test]
    fn test_rom_banking_simple() {
        let mut ctrl = MBC1::new(config(0x05, 0x02), numbered_rom(64));

        assert_eq!(ctrl.read(ROM_LOW_BANK_BEGIN), 0);
        assert_eq!(ctrl.read(ROM_HIGH_BANK_BEGIN), 1);

        for i in 2..32 {
            ctrl.write(ROM_BANK_NUMBER_BEGIN, i);
            assert_eq!(
                ctrl.read(ROM_HIGH_BANK_BEGIN),
                i,
                "ROM bank {i} should be selected"
            );
        }
    }

    #[test]
    fn test_rom_banking_masked() {
        let mut ctrl = MBC1::new(config(0x03, 0x02), numbered_rom(16));
        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0b1111_1001);
        assert_eq!(
            ctrl.bank_low_bits, 0b0000_1001,
            "The upper 3 bits should be masked"
        );
        assert_eq!(
            ctrl.read(ROM_HIGH_BANK_BEGIN),
            9,
            "ROM bank 9 should be selected"
        );

        // Bank numbers beyond the bank count wrap around
        let mut small = MBC1::new(config(0x01, 0x02), numbered_rom(4));
        small.write(ROM_BANK_NUMBER_BEGIN, 0b0000_0110);
        assert_eq!(
            small.read(ROM_HIGH_BANK_BEGIN),
            2,
            "Bank 6 should be reduced modulo 4"
        );
    }

    #[test]
    fn test_rom_banking_advanced() {
        let mut ctrl = MBC1::new(config(0x05, 0x02), numbered_rom(64));

        // Switch to advanced mode
        ctrl.write(BANKING_MODE_SELECT_BEGIN, 0b1);

        assert_eq!(
            ctrl.read(ROM_LOW_BANK_BEGIN),
            0,
            "Bank 0 should be selected"
        );
        assert_eq!(
            ctrl.read(ROM_HIGH_BANK_BEGIN),
            1,
            "Bank 1 should be selected"
        );

        ctrl.write(RAM_BANK_NUMBER_BEGIN, 1);
        assert_eq!(
            ctrl.read(ROM_LOW_BANK_BEGIN),
            32,
            "Advanced mode banks the low region as well"
        );

        // Any attempt to address ROM Bank 32 will select bank 33 instead
        ctrl.write(ROM_BANK_NUMBER_BEGIN, 0);
        assert_eq!(
            ctrl.read(ROM_HIGH_BANK_BEGIN),
            33,
            "ROM bank 33 should be selected"
        );

        for i in 33..64 {
            ctrl.write(ROM_BANK_NUMBER_BEGIN, i);
            assert_eq!(
                ctrl.read(ROM_HIGH_BANK_BEGIN),
                i,
                "ROM bank {i} should be selected"
            );
        }
    }

    #[test]
    fn test_ram_banking() {
        let mut ctrl = MBC1::new(config(0x00, 0x03), numbered_rom(2));

        // Switch to advanced mode and enable RAM
        ctrl.write(BANKING_MODE_SELECT_BEGIN, 1);
        ctrl.write(RAM_ENABLE_BEGIN, 0x0A);

        // Assert the banks are set correctly and the memory is initialized
        for i in 0u8..4 {
            ctrl.write(RAM_BANK_NUMBER_BEGIN, i);
            assert_eq!(ctrl.ram_bank_offset, RAM_BANK_SIZE * i as usize);
            assert_eq!(
                ctrl.read(CRAM_BANK_BEGIN),
                0,
                "RAM should be initialized to 0"
            );
            ctrl.write(CRAM_BANK_BEGIN, i + 1);
            assert_eq!(
                ctrl.read(CRAM_BANK_BEGIN),
                i + 1,
                "RAM should return {}",
                i + 1
            );
        }

        // Assert the written values are correct when switching banks again
        for i in 0u8..4 {
            ctrl.write(RAM_BANK_NUMBER_BEGIN, i);
            assert_eq!(
                ctrl.read(CRAM_BANK_BEGIN),
                i + 1,
                "RAM should return {}",
                i + 1
            );
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut ctrl = MBC1::new(config(0x00, 0x02), numbered_rom(2));
        ctrl.write(RAM_ENABLE_BEGIN, 0x0A);
        ctrl.write(CRAM_BANK_BEGIN, 0x42);
        ctrl.write(CRAM_BANK_BEGIN + 1, 0x77);

        let snapshot = ctrl.save_ram().unwrap();
        assert_eq!(snapshot.len(), RAM_BANK_SIZE);

        let mut restored = MBC1::new(config(0x00, 0x02), numbered_rom(2));
        restored.load_ram(&snapshot).unwrap();
        assert_eq!(restored.save_ram().unwrap(), snapshot);
    }
}

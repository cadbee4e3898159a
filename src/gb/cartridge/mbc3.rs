use crate::gb::cartridge::controller::{BankController, ensure_savable, restore_ram_prefix};
use crate::gb::cartridge::rtc::{ClockRegister, RTC_RECORD_SIZE, RealTimeClock, unix_now};
use crate::gb::cartridge::{CartridgeConfig, RAM_BANK_SIZE, ROM_BANK_SIZE, bank_mask};
use crate::gb::{GBError, GBResult};
use crate::gb::constants::*;
use std::sync::Arc;

/// Mostly the same as for MBC1, a value of $0A will enable reading and writing
/// to external RAM and to the RTC Registers! A value of $00 will disable
/// either.
const RAM_RTC_ENABLE_BEGIN: u16 = 0x0000;
const RAM_RTC_ENABLE_END: u16 = 0x1FFF;

/// Same as for MBC1, except that the whole 7 bits of the ROM Bank Number are
/// written directly to this address. As for the MBC1, writing a value of 0x00
/// will select Bank 0x01 instead. All other values 0x01-0x7F select the
/// corresponding ROM Banks.
const ROM_BANK_NUMBER_BEGIN: u16 = 0x2000;
const ROM_BANK_NUMBER_END: u16 = 0x3FFF;

/// Controls what is mapped into memory at 0xA000 - 0xBFFF.
/// 0x00 - 0x07: RAM bank.
/// 0x08 - 0x0C: RTC register.
const RAM_BANK_NUMBER_BEGIN: u16 = 0x4000;
const RAM_BANK_NUMBER_END: u16 = 0x5FFF;

/// When writing 0x00, and then 0x01 to this register, the current time
/// becomes latched into the RTC registers. The latched data will not change
/// until it becomes latched again, by repeating the 0x00->0x01 procedure.
const LATCH_CLOCK_DATA_BEGIN: u16 = 0x6000;
const LATCH_CLOCK_DATA_END: u16 = 0x7FFF;

/// Determines the current selected RAM bank or RTC register.
#[derive(Clone, Copy, PartialEq, Debug)]
enum RAMBankSelection {
    RAMBank(u8),
    Clock(ClockRegister),
}

#[derive(Clone, Copy, Default, PartialEq)]
enum RTCLatchState {
    #[default]
    Undefined,
    Pending,
    Latched,
}

/// Beside the ability to access up to 2MB ROM (128 banks), and 32KB RAM
/// (4 banks), the MBC3 also includes a built-in Real Time Clock (RTC).
#[derive(Clone)]
pub struct MBC3 {
    config: CartridgeConfig,
    rom: Arc<[u8]>,
    ram: Vec<u8>,
    rtc: RealTimeClock,
    rom_bank_number: u8,      // Mapped ROM bank number for 0x4000 - 0x7FFF
    rtc_latch: RTCLatchState, // RTC Latch for 0x6000 - 0x7FFF
    ram_bank_selection: RAMBankSelection, // Mapped RAM bank number or RTC for 0xA000 - 0xBFFF
    has_ram_rtc_access: bool,
}

impl MBC3 {
    pub fn new(config: CartridgeConfig, rom: Arc<[u8]>) -> Self {
        Self {
            ram: vec![0; config.ram_size()],
            rtc: RealTimeClock::default(),
            rom_bank_number: 1,
            rtc_latch: RTCLatchState::default(),
            ram_bank_selection: RAMBankSelection::RAMBank(0),
            has_ram_rtc_access: false,
            rom,
            config,
        }
    }
}

impl BankController for MBC3 {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            ROM_LOW_BANK_BEGIN..=ROM_LOW_BANK_END => {
                self.rom[(address - ROM_LOW_BANK_BEGIN) as usize]
            }
            ROM_HIGH_BANK_BEGIN..=ROM_HIGH_BANK_END => {
                let offset = self.rom_bank_number as usize * ROM_BANK_SIZE;
                self.rom[offset + (address - ROM_HIGH_BANK_BEGIN) as usize]
            }
            CRAM_BANK_BEGIN..=CRAM_BANK_END => {
                if !self.has_ram_rtc_access {
                    return UNDEFINED_READ;
                }

                match self.ram_bank_selection {
                    RAMBankSelection::RAMBank(bank) => {
                        if self.ram.is_empty() {
                            return UNDEFINED_READ;
                        }
                        let offset = bank as usize * RAM_BANK_SIZE;
                        self.ram[offset + (address - CRAM_BANK_BEGIN) as usize]
                    }
                    RAMBankSelection::Clock(register) => {
                        match self.config.controller.has_clock() {
                            true => self.rtc.read(register, unix_now()),
                            false => UNDEFINED_READ,
                        }
                    }
                }
            }
            _ => panic!("MBC3: Invalid address for read: {address:#06x}"),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            RAM_RTC_ENABLE_BEGIN..=RAM_RTC_ENABLE_END => {
                self.has_ram_rtc_access = value & 0b1111 == 0b1010;
            }
            ROM_BANK_NUMBER_BEGIN..=ROM_BANK_NUMBER_END => {
                self.rom_bank_number = if value == 0 { 1 } else { value & 0b0111_1111 };
                self.rom_bank_number &= bank_mask(self.config.rom_banks) as u8;
            }
            RAM_BANK_NUMBER_BEGIN..=RAM_BANK_NUMBER_END => {
                self.ram_bank_selection = match value {
                    0x00..=0x07 => RAMBankSelection::RAMBank(value),
                    0x08 => RAMBankSelection::Clock(ClockRegister::Seconds),
                    0x09 => RAMBankSelection::Clock(ClockRegister::Minutes),
                    0x0A => RAMBankSelection::Clock(ClockRegister::Hours),
                    0x0B => RAMBankSelection::Clock(ClockRegister::DayLow),
                    0x0C => RAMBankSelection::Clock(ClockRegister::DayHigh),
                    _ => return,
                };
            }
            LATCH_CLOCK_DATA_BEGIN..=LATCH_CLOCK_DATA_END => {
                self.rtc_latch = match value {
                    0x00 => RTCLatchState::Pending,
                    0x01 if self.rtc_latch == RTCLatchState::Pending => {
                        self.rtc.latch(unix_now());
                        RTCLatchState::Latched
                    }
                    _ => RTCLatchState::Undefined,
                };
            }
            CRAM_BANK_BEGIN..=CRAM_BANK_END => {
                if !self.has_ram_rtc_access {
                    return;
                }
                match self.ram_bank_selection {
                    RAMBankSelection::RAMBank(bank) if !self.ram.is_empty() => {
                        let offset = bank as usize * RAM_BANK_SIZE;
                        self.ram[offset + (address - CRAM_BANK_BEGIN) as usize] = value;
                    }
                    RAMBankSelection::Clock(register) if self.config.controller.has_clock() => {
                        self.rtc.write(register, value, unix_now());
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn load_ram(&mut self, snapshot: &[u8]) -> GBResult<()> {
        let ram_len = self.ram.len();
        if snapshot.len() <= ram_len {
            return restore_ram_prefix(&mut self.ram, snapshot);
        }
        let (ram, clock) = snapshot.split_at(ram_len);
        self.ram.copy_from_slice(ram);
        match clock.len() {
            // A partial clock record is a valid prefix, but nothing usable
            // can be restored from it.
            n if n < RTC_RECORD_SIZE => Ok(()),
            RTC_RECORD_SIZE => {
                self.rtc.load_snapshot(clock.try_into().unwrap());
                Ok(())
            }
            n => Err(GBError::CorruptSnapshot(format!(
                "{n} trailing bytes after the RAM banks, expected at most {RTC_RECORD_SIZE}"
            ))),
        }
    }

    fn save_ram(&self) -> GBResult<Arc<[u8]>> {
        ensure_savable(&self.config)?;
        let mut snapshot = self.ram.clone();
        if self.config.controller.has_clock() {
            snapshot.extend_from_slice(&self.rtc.snapshot());
        }
        Ok(snapshot.into())
    }
}

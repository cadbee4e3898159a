use crate::gb::cartridge::mbc1::MBC1;
use crate::gb::cartridge::mbc3::MBC3;
use crate::gb::cartridge::mbc5::MBC5;
use crate::gb::cartridge::nombc::NoMBC;
use crate::gb::cartridge::{CartridgeConfig, ControllerType};
use crate::gb::{GBError, GBResult};
use dyn_clone::DynClone;
use std::sync::Arc;

/// This trait defines the interface for a bank controller.
/// It allows reading and writing to different banks of the cartridge and
/// snapshotting the battery backed state.
pub trait BankController: DynClone + Send {
    /// Reads a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Writes a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Restores the battery backed state from a snapshot,
    /// any prefix of the snapshot layout is accepted.
    fn load_ram(&mut self, snapshot: &[u8]) -> GBResult<()>;

    /// Creates a snapshot of the battery backed state: all RAM banks
    /// concatenated, followed by the RTC record for clock equipped boards.
    fn save_ram(&self) -> GBResult<Arc<[u8]>>;
}

dyn_clone::clone_trait_object!(BankController);

/// Creates a new `BankController` with the given ROM and `CartridgeConfig`.
pub fn new(config: CartridgeConfig, rom: Arc<[u8]>) -> Box<dyn BankController> {
    match config.controller {
        ControllerType::NoMBC { .. } => Box::new(NoMBC::new(config, rom)),
        ControllerType::MBC1 { .. } => Box::new(MBC1::new(config, rom)),
        ControllerType::MBC3 { .. } => Box::new(MBC3::new(config, rom)),
        ControllerType::MBC5 { .. } => Box::new(MBC5::new(config, rom)),
    }
}

/// Shared `save_ram` guard: only battery backed boards produce snapshots.
pub(super) fn ensure_savable(config: &CartridgeConfig) -> GBResult<()> {
    match config.is_savable() {
        true => Ok(()),
        false => Err(GBError::UnsupportedCartridge(
            "cartridge has no battery backed RAM".to_string(),
        )),
    }
}

/// Shared `load_ram` prefix handling: copies the given snapshot prefix over
/// the RAM banks and rejects oversized snapshots.
pub(super) fn restore_ram_prefix(ram: &mut [u8], snapshot: &[u8]) -> GBResult<()> {
    if snapshot.len() > ram.len() {
        return Err(GBError::CorruptSnapshot(format!(
            "snapshot holds {} bytes but the cartridge has {} bytes of RAM",
            snapshot.len(),
            ram.len()
        )));
    }
    ram[..snapshot.len()].copy_from_slice(snapshot);
    Ok(())
}

use chromaboy::gb::cartridge::Cartridge;
use chromaboy::gb::{Emulator, EmulatorConfig, GBResult, HardwareMode};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, ValueEnum)]
enum ModeArg {
    Dmg,
    Cgb,
}

impl From<ModeArg> for HardwareMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Dmg => HardwareMode::DMG,
            ModeArg::Cgb => HardwareMode::CGB,
        }
    }
}

/// Headless emulator runner, mostly useful to drive the community
/// test ROMs which report through the serial port.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the cartridge image
    rom: PathBuf,

    /// Forces the hardware revision instead of deriving it from the header
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Number of frames to emulate before exiting, runs forever if omitted
    #[arg(long)]
    frames: Option<u64>,

    /// Executes the embedded DMG boot ROM instead of skipping it
    #[arg(long)]
    boot_rom: bool,

    /// Suppresses serial output
    #[arg(long)]
    quiet: bool,
}

fn main() -> GBResult<()> {
    let args = Args::parse();

    let cartridge = Cartridge::try_from(args.rom.as_path())?;
    println!("Loaded cartridge: {cartridge}");

    let config = EmulatorConfig {
        mode: args.mode.map(HardwareMode::from),
        use_boot_rom: args.boot_rom,
        boot_rom: None,
        print_serial: !args.quiet,
    };
    let mut emulator = Emulator::new(cartridge, config);

    match args.frames {
        Some(frames) => {
            for _ in 0..frames {
                emulator.step_frame();
            }
        }
        None => loop {
            emulator.step_frame();
        },
    }
    Ok(())
}

use crate::gb::audio::noise::NoiseChannel;
use crate::gb::audio::square::SquareChannel;
use crate::gb::audio::wave::WaveChannel;
use crate::gb::constants::UNDEFINED_READ;
use crate::gb::{AudioSink, CPU_CLOCK_SPEED, HardwareMode, SubSystem};

pub mod features;
pub mod noise;
pub mod square;
pub mod wave;

/// This register controls CH1's period sweep functionality.
pub const AUDIO_CHANNEL_1_SWEEP: u16 = 0xFF10;

/// This register controls both the channel's length timer and duty cycle.
pub const AUDIO_CHANNEL_1_LENGTH: u16 = 0xFF11;

/// This register controls the digital amplitude of the "high" part of the
/// pulse, and the envelope applied to that setting.
pub const AUDIO_CHANNEL_1_VOLUME: u16 = 0xFF12;

/// This register stores the low 8 bits of the channel's 11-bit period.
/// The upper 3 bits are stored in the low 3 bits of NR14.
pub const AUDIO_CHANNEL_1_PERIOD_LOW: u16 = 0xFF13;

pub const AUDIO_CHANNEL_1_PERIOD_HIGH: u16 = 0xFF14;

/// This sound channel works exactly like channel 1,
/// except that it lacks a period sweep.
pub const AUDIO_CHANNEL_2_LENGTH: u16 = 0xFF16;
pub const AUDIO_CHANNEL_2_VOLUME: u16 = 0xFF17;
pub const AUDIO_CHANNEL_2_PERIOD_LOW: u16 = 0xFF18;
pub const AUDIO_CHANNEL_2_PERIOD_HIGH: u16 = 0xFF19;

/// This register controls CH3's DAC. Like other channels,
/// turning the DAC off immediately turns the channel off as well.
pub const AUDIO_CHANNEL_3_DAC_ENABLE: u16 = 0xFF1A;

/// This register controls the channel's length timer.
pub const AUDIO_CHANNEL_3_LENGTH: u16 = 0xFF1B;

/// This channel lacks the envelope functionality that the other three
/// channels have, and has a much coarser volume control.
pub const AUDIO_CHANNEL_3_VOLUME: u16 = 0xFF1C;

pub const AUDIO_CHANNEL_3_PERIOD_LOW: u16 = 0xFF1D;
pub const AUDIO_CHANNEL_3_PERIOD_HIGH: u16 = 0xFF1E;

/// This register controls the channel's length timer.
pub const AUDIO_CHANNEL_4_LENGTH: u16 = 0xFF20;

/// This register functions exactly like NR12.
pub const AUDIO_CHANNEL_4_VOLUME: u16 = 0xFF21;

/// This register allows controlling the way the amplitude is randomly
/// switched.
pub const AUDIO_CHANNEL_4_FREQ: u16 = 0xFF22;

pub const AUDIO_CHANNEL_4_CONTROL: u16 = 0xFF23;

pub const AUDIO_MASTER_VOLUME: u16 = 0xFF24;

pub const AUDIO_SOUND_PANNING: u16 = 0xFF25;

pub const AUDIO_MASTER_CONTROL: u16 = 0xFF26;

/// Wave RAM is 16 bytes long; each byte holds two samples, each 4 bits.
pub const AUDIO_WAVE_PATTERN_START: u16 = 0xFF30;
pub const AUDIO_WAVE_PATTERN_END: u16 = 0xFF3F;

/// Output sample rate of the mixer.
pub const SAMPLE_RATE: u32 = 44_100;

/// The frame sequencer advances at 512 Hz.
const FRAME_SEQUENCER_CYCLES: u16 = 8192;

/// T-cycles between two output samples, deliberately fractional.
const CYCLES_PER_SAMPLE: f64 = CPU_CLOCK_SPEED as f64 / SAMPLE_RATE as f64;

/// The audio processor: four channels, the 512 Hz frame sequencer
/// dispatching length, sweep and envelope clocks, and a mixer producing
/// stereo samples at 44.1 kHz.
pub struct AudioProcessor {
    ch1: SquareChannel,
    ch2: SquareChannel,
    ch3: WaveChannel,
    ch4: NoiseChannel,
    powered: bool,
    /// NR50: master volume per side, the VIN bits are stored but unused.
    master_volume: u8,
    /// NR51: per-channel stereo routing.
    panning: u8,
    /// The next frame sequencer step to execute.
    sequencer_step: u8,
    sequencer_counter: u16,
    sample_counter: f64,
    mode: HardwareMode,
    sink: Option<Box<dyn AudioSink>>,
}

impl AudioProcessor {
    pub fn new(mode: HardwareMode) -> Self {
        Self {
            ch1: SquareChannel::new(true),
            ch2: SquareChannel::new(false),
            ch3: WaveChannel::default(),
            ch4: NoiseChannel::default(),
            powered: false,
            master_volume: 0,
            panning: 0,
            sequencer_step: 0,
            sequencer_counter: 0,
            sample_counter: 0.0,
            mode,
            sink: None,
        }
    }

    #[inline]
    pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = Some(sink);
    }

    /// Advances the APU by the given number of T-cycles.
    pub fn step(&mut self, t_cycles: u8) {
        if self.powered {
            self.sequencer_counter += u16::from(t_cycles);
            while self.sequencer_counter >= FRAME_SEQUENCER_CYCLES {
                self.sequencer_counter -= FRAME_SEQUENCER_CYCLES;
                self.tick_sequencer();
            }
            self.ch3.tick(t_cycles);
            self.ch4.tick(t_cycles);
        }
        self.sample_counter += f64::from(t_cycles);
        while self.sample_counter >= CYCLES_PER_SAMPLE {
            self.sample_counter -= CYCLES_PER_SAMPLE;
            self.generate_sample();
        }
    }

    /// Executes one frame sequencer step:
    ///   0: length            4: length
    ///   2: length + sweep    6: length + sweep
    ///   7: envelope
    fn tick_sequencer(&mut self) {
        match self.sequencer_step {
            0 | 4 => self.tick_lengths(),
            2 | 6 => {
                self.tick_lengths();
                self.ch1.tick_sweep();
            }
            7 => {
                self.ch1.tick_envelope();
                self.ch2.tick_envelope();
                self.ch4.tick_envelope();
            }
            _ => {}
        }
        self.sequencer_step = (self.sequencer_step + 1) % 8;
    }

    fn tick_lengths(&mut self) {
        self.ch1.tick_length();
        self.ch2.tick_length();
        self.ch3.tick_length();
        self.ch4.tick_length();
    }

    /// Indicates whether the upcoming sequencer step clocks the length
    /// counters, relevant for the NRx4 write quirks.
    #[inline]
    const fn next_step_clocks_length(&self) -> bool {
        self.sequencer_step % 2 == 0
    }

    /// Mixes one stereo sample pair and hands it to the sink.
    /// Each side averages its routed channels and is scaled by the NR50
    /// master volume.
    fn generate_sample(&mut self) {
        let delta_seconds = CYCLES_PER_SAMPLE / f64::from(CPU_CLOCK_SPEED);
        let outputs = [
            self.ch1.sample(delta_seconds),
            self.ch2.sample(delta_seconds),
            self.ch3.sample(),
            self.ch4.sample(),
        ];

        let mut left = 0.0;
        let mut right = 0.0;
        for (channel, output) in outputs.iter().enumerate() {
            if self.panning & (1 << (channel + 4)) != 0 {
                left += output;
            }
            if self.panning & (1 << channel) != 0 {
                right += output;
            }
        }
        let left_volume = f64::from((self.master_volume >> 4) & 0b111) / 7.0;
        let right_volume = f64::from(self.master_volume & 0b111) / 7.0;
        left = (left / 4.0 * left_volume).clamp(-1.0, 1.0);
        right = (right / 4.0 * right_volume).clamp(-1.0, 1.0);

        if let Some(sink) = self.sink.as_deref_mut() {
            sink.add_sample(left, right);
        }
    }

    /// NR52 read-back: power state and the four channel enable flags.
    fn read_master_control(&self) -> u8 {
        0b0111_0000
            | ((self.powered as u8) << 7)
            | ((self.ch4.enabled as u8) << 3)
            | ((self.ch3.enabled as u8) << 2)
            | ((self.ch2.enabled as u8) << 1)
            | (self.ch1.enabled as u8)
    }

    fn write_master_control(&mut self, value: u8) {
        let on = value & 0b1000_0000 != 0;
        if !on && self.powered {
            // Powering off clears the whole register file except wave RAM,
            // on DMG the length counters keep their values.
            let preserve_length = !self.mode.is_cgb();
            self.ch1.reset(preserve_length);
            self.ch2.reset(preserve_length);
            self.ch3.reset(preserve_length);
            self.ch4.reset(preserve_length);
            self.master_volume = 0;
            self.panning = 0;
            self.powered = false;
        } else if on && !self.powered {
            self.powered = true;
            self.sequencer_step = 0;
            self.sequencer_counter = 0;
        }
    }

    /// Register writes while powered off are dropped, with the documented
    /// exception of the four length registers.
    fn write_while_off(&mut self, address: u16, value: u8) {
        match address {
            AUDIO_CHANNEL_1_LENGTH => self.ch1.length.load(value & 0b0011_1111),
            AUDIO_CHANNEL_2_LENGTH => self.ch2.length.load(value & 0b0011_1111),
            AUDIO_CHANNEL_3_LENGTH => self.ch3.length.load(value),
            AUDIO_CHANNEL_4_LENGTH => self.ch4.length.load(value & 0b0011_1111),
            _ => {}
        }
    }
}

impl SubSystem for AudioProcessor {
    fn write(&mut self, address: u16, value: u8) {
        match address {
            AUDIO_MASTER_CONTROL => return self.write_master_control(value),
            // Wave RAM ignores the power state entirely
            AUDIO_WAVE_PATTERN_START..=AUDIO_WAVE_PATTERN_END => {
                self.ch3.wave_ram[(address - AUDIO_WAVE_PATTERN_START) as usize] = value;
                return;
            }
            _ if !self.powered => return self.write_while_off(address, value),
            _ => {}
        }

        let clocks_length = self.next_step_clocks_length();
        match address {
            AUDIO_CHANNEL_1_SWEEP..=AUDIO_CHANNEL_1_PERIOD_HIGH => self.ch1.write_register(
                (address - AUDIO_CHANNEL_1_SWEEP) as u8,
                value,
                clocks_length,
            ),
            0xFF15 => {} // undocumented
            AUDIO_CHANNEL_2_LENGTH..=AUDIO_CHANNEL_2_PERIOD_HIGH => {
                self.ch2
                    .write_register((address - 0xFF15) as u8, value, clocks_length)
            }
            AUDIO_CHANNEL_3_DAC_ENABLE..=AUDIO_CHANNEL_3_PERIOD_HIGH => self.ch3.write_register(
                (address - AUDIO_CHANNEL_3_DAC_ENABLE) as u8,
                value,
                clocks_length,
            ),
            0xFF1F => {} // undocumented
            AUDIO_CHANNEL_4_LENGTH..=AUDIO_CHANNEL_4_CONTROL => {
                self.ch4
                    .write_register((address - 0xFF1F) as u8, value, clocks_length)
            }
            AUDIO_MASTER_VOLUME => self.master_volume = value,
            AUDIO_SOUND_PANNING => self.panning = value,
            0xFF27..=0xFF2F => {} // undocumented
            _ => panic!("Attempt to write to unmapped audio register: {address:#06x}"),
        }
    }

    fn read(&mut self, address: u16) -> u8 {
        match address {
            AUDIO_CHANNEL_1_SWEEP..=AUDIO_CHANNEL_1_PERIOD_HIGH => {
                self.ch1.read_register((address - AUDIO_CHANNEL_1_SWEEP) as u8)
            }
            0xFF15 => UNDEFINED_READ, // undocumented
            AUDIO_CHANNEL_2_LENGTH..=AUDIO_CHANNEL_2_PERIOD_HIGH => {
                self.ch2.read_register((address - 0xFF15) as u8)
            }
            AUDIO_CHANNEL_3_DAC_ENABLE..=AUDIO_CHANNEL_3_PERIOD_HIGH => {
                self.ch3.read_register((address - AUDIO_CHANNEL_3_DAC_ENABLE) as u8)
            }
            0xFF1F => UNDEFINED_READ, // undocumented
            AUDIO_CHANNEL_4_LENGTH..=AUDIO_CHANNEL_4_CONTROL => {
                self.ch4.read_register((address - 0xFF1F) as u8)
            }
            AUDIO_MASTER_VOLUME => self.master_volume,
            AUDIO_SOUND_PANNING => self.panning,
            AUDIO_MASTER_CONTROL => self.read_master_control(),
            0xFF27..=0xFF2F => UNDEFINED_READ, // undocumented
            AUDIO_WAVE_PATTERN_START..=AUDIO_WAVE_PATTERN_END => {
                self.ch3.wave_ram[(address - AUDIO_WAVE_PATTERN_START) as usize]
            }
            _ => panic!("Attempt to read from unmapped audio register: {address:#06x}"),
        }
    }
}

//! Wiping wavetable sound: 8 voices of 4-bit samples on a Namco-style mixer.
//!
//! Each voice either loops a 32-nibble waveform from the sound PROM or plays
//! a one-shot sample from the sample ROM until it meets a 0xFF byte. Voices
//! are summed in an `i32` mix buffer and pushed through a precomputed gain
//! table that clamps to the i16 range.
//!
//! Register file (written by the sound CPU at 0x4000-0x7FFF, offset 0-0x3FFF):
//!   base = 8 * voice
//!   base+0..2   frequency nibbles, low to high
//!   base+5      one-shot sample bank (non-zero selects one-shot mode)
//!   base+6      looping waveform select
//!   base+7      volume
//!   0x2005+base one-shot sample number within the bank
//!   0x2000+     any write re-triggers the voice's one-shot sample

/// Native output rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

const VOICES: usize = 8;
const DEFAULT_GAIN: i32 = 48;
const REGS_LEN: usize = 0x4000;

/// Gain lookup mapping a summed mix value to an output sample.
#[derive(Clone, Debug)]
pub struct MixerTable {
    table: Vec<i16>,
    center: usize,
}

impl MixerTable {
    /// `128 * voices` entries on each side of zero:
    /// `lookup(±i) = ±min(32767, i * gain * 16 / voices)`.
    pub fn new(voices: usize, gain: i32) -> Self {
        let count = 128 * voices.max(1);
        let mut table = vec![0i16; 2 * count];
        for i in 0..count {
            let val = (i as i32 * gain * 16 / voices.max(1) as i32).min(32767) as i16;
            table[count + i] = val;
            table[count - i] = -val;
        }
        Self {
            table,
            center: count,
        }
    }

    /// Mix values outside the table saturate at its ends.
    pub fn lookup(&self, mix: i32) -> i16 {
        let idx = (self.center as i64 + mix as i64).clamp(0, self.table.len() as i64 - 1);
        self.table[idx as usize]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceMode {
    /// Loops a waveform from the sound PROM.
    #[default]
    Looping,
    /// Plays a sample from the sample ROM once.
    OneShot { playing: bool },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Voice {
    pub frequency: u32,
    pub counter: u32,
    pub volume: i32,
    /// Byte offset of the waveform or sample in its ROM.
    pub wave: usize,
    pub mode: VoiceMode,
}

pub struct WipingSound {
    voices: [Voice; VOICES],
    regs: Vec<u8>,
    samples: Vec<u8>,
    wave_prom: Vec<u8>,
    mixer: MixerTable,
    mix: Vec<i32>,
    enabled: bool,
}

impl WipingSound {
    /// `samples` is the one-shot sample ROM, `wave_prom` the looping
    /// waveform PROM.
    pub fn new(samples: &[u8], wave_prom: &[u8]) -> Self {
        Self {
            voices: [Voice::default(); VOICES],
            regs: vec![0; REGS_LEN],
            samples: samples.to_vec(),
            wave_prom: wave_prom.to_vec(),
            mixer: MixerTable::new(VOICES, DEFAULT_GAIN),
            mix: Vec::new(),
            enabled: true,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn mixer(&self) -> &MixerTable {
        &self.mixer
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn write(&mut self, offset: u16, data: u8) {
        let offset = offset as usize & (REGS_LEN - 1);
        self.regs[offset] = data;

        if offset <= 0x3f {
            for (v, voice) in self.voices.iter_mut().enumerate() {
                let base = 8 * v;
                let r = |o: usize| (self.regs[o] & 0x0f) as u32;
                voice.frequency = (r(base + 2) << 8) | (r(base + 1) << 4) | r(base);
                voice.volume = r(base + 7) as i32;
                let bank = r(base + 5);
                if bank != 0 {
                    voice.wave = 128 * (16 * bank + r(0x2005 + base)) as usize;
                    let playing = matches!(voice.mode, VoiceMode::OneShot { playing: true });
                    voice.mode = VoiceMode::OneShot { playing };
                } else {
                    voice.wave = 16 * r(base + 6) as usize;
                    voice.mode = VoiceMode::Looping;
                }
            }
        } else if offset >= 0x2000 {
            let voice = &mut self.voices[(offset & 0x3f) / 8];
            if let VoiceMode::OneShot { .. } = voice.mode {
                voice.counter = 0;
                voice.mode = VoiceMode::OneShot { playing: true };
                log::trace!("wiping: one-shot at 0x{:04X} triggered", voice.wave);
            }
        }
    }

    /// Add one voice's contribution for `mix.len()` samples.
    pub fn advance_voice(&mut self, voice: usize, mix: &mut [i32]) {
        let Some(v) = self.voices.get_mut(voice) else {
            return;
        };
        advance(v, &self.samples, &self.wave_prom, mix);
    }

    /// Produce exactly `buffer.len()` output samples.
    pub fn update(&mut self, buffer: &mut [i16]) {
        if !self.enabled {
            buffer.fill(0);
            return;
        }
        self.mix.clear();
        self.mix.resize(buffer.len(), 0);
        for v in &mut self.voices {
            advance(v, &self.samples, &self.wave_prom, &mut self.mix);
        }
        for (out, &m) in buffer.iter_mut().zip(&self.mix) {
            *out = self.mixer.lookup(m);
        }
    }
}

fn advance(voice: &mut Voice, samples: &[u8], wave_prom: &[u8], mix: &mut [i32]) {
    let f = 16 * voice.frequency;
    let vol = voice.volume;
    if vol == 0 || f == 0 {
        return;
    }
    let mut c = voice.counter;

    for m in mix.iter_mut() {
        c = c.wrapping_add(f);
        let (byte, offs) = match voice.mode {
            VoiceMode::OneShot { playing: false } => continue,
            VoiceMode::OneShot { playing: true } => {
                let offs = (c >> 15) as usize;
                // Reading past the ROM ends the sample.
                let byte = samples.get(voice.wave + offs / 2).copied().unwrap_or(0xff);
                if byte == 0xff {
                    voice.mode = VoiceMode::OneShot { playing: false };
                    continue;
                }
                (byte, offs)
            }
            VoiceMode::Looping => {
                let offs = ((c >> 15) & 0x1f) as usize;
                let byte = wave_prom.get(voice.wave + offs / 2).copied().unwrap_or(0x88);
                (byte, offs)
            }
        };
        let nibble = if offs & 1 != 0 { byte & 0x0f } else { byte >> 4 };
        *m += (nibble as i32 - 8) * vol;
    }
    voice.counter = c;
}

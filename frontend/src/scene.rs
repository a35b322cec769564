//! Scripted bus traffic: a TOML scene names a board, lists the writes its
//! CPUs would make and asks for one composed frame (and optionally audio).
//!
//! ```toml
//! machine = "blueprnt"
//! regions = "dumps/blueprnt"   # relative to the scene file
//! ticks = [64, 128]
//! full_refresh = false
//! audio_samples = 0
//!
//! [[write]]
//! addr = 0x9000
//! data = 5
//!
//! [[write]]
//! cpu = 1
//! addr = 0x100000
//! data = 0x1234
//! mask = 0x00ff
//! ```

use std::path::{Path, PathBuf};

use marquee_core::core::BusMaster;
use marquee_core::core::machine::Machine;
use marquee_core::video::Bitmap;
use marquee_machines::{MachineError, RomRegions, registry};
use serde::Deserialize;

use crate::image::RgbImage;

#[derive(Debug)]
pub enum SceneError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    UnknownMachine(String),
    Machine(MachineError),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse(e) => write!(f, "bad scene: {e}"),
            Self::UnknownMachine(name) => write!(f, "unknown machine: {name}"),
            Self::Machine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Machine(e) => Some(e),
            Self::UnknownMachine(_) => None,
        }
    }
}

impl From<toml::de::Error> for SceneError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<MachineError> for SceneError {
    fn from(e: MachineError) -> Self {
        Self::Machine(e)
    }
}

fn full_mask() -> u16 {
    0xFFFF
}

/// One bus write as a CPU would issue it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneWrite {
    #[serde(default)]
    pub cpu: usize,
    pub addr: u32,
    pub data: u16,
    #[serde(default = "full_mask")]
    pub mask: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub machine: String,
    pub regions: Option<PathBuf>,
    #[serde(default, rename = "write")]
    pub writes: Vec<SceneWrite>,
    /// Scanlines reached by the beam after the writes, in order.
    #[serde(default)]
    pub ticks: Vec<u16>,
    #[serde(default)]
    pub full_refresh: bool,
    #[serde(default)]
    pub audio_samples: usize,
}

/// What a scene produced.
pub struct SceneOutput {
    /// Visible area as RGB.
    pub frame: RgbImage,
    pub audio: Vec<i16>,
    pub sample_rate: u32,
}

impl Scene {
    pub fn parse(text: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a scene file. A relative `regions` path is taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scene = Self::parse(&text)?;
        if let Some(regions) = &scene.regions
            && regions.is_relative()
            && let Some(dir) = path.parent()
        {
            scene.regions = Some(dir.join(regions));
        }
        Ok(scene)
    }

    pub fn create_machine(&self, regions: &RomRegions) -> Result<Box<dyn Machine>, SceneError> {
        let entry = registry::find(&self.machine)
            .ok_or_else(|| SceneError::UnknownMachine(self.machine.clone()))?;
        Ok((entry.create)(regions)?)
    }

    /// Replay the writes and ticks, compose one frame, then pull audio.
    pub fn play(&self, machine: &mut dyn Machine) -> SceneOutput {
        for w in &self.writes {
            machine.bus_write(BusMaster::Cpu(w.cpu), w.addr, w.data, w.mask);
        }
        for &line in &self.ticks {
            machine.tick(line);
        }
        log::debug!(
            "{}: {} writes, {} ticks replayed",
            self.machine,
            self.writes.len(),
            self.ticks.len()
        );

        let (w, h) = machine.display_size();
        let mut bitmap = Bitmap::new(w as usize, h as usize);
        machine.refresh(&mut bitmap, self.full_refresh);

        let visible = machine.visible_area();
        let mut frame = RgbImage::new(visible.width(), visible.height());
        machine.render_frame(&bitmap, &mut frame.data);

        let mut audio = vec![0i16; self.audio_samples];
        let produced = machine.fill_audio(&mut audio);
        audio.truncate(produced);

        SceneOutput {
            frame,
            audio,
            sample_rate: machine.audio_sample_rate(),
        }
    }
}

/// Mono little-endian i16 PCM.
pub fn write_pcm(path: &Path, samples: &[i16]) -> std::io::Result<()> {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUEPRNT_TILE: &str = r#"
machine = "blueprnt"

# Character 5 in colour 2 at cell 0.
[[write]]
addr = 0x9000
data = 5

[[write]]
addr = 0xF000
data = 2
"#;

    fn blueprnt_regions() -> RomRegions {
        let mut gfx1 = vec![0u8; 0x2000];
        gfx1[5 * 8..6 * 8].fill(0xFF);
        gfx1[0x1000 + 5 * 8..0x1000 + 6 * 8].fill(0xFF);
        RomRegions::from_entries([
            ("gfx1".to_string(), gfx1),
            ("gfx2".to_string(), vec![0u8; 0x3000]),
        ])
    }

    #[test]
    fn parse_defaults() {
        let scene = Scene::parse(BLUEPRNT_TILE).unwrap();
        assert_eq!(scene.machine, "blueprnt");
        assert_eq!(scene.writes.len(), 2);
        assert_eq!(scene.writes[0].cpu, 0);
        assert_eq!(scene.writes[0].mask, 0xFFFF);
        assert!(scene.ticks.is_empty());
        assert!(!scene.full_refresh);
        assert_eq!(scene.audio_samples, 0);
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        assert!(matches!(
            Scene::parse("machine = \"wiping\"\nspeed = 2\n"),
            Err(SceneError::Parse(_))
        ));
    }

    #[test]
    fn unknown_machine() {
        let scene = Scene::parse("machine = \"pacman\"").unwrap();
        assert!(matches!(
            scene.create_machine(&RomRegions::new()),
            Err(SceneError::UnknownMachine(_))
        ));
    }

    #[test]
    fn missing_regions_reported() {
        let scene = Scene::parse("machine = \"blueprnt\"").unwrap();
        assert!(matches!(
            scene.create_machine(&RomRegions::new()),
            Err(SceneError::Machine(MachineError::MissingRegion(_)))
        ));
    }

    #[test]
    fn play_renders_visible_area() {
        let scene = Scene::parse(BLUEPRNT_TILE).unwrap();
        let mut machine = scene.create_machine(&blueprnt_regions()).unwrap();
        let out = scene.play(machine.as_mut());
        // 256 wide, lines 16-239 visible.
        assert_eq!((out.frame.width, out.frame.height), (256, 224));
        assert!(out.audio.is_empty());
        assert_eq!(out.sample_rate, 0);
    }

    #[test]
    fn play_collects_audio() {
        let text = r#"
machine = "wiping"
audio_samples = 16

[[write]]
cpu = 1
addr = 0x4007
data = 0x0F
"#;
        let scene = Scene::parse(text).unwrap();
        let regions = RomRegions::from_entries([
            ("gfx1".to_string(), vec![0u8; 0x2000]),
            ("gfx2".to_string(), vec![0u8; 0x2000]),
            ("proms".to_string(), vec![0u8; 0x220]),
            ("sound1".to_string(), vec![0u8; 0x4000]),
            ("sound2".to_string(), vec![0x88u8; 0x200]),
        ]);
        let mut machine = scene.create_machine(&regions).unwrap();
        let out = scene.play(machine.as_mut());
        assert_eq!(out.audio.len(), 16);
        assert_eq!(out.sample_rate, 48_000);
    }

    #[test]
    fn pcm_is_little_endian() {
        let path = std::env::temp_dir().join("marquee_scene_pcm.raw");
        write_pcm(&path, &[0x0102, -1]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x02, 0x01, 0xFF, 0xFF]);
        std::fs::remove_file(&path).unwrap();
    }
}

//! Named memory regions handed to a board at construction.
//!
//! The host assembles each region (program ROM, graphics ROMs, PROMs, sound
//! samples) however it likes and delivers the finished bytes by name:
//! `gfx1`, `proms`, `sound1` and so on. Boards declare the regions they read
//! with [`RegionSpec`] and validate sizes when they are created.

use std::collections::HashMap;
use std::path::Path;

use marquee_core::core::AddressMapError;
use marquee_core::video::VideoError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading regions or creating a board.
#[derive(Debug)]
pub enum MachineError {
    /// Underlying I/O error while reading region files.
    Io(std::io::Error),

    /// A required region was not supplied.
    MissingRegion(String),

    /// A region is shorter than the board needs.
    SizeMismatch {
        region: String,
        expected: usize,
        actual: usize,
    },

    /// Off-screen bitmap or dirty buffer allocation failed.
    Video(VideoError),

    /// The board's memory map is malformed.
    AddressMap(AddressMapError),
}

impl std::fmt::Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MissingRegion(name) => write!(f, "missing region: {name}"),
            Self::SizeMismatch {
                region,
                expected,
                actual,
            } => write!(
                f,
                "region {region}: expected at least {expected} bytes, got {actual}"
            ),
            Self::Video(e) => write!(f, "video setup failed: {e}"),
            Self::AddressMap(e) => write!(f, "bad memory map: {e}"),
        }
    }
}

impl std::error::Error for MachineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Video(e) => Some(e),
            Self::AddressMap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MachineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<VideoError> for MachineError {
    fn from(e: VideoError) -> Self {
        Self::Video(e)
    }
}

impl From<AddressMapError> for MachineError {
    fn from(e: AddressMapError) -> Self {
        Self::AddressMap(e)
    }
}

// ---------------------------------------------------------------------------
// RegionSpec
// ---------------------------------------------------------------------------

/// A region a board reads, with its declared size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSpec {
    pub name: &'static str,
    pub size: usize,
    /// Optional regions (CPU program ROM) read back as zeros when absent.
    pub required: bool,
}

impl RegionSpec {
    pub const fn required(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            required: false,
        }
    }
}

// ---------------------------------------------------------------------------
// RomRegions
// ---------------------------------------------------------------------------

/// Region bytes by name.
#[derive(Clone, Debug, Default)]
pub struct RomRegions {
    regions: HashMap<String, Vec<u8>>,
}

impl RomRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<region>.bin` (or any other file) in a directory; the
    /// region name is the file stem.
    pub fn from_directory(path: &Path) -> Result<Self, MachineError> {
        let mut regions = HashMap::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();
            if file_path.is_file() {
                let name = file_path
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                let data = std::fs::read(&file_path)?;
                regions.insert(name, data);
            }
        }
        Ok(Self { regions })
    }

    /// Build from programmatic byte slices (for testing).
    pub fn from_slices(entries: &[(&str, &[u8])]) -> Self {
        let mut regions = HashMap::new();
        for (name, data) in entries {
            regions.insert(name.to_string(), data.to_vec());
        }
        Self { regions }
    }

    /// Build from owned (name, data) pairs, e.g. archive entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            regions: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.regions.insert(name.to_string(), data);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.regions.get(name).map(|v| v.as_slice())
    }

    pub fn require(&self, name: &str) -> Result<&[u8], MachineError> {
        self.get(name)
            .ok_or_else(|| MachineError::MissingRegion(name.to_string()))
    }

    /// Copy a region out at exactly `spec.size` bytes.
    ///
    /// Longer data is truncated. Shorter data is an error for required
    /// regions; optional regions are zero-padded, and absent optional
    /// regions are all zeros.
    pub fn load(&self, spec: &RegionSpec) -> Result<Vec<u8>, MachineError> {
        let Some(data) = self.get(spec.name) else {
            if spec.required {
                return Err(MachineError::MissingRegion(spec.name.to_string()));
            }
            log::debug!("region {} not supplied, using zeros", spec.name);
            return Ok(vec![0; spec.size]);
        };
        if data.len() < spec.size && spec.required {
            return Err(MachineError::SizeMismatch {
                region: spec.name.to_string(),
                expected: spec.size,
                actual: data.len(),
            });
        }
        let mut region = vec![0u8; spec.size];
        let n = data.len().min(spec.size);
        region[..n].copy_from_slice(&data[..n]);
        Ok(region)
    }

    /// List all region names.
    pub fn names(&self) -> Vec<&str> {
        self.regions.keys().map(|s| s.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

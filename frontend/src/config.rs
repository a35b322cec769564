//! Host settings from `marquee.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

const CONFIG_FILE: &str = "marquee.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where region dumps live when a command is not given a path.
    pub regions_dir: Option<PathBuf>,
    /// Integer upscale applied to PNG output.
    pub scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regions_dir: None,
            scale: 1,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("marquee").join(CONFIG_FILE))
    }

    /// Load `explicit`, or the per-user file when none is given. A missing
    /// per-user file yields the defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) if !required => {
                log::warn!("ignoring unreadable config {}: {e}", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        config.scale = config.scale.max(1);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn fields_parse() {
        let config = Config::parse("regions_dir = \"/srv/dumps\"\nscale = 3\n").unwrap();
        assert_eq!(config.regions_dir, Some(PathBuf::from("/srv/dumps")));
        assert_eq!(config.scale, 3);
    }

    #[test]
    fn zero_scale_clamps_to_one() {
        assert_eq!(Config::parse("scale = 0").unwrap().scale, 1);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Config::parse("volume = 11").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("marquee_config_missing.toml");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Io { .. })
        ));
    }
}

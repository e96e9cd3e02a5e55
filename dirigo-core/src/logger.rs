//! Data logging settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Frames written per file before the logger rolls over to a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FramesPerFile {
    Finite(u32),
    /// Everything goes into a single file.
    Unlimited,
}

impl FramesPerFile {
    pub const DEFAULT: FramesPerFile = FramesPerFile::Finite(256);

    /// Whether a file already holding `frames` frames is full.
    #[must_use]
    pub fn is_full(self, frames: u64) -> bool {
        match self {
            FramesPerFile::Finite(n) => frames >= u64::from(n),
            FramesPerFile::Unlimited => false,
        }
    }
}

impl Default for FramesPerFile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for FramesPerFile {
    type Err = ValidationError;

    /// Accepts an integer `>= 1`, or `inf`, `infinity` or `∞` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if ["inf", "infinity", "∞"]
            .iter()
            .any(|word| text.eq_ignore_ascii_case(word))
        {
            return Ok(FramesPerFile::Unlimited);
        }
        let value: i64 = text
            .parse()
            .map_err(|_| ValidationError::MalformedNumber(text.to_string()))?;
        u32::try_from(value)
            .ok()
            .filter(|n| *n >= 1)
            .map(FramesPerFile::Finite)
            .ok_or_else(|| {
                ValidationError::out_of_range("frames per file", value, "must be an integer >= 1")
            })
    }
}

impl fmt::Display for FramesPerFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramesPerFile::Finite(n) => write!(f, "{n}"),
            FramesPerFile::Unlimited => write!(f, "Inf"),
        }
    }
}

/// Basename used when the entry is left empty.
pub const DEFAULT_BASENAME: &str = "file";

/// Where and how frames are saved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoggerSettings {
    pub save_path: PathBuf,
    pub basename: String,
    pub frames_per_file: FramesPerFile,
    /// Log digitizer output instead of processed frames.
    pub save_raw: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            basename: String::new(),
            frames_per_file: FramesPerFile::DEFAULT,
            save_raw: false,
        }
    }
}

/// `<documents>/Dirigo`, falling back to the home directory and then the
/// working directory.
#[must_use]
pub fn default_save_path() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Dirigo")
}

impl LoggerSettings {
    #[must_use]
    pub fn with_path(save_path: impl Into<PathBuf>) -> Self {
        Self {
            save_path: save_path.into(),
            ..Self::default()
        }
    }

    /// Basename as written to disk: the placeholder when empty, `_raw`
    /// appended when saving raw frames.
    #[must_use]
    pub fn effective_basename(&self) -> String {
        let base = self.basename.trim();
        let base = if base.is_empty() { DEFAULT_BASENAME } else { base };
        if self.save_raw {
            format!("{base}_raw")
        } else {
            base.to_string()
        }
    }

    /// Path of the `file_index`-th output file.
    #[must_use]
    pub fn file_path(&self, file_index: u32, extension: &str) -> PathBuf {
        let name = match self.frames_per_file {
            FramesPerFile::Unlimited if file_index == 0 => {
                format!("{}.{extension}", self.effective_basename())
            }
            _ => format!("{}_{file_index}.{extension}", self.effective_basename()),
        };
        Path::new(&self.save_path).join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_per_file_parse() {
        assert_eq!("256".parse::<FramesPerFile>().unwrap(), FramesPerFile::Finite(256));
        assert_eq!("inf".parse::<FramesPerFile>().unwrap(), FramesPerFile::Unlimited);
        assert_eq!("Infinity".parse::<FramesPerFile>().unwrap(), FramesPerFile::Unlimited);
        assert_eq!(" ∞ ".parse::<FramesPerFile>().unwrap(), FramesPerFile::Unlimited);
        assert!("0".parse::<FramesPerFile>().is_err());
        assert!("-1".parse::<FramesPerFile>().is_err());
        assert!("lots".parse::<FramesPerFile>().is_err());
        assert_eq!(FramesPerFile::Unlimited.to_string(), "Inf");
    }

    #[test]
    fn test_is_full() {
        assert!(FramesPerFile::Finite(2).is_full(2));
        assert!(!FramesPerFile::Finite(2).is_full(1));
        assert!(!FramesPerFile::Unlimited.is_full(u64::MAX));
    }

    #[test]
    fn test_default_save_path() {
        let settings = LoggerSettings::default();
        assert!(settings.save_path.ends_with("Dirigo"));
        assert_eq!(settings.frames_per_file, FramesPerFile::Finite(256));
    }

    #[test]
    fn test_effective_basename() {
        let mut settings = LoggerSettings::with_path("/data");
        assert_eq!(settings.effective_basename(), "file");
        settings.basename = "mouse1".into();
        settings.save_raw = true;
        assert_eq!(settings.effective_basename(), "mouse1_raw");
        assert_eq!(
            settings.file_path(3, "tif"),
            PathBuf::from("/data").join("mouse1_raw_3.tif")
        );
    }
}

//! Export formats and the finished artifact.

use crate::error::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// 16-bit PCM WAV.
    Wav,
    /// MP3 at the configured constant bitrate.
    Mp3,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> ExportResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output settings shared by every export of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub sample_rate: u32,
    /// Constant bitrate for MP3 output.
    pub mp3_bitrate_kbps: u32,
    /// Output ceiling in linear amplitude, `None` to only hard-clip at ±1.
    pub limiter_threshold: Option<f32>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            mp3_bitrate_kbps: 192,
            limiter_threshold: Some(0.95),
        }
    }
}

/// Encoded mix ready for download.
#[derive(Debug, Clone, PartialEq)]
pub struct MixArtifact {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl MixArtifact {
    /// Download name derived from a track title, e.g. `My_Song_mix.wav`.
    ///
    /// Keeps letters, digits, `_`, `-` and whitespace; runs of whitespace
    /// become a single `_`.
    pub fn file_name(&self, title: &str) -> String {
        mix_file_name(title, self.format)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        tokio::fs::write(path, &self.bytes).await?;
        Ok(())
    }
}

pub fn mix_file_name(title: &str, format: ExportFormat) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let stem = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = if stem.is_empty() { "track".to_string() } else { stem };
    format!("{stem}_mix.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("WAV".parse::<ExportFormat>().unwrap(), ExportFormat::Wav);
        assert_eq!("mp3".parse::<ExportFormat>().unwrap(), ExportFormat::Mp3);
        assert!(matches!(
            "flac".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_file_name_sanitizes() {
        assert_eq!(mix_file_name("My Song: Remix!", ExportFormat::Wav), "My_Song_Remix_mix.wav");
        assert_eq!(mix_file_name("  a   b  ", ExportFormat::Mp3), "a_b_mix.mp3");
        assert_eq!(mix_file_name("Песня-1", ExportFormat::Mp3), "Песня-1_mix.mp3");
        assert_eq!(mix_file_name("???", ExportFormat::Wav), "track_mix.wav");
    }

    #[tokio::test]
    async fn test_save_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = MixArtifact {
            bytes: vec![1, 2, 3],
            format: ExportFormat::Wav,
            sample_rate: 44_100,
            duration_secs: 0.0,
        };
        let path = dir.path().join(artifact.file_name("Demo"));
        artifact.save(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(artifact.mime_type(), "audio/wav");
    }
}

//! Beep asset and the feedback output seam.
//!
//! The beep is a short WAV resource loaded once per radar run. Playing it and
//! pulsing the vibration motor are delegated to a [`FeedbackSink`], which the
//! platform (or a test) supplies.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use routes_core::FeedbackEvent;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Beep asset '{0}' not found")]
    Missing(PathBuf),
    #[error("Cannot read beep asset '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Beep asset '{0}' is not a RIFF/WAVE file")]
    InvalidFormat(PathBuf),
}

/// In-memory beep sound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeepAsset {
    name: String,
    data: Arc<[u8]>,
}

impl BeepAsset {
    /// Load and validate a WAV file
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AudioError::Missing(path.to_owned()));
            }
            Err(source) => {
                return Err(AudioError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "beep".to_string());
        Self::from_bytes(name, data).map_err(|_| AudioError::InvalidFormat(path.to_owned()))
    }

    /// Wrap WAV bytes already in memory
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, AudioError> {
        let name = name.into();
        if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
            return Err(AudioError::InvalidFormat(PathBuf::from(name)));
        }
        debug!("Loaded beep asset '{}' ({} bytes)", name, data.len());
        Ok(BeepAsset {
            name,
            data: data.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Output device for feedback.
///
/// Calls come from the cue timer and the sensor ingestion path and must not
/// block.
pub trait FeedbackSink: Send + Sync {
    /// Play `asset` for `duration`, then stop it
    fn audio_cue(&self, asset: &BeepAsset, duration: Duration);

    /// Fire one alignment pulse
    fn haptic_pulse(&self);

    /// Release the audio device; may be called repeatedly
    fn release_audio(&self) {}
}

/// Sink forwarding every event over a channel, for presentation layers and
/// tests that observe feedback instead of producing it.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<FeedbackEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FeedbackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl FeedbackSink for ChannelSink {
    fn audio_cue(&self, _asset: &BeepAsset, duration: Duration) {
        let _ = self.tx.send(FeedbackEvent::AudioCue { duration });
    }

    fn haptic_pulse(&self) {
        let _ = self.tx.send(FeedbackEvent::HapticPulse);
    }
}

/// Minimal valid WAV header followed by `samples` bytes of silence
#[cfg(test)]
pub(crate) fn test_wav(samples: usize) -> Vec<u8> {
    let mut wav = Vec::with_capacity(44 + samples);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + samples) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&8000u32.to_le_bytes());
    wav.extend_from_slice(&8000u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&8u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(samples as u32).to_le_bytes());
    wav.resize(44 + samples, 0x80);
    wav
}

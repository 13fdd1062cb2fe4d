//! Audio frame types
//!
//! Frames are opaque to the call core: the transport and the speech
//! collaborators agree on encoding, the session only moves bytes.

use serde::{Deserialize, Serialize};

/// Supported audio sample rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleRate {
    /// 8kHz - Telephony
    #[default]
    Hz8000,
    /// 16kHz - Wideband speech
    Hz16000,
    /// 24kHz - TTS output
    Hz24000,
}

impl SampleRate {
    /// Get sample rate as u32
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz24000 => 24000,
        }
    }
}

/// Audio encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AudioEncoding {
    /// μ-law (telephony media streams)
    #[default]
    Mulaw,
    /// 16-bit signed PCM (little-endian)
    Pcm16,
    /// Opus codec
    Opus,
}

/// A chunk of encoded audio moving between transport and speech services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Encoded payload
    pub data: Vec<u8>,
    pub encoding: AudioEncoding,
    pub sample_rate: SampleRate,
    /// Monotonic sequence number within one stream
    pub sequence: u64,
}

impl AudioFrame {
    /// Create a telephony frame (8kHz μ-law)
    pub fn new(data: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self {
            data: data.into(),
            encoding: AudioEncoding::Mulaw,
            sample_rate: SampleRate::Hz8000,
            sequence,
        }
    }

    pub fn with_format(mut self, encoding: AudioEncoding, sample_rate: SampleRate) -> Self {
        self.encoding = encoding;
        self.sample_rate = sample_rate;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback duration in milliseconds, for byte-per-sample encodings
    pub fn duration_ms(&self) -> Option<u64> {
        let bytes_per_sample = match self.encoding {
            AudioEncoding::Mulaw => 1,
            AudioEncoding::Pcm16 => 2,
            AudioEncoding::Opus => return None,
        };
        let samples = (self.data.len() / bytes_per_sample) as u64;
        Some(samples * 1000 / self.sample_rate.as_u32() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_is_telephony() {
        let frame = AudioFrame::new(vec![0u8; 160], 0);
        assert_eq!(frame.encoding, AudioEncoding::Mulaw);
        assert_eq!(frame.sample_rate, SampleRate::Hz8000);
        assert_eq!(frame.duration_ms(), Some(20));
    }

    #[test]
    fn test_pcm16_duration() {
        let frame = AudioFrame::new(vec![0u8; 640], 3)
            .with_format(AudioEncoding::Pcm16, SampleRate::Hz16000);
        assert_eq!(frame.duration_ms(), Some(20));
        assert_eq!(frame.sequence, 3);
    }

    #[test]
    fn test_opus_duration_unknown() {
        let frame = AudioFrame::new(vec![1, 2, 3], 0)
            .with_format(AudioEncoding::Opus, SampleRate::Hz16000);
        assert!(frame.duration_ms().is_none());
    }
}

//! `wfd_audio_codecs` capability encoding
//!
//! The wire value lists codecs as `NAME <modes-hex> <latency-hex>`, comma
//! separated. Mode bits select sample rate / width / channel combinations.

/// A negotiable audio format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// AAC, 48 kHz, 16-bit, stereo
    Aac48000B16C2,
    /// LPCM, 48 kHz, 16-bit, stereo
    Lpcm48000B16C2,
    /// LPCM, 44.1 kHz, 16-bit, stereo
    Lpcm44100B16C2,
}

impl AudioFormat {
    /// Codec name token on the wire
    #[must_use]
    pub fn codec_name(&self) -> &'static str {
        match self {
            AudioFormat::Aac48000B16C2 => "AAC",
            AudioFormat::Lpcm48000B16C2 | AudioFormat::Lpcm44100B16C2 => "LPCM",
        }
    }

    /// Sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioFormat::Aac48000B16C2 | AudioFormat::Lpcm48000B16C2 => 48_000,
            AudioFormat::Lpcm44100B16C2 => 44_100,
        }
    }

    fn mode_bit(self) -> u32 {
        match self {
            AudioFormat::Aac48000B16C2 => 0x0000_0001,
            AudioFormat::Lpcm44100B16C2 => 0x0000_0001,
            AudioFormat::Lpcm48000B16C2 => 0x0000_0002,
        }
    }

    /// Render the wire value advertising this format
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{} {:08x} 00", self.codec_name(), self.mode_bit())
    }

    /// Parse a `wfd_audio_codecs` offer, preferring AAC
    ///
    /// Returns the fallback AAC 48000/16/2 when the offer cannot be parsed:
    /// an unreadable capability line must not kill the negotiation.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut lpcm: Option<AudioFormat> = None;

        for codec in value.split(',') {
            let mut fields = codec.split_whitespace();
            let (Some(name), Some(modes)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(modes) = u32::from_str_radix(modes, 16) else {
                continue;
            };

            match name {
                "AAC" if modes & 0x0000_0001 != 0 => return AudioFormat::Aac48000B16C2,
                "LPCM" => {
                    if modes & 0x0000_0002 != 0 {
                        lpcm.get_or_insert(AudioFormat::Lpcm48000B16C2);
                    } else if modes & 0x0000_0001 != 0 {
                        lpcm.get_or_insert(AudioFormat::Lpcm44100B16C2);
                    }
                }
                _ => {}
            }
        }

        lpcm.unwrap_or_default()
    }
}

impl Default for AudioFormat {
    /// Policy fallback when the peer's offer cannot be parsed
    fn default() -> Self {
        AudioFormat::Aac48000B16C2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(AudioFormat::Aac48000B16C2.encode(), "AAC 00000001 00");
        assert_eq!(AudioFormat::Lpcm48000B16C2.encode(), "LPCM 00000002 00");
    }

    #[test]
    fn test_parse_prefers_aac() {
        let format = AudioFormat::parse("LPCM 00000003 00, AAC 00000001 00");
        assert_eq!(format, AudioFormat::Aac48000B16C2);
    }

    #[test]
    fn test_parse_lpcm_only_offer() {
        assert_eq!(
            AudioFormat::parse("LPCM 00000002 00"),
            AudioFormat::Lpcm48000B16C2
        );
        assert_eq!(
            AudioFormat::parse("LPCM 00000001 00"),
            AudioFormat::Lpcm44100B16C2
        );
    }

    #[test]
    fn test_unparseable_offer_falls_back_to_aac() {
        assert_eq!(AudioFormat::parse("garbage"), AudioFormat::Aac48000B16C2);
        assert_eq!(AudioFormat::parse(""), AudioFormat::Aac48000B16C2);
        assert_eq!(
            AudioFormat::parse("OPUS zzzz 00"),
            AudioFormat::Aac48000B16C2
        );
    }
}

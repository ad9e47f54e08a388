//! `wfd_video_formats` capability encoding
//!
//! The wire value is a comma-separated list of fixed-width zero-padded hex
//! fields: native selector byte, preferred-display-mode flag, H.264 profile
//! and level bitmasks, CEA/VESA/HH resolution bitmasks, decoder latency,
//! and slice parameters. The low 3 bits of the native byte select a
//! resolution table (0 = CEA); the remaining bits index into that table.

/// Resolution table selected by the low 3 bits of the native byte
const TABLE_CEA: u8 = 0;

/// CEA table indices for the formats this source negotiates
const CEA_640X480_60: u8 = 0;
const CEA_1280X720_30: u8 = 5;
const CEA_1920X1080_30: u8 = 7;
const CEA_1280X720_25: u8 = 10;
const CEA_1920X1080_25: u8 = 12;

/// A negotiable video format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    /// 640x480 at 60 fps (mandatory WFD baseline)
    V640x480F60,
    /// 1280x720 at 25 fps
    V1280x720F25,
    /// 1280x720 at 30 fps
    V1280x720F30,
    /// 1920x1080 at 25 fps
    V1920x1080F25,
    /// 1920x1080 at 30 fps
    V1920x1080F30,
}

impl VideoFormat {
    /// Pixel dimensions
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            VideoFormat::V640x480F60 => (640, 480),
            VideoFormat::V1280x720F25 | VideoFormat::V1280x720F30 => (1280, 720),
            VideoFormat::V1920x1080F25 | VideoFormat::V1920x1080F30 => (1920, 1080),
        }
    }

    /// Frame rate in fps
    #[must_use]
    pub fn frame_rate(&self) -> u32 {
        match self {
            VideoFormat::V640x480F60 => 60,
            VideoFormat::V1280x720F25 | VideoFormat::V1920x1080F25 => 25,
            VideoFormat::V1280x720F30 | VideoFormat::V1920x1080F30 => 30,
        }
    }

    fn cea_index(self) -> u8 {
        match self {
            VideoFormat::V640x480F60 => CEA_640X480_60,
            VideoFormat::V1280x720F25 => CEA_1280X720_25,
            VideoFormat::V1280x720F30 => CEA_1280X720_30,
            VideoFormat::V1920x1080F25 => CEA_1920X1080_25,
            VideoFormat::V1920x1080F30 => CEA_1920X1080_30,
        }
    }

    fn from_cea_index(index: u8) -> Option<Self> {
        match index {
            CEA_640X480_60 => Some(VideoFormat::V640x480F60),
            CEA_1280X720_25 => Some(VideoFormat::V1280x720F25),
            CEA_1280X720_30 => Some(VideoFormat::V1280x720F30),
            CEA_1920X1080_25 => Some(VideoFormat::V1920x1080F25),
            CEA_1920X1080_30 => Some(VideoFormat::V1920x1080F30),
            _ => None,
        }
    }
}

impl Default for VideoFormat {
    /// Policy fallback when the peer's offer cannot be parsed
    fn default() -> Self {
        VideoFormat::V1920x1080F30
    }
}

/// Parsed `wfd_video_formats` record
///
/// Produced once from the Sink's M3 response and held unchanged for the rest
/// of the session to build the M4 negotiated-format request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormatsInfo {
    /// Resolution-table selector and index
    pub native: u8,
    /// Preferred-display-mode flag
    pub preferred_display_mode: u8,
    /// H.264 profile bitmask
    pub profile: u8,
    /// H.264 level bitmask
    pub level: u8,
    /// CEA resolution bitmask
    pub cea_mask: u32,
    /// VESA resolution bitmask
    pub vesa_mask: u32,
    /// Handheld resolution bitmask
    pub hh_mask: u32,
    /// Decoder latency in milliseconds
    pub latency: u8,
    /// Minimum slice size
    pub min_slice_size: u16,
    /// Slice encoding parameters
    pub slice_enc_params: u16,
}

impl VideoFormatsInfo {
    /// Build the record advertising a single format
    #[must_use]
    pub fn from_format(format: VideoFormat) -> Self {
        let index = format.cea_index();
        Self {
            native: (index << 3) | TABLE_CEA,
            preferred_display_mode: 0,
            profile: 0x02, // CHP
            level: 0x08,   // 4.1
            cea_mask: 1 << index,
            vesa_mask: 0,
            hh_mask: 0,
            latency: 0,
            min_slice_size: 0,
            slice_enc_params: 0,
        }
    }

    /// The format selected by the native byte
    ///
    /// An unknown table selector or table index falls back to the mandatory
    /// 640x480@60 baseline rather than failing.
    #[must_use]
    pub fn format(&self) -> VideoFormat {
        let table = self.native & 0x07;
        let index = self.native >> 3;
        if table != TABLE_CEA {
            return VideoFormat::V640x480F60;
        }
        VideoFormat::from_cea_index(index).unwrap_or(VideoFormat::V640x480F60)
    }

    /// Render the wire value
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{:02x}, {:02x}, {:02x}, {:02x}, {:08x}, {:08x}, {:08x}, {:02x}, {:04x}, {:04x}",
            self.native,
            self.preferred_display_mode,
            self.profile,
            self.level,
            self.cea_mask,
            self.vesa_mask,
            self.hh_mask,
            self.latency,
            self.min_slice_size,
            self.slice_enc_params,
        )
    }

    /// Parse the wire value
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        if fields.len() < 10 {
            return None;
        }

        Some(Self {
            native: u8::from_str_radix(fields[0], 16).ok()?,
            preferred_display_mode: u8::from_str_radix(fields[1], 16).ok()?,
            profile: u8::from_str_radix(fields[2], 16).ok()?,
            level: u8::from_str_radix(fields[3], 16).ok()?,
            cea_mask: u32::from_str_radix(fields[4], 16).ok()?,
            vesa_mask: u32::from_str_radix(fields[5], 16).ok()?,
            hh_mask: u32::from_str_radix(fields[6], 16).ok()?,
            latency: u8::from_str_radix(fields[7], 16).ok()?,
            min_slice_size: u16::from_str_radix(fields[8], 16).ok()?,
            slice_enc_params: u16::from_str_radix(fields[9], 16).ok()?,
        })
    }
}

impl Default for VideoFormatsInfo {
    fn default() -> Self {
        Self::from_format(VideoFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: [VideoFormat; 5] = [
        VideoFormat::V640x480F60,
        VideoFormat::V1280x720F25,
        VideoFormat::V1280x720F30,
        VideoFormat::V1920x1080F25,
        VideoFormat::V1920x1080F30,
    ];

    #[test]
    fn test_round_trip_canonical_formats() {
        for format in CANONICAL {
            let info = VideoFormatsInfo::from_format(format);
            let parsed = VideoFormatsInfo::parse(&info.encode()).expect("parse own encoding");
            assert_eq!(parsed, info);
            assert_eq!(parsed.format(), format, "format {format:?}");
        }
    }

    #[test]
    fn test_encode_is_fixed_width_hex() {
        let info = VideoFormatsInfo::from_format(VideoFormat::V1920x1080F30);
        assert_eq!(
            info.encode(),
            "38, 00, 02, 08, 00000080, 00000000, 00000000, 00, 0000, 0000"
        );
    }

    #[test]
    fn test_unknown_table_selector_defaults_to_vga() {
        let mut info = VideoFormatsInfo::from_format(VideoFormat::V1920x1080F30);
        info.native = (info.native & !0x07) | 0x05; // bogus table
        assert_eq!(info.format(), VideoFormat::V640x480F60);
    }

    #[test]
    fn test_unknown_table_index_defaults_to_vga() {
        let info = VideoFormatsInfo {
            native: 31 << 3, // index with no CEA entry
            ..VideoFormatsInfo::default()
        };
        assert_eq!(info.format(), VideoFormat::V640x480F60);
    }

    #[test]
    fn test_parse_rejects_short_field_list() {
        assert!(VideoFormatsInfo::parse("38, 00, 02").is_none());
        assert!(VideoFormatsInfo::parse("not hex at all").is_none());
    }
}

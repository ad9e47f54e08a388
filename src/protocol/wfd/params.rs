//! `text/parameters` body codec
//!
//! WFD bodies are `key: value` lines. A GET_PARAMETER query body lists bare
//! key names with no value. Unrecognized keys must survive a parse/render
//! round trip unchanged so parameter echoes are lossless.

/// An ordered `key[: value]` parameter body
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    entries: Vec<(String, Option<String>)>,
}

impl Parameters {
    /// Create an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `text/parameters` body
    ///
    /// Lines split on the first `:`; lines without a colon are kept as bare
    /// keys. Never fails: unknown content is preserved, not dropped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut params = Self::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            match line.find(':') {
                Some(pos) => {
                    let key = line[..pos].trim().to_string();
                    let value = line[pos + 1..].trim().to_string();
                    params.entries.push((key, Some(value)));
                }
                None => params.entries.push((line.trim().to_string(), None)),
            }
        }
        params
    }

    /// Append a `key: value` pair
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), Some(value.into())));
    }

    /// Append a bare key (GET_PARAMETER query form)
    pub fn query(&mut self, key: impl Into<String>) {
        self.entries.push((key.into(), None));
    }

    /// Get the value for a key, if present with a value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Check whether a key appears at all (with or without a value)
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render to wire text, CRLF line endings, entries in order
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            match value {
                Some(value) => {
                    out.push_str(key);
                    out.push_str(": ");
                    out.push_str(value);
                }
                None => out.push_str(key),
            }
            out.push_str("\r\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values() {
        let params = Parameters::parse(
            "wfd_audio_codecs: AAC 00000001 00\r\nwfd_client_rtp_ports: RTP/AVP/UDP;unicast 6700 0 mode=play\r\n",
        );

        assert_eq!(params.get("wfd_audio_codecs"), Some("AAC 00000001 00"));
        assert_eq!(
            params.get("wfd_client_rtp_ports"),
            Some("RTP/AVP/UDP;unicast 6700 0 mode=play")
        );
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        let params = Parameters::parse("wfd_presentation_URL: rtsp://10.0.0.1/wfd1.0/streamid=0 none\r\n");
        assert_eq!(
            params.get("wfd_presentation_URL"),
            Some("rtsp://10.0.0.1/wfd1.0/streamid=0 none")
        );
    }

    #[test]
    fn test_unknown_keys_round_trip_losslessly() {
        let body = "wfd_vendor_extension: opaque blob\r\nwfd_audio_codecs: AAC 00000001 00\r\n";
        let params = Parameters::parse(body);
        assert_eq!(params.encode(), body);
    }

    #[test]
    fn test_bare_query_keys() {
        let mut params = Parameters::new();
        params.query("wfd_video_formats");
        params.query("wfd_audio_codecs");

        assert_eq!(params.encode(), "wfd_video_formats\r\nwfd_audio_codecs\r\n");

        let reparsed = Parameters::parse(&params.encode());
        assert!(reparsed.contains("wfd_video_formats"));
        assert_eq!(reparsed.get("wfd_video_formats"), None);
    }
}

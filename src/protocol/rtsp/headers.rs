//! RTSP header collection
//!
//! Insertion order is preserved: WFD peers parse the trailing `Transport`
//! and `Range` headers of the M6/M7 replies strictly, so a header added last
//! must be rendered last.

/// Well-known RTSP header names
pub mod names {
    /// Command sequence number
    pub const CSEQ: &str = "CSeq";
    /// Body MIME type
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Body length in bytes
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// Session identifier, optionally with `;timeout=N`
    pub const SESSION: &str = "Session";
    /// RTP transport description
    pub const TRANSPORT: &str = "Transport";
    /// Client software identifier
    pub const USER_AGENT: &str = "User-Agent";
    /// Feature the peer must support
    pub const REQUIRE: &str = "Require";
    /// Methods and features the sender supports
    pub const PUBLIC: &str = "Public";
    /// Playback range
    pub const RANGE: &str = "Range";
}

/// RTSP header collection
///
/// Lookup is case-insensitive; iteration yields headers in the order they
/// were first inserted.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Create empty headers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header
    ///
    /// If a header with the same name (case-insensitive) already exists, its
    /// value is replaced in place and its position kept. The original key
    /// casing is preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .inner
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.inner.push((name, value));
        }
    }

    /// Get header value (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if header exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get `CSeq` value
    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.get(names::CSEQ)?.parse().ok()
    }

    /// Get Content-Length value
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.get(names::CONTENT_LENGTH)?.parse().ok()
    }

    /// Get Content-Type value
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Get session ID, stripped of any `;timeout=N` suffix
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        let raw = self.get(names::SESSION)?;
        raw.split(';').next()
    }

    /// Get the `Public` header as a list of trimmed tokens
    #[must_use]
    pub fn public_tokens(&self) -> Vec<&str> {
        self.get(names::PUBLIC)
            .map(|v| v.split(',').map(str::trim).collect())
            .unwrap_or_default()
    }

    /// Iterate over all headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

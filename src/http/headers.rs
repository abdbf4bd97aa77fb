//! Case-insensitive header map.

/// Ordered mapping from header name to value.
///
/// Lookup is case-insensitive; the original casing of the last inserted
/// name is preserved for serialization. Keys are unique — inserting an
/// existing name replaces both the stored name and value (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a header, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            *entry = (name, value);
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Remove a header by name, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parsed `Content-Length` value.
    ///
    /// `None` when the header is missing or not a valid integer; an
    /// unparsable length is treated the same as an absent one.
    pub fn content_length(&self) -> Option<u64> {
        self.get("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    /// Whether the message body uses chunked transfer-encoding.
    pub fn is_chunked(&self) -> bool {
        self.get("Transfer-Encoding")
            .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("chunked")))
            .unwrap_or(false)
    }

    /// Serialize all entries as `Name: value\r\n` rows.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

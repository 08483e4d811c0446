use std::fmt;

use bytes::Bytes;
use url::Url;

/// Where a piece of entry material comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Source {
    /// Content submitted with the entry.
    Inline(Bytes),

    /// Content to be fetched from a URL.
    Remote(Url),
}

impl Source {
    pub fn is_remote(&self) -> bool {
        matches!(self, Source::Remote(_))
    }
}

// Inline content is never printed, only its length.
impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Inline(bytes) => f.debug_tuple("Inline").field(&bytes.len()).finish(),
            Source::Remote(url) => f.debug_tuple("Remote").field(&url.as_str()).finish(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Inline(bytes) => write!(f, "inline ({} bytes)", bytes.len()),
            Source::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_inline_content() {
        let source = Source::Inline(Bytes::from_static(b"secret material"));
        let rendered = format!("{source:?} {source}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("15"));
    }

    #[test]
    fn test_is_remote() {
        let url = Url::parse("https://example.com/artifact.tar.gz").unwrap();
        let remote = Source::Remote(url);
        assert!(remote.is_remote());
        assert_eq!(remote.to_string(), "https://example.com/artifact.tar.gz");
        assert!(!Source::Inline(Bytes::new()).is_remote());
    }
}

use std::fmt;
use std::path::PathBuf;

use url::Url;

/// Where a feed comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Http(Url),
    File(PathBuf),
}

impl FeedSource {
    /// `http(s)://` and `file://` are URLs; anything else is a local path.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("feed source is empty".into());
        }

        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(input).map_err(|e| format!("invalid URL '{input}': {e}"))?;
            return Ok(Self::Http(url));
        }
        if lower.starts_with("file://") {
            let url = Url::parse(input).map_err(|e| format!("invalid URL '{input}': {e}"))?;
            let path = url
                .to_file_path()
                .map_err(|_| format!("file URL '{input}' has no local path"))?;
            return Ok(Self::File(path));
        }

        Ok(Self::File(PathBuf::from(input)))
    }

    /// Resolve a relative file path against `base` (e.g. the config file's directory).
    pub fn relative_to(self, base: &std::path::Path) -> Self {
        match self {
            Self::File(p) if p.is_relative() => Self::File(base.join(p)),
            other => other,
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

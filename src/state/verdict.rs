//! Link classification types

use std::fmt;
use url::Url;

/// Terminal failure of a fetch or probe, as decided by the retry controller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Broken {
    /// The server answered with an HTTP status in [400, 599]
    Status(u16),
    /// No usable answer: retries exhausted, rendering failure, invalid link...
    Error(String),
}

impl fmt::Display for Broken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{}", code),
            Self::Error(message) => f.write_str(message),
        }
    }
}

/// The classification of one discovered hyperlink
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    Ok,
    BrokenStatus(u16),
    BrokenError(String),
}

impl Classification {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_broken(&self) -> bool {
        !self.is_ok()
    }

    /// The reason column of a broken link record (`None` for working links)
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Ok => None,
            Self::BrokenStatus(code) => Some(code.to_string()),
            Self::BrokenError(message) => Some(message.clone()),
        }
    }
}

impl From<Broken> for Classification {
    fn from(broken: Broken) -> Self {
        match broken {
            Broken::Status(code) => Self::BrokenStatus(code),
            Broken::Error(message) => Self::BrokenError(message),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::BrokenStatus(code) => write!(f, "HTTP {}", code),
            Self::BrokenError(message) => write!(f, "error: {}", message),
        }
    }
}

/// The result of checking one link found on one page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkVerdict {
    /// Page the link was found on
    pub origin: Url,

    /// The link target: a normalized URL, or the raw href text when the link
    /// could not be resolved into a URL at all
    pub target: String,

    pub classification: Classification,
}

impl LinkVerdict {
    pub fn new(origin: Url, target: impl Into<String>, classification: Classification) -> Self {
        Self {
            origin,
            target: target.into(),
            classification,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.classification.is_broken()
    }
}

//! Diagnostic severities and the internal diagnostic record.

use serde::{Deserialize, Serialize};

/// LSP diagnostic severity (1=Error .. 4=Hint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl Severity {
    /// Convert from the LSP numeric encoding.
    ///
    /// Returns `None` for values outside the LSP-defined range; callers at
    /// the boundary decide the fallback policy.
    #[must_use]
    pub fn from_lsp(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    /// Label used when prefixing user-visible diagnostic messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Info",
            Self::Hint => "Hint",
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        Severity::from_lsp(value).ok_or_else(|| format!("invalid severity {value}"))
    }
}

/// A severity and message attached to a parsed URI or route.
///
/// The source range is carried by the owning URI, not the diagnostic; every
/// diagnostic of a URI reports at the URI's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

//! Display preferences persisted on the client.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Light or dark color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    /// The opposite mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl std::str::FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("invalid theme mode: {s}")),
        }
    }
}

/// Error parsing an [`AccentColor`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("accent color must be #rgb or #rrggbb, got {0:?}")]
pub struct AccentColorError(pub String);

/// A CSS hex accent color (`#rgb` or `#rrggbb`), stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccentColor(String);

impl AccentColor {
    /// Parse a hex color.
    ///
    /// # Errors
    ///
    /// Returns `AccentColorError` unless the input is `#` followed by three
    /// or six hex digits.
    pub fn parse(s: &str) -> Result<Self, AccentColorError> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| AccentColorError(s.to_owned()))?;
        if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AccentColorError(s.to_owned()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The color as a CSS string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccentColor {
    type Error = AccentColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccentColor> for String {
    fn from(color: AccentColor) -> Self {
        color.0
    }
}

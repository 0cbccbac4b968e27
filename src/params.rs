//! Request parameters and their typed parsing
//!
//! Every parameter arrives as a multipart text field. Absent or empty fields
//! fall back to a default that leaves the image unchanged wherever that is
//! meaningful; present fields that fail to parse are rejected with
//! [`EditError::InvalidParameter`].

use crate::error::{EditError, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// Flat string-to-string mapping of the non-file form fields of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationParameters {
    values: HashMap<String, String>,
}

impl OperationParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field; later fields with the same name win
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy in tests
    #[must_use]
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value, with surrounding whitespace trimmed and empty values treated as absent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a floating-point parameter, falling back to `default` when absent
    ///
    /// # Errors
    /// - Value present but not a finite number
    pub fn f32_or(&self, key: &str, default: f32) -> Result<f32> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.parse::<f32>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(EditError::invalid_parameter(key, raw, "number")),
            },
        }
    }

    /// Parse a boolean flag; only a case-insensitive `"true"` enables it
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|raw| raw.eq_ignore_ascii_case("true"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OperationParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Parameters of the manual edit operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualEditParams {
    /// Clockwise rotation in degrees; the canvas grows to fit
    pub rotate: f32,
    /// Mirror horizontally after rotating
    pub flip: bool,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
}

impl Default for ManualEditParams {
    fn default() -> Self {
        Self {
            rotate: 0.0,
            flip: false,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
        }
    }
}

impl ManualEditParams {
    /// Parse from request fields
    ///
    /// # Errors
    /// - Any numeric field that does not parse
    pub fn from_params(params: &OperationParameters) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            rotate: params.f32_or("rotate", defaults.rotate)?,
            flip: params.flag("flip"),
            brightness: params.f32_or("brightness", defaults.brightness)?,
            contrast: params.f32_or("contrast", defaults.contrast)?,
            saturation: params.f32_or("saturation", defaults.saturation)?,
            sharpness: params.f32_or("sharpness", defaults.sharpness)?,
        })
    }

    /// True when every field is at its no-op value
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Synthesized background for sky replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkyMode {
    /// Solid daylight blue
    Day,
    /// Sparse white points on dark navy
    Stars,
    /// Dense colored points on dark purple
    #[default]
    Galaxy,
}

impl FromStr for SkyMode {
    type Err = std::convert::Infallible;

    /// Unrecognized names fall back to the galaxy background
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "day" => Self::Day,
            "stars" => Self::Stars,
            _ => Self::Galaxy,
        })
    }
}

impl SkyMode {
    #[must_use]
    pub fn from_params(params: &OperationParameters) -> Self {
        params
            .get("mode")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

/// Color tint for the sky mood operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkyMood {
    #[default]
    Sunset,
    Dusk,
    /// Also used for any unrecognized mood name
    Night,
}

impl FromStr for SkyMood {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "sunset" => Self::Sunset,
            "dusk" => Self::Dusk,
            _ => Self::Night,
        })
    }
}

impl SkyMood {
    #[must_use]
    pub fn from_params(params: &OperationParameters) -> Self {
        params
            .get("mood")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

//! Value typing for INI entries.
//!
//! INI values are always stored as text. [`ValueKind::classify`] only decides which kind
//! of editor fits a value; [`render_edit`] turns an edited value back into text without
//! touching values the user left alone.

use crate::error::{Error, Result};
use std::fmt;

/// An `0xRRGGBB` or `0xAARRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Whether the source text carried an alpha byte
    pub has_alpha: bool,
}

impl HexColor {
    /// Create an opaque color from RGB components
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            a: 255,
            r,
            g,
            b,
            has_alpha: false,
        }
    }

    /// Create a color from ARGB components
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self {
            a,
            r,
            g,
            b,
            has_alpha: true,
        }
    }

    /// Parse `0xRRGGBB` or `0xAARRGGBB` (surrounding whitespace allowed)
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .ok_or_else(|| Error::invalid_color(trimmed, "missing 0x prefix"))?;

        if hex.len() != 6 && hex.len() != 8 {
            return Err(Error::invalid_color(
                trimmed,
                "hex color must be 6 or 8 digits",
            ));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid_color(trimmed, "invalid hex digits"));
        }

        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| Error::invalid_color(trimmed, "invalid hex digits"))
        };

        if hex.len() == 8 {
            Ok(Self::from_argb(byte(0)?, byte(2)?, byte(4)?, byte(6)?))
        } else {
            Ok(Self::from_rgb(byte(0)?, byte(2)?, byte(4)?))
        }
    }

    /// Format as upper-case hex; alpha is written when the source had it or it is not opaque.
    pub fn to_hex_string(&self) -> String {
        if self.has_alpha || self.a != 255 {
            format!("0x{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
        } else {
            format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        }
    }

    /// Convert to packed ARGB
    pub fn to_argb(&self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

/// The editing affordance a value calls for.
///
/// Variants are tried in declaration order, so `"1"` is a boolean and `0xFF00FF` a color.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// `true/false/1/0/yes/no/on/off`, any case
    Boolean(bool),

    /// `0xRRGGBB` or `0xAARRGGBB`
    Color(HexColor),

    /// Base-10 (optionally negative) or `0x`-prefixed base-16 integer
    Integer(i64),

    /// `digits.digits`, optionally negative
    Float(f64),

    /// Anything else
    Text(String),
}

impl ValueKind {
    /// Classify a stored value
    pub fn classify(text: &str) -> Self {
        if let Some(b) = parse_bool(text) {
            return ValueKind::Boolean(b);
        }
        if let Ok(color) = HexColor::parse(text) {
            return ValueKind::Color(color);
        }
        if let Some(i) = parse_int(text) {
            return ValueKind::Integer(i);
        }
        if let Some(f) = parse_float(text) {
            return ValueKind::Float(f);
        }
        ValueKind::Text(text.to_string())
    }

    /// Short name of the kind
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Boolean(_) => "bool",
            ValueKind::Color(_) => "color",
            ValueKind::Integer(_) => "int",
            ValueKind::Float(_) => "float",
            ValueKind::Text(_) => "text",
        }
    }
}

/// Parse a boolean value (true/false/1/0/yes/no/on/off)
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an integer: `-?digits` or `0x` followed by hex digits
pub fn parse_int(text: &str) -> Option<i64> {
    let s = text.trim();
    if let Some(hex) = strip_hex_prefix(s) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return i64::from_str_radix(hex, 16).ok();
    }

    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Parse a float of the form `-?digits(.digits)?`
pub fn parse_float(text: &str) -> Option<f64> {
    let s = text.trim();
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };

    let is_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || fraction.is_some_and(|f| !is_digits(f)) {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Format a boolean in the same style as `original` (`1/0`, `yes/no`, `on/off`, `true/false`),
/// keeping upper-case spelling when the original used it.
pub fn format_bool(original: &str, value: bool) -> String {
    let trimmed = original.trim();
    let (t, f) = match trimmed.to_lowercase().as_str() {
        "1" | "0" => ("1", "0"),
        "yes" | "no" => ("yes", "no"),
        "on" | "off" => ("on", "off"),
        _ => ("true", "false"),
    };
    let word = if value { t } else { f };

    if !trimmed.is_empty() && trimmed.chars().all(|c| !c.is_ascii_lowercase()) {
        word.to_uppercase()
    } else if trimmed.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        let mut chars = word.chars();
        chars
            .next()
            .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
            .unwrap_or_default()
    } else {
        word.to_string()
    }
}

/// Format a float compactly: integral values print without decimals, others with up to
/// six decimals and no trailing zeros.
pub fn format_float(value: f64) -> String {
    if (value - value.trunc()).abs() < 1e-12 {
        format!("{}", value.trunc() as i64)
    } else {
        let text = format!("{:.6}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Turn an edited value back into text.
///
/// If the edit is equal to what `original` already classifies as, `original` is returned
/// verbatim so untouched values keep their exact spelling.
pub fn render_edit(original: &str, edited: &ValueKind) -> String {
    if ValueKind::classify(original) == *edited {
        return original.to_string();
    }

    match edited {
        ValueKind::Boolean(b) => format_bool(original, *b),
        ValueKind::Color(color) => color.to_hex_string(),
        ValueKind::Integer(i) => {
            if strip_hex_prefix(original.trim()).is_some() && *i >= 0 {
                format!("0x{:X}", i)
            } else {
                i.to_string()
            }
        }
        ValueKind::Float(f) => format_float(*f),
        ValueKind::Text(s) => s.clone(),
    }
}

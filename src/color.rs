//! Hex color parsing shared by validation, compositing and the GUI

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// RGBA color parsed from `#rgb`, `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    pub const TRANSPARENT: HexColor = HexColor::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS-style hex color. The leading '#' is required.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);

        match hex.len() {
            3 => Some(Self::rgba(nibble(0)?, nibble(1)?, nibble(2)?, 0xFF)),
            6 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, 0xFF)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 0xFF
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HexColor::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex color '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit() {
        assert_eq!(HexColor::parse("#ff69b4"), Some(HexColor::rgba(0xFF, 0x69, 0xB4, 0xFF)));
    }

    #[test]
    fn test_parse_short_form_expands() {
        assert_eq!(HexColor::parse("#f00"), Some(HexColor::rgba(0xFF, 0, 0, 0xFF)));
    }

    #[test]
    fn test_parse_with_alpha() {
        assert_eq!(HexColor::parse("#0000004d"), Some(HexColor::rgba(0, 0, 0, 0x4D)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(HexColor::parse("ffffff"), None);
        assert_eq!(HexColor::parse("#ggg"), None);
        assert_eq!(HexColor::parse("#12345"), None);
        assert_eq!(HexColor::parse("red"), None);
    }

    #[test]
    fn test_display_drops_opaque_alpha() {
        assert_eq!(HexColor::WHITE.to_string(), "#ffffff");
        assert_eq!(HexColor::rgba(0, 0, 0, 0x4D).to_string(), "#0000004d");
    }
}

//! WCAG contrast checks between the dot color and the background.
//!
//! Scanners need dark modules on a light background, or at least enough
//! separation between the two. The ratio computed here is the one WCAG 2.x
//! uses for text legibility; anything under [`LOW_CONTRAST_THRESHOLD`] is
//! flagged so the front end can warn before the user exports an unreadable
//! code.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ratios below this value are reported as low contrast.
pub const LOW_CONTRAST_THRESHOLD: f64 = 4.5;

/// An sRGB color parsed from a `#rgb` or `#rrggbb` hex string. Defaults to
/// black.
///
/// # Example
///
/// ```rust
/// use artqr::contrast::Rgb;
///
/// let orange: Rgb = "#FFA500".parse().unwrap();
/// assert_eq!(orange, Rgb::new(255, 165, 0));
/// assert_eq!(orange.to_string(), "#ffa500");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parses a hex color. The leading `#` is optional and digits are
    /// case-insensitive.
    pub fn from_hex(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidColor(text.to_string());
        let digits = text.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                // #abc is shorthand for #aabbcc
                let mut out = [0u8; 3];
                for (slot, c) in out.iter_mut().zip(digits.chars()) {
                    let v = channel(&c.to_string())?;
                    *slot = v * 16 + v;
                }
                Ok(Rgb::new(out[0], out[1], out[2]))
            }
            6 => Ok(Rgb::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Relative luminance in `[0, 1]`, as defined by WCAG.
    pub fn relative_luminance(self) -> f64 {
        let r = linearize(self.r);
        let g = linearize(self.g);
        let b = linearize(self.b);
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    pub fn to_rgba(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, alpha])
    }
}

fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Rgb::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Contrast ratio between two colors, from 1.0 (identical) to 21.0
/// (black on white). The order of the arguments does not matter.
///
/// # Example
///
/// ```rust
/// use artqr::contrast::{contrast_ratio, Rgb};
///
/// let ratio = contrast_ratio(Rgb::BLACK, Rgb::WHITE);
/// assert!((ratio - 21.0).abs() < 1e-9);
/// ```
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Same as [`contrast_ratio`], for hex strings straight from a color picker.
pub fn contrast_ratio_hex(a: &str, b: &str) -> Result<f64> {
    Ok(contrast_ratio(Rgb::from_hex(a)?, Rgb::from_hex(b)?))
}

/// Outcome of a contrast check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastReport {
    pub ratio: f64,
    pub low_contrast: bool,
}

impl ContrastReport {
    pub fn check(foreground: Rgb, background: Rgb) -> Self {
        let ratio = contrast_ratio(foreground, background);
        ContrastReport {
            ratio,
            low_contrast: ratio < LOW_CONTRAST_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(a: &str, b: &str) -> f64 {
        contrast_ratio_hex(a, b).unwrap()
    }

    #[test]
    fn test_black_on_white_is_maximum() {
        assert!((ratio("#000000", "#ffffff") - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_colors_are_minimum() {
        assert!((ratio("#3366cc", "#3366cc") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_close_grays_are_low_contrast() {
        let report = ContrastReport::check(
            "#777777".parse().unwrap(),
            "#808080".parse().unwrap(),
        );
        assert!(report.ratio < LOW_CONTRAST_THRESHOLD);
        assert!(report.low_contrast);
    }

    #[test]
    fn test_ratio_is_symmetric_and_at_least_one() {
        let colors = [
            "#000000", "#ffffff", "#777777", "#808080", "#ff0000", "#00ff00", "#0000ff",
            "#123456", "#fedcba", "#0a0a0a", "#a5a5a5",
        ];
        for a in colors {
            for b in colors {
                let ab = ratio(a, b);
                let ba = ratio(b, a);
                assert!((ab - ba).abs() < 1e-12, "{a} vs {b}");
                assert!(ab >= 1.0, "{a} vs {b} gave {ab}");
            }
        }
    }

    #[test]
    fn test_known_wcag_values() {
        // Reference values published by the WebAIM contrast checker.
        assert!((ratio("#777777", "#ffffff") - 4.48).abs() < 0.01);
        assert!((ratio("#0000ff", "#ffffff") - 8.59).abs() < 0.01);
        assert!((ratio("#ff0000", "#ffffff") - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_linear_segment_of_gamma_curve() {
        // 10/255 sits below the 0.03928 knee and is scaled linearly.
        let dark = Rgb::new(10, 10, 10).relative_luminance();
        assert!((dark - (10.0 / 255.0) / 12.92).abs() < 1e-12);
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#abc").unwrap(), Rgb::new(0xaa, 0xbb, 0xcc));
        assert_eq!(Rgb::from_hex("ABCDEF").unwrap(), Rgb::new(0xab, 0xcd, 0xef));
        assert_eq!(Rgb::from_hex(" #FFFFFF ").unwrap(), Rgb::WHITE);
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("zzzzzz").is_err());
        assert!(Rgb::from_hex("").is_err());
        assert!(Rgb::from_hex("#+1+2+3").is_err());
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102ff\"");
        let back: Rgb = serde_json::from_str("\"#0102FF\"").unwrap();
        assert_eq!(back, Rgb::new(1, 2, 255));
        assert!(serde_json::from_str::<Rgb>("\"blue\"").is_err());
    }
}

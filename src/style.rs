//! Visual style selection and its translation into renderer options.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contrast::{ContrastReport, Rgb};
use crate::error::Error;

/// Declares a kebab-case style enum with `FromStr`, `Display` and a list of
/// all its variants, so the CLI and the config file accept the same names.
macro_rules! style_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| Error::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

style_enum! {
    /// Shape of the data modules.
    DotType, "dot type" {
        Dots => "dots",
        #[default]
        Rounded => "rounded",
        Classy => "classy",
        ClassyRounded => "classy-rounded",
        Square => "square",
        ExtraRounded => "extra-rounded",
    }
}

style_enum! {
    /// Shape of the outer 7x7 ring of each finder pattern.
    CornerSquareType, "corner square type" {
        Dot => "dot",
        Square => "square",
        #[default]
        ExtraRounded => "extra-rounded",
    }
}

style_enum! {
    /// Shape of the 3x3 center of each finder pattern.
    CornerDotType, "corner dot type" {
        #[default]
        Dot => "dot",
        Square => "square",
    }
}

style_enum! {
    /// Export file format offered by the download button.
    Extension, "file extension" {
        #[default]
        Png => "png",
        Jpeg => "jpeg",
        Webp => "webp",
        Svg => "svg",
    }
}

/// QR error correction level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    /// ~7% of codewords can be restored.
    L,
    /// ~15%.
    M,
    /// ~25%.
    #[default]
    Q,
    /// ~30%. Pick this one when a logo covers the middle of the code.
    H,
}

impl ErrorCorrectionLevel {
    pub fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrectionLevel::L => qrcode::EcLevel::L,
            ErrorCorrectionLevel::M => qrcode::EcLevel::M,
            ErrorCorrectionLevel::Q => qrcode::EcLevel::Q,
            ErrorCorrectionLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrectionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(ErrorCorrectionLevel::L),
            "M" | "MEDIUM" => Ok(ErrorCorrectionLevel::M),
            "Q" | "QUARTILE" => Ok(ErrorCorrectionLevel::Q),
            "H" | "HIGH" => Ok(ErrorCorrectionLevel::H),
            _ => Err(Error::UnknownVariant {
                kind: "error correction level",
                value: s.to_string(),
            }),
        }
    }
}

/// Background fill: a solid color or nothing at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Background {
    Color(Rgb),
    Transparent,
}

impl Background {
    /// The color the contrast check compares against. A transparent code is
    /// assumed to be printed on white.
    pub fn effective(self) -> Rgb {
        match self {
            Background::Color(color) => color,
            Background::Transparent => Rgb::WHITE,
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Background::Color(Rgb::WHITE)
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Color(color) => color.fmt(f),
            Background::Transparent => f.write_str("transparent"),
        }
    }
}

impl FromStr for Background {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.trim().eq_ignore_ascii_case("transparent") {
            Ok(Background::Transparent)
        } else {
            Rgb::from_hex(s).map(Background::Color)
        }
    }
}

impl TryFrom<String> for Background {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        value.parse()
    }
}

impl From<Background> for String {
    fn from(value: Background) -> Self {
        value.to_string()
    }
}

/// Everything the user picked in the styling panel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSpec {
    pub dot_color: Rgb,
    pub background: Background,
    pub dot_type: DotType,
    pub corner_square_type: CornerSquareType,
    pub corner_dot_type: CornerDotType,
    /// Logo as a `data:` URL, see [`crate::logo`].
    pub logo: Option<String>,
    pub error_correction: ErrorCorrectionLevel,
    /// Caption drawn under the code in SVG exports.
    pub label: Option<String>,
}

impl StyleSpec {
    pub fn contrast(&self) -> ContrastReport {
        ContrastReport::check(self.dot_color, self.background.effective())
    }
}

/// Canvas size and logo padding, shared by every render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub size: u32,
    pub logo_margin: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            size: 300,
            logo_margin: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeOptions<T> {
    pub color: Rgb,
    #[serde(rename = "type")]
    pub kind: T,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundOptions {
    pub color: Background,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    pub cross_origin: String,
    pub margin: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOptions {
    pub error_correction_level: ErrorCorrectionLevel,
}

/// The option object handed to a [`crate::render::RenderSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub dots_options: ShapeOptions<DotType>,
    pub corners_square_options: ShapeOptions<CornerSquareType>,
    pub corners_dot_options: ShapeOptions<CornerDotType>,
    pub background_options: BackgroundOptions,
    pub image_options: ImageOptions,
    pub qr_options: QrOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Renderer options plus the contrast verdict for the chosen colors.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub options: RenderOptions,
    pub contrast: ContrastReport,
}

/// Combines a payload with a style into the renderer's option object.
///
/// Corner squares and corner dots are drawn in the dot color.
///
/// # Example
///
/// ```rust
/// use artqr::style::{resolve, Layout, StyleSpec};
///
/// let resolved = resolve("https://example.com", &StyleSpec::default(), Layout::default());
/// assert_eq!(resolved.options.data, "https://example.com");
/// assert!(!resolved.contrast.low_contrast);
/// ```
pub fn resolve(payload: &str, style: &StyleSpec, layout: Layout) -> Resolution {
    let contrast = style.contrast();
    if contrast.low_contrast {
        log::warn!(
            "low contrast between {} and {} (ratio {:.2})",
            style.dot_color,
            style.background.effective(),
            contrast.ratio
        );
    }
    let options = RenderOptions {
        width: layout.size,
        height: layout.size,
        data: payload.to_string(),
        image: style.logo.clone(),
        dots_options: ShapeOptions {
            color: style.dot_color,
            kind: style.dot_type,
        },
        corners_square_options: ShapeOptions {
            color: style.dot_color,
            kind: style.corner_square_type,
        },
        corners_dot_options: ShapeOptions {
            color: style.dot_color,
            kind: style.corner_dot_type,
        },
        background_options: BackgroundOptions {
            color: style.background,
        },
        image_options: ImageOptions {
            cross_origin: "anonymous".to_string(),
            margin: layout.logo_margin,
        },
        qr_options: QrOptions {
            error_correction_level: style.error_correction,
        },
        label: style.label.clone().filter(|l| !l.trim().is_empty()),
    };
    log::debug!("resolved render options for {} byte payload", payload.len());
    Resolution { options, contrast }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_form() {
        let style = StyleSpec::default();
        assert_eq!(style.dot_color, Rgb::BLACK);
        assert_eq!(style.background, Background::Color(Rgb::WHITE));
        assert_eq!(style.dot_type, DotType::Rounded);
        assert_eq!(style.corner_square_type, CornerSquareType::ExtraRounded);
        assert_eq!(style.corner_dot_type, CornerDotType::Dot);
        assert_eq!(style.error_correction, ErrorCorrectionLevel::Q);
    }

    #[test]
    fn test_corners_inherit_dot_color() {
        let style = StyleSpec {
            dot_color: Rgb::new(0x25, 0x63, 0xeb),
            ..StyleSpec::default()
        };
        let options = resolve("x", &style, Layout::default()).options;
        assert_eq!(options.corners_square_options.color, style.dot_color);
        assert_eq!(options.corners_dot_options.color, style.dot_color);
    }

    #[test]
    fn test_transparent_background_is_checked_against_white() {
        let style = StyleSpec {
            dot_color: Rgb::new(0xee, 0xee, 0xee),
            background: Background::Transparent,
            ..StyleSpec::default()
        };
        let resolved = resolve("x", &style, Layout::default());
        assert!(resolved.contrast.low_contrast);
        assert_eq!(resolved.options.background_options.color, Background::Transparent);
    }

    #[test]
    fn test_options_serialize_like_the_renderer_expects() {
        let style = StyleSpec {
            dot_type: DotType::ClassyRounded,
            label: Some("Scan me".into()),
            ..StyleSpec::default()
        };
        let options = resolve("https://example.com", &style, Layout::default()).options;
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["width"], 300);
        assert_eq!(json["dotsOptions"]["type"], "classy-rounded");
        assert_eq!(json["dotsOptions"]["color"], "#000000");
        assert_eq!(json["cornersSquareOptions"]["type"], "extra-rounded");
        assert_eq!(json["cornersDotOptions"]["type"], "dot");
        assert_eq!(json["backgroundOptions"]["color"], "#ffffff");
        assert_eq!(json["imageOptions"]["crossOrigin"], "anonymous");
        assert_eq!(json["imageOptions"]["margin"], 10);
        assert_eq!(json["qrOptions"]["errorCorrectionLevel"], "Q");
        assert_eq!(json["label"], "Scan me");
        assert!(json.get("image").is_none());
    }

    #[test]
    fn test_blank_label_is_dropped() {
        let style = StyleSpec {
            label: Some("   ".into()),
            ..StyleSpec::default()
        };
        assert_eq!(resolve("x", &style, Layout::default()).options.label, None);
    }

    #[test]
    fn test_style_names_parse() {
        assert_eq!("classy_rounded".parse::<DotType>().unwrap(), DotType::ClassyRounded);
        assert_eq!("Extra-Rounded".parse::<CornerSquareType>().unwrap(), CornerSquareType::ExtraRounded);
        assert_eq!("square".parse::<CornerDotType>().unwrap(), CornerDotType::Square);
        assert_eq!("SVG".parse::<Extension>().unwrap(), Extension::Svg);
        assert_eq!("high".parse::<ErrorCorrectionLevel>().unwrap(), ErrorCorrectionLevel::H);
        assert!("hexagon".parse::<DotType>().is_err());
        assert!("extra-rounded".parse::<CornerDotType>().is_err());
        assert!("gif".parse::<Extension>().is_err());
    }

    #[test]
    fn test_background_parsing() {
        assert_eq!("Transparent".parse::<Background>().unwrap(), Background::Transparent);
        assert_eq!("#000".parse::<Background>().unwrap(), Background::Color(Rgb::BLACK));
        assert!("blue".parse::<Background>().is_err());
    }

    #[test]
    fn test_style_spec_from_partial_json() {
        let style: StyleSpec =
            serde_json::from_str(r##"{"dot_color":"#ff0000","background":"transparent"}"##).unwrap();
        assert_eq!(style.dot_color, Rgb::new(255, 0, 0));
        assert_eq!(style.background, Background::Transparent);
        assert_eq!(style.dot_type, DotType::Rounded);
    }
}

use thiserror::Error;

/// Errors produced while building, styling or exporting a QR code.
#[derive(Error, Debug)]
pub enum Error {
    /// A color string that is neither `#rgb` nor `#rrggbb`.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// A style or format name that none of the known variants match.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// What was being parsed (dot type, extension, ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Rendering was requested for an empty payload.
    #[error("nothing to encode: the payload is empty")]
    EmptyPayload,

    /// The payload does not fit in a QR symbol at the requested level.
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The uploaded logo is not an image the decoder recognizes.
    #[error("unsupported logo file: {0}")]
    UnsupportedLogo(String),

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

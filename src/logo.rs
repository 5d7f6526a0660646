//! Logo upload: image files in, `data:` URLs out.
//!
//! The style keeps the logo as a `data:<mime>;base64,...` string so it can be
//! embedded as-is into SVG exports and serialized with the render options.
//! Raster exports decode it back with [`decode_data_url`].

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;

use crate::error::{Error, Result};

/// Reads an image file and returns it as a `data:` URL.
///
/// Only the content is inspected, not the file extension; anything the
/// decoder does not recognize as an image is rejected.
///
/// # Example
///
/// ```no_run
/// use artqr::logo::load_logo;
///
/// let data_url = load_logo("assets/logo.png").unwrap();
/// assert!(data_url.starts_with("data:image/png;base64,"));
/// ```
pub fn load_logo(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let data_url = to_data_url(&bytes)
        .map_err(|_| Error::UnsupportedLogo(path.display().to_string()))?;
    log::info!("loaded logo {} ({} bytes)", path.display(), bytes.len());
    Ok(data_url)
}

/// Wraps raw image bytes into a `data:` URL, sniffing the MIME type.
pub fn to_data_url(bytes: &[u8]) -> Result<String> {
    let format = image::guess_format(bytes)
        .map_err(|_| Error::UnsupportedLogo("unrecognized image data".to_string()))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Decodes a base64 `data:` URL produced by [`to_data_url`].
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage> {
    let invalid = |why: &str| Error::InvalidDataUrl(why.to_string());
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| invalid("missing data: scheme"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;
    if !meta.ends_with(";base64") {
        return Err(invalid("only base64 data URLs are supported"));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&e.to_string()))?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(4, 3, Rgba([255u8, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_png_round_trips_through_data_url() {
        let url = to_data_url(&png_bytes()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        let img = decode_data_url(&url).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    #[test]
    fn test_non_image_is_rejected() {
        assert!(matches!(
            to_data_url(b"plain text, not a picture"),
            Err(Error::UnsupportedLogo(_))
        ));
    }

    #[test]
    fn test_load_logo_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("logo.bin");
        std::fs::write(&good, png_bytes()).unwrap();
        assert!(load_logo(&good).unwrap().starts_with("data:image/png;"));

        let bad = dir.path().join("notes.png");
        std::fs::write(&bad, "hello").unwrap();
        assert!(matches!(load_logo(&bad), Err(Error::UnsupportedLogo(_))));

        assert!(matches!(load_logo(dir.path().join("missing.png")), Err(Error::Io(_))));
    }

    #[test]
    fn test_malformed_data_urls() {
        assert!(matches!(decode_data_url("image/png;base64,AAAA"), Err(Error::InvalidDataUrl(_))));
        assert!(matches!(decode_data_url("data:image/png;base64"), Err(Error::InvalidDataUrl(_))));
        assert!(matches!(decode_data_url("data:text/plain,hello"), Err(Error::InvalidDataUrl(_))));
        assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(Error::InvalidDataUrl(_))));
    }
}

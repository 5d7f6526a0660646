//! Rendering and export of styled QR codes.
//!
//! The module matrix comes from the `qrcode` crate; this module only decides
//! how each dark module looks. Every shape is described once as a [`Figure`]
//! in module coordinates, then either sampled per pixel (PNG, JPEG, WEBP) or
//! written as an SVG path, so both outputs always agree.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ab_glyph::{point, Font, FontRef, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb as Pixel, RgbImage, Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::error::{Error, Result};
use crate::logo;
use crate::style::{
    Background, CornerDotType, CornerSquareType, DotType, ErrorCorrectionLevel, Extension,
    RenderOptions,
};

/// Light modules around the symbol, in modules.
pub const QUIET_ZONE: usize = 4;

/// Largest share of the symbol width a logo may cover.
pub const LOGO_SIZE_RATIO: f64 = 0.4;

/// Side of a finder pattern, in modules.
const FINDER: usize = 7;

/// Height of the label band under the symbol, as a share of the symbol side.
const LABEL_BAND: f64 = 0.15;

/// Font used to draw labels into raster exports.
const LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Default export directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Anything that can show and export a QR code described by [`RenderOptions`].
pub trait RenderSink {
    /// Replaces the options the next render uses.
    fn update(&mut self, options: RenderOptions);

    /// Draws the code onto a text display.
    fn append(&self, out: &mut dyn Write) -> Result<()>;

    /// Encodes the code into the bytes of an image file.
    fn encode(&self, extension: Extension) -> Result<Vec<u8>>;

    /// Saves the code as `<directory>/<filename>.<extension>` and returns the
    /// path written.
    ///
    /// # Arguments
    ///
    /// * `directory` - Optional. Created if missing; defaults to `generated`.
    /// * `filename` - Optional. File stem; defaults to a timestamp.
    fn download(
        &self,
        extension: Extension,
        directory: Option<&Path>,
        filename: Option<&str>,
    ) -> Result<PathBuf> {
        let bytes = self.encode(extension)?;
        let directory = directory.unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR));
        let filename = match filename {
            Some(name) => name.to_string(),
            None => {
                let since_the_epoch = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                format!("qr-{}", since_the_epoch.as_millis())
            }
        };
        if !directory.exists() {
            fs::create_dir_all(directory)?;
        }
        let path = directory.join(format!("{filename}.{extension}"));
        fs::write(&path, bytes)?;
        log::info!("saved {}", path.display());
        Ok(path)
    }
}

/// The dark/light module grid of an encoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    width: usize,
    modules: Vec<bool>,
}

impl Matrix {
    pub fn encode(data: &str, level: ErrorCorrectionLevel) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyPayload);
        }
        let code = QrCode::with_error_correction_level(data.as_bytes(), level.to_ec_level())?;
        let width = code.width();
        let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        Ok(Matrix { width, modules })
    }

    /// Width and height in modules, without the quiet zone.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the color of the module at the given coordinates; anything
    /// outside the symbol is light.
    pub fn get(&self, x: i64, y: i64) -> bool {
        let w = self.width as i64;
        if x < 0 || y < 0 || x >= w || y >= w {
            return false;
        }
        self.modules[(y * w + x) as usize]
    }

    /// Whether the module belongs to one of the three finder patterns.
    pub fn in_finder(&self, x: usize, y: usize) -> bool {
        let far = self.width - FINDER;
        (x < FINDER && y < FINDER) || (x >= far && y < FINDER) || (x < FINDER && y >= far)
    }
}

/// A filled shape in module coordinates (quiet zone included).
#[derive(Clone, Debug, PartialEq)]
pub enum Figure {
    /// Rectangle with per-corner radii: top-left, top-right, bottom-right,
    /// bottom-left.
    RoundRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        radii: [f64; 4],
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    /// `outer` with `inner` cut out.
    Ring {
        outer: Box<Figure>,
        inner: Box<Figure>,
    },
}

impl Figure {
    fn square(x: f64, y: f64, side: f64, radius: f64) -> Figure {
        Figure::RoundRect {
            x,
            y,
            w: side,
            h: side,
            radii: [radius; 4],
        }
    }

    pub fn contains(&self, u: f64, v: f64) -> bool {
        match self {
            Figure::RoundRect { x, y, w, h, radii } => {
                let (x, y, w, h) = (*x, *y, *w, *h);
                if u < x || v < y || u >= x + w || v >= y + h {
                    return false;
                }
                let [tl, tr, br, bl] = *radii;
                let corners = [
                    (tl, x + tl, y + tl, u < x + tl && v < y + tl),
                    (tr, x + w - tr, y + tr, u > x + w - tr && v < y + tr),
                    (br, x + w - br, y + h - br, u > x + w - br && v > y + h - br),
                    (bl, x + bl, y + h - bl, u < x + bl && v > y + h - bl),
                ];
                for (r, cx, cy, in_corner) in corners {
                    if r > 0.0 && in_corner {
                        return (u - cx).powi(2) + (v - cy).powi(2) <= r * r;
                    }
                }
                true
            }
            Figure::Circle { cx, cy, r } => (u - cx).powi(2) + (v - cy).powi(2) <= r * r,
            Figure::Ring { outer, inner } => outer.contains(u, v) && !inner.contains(u, v),
        }
    }

    /// SVG path data. Rings rely on the `evenodd` fill rule.
    pub fn path(&self) -> String {
        match self {
            Figure::RoundRect { x, y, w, h, radii } if radii.iter().all(|r| *r == 0.0) => {
                format!("M{},{}h{}v{}h-{}z", num(*x), num(*y), num(*w), num(*h), num(*w))
            }
            Figure::RoundRect { x, y, w, h, radii } => {
                let (x, y, w, h) = (*x, *y, *w, *h);
                let [tl, tr, br, bl] = *radii;
                format!(
                    "M{},{}H{}A{r1},{r1} 0 0 1 {},{}V{}A{r2},{r2} 0 0 1 {},{}H{}A{r3},{r3} 0 0 1 {},{}V{}A{r0},{r0} 0 0 1 {},{}z",
                    num(x + tl), num(y),
                    num(x + w - tr),
                    num(x + w), num(y + tr),
                    num(y + h - br),
                    num(x + w - br), num(y + h),
                    num(x + bl),
                    num(x), num(y + h - bl),
                    num(y + tl),
                    num(x + tl), num(y),
                    r0 = num(tl), r1 = num(tr), r2 = num(br), r3 = num(bl),
                )
            }
            Figure::Circle { cx, cy, r } => format!(
                "M{},{}a{r},{r} 0 1 0 {},0a{r},{r} 0 1 0 -{},0z",
                num(cx - r),
                num(*cy),
                num(2.0 * r),
                num(2.0 * r),
                r = num(*r),
            ),
            Figure::Ring { outer, inner } => format!("{} {}", outer.path(), inner.path()),
        }
    }
}

/// Formats a coordinate with at most three decimals and no trailing zeros.
fn num(value: f64) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Radii for a data module given which of its corners touch no dark
/// neighbor.
fn module_radii(dot: DotType, exposed: [bool; 4]) -> [f64; 4] {
    let pick = |i: usize, r: f64| if exposed[i] { r } else { 0.0 };
    match dot {
        DotType::Square | DotType::Dots => [0.0; 4],
        DotType::Rounded => [0, 1, 2, 3].map(|i| pick(i, 0.35)),
        DotType::ExtraRounded => [0, 1, 2, 3].map(|i| pick(i, 0.5)),
        DotType::Classy => [pick(0, 0.5), 0.0, pick(2, 0.5), 0.0],
        DotType::ClassyRounded => [pick(0, 0.5), pick(1, 0.25), pick(2, 0.5), pick(3, 0.25)],
    }
}

fn finder_ring(kind: CornerSquareType, ox: f64, oy: f64) -> Figure {
    let c = FINDER as f64 / 2.0;
    let (outer, inner) = match kind {
        CornerSquareType::Square => (
            Figure::square(ox, oy, 7.0, 0.0),
            Figure::square(ox + 1.0, oy + 1.0, 5.0, 0.0),
        ),
        CornerSquareType::ExtraRounded => (
            Figure::square(ox, oy, 7.0, 2.5),
            Figure::square(ox + 1.0, oy + 1.0, 5.0, 1.5),
        ),
        CornerSquareType::Dot => (
            Figure::Circle { cx: ox + c, cy: oy + c, r: 3.5 },
            Figure::Circle { cx: ox + c, cy: oy + c, r: 2.5 },
        ),
    };
    Figure::Ring {
        outer: Box::new(outer),
        inner: Box::new(inner),
    }
}

fn finder_dot(kind: CornerDotType, ox: f64, oy: f64) -> Figure {
    match kind {
        CornerDotType::Square => Figure::square(ox + 2.0, oy + 2.0, 3.0, 0.0),
        CornerDotType::Dot => Figure::Circle {
            cx: ox + 3.5,
            cy: oy + 3.5,
            r: 1.5,
        },
    }
}

/// Where the logo goes, in module coordinates.
struct LogoPlacement {
    image: DynamicImage,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Everything needed to draw one code: figures per module, finder figures,
/// and the logo.
struct Scene {
    width: usize,
    pixels: u32,
    cell: f64,
    modules: Vec<Option<Figure>>,
    finders: Vec<Figure>,
    logo: Option<LogoPlacement>,
}

impl Scene {
    fn build(options: &RenderOptions, matrix: &Matrix) -> Scene {
        let width = matrix.width();
        let dim = width + 2 * QUIET_ZONE;
        let pixels = options.width.max(dim as u32);
        let cell = f64::from(pixels) / dim as f64;
        let qz = QUIET_ZONE as f64;

        let logo = options.image.as_deref().and_then(|data_url| {
            match logo::decode_data_url(data_url) {
                Ok(image) => Some(place_logo(image, width)),
                Err(e) => {
                    log::warn!("ignoring logo: {e}");
                    None
                }
            }
        });
        let margin = f64::from(options.image_options.margin) / cell;
        let hidden = |x: usize, y: usize| {
            logo.as_ref().map_or(false, |l| {
                let (mx, my) = (x as f64 + qz, y as f64 + qz);
                mx + 1.0 > l.x - margin
                    && mx < l.x + l.w + margin
                    && my + 1.0 > l.y - margin
                    && my < l.y + l.h + margin
            })
        };
        let visible = |x: i64, y: i64| {
            matrix.get(x, y)
                && !matrix.in_finder(x as usize, y as usize)
                && !hidden(x as usize, y as usize)
        };

        let dot = options.dots_options.kind;
        let mut modules = Vec::with_capacity(width * width);
        for y in 0..width {
            for x in 0..width {
                let (xi, yi) = (x as i64, y as i64);
                if !visible(xi, yi) {
                    modules.push(None);
                    continue;
                }
                let (fx, fy) = (x as f64 + qz, y as f64 + qz);
                let figure = if dot == DotType::Dots {
                    Figure::Circle {
                        cx: fx + 0.5,
                        cy: fy + 0.5,
                        r: 0.5,
                    }
                } else {
                    let top = visible(xi, yi - 1);
                    let right = visible(xi + 1, yi);
                    let bottom = visible(xi, yi + 1);
                    let left = visible(xi - 1, yi);
                    let exposed = [
                        !top && !left,
                        !top && !right,
                        !bottom && !right,
                        !bottom && !left,
                    ];
                    Figure::RoundRect {
                        x: fx,
                        y: fy,
                        w: 1.0,
                        h: 1.0,
                        radii: module_radii(dot, exposed),
                    }
                };
                modules.push(Some(figure));
            }
        }

        let far = (width - FINDER) as f64 + qz;
        let mut finders = Vec::with_capacity(6);
        for (ox, oy) in [(qz, qz), (far, qz), (qz, far)] {
            finders.push(finder_ring(options.corners_square_options.kind, ox, oy));
            finders.push(finder_dot(options.corners_dot_options.kind, ox, oy));
        }

        Scene {
            width,
            pixels,
            cell,
            modules,
            finders,
            logo,
        }
    }

    fn dim(&self) -> f64 {
        (self.width + 2 * QUIET_ZONE) as f64
    }

    /// Whether the point (module coordinates) is painted in the dot color.
    fn covers(&self, u: f64, v: f64) -> bool {
        let (mx, my) = (u.floor() as i64 - QUIET_ZONE as i64, v.floor() as i64 - QUIET_ZONE as i64);
        let w = self.width as i64;
        if mx < 0 || my < 0 || mx >= w || my >= w {
            return false;
        }
        if self.finders.iter().any(|f| f.contains(u, v)) {
            return true;
        }
        self.modules[(my * w + mx) as usize]
            .as_ref()
            .map_or(false, |f| f.contains(u, v))
    }

    fn rasterize(&self, options: &RenderOptions) -> RgbaImage {
        let background = match options.background_options.color {
            Background::Color(color) => color.to_rgba(255),
            Background::Transparent => Rgba([255, 255, 255, 0]),
        };
        let foreground = options.dots_options.color.to_rgba(255);
        let band = match options.label {
            Some(_) => (f64::from(self.pixels) * LABEL_BAND).round() as u32,
            None => 0,
        };
        let mut img = ImageBuffer::from_pixel(self.pixels, self.pixels + band, background);

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let u = (f64::from(x) + 0.5) / self.cell;
            let v = (f64::from(y) + 0.5) / self.cell;
            if self.covers(u, v) {
                *pixel = foreground;
            }
        }

        if let Some(logo) = &self.logo {
            let w = ((logo.w * self.cell).round() as u32).max(1);
            let h = ((logo.h * self.cell).round() as u32).max(1);
            let scaled = imageops::resize(&logo.image.to_rgba8(), w, h, FilterType::Triangle);
            let x = (logo.x * self.cell).round() as i64;
            let y = (logo.y * self.cell).round() as i64;
            imageops::overlay(&mut img, &scaled, x, y);
        }

        if let Some(text) = options.label.as_deref() {
            draw_label(&mut img, text, foreground, self.pixels);
        }
        img
    }

    fn to_svg(&self, options: &RenderOptions) -> String {
        let dim = self.dim();
        let label = options.label.as_deref();
        let band = if label.is_some() { dim * LABEL_BAND } else { 0.0 };
        let height_px = (f64::from(self.pixels) * (dim + band) / dim).round();

        let mut result = String::new();
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
        result += &format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\" stroke=\"none\">\n",
            self.pixels,
            height_px,
            num(dim),
            num(dim + band)
        );
        if let Background::Color(color) = options.background_options.color {
            result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{color}\"/>\n");
        }

        let paths: Vec<String> = self
            .finders
            .iter()
            .chain(self.modules.iter().flatten())
            .map(Figure::path)
            .collect();
        result += &format!(
            "\t<path fill-rule=\"evenodd\" d=\"{}\" fill=\"{}\"/>\n",
            paths.join(" "),
            options.dots_options.color
        );

        if let (Some(logo), Some(href)) = (&self.logo, options.image.as_deref()) {
            result += &format!(
                "\t<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMidYMid meet\" href=\"{}\"/>\n",
                num(logo.x),
                num(logo.y),
                num(logo.w),
                num(logo.h),
                escape_xml(href)
            );
        }
        if let Some(text) = label {
            result += &format!(
                "\t<text x=\"{}\" y=\"{}\" font-family=\"sans-serif\" font-size=\"{}\" text-anchor=\"middle\" fill=\"{}\">{}</text>\n",
                num(dim / 2.0),
                num(dim + band * 0.55),
                num(band * 0.6),
                options.dots_options.color,
                escape_xml(text)
            );
        }
        result += "</svg>\n";
        result
    }
}

fn place_logo(image: DynamicImage, width: usize) -> LogoPlacement {
    let max = width as f64 * LOGO_SIZE_RATIO;
    let aspect = f64::from(image.width().max(1)) / f64::from(image.height().max(1));
    let (w, h) = if aspect >= 1.0 {
        (max, max / aspect)
    } else {
        (max * aspect, max)
    };
    let center = QUIET_ZONE as f64 + width as f64 / 2.0;
    LogoPlacement {
        image,
        x: center - w / 2.0,
        y: center - h / 2.0,
        w,
        h,
    }
}

/// Draws `text` centered in the band between `top` and the bottom edge,
/// baseline and font size matching the SVG `<text>` element.
fn draw_label(img: &mut RgbaImage, text: &str, color: Rgba<u8>, top: u32) {
    let font = match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => font,
        Err(e) => {
            log::warn!("label font unusable, skipping label: {e}");
            return;
        }
    };
    let band = img.height().saturating_sub(top) as f32;
    let scale = PxScale::from(band * 0.6);
    let scaled = font.as_scaled(scale);

    let mut caret = 0.0f32;
    let mut previous = None;
    let mut glyphs = Vec::with_capacity(text.len());
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        glyphs.push((id, caret));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let left = (img.width() as f32 - caret) / 2.0;
    let baseline = top as f32 + band * 0.55;
    let (width, height) = (img.width() as i32, img.height() as i32);
    for (id, offset) in glyphs {
        let glyph = id.with_scale_and_position(scale, point(left + offset, baseline));
        let Some(outline) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outline.px_bounds();
        outline.draw(|x, y, coverage| {
            let px = bounds.min.x as i32 + x as i32;
            let py = bounds.min.y as i32 + y as i32;
            if px < 0 || py < top as i32 || px >= width || py >= height {
                return;
            }
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            let blend = |src: u8, dst: u8| {
                (f32::from(src) * coverage + f32::from(dst) * (1.0 - coverage)).round() as u8
            };
            let Rgba([r, g, b, a]) = *pixel;
            *pixel = Rgba([
                blend(color[0], r),
                blend(color[1], g),
                blend(color[2], b),
                blend(color[3], a),
            ]);
        });
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// JPEG has no alpha channel: blend everything onto white.
fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8;
        Pixel([blend(r), blend(g), blend(b)])
    })
}

/// [`RenderSink`] that draws dot and corner styles, logos and labels on top
/// of the `qrcode` crate's module matrix.
///
/// # Example
///
/// ```rust
/// use artqr::render::{QrStylingSink, RenderSink};
/// use artqr::style::{resolve, Extension, Layout, StyleSpec};
///
/// let options = resolve("https://example.com", &StyleSpec::default(), Layout::default()).options;
/// let sink = QrStylingSink::new(options);
/// let svg = sink.encode(Extension::Svg).unwrap();
/// assert!(svg.starts_with(b"<?xml"));
/// ```
#[derive(Clone, Debug)]
pub struct QrStylingSink {
    options: RenderOptions,
}

impl QrStylingSink {
    pub fn new(options: RenderOptions) -> Self {
        QrStylingSink { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn matrix(&self) -> Result<Matrix> {
        Matrix::encode(
            &self.options.data,
            self.options.qr_options.error_correction_level,
        )
    }

    /// Renders the code as RGBA pixels.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let matrix = self.matrix()?;
        Ok(Scene::build(&self.options, &matrix).rasterize(&self.options))
    }

    pub fn to_svg_string(&self) -> Result<String> {
        let matrix = self.matrix()?;
        Ok(Scene::build(&self.options, &matrix).to_svg(&self.options))
    }
}

impl RenderSink for QrStylingSink {
    fn update(&mut self, options: RenderOptions) {
        self.options = options;
    }

    fn append(&self, out: &mut dyn Write) -> Result<()> {
        let matrix = self.matrix()?;
        let border = QUIET_ZONE as i64;
        let size = matrix.width() as i64;
        for y in -border..size + border {
            let mut line = String::new();
            for x in -border..size + border {
                let c = if matrix.get(x, y) { '█' } else { ' ' };
                line.push(c);
                line.push(c);
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn encode(&self, extension: Extension) -> Result<Vec<u8>> {
        let (img, format) = match extension {
            Extension::Svg => return Ok(self.to_svg_string()?.into_bytes()),
            Extension::Png => (DynamicImage::ImageRgba8(self.to_image()?), ImageFormat::Png),
            Extension::Webp => (DynamicImage::ImageRgba8(self.to_image()?), ImageFormat::WebP),
            Extension::Jpeg => (
                DynamicImage::ImageRgb8(flatten_on_white(&self.to_image()?)),
                ImageFormat::Jpeg,
            ),
        };
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format)?;
        log::debug!("encoded {} bytes of {}", bytes.len(), extension);
        Ok(bytes)
    }
}

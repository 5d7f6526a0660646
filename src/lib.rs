//! # artqr
//!
//! A Rust library for building styled QR codes and the redirect page that goes
//! with them.
//!
//! `artqr` turns form input into QR payloads (links, Wi-Fi networks, contact
//! cards, emails), combines them with a visual style into renderer options,
//! warns about color pairs scanners struggle with, and exports the result as
//! PNG, JPEG, WEBP or SVG. The companion redirect page shows a short progress
//! animation before forwarding a scan to its final destination.
//!
//! ## Features
//!
//! - Encode URLs (optionally routed through the redirect page), `WIFI:`
//!   configs, vCard 3.0 contacts and `mailto:` links.
//! - Style dots, finder corners, background, logo and label.
//! - WCAG contrast ratio check between the dot and background colors.
//! - Export to PNG, JPEG, WEBP and SVG, or print to the terminal.
//! - Cancellable redirect page timer.
//!
//! ## Example
//!
//! Build a Wi-Fi code and save it as SVG:
//!
//! ```rust,no_run
//! use artqr::content::{ContentKind, Encryption};
//! use artqr::render::{QrStylingSink, RenderSink};
//! use artqr::session::{FieldUpdate, Session};
//! use artqr::style::{Extension, Layout, StyleSpec};
//!
//! let mut session = Session::new("https://qr.example.org", StyleSpec::default(), Layout::default());
//! session.apply(FieldUpdate::Kind(ContentKind::Wifi));
//! session.apply(FieldUpdate::WifiSsid("Home".into()));
//! session.apply(FieldUpdate::WifiPassword("pass123".into()));
//! session.apply(FieldUpdate::WifiEncryption(Encryption::Wpa));
//!
//! let resolved = session.resolve();
//! let sink = QrStylingSink::new(resolved.options);
//! sink.download(Extension::Svg, None, Some("wifi")).expect("Failed to save image");
//! ```
//!
//! ## Modules
//!
//! - [`content`]: Payload builders for each content type.
//! - [`contrast`]: Hex colors and WCAG contrast ratios.
//! - [`style`]: Style selection and renderer options.
//! - [`render`]: Raster/SVG rendering and export.
//! - [`logo`]: Logo files to `data:` URLs.
//! - [`session`]: Form state and field updates.
//! - [`redirect`]: The redirect page state machine and its timer.
//! - [`config`]: TOML configuration.

pub mod config;
pub mod content;
pub mod contrast;
pub mod error;
pub mod logo;
pub mod redirect;
pub mod render;
pub mod session;
pub mod style;

pub use error::{Error, Result};

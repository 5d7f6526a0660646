//! TOML configuration: page origin, output defaults and the starting style.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```toml
//! [app]
//! origin = "https://qr.example.org"
//!
//! [render]
//! size = 600
//! format = "svg"
//!
//! [style]
//! dot_color = "#2563eb"
//! dot_type = "classy-rounded"
//! error_correction = "H"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::redirect::HOME_ROUTE;
use crate::render::DEFAULT_OUTPUT_DIR;
use crate::style::{Extension, Layout, StyleSpec};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub render: RenderConfig,
    pub style: StyleSpec,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Origin the redirect page is served from; used for preload links.
    pub origin: String,
    /// Where the redirect page sends visitors that arrive without a target.
    pub home_route: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            origin: "http://localhost:3000".to_string(),
            home_route: HOME_ROUTE.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width and height of exported images, in pixels.
    pub size: u32,
    /// Clear space around the logo, in pixels.
    pub logo_margin: u32,
    pub output_dir: PathBuf,
    pub format: Extension,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let layout = Layout::default();
        RenderConfig {
            size: layout.size,
            logo_margin: layout.logo_margin,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: Extension::default(),
        }
    }
}

impl RenderConfig {
    pub fn layout(&self) -> Layout {
        Layout {
            size: self.size,
            logo_margin: self.logo_margin,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Absolute URL of the home route.
    pub fn home_url(&self) -> String {
        let origin = self.app.origin.trim_end_matches('/');
        if self.app.home_route.starts_with('/') {
            format!("{origin}{}", self.app.home_route)
        } else {
            format!("{origin}/{}", self.app.home_route)
        }
    }
}

/// Reads and parses a config file.
///
/// # Example
///
/// ```no_run
/// use artqr::config::load_config;
///
/// let config = load_config("artqr.toml").unwrap();
/// println!("serving from {}", config.app.origin);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let config = Config::from_toml(&text)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contrast::Rgb;
    use crate::error::Error;
    use crate::style::{Background, DotType, ErrorCorrectionLevel};

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let config = Config::from_toml(
            r##"
            [app]
            origin = "https://app.test/"

            [render]
            size = 600
            format = "svg"

            [style]
            dot_color = "#2563eb"
            background = "transparent"
            dot_type = "classy-rounded"
            error_correction = "H"
            "##,
        )
        .unwrap();
        assert_eq!(config.app.origin, "https://app.test/");
        assert_eq!(config.app.home_route, "/");
        assert_eq!(config.render.size, 600);
        assert_eq!(config.render.logo_margin, 10);
        assert_eq!(config.render.format, Extension::Svg);
        assert_eq!(config.style.dot_color, Rgb::new(0x25, 0x63, 0xeb));
        assert_eq!(config.style.background, Background::Transparent);
        assert_eq!(config.style.dot_type, DotType::ClassyRounded);
        assert_eq!(config.style.error_correction, ErrorCorrectionLevel::H);
        assert_eq!(config.home_url(), "https://app.test/");
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        assert!(matches!(
            Config::from_toml("[style]\ndot_color = \"purple\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[render]\nformat = \"gif\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artqr.toml");
        std::fs::write(&path, "[app]\nhome_route = \"start\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.home_url(), "http://localhost:3000/start");
        assert!(matches!(load_config(dir.path().join("nope.toml")), Err(Error::Io(_))));
    }
}

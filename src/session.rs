//! Form state for one editing session.
//!
//! The session is the adapter between form controls and the pure core: every
//! control dispatches a [`FieldUpdate`], and the current payload and render
//! options are recomputed from scratch on demand. Each content type keeps its
//! own draft, so switching types and back restores what was typed.

use crate::content::{ContentKind, ContentSpec, Email, Encryption, UrlOptions, VCard, Wifi};
use crate::contrast::Rgb;
use crate::style::{
    resolve, Background, CornerDotType, CornerSquareType, DotType, ErrorCorrectionLevel,
    Extension, Layout, Resolution, StyleSpec,
};

/// URL shown when the form first opens.
pub const DEFAULT_URL: &str = "https://example.com";

/// One change coming from a form control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    Kind(ContentKind),
    Url(String),
    Preload(bool),
    WifiSsid(String),
    WifiPassword(String),
    WifiEncryption(Encryption),
    WifiHidden(bool),
    FirstName(String),
    LastName(String),
    Phone(String),
    ContactEmail(String),
    EmailTo(String),
    EmailSubject(String),
    EmailBody(String),
    DotColor(Rgb),
    Background(Background),
    DotType(DotType),
    CornerSquareType(CornerSquareType),
    CornerDotType(CornerDotType),
    ErrorCorrection(ErrorCorrectionLevel),
    /// A `data:` URL from [`crate::logo`], or `None` to remove the logo.
    Logo(Option<String>),
    Label(Option<String>),
    Extension(Extension),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    kind: ContentKind,
    url: String,
    wifi: Wifi,
    vcard: VCard,
    email: Email,
    preload: bool,
    origin: String,
    style: StyleSpec,
    layout: Layout,
    extension: Extension,
}

impl Session {
    /// Starts a session for a page served from `origin`, with the given
    /// style defaults.
    pub fn new(origin: impl Into<String>, style: StyleSpec, layout: Layout) -> Self {
        Session {
            kind: ContentKind::Url,
            url: DEFAULT_URL.to_string(),
            wifi: Wifi::default(),
            vcard: VCard::default(),
            email: Email::default(),
            preload: false,
            origin: origin.into(),
            style,
            layout,
            extension: Extension::default(),
        }
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        log::trace!("form update: {update:?}");
        match update {
            FieldUpdate::Kind(kind) => self.kind = kind,
            FieldUpdate::Url(url) => self.url = url,
            FieldUpdate::Preload(on) => self.preload = on,
            FieldUpdate::WifiSsid(v) => self.wifi.ssid = v,
            FieldUpdate::WifiPassword(v) => self.wifi.password = v,
            FieldUpdate::WifiEncryption(v) => self.wifi.encryption = v,
            FieldUpdate::WifiHidden(v) => self.wifi.hidden = v,
            FieldUpdate::FirstName(v) => self.vcard.first_name = v,
            FieldUpdate::LastName(v) => self.vcard.last_name = v,
            FieldUpdate::Phone(v) => self.vcard.phone = v,
            FieldUpdate::ContactEmail(v) => self.vcard.email = v,
            FieldUpdate::EmailTo(v) => self.email.to = v,
            FieldUpdate::EmailSubject(v) => self.email.subject = v,
            FieldUpdate::EmailBody(v) => self.email.body = v,
            FieldUpdate::DotColor(v) => self.style.dot_color = v,
            FieldUpdate::Background(v) => self.style.background = v,
            FieldUpdate::DotType(v) => self.style.dot_type = v,
            FieldUpdate::CornerSquareType(v) => self.style.corner_square_type = v,
            FieldUpdate::CornerDotType(v) => self.style.corner_dot_type = v,
            FieldUpdate::ErrorCorrection(v) => self.style.error_correction = v,
            FieldUpdate::Logo(v) => self.style.logo = v,
            FieldUpdate::Label(v) => self.style.label = v,
            FieldUpdate::Extension(v) => self.extension = v,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn style(&self) -> &StyleSpec {
        &self.style
    }

    pub fn extension(&self) -> Extension {
        self.extension
    }

    /// The active content, built from the selected type's draft only.
    pub fn content(&self) -> ContentSpec {
        match self.kind {
            ContentKind::Url => ContentSpec::Url {
                url: self.url.clone(),
            },
            ContentKind::Wifi => ContentSpec::Wifi(self.wifi.clone()),
            ContentKind::VCard => ContentSpec::VCard(self.vcard.clone()),
            ContentKind::Email => ContentSpec::Email(self.email.clone()),
        }
    }

    pub fn url_options(&self) -> UrlOptions {
        if self.preload {
            UrlOptions::preload(self.origin.clone())
        } else {
            UrlOptions::default()
        }
    }

    pub fn payload(&self) -> String {
        self.content().encode(&self.url_options())
    }

    /// Payload and style combined into renderer options.
    pub fn resolve(&self) -> Resolution {
        resolve(&self.payload(), &self.style, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("https://app.test", StyleSpec::default(), Layout::default())
    }

    #[test]
    fn test_starts_with_example_url() {
        let s = session();
        assert_eq!(s.kind(), ContentKind::Url);
        assert_eq!(s.payload(), "https://example.com");
    }

    #[test]
    fn test_drafts_survive_kind_switches() {
        let mut s = session();
        s.apply(FieldUpdate::Url("rust-lang.org".into()));
        s.apply(FieldUpdate::Kind(ContentKind::Wifi));
        s.apply(FieldUpdate::WifiSsid("Home".into()));
        s.apply(FieldUpdate::WifiPassword("pass123".into()));
        assert_eq!(s.payload(), "WIFI:T:WPA;S:Home;P:pass123;H:false;;");

        s.apply(FieldUpdate::Kind(ContentKind::Url));
        assert_eq!(s.payload(), "https://rust-lang.org");

        s.apply(FieldUpdate::Kind(ContentKind::Wifi));
        assert_eq!(s.payload(), "WIFI:T:WPA;S:Home;P:pass123;H:false;;");
    }

    #[test]
    fn test_variants_do_not_leak_fields() {
        let mut s = session();
        s.apply(FieldUpdate::ContactEmail("ada@example.com".into()));
        s.apply(FieldUpdate::Kind(ContentKind::Email));
        assert_eq!(s.content(), ContentSpec::Email(Email::default()));
    }

    #[test]
    fn test_preload_uses_origin() {
        let mut s = session();
        s.apply(FieldUpdate::Url("example.com".into()));
        s.apply(FieldUpdate::Preload(true));
        assert_eq!(s.payload(), "https://app.test/go?to=https%3A%2F%2Fexample.com");
        s.apply(FieldUpdate::Kind(ContentKind::VCard));
        assert!(s.payload().starts_with("BEGIN:VCARD"));
    }

    #[test]
    fn test_style_updates_flow_into_options() {
        let mut s = session();
        s.apply(FieldUpdate::DotColor(Rgb::new(0x77, 0x77, 0x77)));
        s.apply(FieldUpdate::Background(Background::Color(Rgb::new(0x80, 0x80, 0x80))));
        s.apply(FieldUpdate::DotType(DotType::Classy));
        s.apply(FieldUpdate::ErrorCorrection(ErrorCorrectionLevel::H));
        s.apply(FieldUpdate::Extension(Extension::Svg));
        let resolved = s.resolve();
        assert!(resolved.contrast.low_contrast);
        assert_eq!(resolved.options.dots_options.kind, DotType::Classy);
        assert_eq!(
            resolved.options.qr_options.error_correction_level,
            ErrorCorrectionLevel::H
        );
        assert_eq!(resolved.options.data, "https://example.com");
        assert_eq!(s.extension(), Extension::Svg);
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let mut s = session();
        s.apply(FieldUpdate::Kind(ContentKind::Email));
        s.apply(FieldUpdate::EmailTo("a@b.c".into()));
        s.apply(FieldUpdate::EmailBody("hi there".into()));
        assert_eq!(s.resolve(), s.resolve());
    }
}

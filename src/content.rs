//! Payload builders for the supported content types.
//!
//! Each [`ContentSpec`] variant formats into one of the text conventions QR
//! scanners understand: a plain `https://` link, a `WIFI:` network config, a
//! vCard 3.0 contact or a `mailto:` URI. Encoding is a pure function of the
//! input.

use core::fmt;
use core::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Characters `encodeURIComponent` leaves alone: alphanumerics and `-_.!~*'()`.
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Route of the redirect page, relative to the origin.
pub const REDIRECT_ROUTE: &str = "/go";

/// Percent-encodes a string the way `encodeURIComponent` does.
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Wi-Fi authentication type written into the `T:` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encryption {
    #[default]
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "nopass")]
    None,
}

impl Encryption {
    pub fn as_str(self) -> &'static str {
        match self {
            Encryption::Wpa => "WPA",
            Encryption::Wep => "WEP",
            Encryption::None => "nopass",
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encryption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "wpa" | "wpa2" | "wpa3" => Ok(Encryption::Wpa),
            "wep" => Ok(Encryption::Wep),
            "none" | "nopass" | "open" => Ok(Encryption::None),
            _ => Err(Error::UnknownVariant {
                kind: "encryption",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wifi {
    pub ssid: String,
    pub password: String,
    pub encryption: Encryption,
    pub hidden: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VCard {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// What the QR code carries. Exactly one variant is active at a time and each
/// one owns only its own fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentSpec {
    Url { url: String },
    Wifi(Wifi),
    VCard(VCard),
    Email(Email),
}

impl ContentSpec {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentSpec::Url { .. } => ContentKind::Url,
            ContentSpec::Wifi(_) => ContentKind::Wifi,
            ContentSpec::VCard(_) => ContentKind::VCard,
            ContentSpec::Email(_) => ContentKind::Email,
        }
    }

    /// Formats the content into its payload string.
    ///
    /// `options` only affects the URL variant.
    ///
    /// # Example
    ///
    /// ```rust
    /// use artqr::content::{ContentSpec, UrlOptions};
    ///
    /// let spec = ContentSpec::Url { url: "example.com".into() };
    /// assert_eq!(spec.encode(&UrlOptions::default()), "https://example.com");
    /// ```
    pub fn encode(&self, options: &UrlOptions) -> String {
        let payload = match self {
            ContentSpec::Url { url } => encode_url(url, options),
            ContentSpec::Wifi(wifi) => encode_wifi(wifi),
            ContentSpec::VCard(card) => encode_vcard(card),
            ContentSpec::Email(email) => encode_email(email),
        };
        log::debug!("encoded {:?} payload ({} bytes)", self.kind(), payload.len());
        payload
    }
}

/// The content type selector of the form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Url,
    Wifi,
    VCard,
    Email,
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "url" => Ok(ContentKind::Url),
            "wifi" => Ok(ContentKind::Wifi),
            "vcard" => Ok(ContentKind::VCard),
            "email" => Ok(ContentKind::Email),
            _ => Err(Error::UnknownVariant {
                kind: "content type",
                value: s.to_string(),
            }),
        }
    }
}

/// URL-only switches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// Route scans through the redirect page hosted at this origin
    /// (e.g. `https://app.test`) instead of linking directly.
    pub preload_origin: Option<String>,
}

impl UrlOptions {
    pub fn preload(origin: impl Into<String>) -> Self {
        UrlOptions {
            preload_origin: Some(origin.into()),
        }
    }
}

/// Strips every leading `http://` or `https://` (any case).
fn strip_schemes(mut rest: &str) -> &str {
    loop {
        let lower = rest.get(..8).unwrap_or(rest).to_ascii_lowercase();
        if lower.starts_with("https://") {
            rest = &rest[8..];
        } else if lower.starts_with("http://") {
            rest = &rest[7..];
        } else {
            return rest;
        }
    }
}

/// Normalizes a user-typed address to a single `https://` link.
pub fn normalize_url(raw: &str) -> String {
    let host_and_path = strip_schemes(raw.trim());
    if host_and_path.is_empty() {
        return String::new();
    }
    format!("https://{host_and_path}")
}

pub fn encode_url(raw: &str, options: &UrlOptions) -> String {
    let url = normalize_url(raw);
    match &options.preload_origin {
        Some(origin) if !url.is_empty() => format!(
            "{}{}?to={}",
            origin.trim_end_matches('/'),
            REDIRECT_ROUTE,
            encode_uri_component(&url)
        ),
        _ => url,
    }
}

/// Builds a `WIFI:` payload.
///
/// Fields are written as typed; `;`, `,`, `\` and `"` are not escaped, so an
/// SSID or password containing them yields a payload some scanners misread.
pub fn encode_wifi(wifi: &Wifi) -> String {
    format!(
        "WIFI:T:{};S:{};P:{};H:{};;",
        wifi.encryption, wifi.ssid, wifi.password, wifi.hidden
    )
}

pub fn encode_vcard(card: &VCard) -> String {
    let full_name = format!("{} {}", card.first_name, card.last_name);
    [
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("N:{};{}", card.last_name, card.first_name),
        format!("FN:{}", full_name.trim()),
        format!("TEL:{}", card.phone),
        format!("EMAIL:{}", card.email),
        "END:VCARD".to_string(),
    ]
    .join("\n")
}

pub fn encode_email(email: &Email) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        email.to,
        encode_uri_component(&email.subject),
        encode_uri_component(&email.body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> String {
        ContentSpec::Url { url: raw.into() }.encode(&UrlOptions::default())
    }

    #[test]
    fn test_url_gets_single_https_prefix() {
        assert_eq!(url("example.com"), "https://example.com");
        assert_eq!(url("https://https://example.com"), "https://example.com");
        assert_eq!(url("http://example.com/a?b=c"), "https://example.com/a?b=c");
        assert_eq!(url("HTTP://Https://example.com"), "https://example.com");
        assert_eq!(url("  example.com/path  "), "https://example.com/path");
    }

    #[test]
    fn test_empty_url_stays_empty() {
        assert_eq!(url(""), "");
        assert_eq!(url("https://"), "");
        assert_eq!(url("http://https://"), "");
        assert_eq!(url("   "), "");
    }

    #[test]
    fn test_url_with_non_ascii_does_not_panic() {
        assert_eq!(url("é.example"), "https://é.example");
        assert_eq!(url("ht"), "https://ht");
    }

    #[test]
    fn test_preload_wraps_through_redirect_page() {
        let spec = ContentSpec::Url { url: "example.com".into() };
        assert_eq!(
            spec.encode(&UrlOptions::preload("https://app.test")),
            "https://app.test/go?to=https%3A%2F%2Fexample.com"
        );
        assert_eq!(
            spec.encode(&UrlOptions::preload("https://app.test/")),
            "https://app.test/go?to=https%3A%2F%2Fexample.com"
        );
    }

    #[test]
    fn test_preload_encodes_query_characters() {
        let spec = ContentSpec::Url {
            url: "example.com/search?q=a b&lang=id".into(),
        };
        assert_eq!(
            spec.encode(&UrlOptions::preload("https://app.test")),
            "https://app.test/go?to=https%3A%2F%2Fexample.com%2Fsearch%3Fq%3Da%20b%26lang%3Did"
        );
    }

    #[test]
    fn test_preload_with_empty_url_is_empty() {
        let spec = ContentSpec::Url { url: String::new() };
        assert_eq!(spec.encode(&UrlOptions::preload("https://app.test")), "");
    }

    #[test]
    fn test_wifi_payload() {
        let spec = ContentSpec::Wifi(Wifi {
            ssid: "Home".into(),
            password: "pass123".into(),
            encryption: Encryption::Wpa,
            hidden: false,
        });
        assert_eq!(
            spec.encode(&UrlOptions::default()),
            "WIFI:T:WPA;S:Home;P:pass123;H:false;;"
        );
    }

    #[test]
    fn test_wifi_open_hidden_network() {
        let wifi = Wifi {
            ssid: "Lab".into(),
            password: String::new(),
            encryption: Encryption::None,
            hidden: true,
        };
        assert_eq!(encode_wifi(&wifi), "WIFI:T:nopass;S:Lab;P:;H:true;;");
    }

    #[test]
    fn test_wifi_fields_are_not_escaped() {
        let wifi = Wifi {
            ssid: "a;b,c".into(),
            password: "x\\y\"z".into(),
            encryption: Encryption::Wep,
            hidden: false,
        };
        assert_eq!(encode_wifi(&wifi), "WIFI:T:WEP;S:a;b,c;P:x\\y\"z;H:false;;");
    }

    #[test]
    fn test_vcard_block() {
        let card = VCard {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: "+44 20 7946 0000".into(),
            email: "ada@example.com".into(),
        };
        assert_eq!(
            encode_vcard(&card),
            "BEGIN:VCARD\nVERSION:3.0\nN:Lovelace;Ada\nFN:Ada Lovelace\nTEL:+44 20 7946 0000\nEMAIL:ada@example.com\nEND:VCARD"
        );
    }

    #[test]
    fn test_partial_vcard_keeps_every_field() {
        let card = VCard {
            first_name: "Ada".into(),
            ..VCard::default()
        };
        assert_eq!(
            encode_vcard(&card),
            "BEGIN:VCARD\nVERSION:3.0\nN:;Ada\nFN:Ada\nTEL:\nEMAIL:\nEND:VCARD"
        );
    }

    #[test]
    fn test_mailto_encodes_subject_and_body() {
        let email = Email {
            to: "team@example.com".into(),
            subject: "Hello & welcome".into(),
            body: "Line one\nLine two (ok!)".into(),
        };
        assert_eq!(
            encode_email(&email),
            "mailto:team@example.com?subject=Hello%20%26%20welcome&body=Line%20one%0ALine%20two%20(ok!)"
        );
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let specs = [
            ContentSpec::Url { url: "example.com".into() },
            ContentSpec::Wifi(Wifi::default()),
            ContentSpec::VCard(VCard::default()),
            ContentSpec::Email(Email::default()),
        ];
        let options = UrlOptions::preload("https://app.test");
        for spec in &specs {
            assert_eq!(spec.encode(&options), spec.encode(&options));
        }
    }

    #[test]
    fn test_content_spec_serde_tagging() {
        let spec: ContentSpec =
            serde_json::from_str(r#"{"type":"url","url":"example.com"}"#).unwrap();
        assert_eq!(spec, ContentSpec::Url { url: "example.com".into() });
        let wifi = serde_json::to_value(ContentSpec::Wifi(Wifi::default())).unwrap();
        assert_eq!(wifi["type"], "wifi");
        assert_eq!(wifi["encryption"], "WPA");
    }

    #[test]
    fn test_encryption_names() {
        assert_eq!("wpa".parse::<Encryption>().unwrap(), Encryption::Wpa);
        assert_eq!("None".parse::<Encryption>().unwrap(), Encryption::None);
        assert!("psk".parse::<Encryption>().is_err());
    }
}

//! The "go" page: a short progress animation, then one navigation.
//!
//! [`RedirectMachine`] is a pure state machine fed with timer ticks;
//! [`run`] drives it on tokio time and performs its effects through a
//! [`Navigator`]. The interval and the final delay are both raced against
//! one [`CancellationToken`], so tearing the page down stops everything.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

/// Name of the query parameter carrying the target.
pub const TARGET_PARAM: &str = "to";

/// Time the progress bar takes to fill.
pub const PROGRESS_DURATION: Duration = Duration::from_millis(2500);

/// Progress update interval.
pub const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Pause between a full bar and the navigation.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(500);

/// Route used when no target is given.
pub const HOME_ROUTE: &str = "/";

/// The raw `to` parameter, as read from the page's query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    /// Wraps an already extracted parameter value. Empty values count as
    /// missing.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(RedirectTarget(raw))
        }
    }

    /// Extracts the target from a query string (with or without the leading
    /// `?`), decoding it the way a browser's search params do.
    ///
    /// # Example
    ///
    /// ```rust
    /// use artqr::redirect::RedirectTarget;
    ///
    /// let target = RedirectTarget::from_query("?to=https%3A%2F%2Fexample.com").unwrap();
    /// assert_eq!(target.decoded(), "https://example.com");
    /// assert!(RedirectTarget::from_query("other=1").is_none());
    /// ```
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == TARGET_PARAM)
            .and_then(|(_, value)| RedirectTarget::new(value.into_owned()))
    }

    /// Extracts the target from a full page URL such as
    /// `https://app.test/go?to=...`. Anything that is not a parseable URL is
    /// treated as a bare query string.
    pub fn from_page_url(page: &str) -> Option<Self> {
        match url::Url::parse(page) {
            Ok(url) => url.query().and_then(RedirectTarget::from_query),
            Err(_) => RedirectTarget::from_query(page.split_once('?').map_or(page, |(_, q)| q)),
        }
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    /// The navigation target: the raw value passed through
    /// `decodeURIComponent` semantics, or the raw value itself when it holds
    /// a malformed escape.
    pub fn decoded(&self) -> String {
        decode_uri_component(&self.0).unwrap_or_else(|| {
            log::warn!("malformed percent-encoding in redirect target, using it verbatim");
            self.0.clone()
        })
    }
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape and
/// the result must be valid UTF-8.
pub fn decode_uri_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Where the page is in its lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Loading { progress: f64 },
    Redirecting,
    /// A navigation has been issued; nothing else happens.
    Finished,
}

/// Side effects requested by the machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Progress(f64),
    /// The bar is full: show the destination and schedule the navigation
    /// after [`REDIRECT_DELAY`].
    BeginRedirect { display: String },
    Navigate(String),
    GoHome,
}

/// Tick-driven redirect page state.
///
/// # Example
///
/// ```rust
/// use artqr::redirect::{Effect, RedirectMachine, RedirectTarget};
///
/// let mut page = RedirectMachine::new(RedirectTarget::new("https://example.com"));
/// assert_eq!(page.start(), None);
/// while !matches!(page.tick(), Some(Effect::BeginRedirect { .. })) {}
/// assert_eq!(page.fire(), Some(Effect::Navigate("https://example.com".into())));
/// ```
#[derive(Clone, Debug)]
pub struct RedirectMachine {
    target: Option<RedirectTarget>,
    phase: Phase,
    ticks: u32,
    total_ticks: u32,
}

impl RedirectMachine {
    pub fn new(target: Option<RedirectTarget>) -> Self {
        let total_ticks = (PROGRESS_DURATION.as_millis() / TICK_INTERVAL.as_millis()) as u32;
        RedirectMachine {
            target,
            phase: Phase::Loading { progress: 0.0 },
            ticks: 0,
            total_ticks: total_ticks.max(1),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn target(&self) -> Option<&RedirectTarget> {
        self.target.as_ref()
    }

    /// Page entry. Without a target the page goes home immediately.
    pub fn start(&mut self) -> Option<Effect> {
        if self.target.is_none() && self.phase != Phase::Finished {
            self.phase = Phase::Finished;
            return Some(Effect::GoHome);
        }
        None
    }

    /// One interval tick. Only meaningful while loading.
    pub fn tick(&mut self) -> Option<Effect> {
        let Phase::Loading { .. } = self.phase else {
            return None;
        };
        let target = self.target.as_ref()?;
        self.ticks += 1;
        if self.ticks >= self.total_ticks {
            self.phase = Phase::Redirecting;
            return Some(Effect::BeginRedirect {
                display: target.decoded(),
            });
        }
        let progress = f64::from(self.ticks) * 100.0 / f64::from(self.total_ticks);
        self.phase = Phase::Loading { progress };
        Some(Effect::Progress(progress))
    }

    /// The delayed action after [`Effect::BeginRedirect`].
    pub fn fire(&mut self) -> Option<Effect> {
        if self.phase != Phase::Redirecting {
            return None;
        }
        self.phase = Phase::Finished;
        self.target
            .as_ref()
            .map(|target| Effect::Navigate(target.decoded()))
    }
}

/// Receives the page's visible updates and its single navigation.
pub trait Navigator {
    fn navigate(&mut self, url: &str);

    fn go_home(&mut self);

    fn progress(&mut self, _percent: f64) {}

    fn redirecting(&mut self, _display: &str) {}
}

/// How a page run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Navigated(String),
    WentHome,
    Cancelled,
}

/// Runs the page to completion or until `cancel` fires.
///
/// Must be called from within a tokio runtime with the time driver enabled.
pub async fn run<N: Navigator>(
    mut machine: RedirectMachine,
    navigator: &mut N,
    cancel: CancellationToken,
) -> Outcome {
    if let Some(Effect::GoHome) = machine.start() {
        log::info!("no redirect target, going home");
        navigator.go_home();
        return Outcome::WentHome;
    }

    let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("redirect cancelled while loading");
                return Outcome::Cancelled;
            }
            _ = ticker.tick() => match machine.tick() {
                Some(Effect::Progress(percent)) => navigator.progress(percent),
                Some(Effect::BeginRedirect { display }) => {
                    navigator.progress(100.0);
                    navigator.redirecting(&display);
                    break;
                }
                _ => {}
            },
        }
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log::debug!("redirect cancelled before navigation");
            Outcome::Cancelled
        }
        _ = sleep(REDIRECT_DELAY) => match machine.fire() {
            Some(Effect::Navigate(url)) => {
                log::info!("navigating to {url}");
                navigator.navigate(&url);
                Outcome::Navigated(url)
            }
            _ => Outcome::Cancelled,
        },
    }
}

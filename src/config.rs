use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use chrono::{DateTime, NaiveDate, Utc};
use iced::theme::Palette;
use iced::{Color, Theme};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, info, warn};
use crate::error::ApiError;
use crate::storage::{LocalStore, SETTINGS_KEY, THEME_KEY};

/// How long a cached configuration is trusted.
pub const CACHE_TTL_MS: i64 = 3_600_000;

/// Institute branding and feature switches served by `/api/settings/config/current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub institute_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    pub watermark_enabled: bool,
    pub watermark_text: Option<String>,
    pub currency_symbol: String,
    pub date_format: String,
    pub features: BTreeMap<String, bool>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            institute_name: "School ERP".to_string(),
            primary_color: "#1e3a8a".to_string(),
            secondary_color: "#64748b".to_string(),
            logo_url: None,
            watermark_enabled: false,
            watermark_text: None,
            currency_symbol: "₹".to_string(),
            date_format: "%d-%m-%Y".to_string(),
            features: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Features are on unless the backend explicitly switches them off.
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(true)
    }
}

/// Where the broadcaster gets a fresh configuration from.
pub trait ConfigSource {
    fn fetch_config(&self) -> impl Future<Output = Result<SessionConfig, ApiError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CachedConfig {
    payload: SessionConfig,
    timestamp: DateTime<Utc>,
}

pub fn is_fresh(stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - stored_at).num_milliseconds() < CACHE_TTL_MS
}

/// Loads the configuration once per run and publishes it to every screen
/// that waits on it.
pub struct ConfigBroadcaster<S> {
    source: S,
    store: Arc<LocalStore>,
    initialized: OnceCell<()>,
    ready: watch::Sender<Option<Arc<SessionConfig>>>,
}

impl<S: ConfigSource + Sync> ConfigBroadcaster<S> {
    pub fn new(source: S, store: Arc<LocalStore>) -> Self {
        let (ready, _) = watch::channel(None);
        Self { source, store, initialized: OnceCell::new(), ready }
    }

    pub fn current(&self) -> Option<Arc<SessionConfig>> {
        self.ready.borrow().clone()
    }

    /// Resolves once the first configuration has been published.
    pub async fn wait_ready(&self) -> Arc<SessionConfig> {
        let mut rx = self.ready.subscribe();
        let config = rx.wait_for(Option::is_some).await.ok().and_then(|c| (*c).clone());
        config.unwrap_or_default()
    }

    pub async fn init(&self) -> Arc<SessionConfig> {
        self.init_at(Utc::now()).await
    }

    /// Idempotent: only the first call resolves, later calls return the published value.
    pub async fn init_at(&self, now: DateTime<Utc>) -> Arc<SessionConfig> {
        self.initialized
            .get_or_init(|| async {
                let config = self.resolve(now).await;
                self.publish(config);
            })
            .await;
        self.current().unwrap_or_default()
    }

    /// Forces a remote fetch and replaces the published configuration wholesale.
    pub async fn refresh(&self) -> Result<Arc<SessionConfig>, ApiError> {
        self.refresh_at(Utc::now()).await
    }

    /// A refused configuration endpoint publishes the default theme instead of failing.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Arc<SessionConfig>, ApiError> {
        let config = match self.source.fetch_config().await {
            Ok(config) => {
                self.write_cache(&config, now);
                info!(institute = %config.institute_name, "configuration refreshed");
                config
            }
            Err(ApiError::AuthExpired) => {
                warn!("configuration endpoint rejected the session, using default theme");
                SessionConfig::default()
            }
            Err(err) => return Err(err),
        };
        let _ = self.initialized.set(());
        Ok(self.publish(config))
    }

    fn publish(&self, config: SessionConfig) -> Arc<SessionConfig> {
        let config = Arc::new(config);
        self.ready.send_replace(Some(config.clone()));
        config
    }

    async fn resolve(&self, now: DateTime<Utc>) -> SessionConfig {
        let cached = self.read_cache();
        if let Some(cached) = &cached {
            if is_fresh(cached.timestamp, now) {
                debug!(stored_at = %cached.timestamp, "using cached configuration");
                return cached.payload.clone();
            }
        }
        match self.source.fetch_config().await {
            Ok(config) => {
                self.write_cache(&config, now);
                config
            }
            Err(ApiError::AuthExpired) => {
                warn!("configuration endpoint rejected the session, using default theme");
                SessionConfig::default()
            }
            Err(err) => {
                warn!(%err, "configuration fetch failed");
                cached.map(|c| c.payload).unwrap_or_default()
            }
        }
    }

    fn read_cache(&self) -> Option<CachedConfig> {
        let raw = self.store.get(SETTINGS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(err) => {
                warn!(%err, "ignoring unreadable configuration cache");
                None
            }
        }
    }

    fn write_cache(&self, config: &SessionConfig, now: DateTime<Utc>) {
        let cached = CachedConfig { payload: config.clone(), timestamp: now };
        match serde_json::to_string(&cached) {
            Ok(json) => self.store.set(SETTINGS_KEY, json),
            Err(err) => warn!(%err, "could not serialize configuration cache"),
        }
    }
}

/// Money and date formatting taken from the institute configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatters {
    pub currency_symbol: String,
    pub date_format: String,
}

impl Default for Formatters {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self { currency_symbol: config.currency_symbol, date_format: config.date_format }
    }
}

impl Formatters {
    pub fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, amount)
    }

    /// Reformats ISO dates (`2025-03-01` or an RFC 3339 timestamp); other text is shown as is.
    pub fn date(&self, raw: &str) -> String {
        let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()));
        match parsed {
            Some(date) => date.format(&self.date_format).to_string(),
            None => raw.to_string(),
        }
    }
}

/// What the view layer needs after the configuration is applied.
#[derive(Debug, Clone)]
pub struct Branding {
    pub title: String,
    pub theme: Theme,
    pub secondary: Color,
    pub watermark: Option<String>,
    pub formatters: Formatters,
}

impl Default for Branding {
    fn default() -> Self {
        Branding::from_config(&SessionConfig::default())
    }
}

impl Branding {
    pub fn from_config(config: &SessionConfig) -> Self {
        let base = Theme::Light.palette();
        let palette = Palette {
            primary: parse_hex_color(&config.primary_color).unwrap_or(base.primary),
            ..base
        };
        Self {
            title: config.institute_name.clone(),
            theme: Theme::custom(config.institute_name.clone(), palette),
            secondary: parse_hex_color(&config.secondary_color).unwrap_or(base.text),
            watermark: config
                .watermark_text
                .clone()
                .filter(|text| config.watermark_enabled && !text.trim().is_empty()),
            formatters: Formatters {
                currency_symbol: config.currency_symbol.clone(),
                date_format: config.date_format.clone(),
            },
        }
    }
}

/// `#rgb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Color::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
}

pub fn theme_from_str(name: &str) -> Option<Theme> {
    Theme::ALL
        .iter()
        .find(|t| theme_to_str(t).eq_ignore_ascii_case(name))
        .cloned()
}

/// Built-in theme chosen on the settings screen, overriding the institute palette.
pub fn load_theme_override(store: &LocalStore) -> Option<Theme> {
    store.get(THEME_KEY).and_then(|name| theme_from_str(&name))
}

pub fn save_theme_override(store: &LocalStore, theme: Option<&Theme>) {
    match theme {
        Some(theme) => store.set(THEME_KEY, theme_to_str(theme)),
        None => store.remove(THEME_KEY),
    }
}

pub fn theme_to_str(theme: &Theme) -> &'static str {
    match theme {
        Theme::Light => "Light",
        Theme::Dark => "Dark",
        Theme::Dracula => "Dracula",
        Theme::Nord => "Nord",
        Theme::SolarizedLight => "SolarizedLight",
        Theme::SolarizedDark => "SolarizedDark",
        Theme::GruvboxLight => "GruvboxLight",
        Theme::GruvboxDark => "GruvboxDark",
        Theme::CatppuccinLatte => "CatppuccinLatte",
        Theme::CatppuccinFrappe => "CatppuccinFrappe",
        Theme::CatppuccinMacchiato => "CatppuccinMacchiato",
        Theme::CatppuccinMocha => "CatppuccinMocha",
        Theme::TokyoNight => "TokyoNight",
        Theme::TokyoNightStorm => "TokyoNightStorm",
        Theme::TokyoNightLight => "TokyoNightLight",
        Theme::KanagawaWave => "KanagawaWave",
        Theme::KanagawaDragon => "KanagawaDragon",
        Theme::KanagawaLotus => "KanagawaLotus",
        Theme::Moonfly => "Moonfly",
        Theme::Nightfly => "Nightfly",
        Theme::Oxocarbon => "Oxocarbon",
        Theme::Ferra => "Ferra",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::Duration;

    struct FakeSource {
        calls: AtomicUsize,
        result: Result<SessionConfig, ApiError>,
    }

    impl FakeSource {
        fn ok(name: &str) -> Self {
            let config = SessionConfig { institute_name: name.to_string(), ..SessionConfig::default() };
            Self { calls: AtomicUsize::new(0), result: Ok(config) }
        }

        fn failing(err: ApiError) -> Self {
            Self { calls: AtomicUsize::new(0), result: Err(err) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ConfigSource for FakeSource {
        async fn fetch_config(&self) -> Result<SessionConfig, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T08:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn cached_config_is_reused_inside_the_window() {
        let store = Arc::new(LocalStore::in_memory());
        let first = ConfigBroadcaster::new(FakeSource::ok("Green Valley"), store.clone());
        first.init_at(t0()).await;
        assert_eq!(first.source.calls(), 1);

        let second = ConfigBroadcaster::new(FakeSource::ok("Changed"), store);
        let config = second.init_at(t0() + Duration::milliseconds(CACHE_TTL_MS - 1)).await;
        assert_eq!(config.institute_name, "Green Valley");
        assert_eq!(second.source.calls(), 0);
    }

    #[tokio::test]
    async fn expired_cache_triggers_fetch() {
        let store = Arc::new(LocalStore::in_memory());
        ConfigBroadcaster::new(FakeSource::ok("Old"), store.clone()).init_at(t0()).await;

        let later = ConfigBroadcaster::new(FakeSource::ok("New"), store.clone());
        let config = later.init_at(t0() + Duration::milliseconds(CACHE_TTL_MS)).await;
        assert_eq!(config.institute_name, "New");
        assert_eq!(later.source.calls(), 1);

        // The rewritten cache carries the new timestamp.
        let third = ConfigBroadcaster::new(FakeSource::ok("Newest"), store);
        let config = third.init_at(t0() + Duration::milliseconds(CACHE_TTL_MS + 1000)).await;
        assert_eq!(config.institute_name, "New");
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let broadcaster =
            ConfigBroadcaster::new(FakeSource::ok("Once"), Arc::new(LocalStore::in_memory()));
        let a = broadcaster.init_at(t0()).await;
        let b = broadcaster.init_at(t0() + Duration::hours(5)).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(broadcaster.source.calls(), 1);
    }

    #[tokio::test]
    async fn unauthorized_falls_back_to_default_theme() {
        let store = Arc::new(LocalStore::in_memory());
        let broadcaster = ConfigBroadcaster::new(FakeSource::failing(ApiError::AuthExpired), store.clone());
        let config = broadcaster.init_at(t0()).await;
        assert_eq!(*config, SessionConfig::default());
        assert!(store.get(SETTINGS_KEY).is_none());
    }

    #[tokio::test]
    async fn waiters_are_released_only_after_publish() {
        let broadcaster = Arc::new(ConfigBroadcaster::new(
            FakeSource::ok("Ready"),
            Arc::new(LocalStore::in_memory()),
        ));
        assert!(broadcaster.current().is_none());

        let waiter = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move { broadcaster.wait_ready().await })
        };
        broadcaster.init_at(t0()).await;
        let seen = waiter.await.unwrap();
        assert_eq!(seen.institute_name, "Ready");
    }

    #[tokio::test]
    async fn refresh_replaces_wholesale() {
        let store = Arc::new(LocalStore::in_memory());
        let broadcaster = ConfigBroadcaster::new(FakeSource::ok("Fresh"), store);
        broadcaster.init_at(t0()).await;
        let refreshed = broadcaster.refresh_at(t0() + Duration::minutes(1)).await.unwrap();
        assert_eq!(broadcaster.source.calls(), 2);
        assert!(Arc::ptr_eq(&refreshed, &broadcaster.current().unwrap()));
    }

    #[tokio::test]
    async fn refused_refresh_publishes_default_theme() {
        let store = Arc::new(LocalStore::in_memory());
        let broadcaster = ConfigBroadcaster::new(FakeSource::failing(ApiError::AuthExpired), store.clone());
        let refreshed = broadcaster.refresh_at(t0()).await.unwrap();
        assert_eq!(*refreshed, SessionConfig::default());
        assert!(Arc::ptr_eq(&refreshed, &broadcaster.current().unwrap()));
        assert!(store.get(SETTINGS_KEY).is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_published_config() {
        let store = Arc::new(LocalStore::in_memory());
        let broadcaster = ConfigBroadcaster::new(FakeSource::failing(ApiError::Network("down".into())), store);
        assert!(broadcaster.refresh_at(t0()).await.is_err());
        assert!(broadcaster.current().is_none());
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::from_rgb8(255, 0, 0)));
        assert_eq!(parse_hex_color("#0f0"), Some(Color::from_rgb8(0, 255, 0)));
        assert_eq!(parse_hex_color("blue"), None);
    }

    #[test]
    fn non_ascii_colors_are_rejected_without_panicking() {
        // Six bytes, four chars: slicing by byte would split 'é'.
        assert_eq!(parse_hex_color("#aéaé"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
        assert_eq!(parse_hex_color("#12345g"), None);
    }

    #[test]
    fn malformed_server_colors_fall_back_to_the_base_palette() {
        let config = SessionConfig {
            primary_color: "#aéaé".into(),
            secondary_color: "#zzz".into(),
            ..SessionConfig::default()
        };
        let branding = Branding::from_config(&config);
        assert_eq!(branding.theme.palette().primary, Theme::Light.palette().primary);
        assert_eq!(branding.secondary, Theme::Light.palette().text);
    }

    #[test]
    fn formatters_apply_configured_patterns() {
        let f = Formatters { currency_symbol: "$".into(), date_format: "%d/%m/%Y".into() };
        assert_eq!(f.money(1100.0), "$1100.00");
        assert_eq!(f.date("2025-03-01"), "01/03/2025");
        assert_eq!(f.date("2025-03-01T10:00:00Z"), "01/03/2025");
        assert_eq!(f.date("soon"), "soon");
    }

    #[test]
    fn watermark_requires_flag() {
        let config = SessionConfig { watermark_text: Some("CONFIDENTIAL".into()), ..SessionConfig::default() };
        assert!(Branding::from_config(&config).watermark.is_none());
        let config = SessionConfig { watermark_enabled: true, ..config };
        assert_eq!(Branding::from_config(&config).watermark.as_deref(), Some("CONFIDENTIAL"));
    }

    #[test]
    fn theme_override_round_trips_through_store() {
        let store = LocalStore::in_memory();
        save_theme_override(&store, Some(&Theme::Dracula));
        assert_eq!(load_theme_override(&store), Some(Theme::Dracula));
        save_theme_override(&store, None);
        assert_eq!(load_theme_override(&store), None);
    }
}

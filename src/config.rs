//! Engine configuration, read once at startup from the environment.

use tracing::warn;

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 86_400;
pub const DEFAULT_UNDO_WINDOW_SECONDS: u64 = 300;
pub const DEFAULT_RESTRUCTURE_HORIZON_SECONDS: u64 = 86_400;
pub const DEFAULT_MATERIAL_WAIT_DELTA_MINUTES: u32 = 5;

/// Process configuration. Every key is read exactly once at engine start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Persistence location. `:memory:` runs without a database file.
    pub store_uri: String,
    /// Push notification transport endpoint (Expo-compatible).
    pub notifier_url: String,
    /// Secret used to sign bearer tokens.
    pub session_secret: String,
    /// Bearer token lifetime.
    pub token_ttl_seconds: u64,
    /// Trailing interval during which a vendor action remains undoable.
    pub undo_window_seconds: u64,
    /// Window length used for action-triggered restructures.
    pub restructure_horizon_seconds: u64,
    /// ETA delta that counts as a material change for notifications.
    pub material_wait_delta_minutes: u32,
    /// Seed a demo business on startup (development convenience).
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_uri: "lineup.db".to_string(),
            notifier_url: "https://exp.host/--/api/v2/push/send".to_string(),
            session_secret: "lineup-dev-secret".to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            undo_window_seconds: DEFAULT_UNDO_WINDOW_SECONDS,
            restructure_horizon_seconds: DEFAULT_RESTRUCTURE_HORIZON_SECONDS,
            material_wait_delta_minutes: DEFAULT_MATERIAL_WAIT_DELTA_MINUTES,
            seed_demo: false,
        }
    }
}

impl Config {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!("SESSION_SECRET not set - using development secret. Set this in production!");
                defaults.session_secret
            }
        };

        Self {
            store_uri: std::env::var("STORE_URI").unwrap_or(defaults.store_uri),
            notifier_url: std::env::var("NOTIFIER_URL").unwrap_or(defaults.notifier_url),
            session_secret,
            token_ttl_seconds: env_u64("TOKEN_TTL_SECONDS", defaults.token_ttl_seconds),
            undo_window_seconds: env_u64("UNDO_WINDOW_SECONDS", defaults.undo_window_seconds),
            restructure_horizon_seconds: env_u64(
                "RESTRUCTURE_HORIZON_SECONDS",
                defaults.restructure_horizon_seconds,
            ),
            material_wait_delta_minutes: env_u64(
                "MATERIAL_WAIT_DELTA_MINUTES",
                defaults.material_wait_delta_minutes as u64,
            ) as u32,
            seed_demo: std::env::var("SEED_DEMO")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                warn!(key, value = %v, "ignoring unparseable configuration value");
                default
            }
        },
        Err(_) => default,
    }
}

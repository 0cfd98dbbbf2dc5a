//! Runtime configuration loaded from `WITWAGER_*` environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Read a trimmed, non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_string(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, raw);
            default
        }),
        None => default,
    }
}

fn env_chance(key: &str, default: f64) -> f64 {
    env_parse(key, default).clamp(0.0, 1.0)
}

/// Tunables for the game rules and the background drivers
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub text_points: u32,
    pub video_points: u32,
    pub freeze_cost: u32,
    pub bomb_cost: u32,
    /// Tiles a bombed player is knocked back
    pub bomb_penalty: u8,
    /// Probability that a question ignores the tile's category
    pub chaos_chance: f64,
    /// Probability that a correct answer earns a host comment
    pub streak_comment_chance: f64,
    /// Probability that an idle tick earns a host comment
    pub idle_comment_chance: f64,
    pub idle_interval: Duration,
    pub bot_turn_delay: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            text_points: 100,
            video_points: 200,
            freeze_cost: 150,
            bomb_cost: 100,
            bomb_penalty: 3,
            chaos_chance: 0.2,
            streak_comment_chance: 0.4,
            idle_comment_chance: 0.2,
            idle_interval: Duration::from_secs(30),
            bot_turn_delay: Duration::from_millis(1500),
        }
    }
}

impl GameConfig {
    /// Load game tunables from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            text_points: env_parse("WITWAGER_TEXT_POINTS", defaults.text_points),
            video_points: env_parse("WITWAGER_VIDEO_POINTS", defaults.video_points),
            freeze_cost: env_parse("WITWAGER_FREEZE_COST", defaults.freeze_cost),
            bomb_cost: env_parse("WITWAGER_BOMB_COST", defaults.bomb_cost),
            bomb_penalty: env_parse("WITWAGER_BOMB_PENALTY", defaults.bomb_penalty),
            chaos_chance: env_chance("WITWAGER_CHAOS_CHANCE", defaults.chaos_chance),
            streak_comment_chance: env_chance(
                "WITWAGER_STREAK_COMMENT_CHANCE",
                defaults.streak_comment_chance,
            ),
            idle_comment_chance: env_chance(
                "WITWAGER_IDLE_COMMENT_CHANCE",
                defaults.idle_comment_chance,
            ),
            idle_interval: Duration::from_secs(env_parse(
                "WITWAGER_IDLE_INTERVAL_SECS",
                defaults.idle_interval.as_secs(),
            )),
            bot_turn_delay: Duration::from_millis(env_parse(
                "WITWAGER_BOT_DELAY_MS",
                defaults.bot_turn_delay.as_millis() as u64,
            )),
        };

        tracing::info!(
            chaos_chance = config.chaos_chance,
            freeze_cost = config.freeze_cost,
            bomb_cost = config.bomb_cost,
            "Game config loaded"
        );

        config
    }
}

/// Connection settings for the external realtime document store
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    pub base_url: String,
    pub collection: String,
    pub poll_interval: Duration,
}

/// Server-level settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// None = no external store, every room runs in local mode
    pub remote_store: Option<RemoteStoreConfig>,
    /// Optional replacement for the built-in question bank
    pub questions_path: Option<PathBuf>,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8023)),
            remote_store: None,
            questions_path: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    /// Load server settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let remote_store = env_string("WITWAGER_STORE_URL").map(|base_url| RemoteStoreConfig {
            base_url,
            collection: env_string("WITWAGER_STORE_COLLECTION")
                .unwrap_or_else(|| "rooms".to_string()),
            poll_interval: Duration::from_millis(env_parse("WITWAGER_STORE_POLL_MS", 500)),
        });

        if remote_store.is_none() {
            tracing::warn!("WITWAGER_STORE_URL not set - running in local simulation mode");
        }

        Self {
            bind_addr: env_parse("WITWAGER_BIND", defaults.bind_addr),
            remote_store,
            questions_path: env_string("WITWAGER_QUESTIONS_PATH").map(PathBuf::from),
            static_dir: env_string("WITWAGER_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }
}

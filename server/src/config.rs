//! Server configuration, loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a typed default and is overridable via env var. Parsing is
//! forgiving: a malformed value falls back to the default rather than
//! aborting startup.

use engine::bag::Language;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_TURN_DURATION_MS: u64 = 120_000;
const DEFAULT_MAX_CONSECUTIVE_PASSES: u32 = 6;
const DEFAULT_IDLE_ROOM_TTL_SECS: u64 = 30 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_TURN_TICK_MS: u64 = 1_000;
const DEFAULT_WORD_LOOKUP_TIMEOUT_MS: u64 = 1_000;

/// Runtime knobs for the whole process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener port for the websocket/health endpoints.
    pub port: u16,
    /// Allowed browser origin; `None` means permissive.
    pub client_origin: Option<String>,
    /// Explicit word-list path; `None` triggers auto-discovery.
    pub words_path: Option<String>,
    /// Which letter distribution fills new bags.
    pub language: Language,
    /// How long each turn lasts before a forced pass.
    pub turn_duration_ms: u64,
    /// Consecutive non-scoring actions that end the game.
    pub max_consecutive_passes: u32,
    /// Idle threshold after which an unconnected room is evicted.
    pub idle_room_ttl_secs: u64,
    /// Cadence of the idle-room sweep.
    pub sweep_interval_secs: u64,
    /// Cadence of the turn-deadline tick.
    pub turn_tick_ms: u64,
    /// Deadline for a single dictionary lookup; elapsed means invalid.
    pub word_lookup_timeout_ms: u64,
    /// Whether an exchange counts toward the stall-out pass counter.
    pub exchange_counts_as_pass: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            client_origin: std::env::var("CLIENT_ORIGIN").ok().filter(|v| !v.is_empty()),
            words_path: std::env::var("WORDS_PATH").ok().filter(|v| !v.is_empty()),
            language: parse_language(std::env::var("GAME_LANGUAGE").ok().as_deref()),
            turn_duration_ms: env_parse("TURN_DURATION_MS", DEFAULT_TURN_DURATION_MS),
            max_consecutive_passes: env_parse("MAX_CONSECUTIVE_PASSES", DEFAULT_MAX_CONSECUTIVE_PASSES),
            idle_room_ttl_secs: env_parse("IDLE_ROOM_TTL_SECS", DEFAULT_IDLE_ROOM_TTL_SECS),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS),
            turn_tick_ms: env_parse("TURN_TICK_MS", DEFAULT_TURN_TICK_MS),
            word_lookup_timeout_ms: env_parse("WORD_LOOKUP_TIMEOUT_MS", DEFAULT_WORD_LOOKUP_TIMEOUT_MS),
            exchange_counts_as_pass: env_parse("EXCHANGE_COUNTS_AS_PASS", true),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            client_origin: None,
            words_path: None,
            language: Language::English,
            turn_duration_ms: DEFAULT_TURN_DURATION_MS,
            max_consecutive_passes: DEFAULT_MAX_CONSECUTIVE_PASSES,
            idle_room_ttl_secs: DEFAULT_IDLE_ROOM_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            turn_tick_ms: DEFAULT_TURN_TICK_MS,
            word_lookup_timeout_ms: DEFAULT_WORD_LOOKUP_TIMEOUT_MS,
            exchange_counts_as_pass: true,
        }
    }
}

fn parse_language(value: Option<&str>) -> Language {
    match value.map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("FR") => Language::French,
        _ => Language::English,
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    /// Bound on how long a writer waits for the database write lock before
    /// surfacing a (sanitized) error instead of hanging the caller.
    pub busy_timeout_ms: u64,
    /// Invitations allowed per (actor, project) per window.
    pub invite_limit: i64,
    /// Role updates / removals allowed per (actor, project) per window.
    pub mutate_limit: i64,
    /// Rate-limit window length in seconds.
    pub rate_window_secs: i64,
    /// Bounds of the uniform random delay added on enumeration-sensitive
    /// invitation failures. `noise_max_ms = 0` disables the delay.
    pub noise_min_ms: u64,
    pub noise_max_ms: u64,
    /// Session lifetime for dev-minted sessions.
    pub session_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CREWDECK_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "crewdeck.db".to_string()),
            dev_mode,
            busy_timeout_ms: env_parse("DB_BUSY_TIMEOUT_MS", 5_000),
            invite_limit: env_parse("INVITE_RATE_LIMIT", 10),
            mutate_limit: env_parse("MEMBER_MUTATION_RATE_LIMIT", 20),
            rate_window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 900),
            noise_min_ms: env_parse("INVITE_NOISE_MIN_MS", 50),
            noise_max_ms: env_parse("INVITE_NOISE_MAX_MS", 250),
            session_ttl_secs: env_parse("SESSION_TTL_SECS", 86_400),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

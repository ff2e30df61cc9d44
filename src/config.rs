use std::env;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub moderation_url: String,
    pub auth_key: String,
    pub context_window_minutes: u64,
    pub check_interval_seconds: u64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            discord_token: env::var("DISCORD_BOT_TOKEN")
                .expect("Expected DISCORD_BOT_TOKEN in env"),
            moderation_url: env::var("MODERATION_URL")
                .expect("Expected MODERATION_URL in env"),
            auth_key: env::var("AUTH_KEY")
                .expect("Expected AUTH_KEY in env"),
            context_window_minutes: parse_or("CONTEXT_WINDOW_MINUTES", 10),
            check_interval_seconds: parse_or("CHECK_INTERVAL_SECONDS", 60),
            port: parse_or("PORT", 3000),
        }
    }

    pub fn context_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.context_window_minutes as i64)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    #[serde(alias = "DATABASE_URL")]
    pub database_url: String,
    #[serde(alias = "ADMIN_PASSWORD_HASH")]
    pub admin_password_hash: String,
    /// Accepted votes per identity, per category, per canonical day.
    #[serde(default = "default_vote_limit", alias = "VOTE_LIMIT")]
    pub vote_limit: u32,
    /// IANA zone name the daily window resets in. One zone for the whole
    /// deployment; server-local time is never consulted.
    #[serde(default = "default_vote_timezone", alias = "VOTE_TIMEZONE")]
    pub vote_timezone: String,
    #[serde(default = "default_rocket_port", alias = "ROCKET_PORT")]
    pub rocket_port: u16,
}

fn default_vote_limit() -> u32 {
    5
}

fn default_vote_timezone() -> String {
    "UTC".to_string()
}

fn default_rocket_port() -> u16 {
    8000
}

impl AppConfig {
    pub fn load() -> Self {
        Figment::new()
            .merge(Toml::file("Config.toml"))
            .merge(Toml::file("../Config.toml"))
            .merge(Env::raw().only(&[
                "DATABASE_URL",
                "ADMIN_PASSWORD_HASH",
                "VOTE_LIMIT",
                "VOTE_TIMEZONE",
                "ROCKET_PORT",
            ]))
            .extract()
            .expect(
                "Failed to load configuration. Ensure Config.toml exists or environment variables are set (DATABASE_URL, ADMIN_PASSWORD_HASH).",
            )
    }

    /// Parsed canonical zone. Panics at startup on a bad name rather than
    /// letting every node fall back to its own local time.
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.vote_timezone
            .parse()
            .unwrap_or_else(|_| panic!("Invalid VOTE_TIMEZONE '{}'", self.vote_timezone))
    }
}

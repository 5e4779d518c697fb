//! Application settings, read from `settings.toml` with `MONETA_*`
//! environment overrides (double underscore as the section separator,
//! e.g. `MONETA_OPENAI__API_KEY`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Mx {
    pub base_url: String,
    pub client_id: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAi {
    pub api_key: String,
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
    pub realtime_model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pinecone {
    pub api_key: String,
    pub index_host: String,
}

#[derive(Debug, Deserialize)]
pub struct Notify {
    pub email_webhook: Option<String>,
    pub sms_webhook: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
pub struct Sync {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub database: Database,
    pub redis: Option<Redis>,
    pub mx: Mx,
    pub openai: OpenAi,
    pub pinecone: Pinecone,
    pub notify: Option<Notify>,
    pub auth: Auth,
    pub sync: Option<Sync>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .add_source(Environment::with_prefix("MONETA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

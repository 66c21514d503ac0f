use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub port: u16,
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrexPay {
    pub url: String,
    pub token: String,
    pub secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Webhook {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attribution {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub trexpay: TrexPay,
    #[serde(default)]
    pub webhook: Webhook,
    pub attribution: Attribution,
}

impl Settings {
    /// Optional `config.toml`, overridden by environment variables
    /// (`APP_TREXPAY__TOKEN`, `APP_WEBHOOK__SECRET`, ...). Credentials
    /// default to empty so a misconfigured deploy degrades to typed
    /// credential errors instead of refusing to boot.
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("trexpay.url", "https://api.trexpagamentos.com/api")?
            .set_default("trexpay.token", "")?
            .set_default("trexpay.secret", "")?
            .set_default(
                "attribution.url",
                "https://api.utmify.com.br/api-credentials/orders",
            )?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Base URL the gateway calls back on. Platform-provided host first,
    /// then the configured public URL, then localhost.
    pub fn callback_base(&self) -> String {
        if let Ok(host) = std::env::var("APP_HOST") {
            if !host.is_empty() {
                return format!("https://{}", host.trim_end_matches('/'));
            }
        }
        if let Some(url) = &self.server.public_url {
            if !url.is_empty() {
                return url.trim_end_matches('/').to_string();
            }
        }
        format!("http://localhost:{}", self.server.port)
    }
}

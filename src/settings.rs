use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// Upper bound for the token exchange call, whatever the configuration says
pub const MAX_EXCHANGE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BrokerSettings {
    pub application: ApplicationSettings,
    pub provider: ProviderSettings,
    pub exchange: ExchangeSettings,
    pub state: StateSettings,
    pub audit: AuditSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" | "test" | "staging" => Some(Self::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Where failed handshakes are sent, with `?error=<reason>` appended
    pub login_path: String,
    /// Where the browser lands after a successful handshake
    pub landing_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: String,
    /// FHIR base URL sent as the SMART `aud` parameter
    pub fhir_base_url: Option<String>,
    pub extra_auth_params: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StateSettings {
    /// Remember consumed state tokens server-side until they expire
    pub enforce_single_use: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    #[default]
    Jsonl,
    Log,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub sink: AuditSinkKind,
    pub log_path: String,
    /// Trusted header carrying the signed-in user's id, set by the fronting gateway
    pub actor_header: Option<String>,
    pub resource_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::default(),
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "epic".to_string(),
            client_id: None,
            client_secret: None,
            authorize_endpoint: None,
            token_endpoint: None,
            redirect_uri: None,
            scope: "launch/patient openid fhirUser patient/*.read".to_string(),
            fhir_base_url: None,
            extra_auth_params: HashMap::new(),
        }
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: MAX_EXCHANGE_TIMEOUT_SECONDS,
        }
    }
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::default(),
            log_path: "audit.jsonl".to_string(),
            actor_header: None,
            resource_type: "epic_fhir".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provider configuration after validation; every required field is present
#[derive(Clone)]
pub struct ResolvedProvider {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_endpoint: url::Url,
    pub token_endpoint: url::Url,
    pub redirect_uri: String,
    pub scope: String,
    pub fhir_base_url: Option<String>,
    pub extra_auth_params: HashMap<String, String>,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("authorize_endpoint", &self.authorize_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("fhir_base_url", &self.fhir_base_url)
            .field("extra_auth_params", &self.extra_auth_params)
            .finish()
    }
}

impl BrokerSettings {
    /// Load settings from configuration files and environment variables, then
    /// initialize logging
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] if a settings file cannot be read
    /// or parsed.
    pub fn load() -> Result<Self, BrokerError> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.initialize_logging();

        Ok(settings)
    }

    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately)
    /// 2. Settings.toml in `BROKER_SECRETS_DIR`
    /// 3. Settings.toml in the current directory
    /// 4. Defaults
    fn load_base_settings() -> Result<Self, BrokerError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
        }

        if let Ok(secrets_dir) = std::env::var("BROKER_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] on I/O or TOML errors.
    pub fn from_file(path: &Path) -> Result<Self, BrokerError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BrokerError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| BrokerError::Configuration(format!("{}: {e}", path.display())))
    }

    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, BrokerError> {
        basic_toml::from_str(content)
            .map_err(|e| BrokerError::Configuration(format!("invalid settings TOML: {e}")))
    }

    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_provider_env_overrides(&mut settings.provider);
        Self::apply_exchange_env_overrides(&mut settings.exchange);
        Self::apply_audit_env_overrides(&mut settings.audit);
        if let Ok(level) = std::env::var("RUST_LOG") {
            settings.logging.level = level;
        }
    }

    fn apply_application_env_overrides(app: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            app.port = port;
        }
        if let Some(env) = std::env::var("APP_ENV").ok().and_then(|v| Environment::parse(&v)) {
            app.environment = env;
        }
        if let Ok(login_path) = std::env::var("LOGIN_PATH") {
            app.login_path = login_path;
        }
        if let Ok(landing_path) = std::env::var("LANDING_PATH") {
            app.landing_path = landing_path;
        }
    }

    /// Apply environment overrides for the identity provider
    pub fn apply_provider_env_overrides(provider: &mut ProviderSettings) {
        Self::apply_optional_env_override("EPIC_CLIENT_ID", &mut provider.client_id);
        Self::apply_optional_env_override("EPIC_CLIENT_SECRET", &mut provider.client_secret);
        Self::apply_optional_env_override("EPIC_REDIRECT_URI", &mut provider.redirect_uri);
        Self::apply_optional_env_override("EPIC_AUTHORIZE_URL", &mut provider.authorize_endpoint);
        Self::apply_optional_env_override("EPIC_TOKEN_URL", &mut provider.token_endpoint);
        Self::apply_optional_env_override("EPIC_FHIR_BASE_URL", &mut provider.fhir_base_url);
        if let Ok(scope) = std::env::var("EPIC_SCOPE") {
            provider.scope = scope;
        }
    }

    fn apply_exchange_env_overrides(exchange: &mut ExchangeSettings) {
        if let Some(timeout) = std::env::var("EXCHANGE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            exchange.timeout_seconds = timeout;
        }
    }

    fn apply_audit_env_overrides(audit: &mut AuditSettings) {
        if let Ok(path) = std::env::var("AUDIT_LOG_PATH") {
            audit.log_path = path;
        }
    }

    /// Empty values count as unset so a blank variable cannot mask a file value
    fn apply_optional_env_override(env_var: &str, target: &mut Option<String>) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                *target = Some(value);
            }
        }
    }

    /// Load environment variables from a .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    fn initialize_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.logging.level.as_str());
        if env_logger::Builder::from_env(env).try_init().is_err() {
            log::debug!("Logger already initialized");
        }
    }

    /// Check that every secret and endpoint the handshake needs is present
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Configuration`] naming the first missing or
    /// malformed value.
    pub fn resolve_provider(&self) -> Result<ResolvedProvider, BrokerError> {
        let provider = &self.provider;
        let client_id = required(provider.client_id.as_ref(), "provider.client_id")?;
        let client_secret = required(provider.client_secret.as_ref(), "provider.client_secret")?;
        let redirect_uri = required(provider.redirect_uri.as_ref(), "provider.redirect_uri")?;
        let authorize_endpoint = required_url(
            provider.authorize_endpoint.as_ref(),
            "provider.authorize_endpoint",
        )?;
        let token_endpoint =
            required_url(provider.token_endpoint.as_ref(), "provider.token_endpoint")?;
        url::Url::parse(&redirect_uri).map_err(|e| {
            BrokerError::Configuration(format!("provider.redirect_uri is not a valid URL: {e}"))
        })?;
        if provider.scope.trim().is_empty() {
            return Err(BrokerError::Configuration(
                "provider.scope must not be empty".to_string(),
            ));
        }

        Ok(ResolvedProvider {
            name: provider.name.clone(),
            client_id,
            client_secret,
            authorize_endpoint,
            token_endpoint,
            redirect_uri,
            scope: provider.scope.clone(),
            fhir_base_url: provider.fhir_base_url.clone().filter(|s| !s.trim().is_empty()),
            extra_auth_params: provider.extra_auth_params.clone(),
        })
    }

    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Whether cookies carry the `Secure` attribute
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.application.environment.is_production()
    }

    #[must_use]
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(
            self.exchange
                .timeout_seconds
                .clamp(1, MAX_EXCHANGE_TIMEOUT_SECONDS),
        )
    }
}

fn required(value: Option<&String>, name: &str) -> Result<String, BrokerError> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| BrokerError::Configuration(format!("{name} is required")))
}

fn required_url(value: Option<&String>, name: &str) -> Result<url::Url, BrokerError> {
    let raw = required(value, name)?;
    url::Url::parse(&raw)
        .map_err(|e| BrokerError::Configuration(format!("{name} is not a valid URL: {e}")))
}

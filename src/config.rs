use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::auth::keys::DEFAULT_REFRESH_INTERVAL;

/// Directories searched for `.env.local` / `.env`, in order.
const ENV_LOCATIONS: [&str; 3] = [".", "..", "../.."];
/// Env file names tried in each location, in order.
const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// The scope required on every admin route unless overridden.
pub const DEFAULT_REQUIRED_SCOPE: &str = "admin:execute";

/// Token validation settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The issuer's base URL (`AUTH0_DOMAIN`), scheme included.
    pub domain: String,
    /// The audience tokens must be issued for.
    pub audience: String,
    /// The scope required on admin routes.
    pub required_scope: String,
    /// How often the signing keys are re-fetched.
    pub jwks_refresh_interval: Duration,
}

impl AuthConfig {
    /// The expected `iss` claim: the domain with exactly one trailing slash.
    pub fn issuer(&self) -> String {
        format!("{}/", self.domain.trim_end_matches('/'))
    }

    /// The issuer's published key set.
    pub fn jwks_uri(&self) -> String {
        format!("{}.well-known/jwks.json", self.issuer())
    }
}

/// Document store settings.
#[derive(Clone)]
pub struct CosmosConfig {
    /// The account endpoint. Empty selects the in-memory store.
    pub endpoint: String,
    /// The base64 account key.
    pub key: Zeroizing<String>,
    /// The database name.
    pub database: String,
    /// The container holding speakers.
    pub speaker_container: String,
    /// The container holding sessions.
    pub session_container: String,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The port to listen on.
    pub port: u16,
    /// The deployment environment name.
    pub environment: String,
    /// Whether the service runs against local infrastructure.
    pub is_local: bool,
    /// Token validation settings.
    pub auth: AuthConfig,
    /// Document store settings.
    pub cosmos: CosmosConfig,
}

/// Loads the first `.env.local` or `.env` found near the working directory.
///
/// # Returns
///
/// The path of the loaded file, if any.
pub fn load_env_files() -> Option<PathBuf> {
    for location in ENV_LOCATIONS {
        for file in ENV_FILES {
            let path = Path::new(location).join(file);
            if dotenvy::from_path(&path).is_ok() {
                tracing::info!("✅ Loaded environment variables from: {}", path.display());
                return Some(path);
            }
        }
    }

    tracing::info!("No .env file found, using system environment variables");
    None
}

/// Returns the value, or `default` when absent or empty.
fn env_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `true`/`1` are true, any other value is false, absent uses `default`.
fn env_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
    }
}

/// Adds `https://` to a bare host.
fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a `Config` reading each variable through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let domain = lookup("AUTH0_DOMAIN")
            .filter(|v| !v.trim().is_empty())
            .context("AUTH0_DOMAIN must be set")?;
        let audience = lookup("AUTH0_AUDIENCE")
            .filter(|v| !v.trim().is_empty())
            .context("AUTH0_AUDIENCE must be set")?;

        let refresh_secs: u64 = env_or(
            lookup("JWKS_REFRESH_SECS"),
            &DEFAULT_REFRESH_INTERVAL.as_secs().to_string(),
        )
        .parse()
        .context("Invalid JWKS_REFRESH_SECS")?;
        if refresh_secs == 0 {
            anyhow::bail!("JWKS_REFRESH_SECS must be greater than zero");
        }

        let endpoint = env_or(lookup("COSMOSDB_ENDPOINT"), "");
        let key = Zeroizing::new(env_or(lookup("COSMOSDB_KEY"), ""));
        if !endpoint.is_empty() && key.is_empty() {
            anyhow::bail!("COSMOSDB_KEY must be set when COSMOSDB_ENDPOINT is set");
        }

        Ok(Self {
            port: env_or(lookup("PORT"), "8084")
                .parse()
                .context("Invalid PORT")?,
            environment: env_or(lookup("ENVIRONMENT"), "development"),
            is_local: env_bool(lookup("LOCAL"), true),
            auth: AuthConfig {
                domain: normalize_domain(&domain),
                audience,
                required_scope: env_or(lookup("AUTH0_SCOPE"), DEFAULT_REQUIRED_SCOPE),
                jwks_refresh_interval: Duration::from_secs(refresh_secs),
            },
            cosmos: CosmosConfig {
                endpoint,
                key,
                database: env_or(lookup("COSMOSDB_DATABASE"), "conferenti"),
                speaker_container: env_or(lookup("COSMOSDB_SPEAKER_CONTAINER"), "speakers"),
                session_container: env_or(lookup("COSMOSDB_SESSION_CONTAINER"), "sessions"),
            },
        })
    }
}

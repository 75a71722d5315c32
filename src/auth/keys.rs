//! Issuer signing keys.
//!
//! [`KeyProvider`] owns the issuer's public keys. The whole key set lives
//! behind an [`ArcSwap`]: lookups load the current snapshot without locking
//! and a refresh replaces the snapshot in one store, so readers never see a
//! partial set.
//!
//! Refreshes happen three ways:
//! - once at construction (failure is fatal to bootstrap),
//! - on a timer, via [`KeyProvider::spawn_refresh_task`],
//! - on a cache miss.
//!
//! Timer and miss refreshes share one gate: a fetch starts only when no other
//! fetch is running and the last *attempt* is at least one refresh interval
//! old. Failed attempts count, so a failing issuer is asked at most once per
//! interval.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use jsonwebtoken::{
    DecodingKey,
    jwk::{JwkSet, KeyAlgorithm},
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error::AuthError;

/// Default interval between key set refreshes (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Default timeout of one JWKS request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A public key able to verify token signatures.
#[derive(Clone)]
pub struct SigningKey {
    /// Matches the `kid` of the token header.
    pub kid: String,
    /// The algorithm the issuer declared for this key, if any.
    pub algorithm: Option<KeyAlgorithm>,
    /// The verification key.
    pub key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Where the issuer's JSON Web Key Set comes from.
#[async_trait]
pub trait JwksSource: Send + Sync {
    /// Fetches the complete key set.
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set from the issuer's well-known endpoint.
pub struct HttpJwksSource {
    client: reqwest::Client,
    uri: String,
}

impl HttpJwksSource {
    /// Creates a source reading `uri` with the default request timeout.
    pub fn new(uri: impl Into<String>) -> Result<Self, AuthError> {
        Self::with_timeout(uri, DEFAULT_FETCH_TIMEOUT)
    }

    /// Creates a source reading `uri`; each request is abandoned after `timeout`.
    pub fn with_timeout(uri: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::JwksFetch(format!("Failed to build JWKS client: {e}")))?;

        Ok(Self {
            client,
            uri: uri.into(),
        })
    }

    /// The endpoint this source reads.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!("🔑 Fetching JWKS from {}", self.uri);

        let response = self.client.get(&self.uri).send().await.map_err(|e| {
            AuthError::JwksFetch(format!("Failed to fetch JWKS from '{}': {}", self.uri, e))
        })?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "JWKS request to '{}' returned status {}",
                self.uri,
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            AuthError::JwksFetch(format!("Failed to parse JWKS from '{}': {}", self.uri, e))
        })
    }
}

/// A fixed key set that can be swapped by hand.
///
/// Used for local wiring and tests where no issuer is reachable.
pub struct StaticJwksSource {
    keys: ArcSwap<JwkSet>,
}

impl StaticJwksSource {
    /// Creates a source serving `keys`.
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: ArcSwap::from_pointee(keys),
        }
    }

    /// Replaces the served key set, as an issuer does when rotating keys.
    pub fn replace(&self, keys: JwkSet) {
        self.keys.store(Arc::new(keys));
    }
}

#[async_trait]
impl JwksSource for StaticJwksSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok((**self.keys.load()).clone())
    }
}

struct KeySnapshot {
    keys: HashMap<String, SigningKey>,
    fetched_at: Instant,
}

/// Resets the in-flight flag even if the refreshing future is dropped.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Caches the issuer's signing keys and refreshes them on an interval.
pub struct KeyProvider {
    source: Arc<dyn JwksSource>,
    snapshot: ArcSwap<KeySnapshot>,
    refresh_interval: Duration,
    refreshing: AtomicBool,
    last_attempt: Mutex<Instant>,
}

impl KeyProvider {
    /// Creates a provider and performs the first fetch.
    ///
    /// # Arguments
    ///
    /// * `source` - Where the key set is fetched from.
    /// * `refresh_interval` - Minimum age of the key set before it is fetched again.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `KeyProvider`, or the error of the first fetch.
    pub async fn new(
        source: Arc<dyn JwksSource>,
        refresh_interval: Duration,
    ) -> Result<Self, AuthError> {
        let provider = Self {
            source,
            snapshot: ArcSwap::from_pointee(KeySnapshot {
                keys: HashMap::new(),
                fetched_at: Instant::now(),
            }),
            refresh_interval,
            refreshing: AtomicBool::new(false),
            last_attempt: Mutex::new(Instant::now()),
        };
        provider.fetch_and_swap().await?;

        Ok(provider)
    }

    /// The configured refresh interval.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Number of keys in the current snapshot.
    pub fn key_count(&self) -> usize {
        self.snapshot.load().keys.len()
    }

    /// Looks `kid` up in the current snapshot. Never touches the network.
    pub fn get_key(&self, kid: &str) -> Result<SigningKey, AuthError> {
        self.snapshot
            .load()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Looks `kid` up, refreshing first on a miss when the last fetch attempt
    /// is older than the refresh interval.
    pub async fn key_for(&self, kid: &str) -> Result<SigningKey, AuthError> {
        if let Ok(key) = self.get_key(kid) {
            return Ok(key);
        }

        self.refresh_if_stale().await;
        self.get_key(kid)
    }

    /// Fetches the key set now, ignoring its age.
    ///
    /// A failed fetch keeps the last good set. Fails without fetching when
    /// another refresh is already running.
    ///
    /// # Returns
    ///
    /// A `Result` containing the number of usable keys.
    pub async fn refresh(&self) -> Result<usize, AuthError> {
        self.try_refresh(false).await.unwrap_or_else(|| {
            Err(AuthError::JwksFetch(
                "another JWKS refresh is in flight".to_string(),
            ))
        })
    }

    /// Time since the last fetch attempt, successful or not.
    fn since_last_attempt(&self) -> Duration {
        self.last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Runs one fetch behind the single-flight gate.
    ///
    /// Returns `None` when the fetch was skipped: another one is running, or
    /// `only_if_stale` is set and the last attempt is younger than the interval.
    async fn try_refresh(&self, only_if_stale: bool) -> Option<Result<usize, AuthError>> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            tracing::debug!("JWKS refresh already in flight, serving cached keys");
            return None;
        }
        let _guard = RefreshGuard(&self.refreshing);

        // Checked under the flag so concurrent callers see the attempt below.
        if only_if_stale && self.since_last_attempt() < self.refresh_interval {
            tracing::debug!("JWKS fetched recently, serving cached keys");
            return None;
        }

        *self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();

        Some(self.fetch_and_swap().await)
    }

    async fn fetch_and_swap(&self) -> Result<usize, AuthError> {
        let jwks = self.source.fetch().await?;
        let keys = usable_keys(jwks);

        if keys.is_empty() {
            return Err(AuthError::JwksFetch(
                "key set contains no usable signing keys".to_string(),
            ));
        }

        let count = keys.len();
        self.snapshot.store(Arc::new(KeySnapshot {
            keys,
            fetched_at: Instant::now(),
        }));
        tracing::info!("🔑 JWKS refreshed with {} keys", count);

        Ok(count)
    }

    async fn refresh_if_stale(&self) {
        if let Some(Err(e)) = self.try_refresh(true).await {
            tracing::warn!(
                "⚠️ On-demand JWKS refresh failed, keeping keys {}s old: {}",
                self.snapshot_age().as_secs(),
                e
            );
        }
    }

    /// Age of the current key set.
    pub fn snapshot_age(&self) -> Duration {
        self.snapshot.load().fetched_at.elapsed()
    }

    /// Spawns the periodic refresh loop. It stops when `shutdown` is cancelled.
    pub fn spawn_refresh_task(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let provider = Arc::clone(self);

        tokio::spawn(async move {
            // `interval` panics on a zero period.
            let period = provider.refresh_interval.max(Duration::from_millis(10));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the constructor already fetched.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("🛑 JWKS refresh task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Some(Err(e)) = provider.try_refresh(true).await {
                            tracing::error!("❌ Scheduled JWKS refresh failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

/// Keeps the keys that carry a `kid` and convert into a verification key.
fn usable_keys(jwks: JwkSet) -> HashMap<String, SigningKey> {
    jwks.keys
        .into_iter()
        .filter_map(|jwk| {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!("Ignoring JWK without 'kid'");
                return None;
            };

            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => Some((
                    kid.clone(),
                    SigningKey {
                        kid,
                        algorithm: jwk.common.key_algorithm,
                        key,
                    },
                )),
                Err(e) => {
                    tracing::warn!("Ignoring invalid JWK '{}': {}", kid, e);
                    None
                }
            }
        })
        .collect()
}

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, jwk::JwkSet};
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use zeroize::Zeroizing;

use tokio::sync::Notify;

use conferenti_admin_api::{
    auth::{
        error::AuthError,
        keys::{JwksSource, KeyProvider, StaticJwksSource},
    },
    config::{AuthConfig, Config, CosmosConfig},
    db::Containers,
    state::AppState,
    store::memory::MemoryStore,
};

pub const ISSUER_DOMAIN: &str = "https://conferenti.eu.auth0.com";
pub const ISSUER: &str = "https://conferenti.eu.auth0.com/";
pub const AUDIENCE: &str = "https://admin.conferenti.dev";
pub const ADMIN_SCOPE: &str = "admin:execute";

pub const KID: &str = "test-key-1";
pub const ROTATED_KID: &str = "test-key-2";

const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
const SIGNING_KEY_N: &str = include_str!("../fixtures/signing_key.n");
const ROTATED_KEY_PEM: &str = include_str!("../fixtures/rotated_key.pem");
const ROTATED_KEY_N: &str = include_str!("../fixtures/rotated_key.n");

pub static SIGNING_KEY: Lazy<EncodingKey> =
    Lazy::new(|| EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).unwrap());
pub static ROTATED_KEY: Lazy<EncodingKey> =
    Lazy::new(|| EncodingKey::from_rsa_pem(ROTATED_KEY_PEM.as_bytes()).unwrap());

/// Page size small enough that a handful of documents spans several pages.
pub const PAGE_SIZE: usize = 2;

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": n.trim(),
        "e": "AQAB"
    })
}

/// A JWKS holding the primary signing key.
pub fn jwks() -> JwkSet {
    jwks_from(vec![rsa_jwk(KID, SIGNING_KEY_N)])
}

/// A JWKS holding both the primary and the rotated key.
pub fn rotated_jwks() -> JwkSet {
    jwks_from(vec![
        rsa_jwk(KID, SIGNING_KEY_N),
        rsa_jwk(ROTATED_KID, ROTATED_KEY_N),
    ])
}

/// A JWKS with one key lacking a `kid` next to the primary key.
pub fn jwks_with_anonymous_key() -> JwkSet {
    let mut anonymous = rsa_jwk("unused", ROTATED_KEY_N);
    anonymous
        .as_object_mut()
        .unwrap()
        .remove("kid");
    jwks_from(vec![anonymous, rsa_jwk(KID, SIGNING_KEY_N)])
}

pub fn jwks_from(keys: Vec<Value>) -> JwkSet {
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

/// Claims for a valid admin token, one hour from expiry.
pub fn admin_claims() -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|admin",
        "iat": now(),
        "exp": now() + 3600,
        "scope": "openid admin:execute",
        "permissions": ["read:sessions", "write:sessions"]
    })
}

/// Signs `claims` as an RS256 token.
pub fn mint_token(claims: &Value, kid: Option<&str>, key: &EncodingKey) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, key).unwrap()
}

/// A valid admin token signed with the primary key.
pub fn admin_token() -> String {
    mint_token(&admin_claims(), Some(KID), &SIGNING_KEY)
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        environment: "test".to_string(),
        is_local: true,
        auth: AuthConfig {
            domain: ISSUER_DOMAIN.to_string(),
            audience: AUDIENCE.to_string(),
            required_scope: ADMIN_SCOPE.to_string(),
            jwks_refresh_interval: Duration::from_secs(3600),
        },
        cosmos: CosmosConfig {
            endpoint: String::new(),
            key: Zeroizing::new(String::new()),
            database: "conferenti".to_string(),
            speaker_container: "speakers".to_string(),
            session_container: "sessions".to_string(),
        },
    }
}

/// A key provider fed by an in-process source.
pub async fn key_provider(
    keys: JwkSet,
    refresh_interval: Duration,
) -> (Arc<StaticJwksSource>, Arc<KeyProvider>) {
    let source = Arc::new(StaticJwksSource::new(keys));
    let provider = KeyProvider::new(source.clone(), refresh_interval)
        .await
        .unwrap();
    (source, Arc::new(provider))
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A key source that counts fetches and can fail or stall on demand.
pub struct CountingSource {
    keys: Mutex<JwkSet>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    stalled: AtomicBool,
    resume: Notify,
}

impl CountingSource {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: Mutex::new(keys),
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            resume: Notify::new(),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn replace(&self, keys: JwkSet) {
        *self.keys.lock().unwrap() = keys;
    }

    /// Makes every later fetch fail like an unreachable issuer.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes the next fetch wait until [`CountingSource::resume`].
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.stalled.store(false, Ordering::SeqCst);
        self.resume.notify_one();
    }
}

#[async_trait]
impl JwksSource for CountingSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.stalled.load(Ordering::SeqCst) {
            self.resume.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::JwksFetch("issuer unavailable".to_string()));
        }

        Ok(self.keys.lock().unwrap().clone())
    }
}

/// A key provider fed by a [`CountingSource`].
pub async fn counting_key_provider(
    keys: JwkSet,
    refresh_interval: Duration,
) -> (Arc<CountingSource>, Arc<KeyProvider>) {
    let source = Arc::new(CountingSource::new(keys));
    let provider = KeyProvider::new(source.clone(), refresh_interval)
        .await
        .unwrap();
    (source, Arc::new(provider))
}

/// Application state over arbitrary containers.
pub async fn state_with(containers: Containers) -> AppState {
    let config = test_config();
    let (_, provider) = key_provider(jwks(), config.auth.jwks_refresh_interval).await;
    AppState::from_parts(config, provider, containers)
}

/// An in-memory application.
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();
        let (_, provider) = key_provider(jwks(), config.auth.jwks_refresh_interval).await;
        let store = MemoryStore::new(PAGE_SIZE);
        let containers = Containers::in_memory(&store, &config.cosmos);

        Self {
            state: AppState::from_parts(config, provider, containers),
            store,
        }
    }

    pub fn router(&self) -> Router {
        conferenti_admin_api::routes::build_router(self.state.clone())
    }
}

/// Builds a request, JSON encoding `body` when given.
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collects a response body as JSON.
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

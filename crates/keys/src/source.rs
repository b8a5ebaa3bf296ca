//! Key-source capability trait and implementations.
//!
//! [`KeySource`] abstracts resolution of the current [`SigningKeySet`] for a
//! trust domain so the authorizer can be constructed against production HTTP
//! fetching or a static set in tests.
//!
//! # Architecture
//!
//! ```text
//! token arrives → extract kid
//!               → KeySource::get_keys(jwks_url)
//!               → cold start? fetch the published document, cache for the
//!                 process lifetime
//!               → look up kid, verify signature
//! ```
//!
//! # Cache strategy
//!
//! [`HttpKeySource`] performs exactly one successful fetch per process
//! lifetime. Concurrent first callers coalesce on the same in-flight fetch;
//! nobody observes a partially populated set. A failed fetch leaves the cache
//! empty so the next caller retries. There is no TTL and no background
//! refresh: a rotation landing mid-lifetime is not picked up until restart,
//! which surfaces as key-not-found during token validation rather than as a
//! bad signature.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::{
    error::{KeyError, KeyResult},
    jwk::{JwksDocument, SigningKeySet},
};

/// Capability for resolving the current set of public signing keys.
///
/// Implementations must be safe to share across concurrently evaluated
/// requests.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Returns the current signing key set for the trust domain publishing
    /// at `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Unavailable`] if the set cannot be resolved.
    async fn get_keys(&self, jwks_url: &str) -> KeyResult<Arc<SigningKeySet>>;
}

/// HTTP-backed [`KeySource`] with a once-per-process cache.
///
/// One `HttpKeySource` serves one trust domain: the set fetched for the
/// first requested URL is returned for every subsequent call.
///
/// # Examples
///
/// ```no_run
/// use tasklane_keys::{HttpKeySource, KeySource};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpKeySource::new();
/// let keys = source
///     .get_keys("https://cognito-idp.us-east-1.amazonaws.com/us-east-1_Example/.well-known/jwks.json")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HttpKeySource {
    client: reqwest::Client,
    keys: OnceCell<Arc<SigningKeySet>>,
}

impl HttpKeySource {
    /// Creates a key source with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a key source with a caller-configured HTTP client.
    ///
    /// Use this to set connect and request timeouts; a fetch timeout surfaces
    /// as [`KeyError::Unavailable`] exactly like any other fetch failure.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, keys: OnceCell::new() }
    }

    async fn fetch(&self, jwks_url: &str) -> KeyResult<Arc<SigningKeySet>> {
        let response = self.client.get(jwks_url).send().await?.error_for_status()?;
        let document: JwksDocument = response.json().await?;

        let set = SigningKeySet::new(jwks_url, document.keys);
        tracing::info!(url = jwks_url, key_count = set.len(), "signing key set fetched");

        Ok(Arc::new(set))
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[tracing::instrument(skip(self))]
    async fn get_keys(&self, jwks_url: &str) -> KeyResult<Arc<SigningKeySet>> {
        if let Some(keys) = self.keys.get() {
            tracing::debug!("signing key set cache hit");
            return Ok(Arc::clone(keys));
        }

        // Concurrent cold-start callers coalesce here: exactly one fetch
        // runs and the rest wait on it. Errors do not populate the cell.
        self.keys.get_or_try_init(|| self.fetch(jwks_url)).await.cloned()
    }
}

/// [`KeySource`] backed by a prebuilt key set.
///
/// Ignores the requested URL and serves whatever set it holds. The set can
/// be swapped with [`replace`](Self::replace) to simulate a key rotation the
/// process has not observed.
#[derive(Clone, Debug)]
pub struct StaticKeySource {
    keys: Arc<RwLock<Arc<SigningKeySet>>>,
}

impl StaticKeySource {
    /// Creates a source serving the given key set.
    #[must_use]
    pub fn new(set: SigningKeySet) -> Self {
        Self { keys: Arc::new(RwLock::new(Arc::new(set))) }
    }

    /// Replaces the served key set.
    pub fn replace(&self, set: SigningKeySet) {
        *self.keys.write() = Arc::new(set);
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn get_keys(&self, _jwks_url: &str) -> KeyResult<Arc<SigningKeySet>> {
        Ok(Arc::clone(&self.keys.read()))
    }
}

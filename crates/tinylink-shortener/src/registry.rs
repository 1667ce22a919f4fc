use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tinylink_core::store::Result as StorageResult;
use tinylink_core::{
    Clock, Link, LinkStore, RegistryError, ShortCode, ShortenParams, Shortener, StorageError,
    SystemClock,
};
use tinylink_generator::Generator;
use typed_builder::TypedBuilder;
use url::Url;

type Result<T> = std::result::Result<T, RegistryError>;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(3);

/// Configures a [`LinkRegistry`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RegistrySettings {
    /// Public base URL that short codes are appended to.
    #[builder(setter(into))]
    pub base_url: String,
    /// How many random codes to try before giving up on collisions.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Upper bound for every individual storage call.
    #[builder(default = DEFAULT_OP_TIMEOUT)]
    pub op_timeout: Duration,
}

/// The link registry: the only writer of [`Link`] records.
///
/// The registry keeps no state of its own besides handles to its
/// collaborators, so it can be shared freely between request handlers.
/// Conflicting writes are serialized by the store's atomic operations, never
/// by locks here:
///
/// - uniqueness is decided by a single `create`, there is no
///   check-then-insert;
/// - hit counting is a single `increment_hit`.
///
/// On a collision a random code is regenerated up to
/// [`RegistrySettings::max_attempts`] times. A custom code is tried exactly
/// once.
pub struct LinkRegistry<S, G, C = SystemClock> {
    store: Arc<S>,
    generator: Arc<G>,
    clock: Arc<C>,
    settings: Arc<RegistrySettings>,
}

impl<S, G, C> Clone for LinkRegistry<S, G, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<S: LinkStore, G: Generator> LinkRegistry<S, G> {
    /// Creates a registry stamping links with the system clock.
    pub fn new(store: S, generator: G, settings: RegistrySettings) -> Self {
        Self::with_clock(store, generator, SystemClock, settings)
    }
}

impl<S: LinkStore, G: Generator, C: Clock> LinkRegistry<S, G, C> {
    pub fn with_clock(store: S, generator: G, clock: C, settings: RegistrySettings) -> Self {
        Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
            clock: Arc::new(clock),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Validates that the URL is absolute, uses http(s) and names a host.
    fn validate_url(raw: &str) -> Result<()> {
        let url = Url::parse(raw)
            .map_err(|e| RegistryError::InvalidUrl(format!("{raw}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                url.scheme()
            )));
        }

        // the url crate finds a host in `http:example.com`; require `scheme://`
        let has_authority = raw
            .split_once("://")
            .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(url.scheme()));

        if !has_authority || url.host_str().map_or(true, str::is_empty) {
            return Err(RegistryError::InvalidUrl(format!(
                "URL must have a host: {raw}"
            )));
        }

        Ok(())
    }

    /// Runs a storage call under the configured timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        let limit = self.settings.op_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StorageError::Timeout(format!("{op} exceeded {limit:?}")))?
    }

    async fn create_with_custom_code(&self, code: &str, long_url: String) -> Result<Link> {
        let code = ShortCode::new(code)?;
        let link = Link::new(code, long_url, self.clock.now());

        // Conflict maps to DuplicateCode: a chosen code is never swapped out.
        let create = self.store.create(link.clone());
        self.bounded("create", create).await?;
        Ok(link)
    }

    async fn create_with_random_code(&self, long_url: String) -> Result<Link> {
        let attempts = self.settings.max_attempts.max(1);

        for _ in 0..attempts {
            let code = self.generator.generate()?;
            let link = Link::new(code, long_url.clone(), self.clock.now());

            let create = self.store.create(link.clone());
            match self.bounded("create", create).await {
                Ok(()) => return Ok(link),
                Err(StorageError::Conflict(_)) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(RegistryError::RetriesExhausted { attempts })
    }
}

#[async_trait]
impl<S: LinkStore, G: Generator, C: Clock> Shortener for LinkRegistry<S, G, C> {
    async fn shorten(&self, params: ShortenParams) -> Result<Link> {
        Self::validate_url(&params.long_url)?;

        match params.custom_code.as_deref().filter(|code| !code.is_empty()) {
            Some(code) => self.create_with_custom_code(code, params.long_url).await,
            None => self.create_with_random_code(params.long_url).await,
        }
    }

    async fn resolve(&self, code: &ShortCode) -> Result<Option<Link>> {
        Ok(self.bounded("get", self.store.get(code)).await?)
    }

    async fn hit(&self, code: &ShortCode) -> Result<Link> {
        let now = self.clock.now();
        Ok(self
            .bounded("increment_hit", self.store.increment_hit(code, now))
            .await?)
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        Ok(self.bounded("delete", self.store.delete(code)).await?)
    }

    async fn list(&self) -> Result<Vec<Link>> {
        Ok(self.bounded("list", self.store.list()).await?)
    }

    fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.settings.base_url)
    }
}

use crate::link::Link;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::RegistryError>;

/// Parameters for creating a short link.
#[derive(Debug, Clone, Default)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub long_url: String,
    /// Optional caller-chosen code. An empty string counts as absent.
    pub custom_code: Option<String>,
}

impl ShortenParams {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            custom_code: None,
        }
    }

    pub fn with_custom_code(mut self, code: impl Into<String>) -> Self {
        self.custom_code = Some(code.into());
        self
    }
}

/// The interface request-handling layers use to manage short links.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a short link, either with the caller's custom code or a random one.
    async fn shorten(&self, params: ShortenParams) -> Result<Link>;

    /// Looks up a link without touching its counters.
    /// Returns `None` if the code does not exist.
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Link>>;

    /// Records a hit on the link and returns the updated record.
    async fn hit(&self, code: &ShortCode) -> Result<Link>;

    /// Permanently removes a link.
    async fn delete(&self, code: &ShortCode) -> Result<()>;

    /// Returns every link, in no particular order.
    async fn list(&self) -> Result<Vec<Link>>;

    /// Builds the public short URL for a code.
    fn short_url(&self, code: &ShortCode) -> String;
}

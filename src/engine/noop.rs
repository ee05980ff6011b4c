//! No-op engine for graceful degradation

use async_trait::async_trait;

use super::traits::{Engine, ExtractOptions, ProgressHook, RawMetadata};
use crate::config::TransferConfig;
use crate::error::{Error, Result};

/// Engine stub used when no real binding is wired up
///
/// Both calls return [`Error::NotSupported`], so a consumer that forgets to
/// supply an engine gets a clear error on the first queue item instead of a
/// panic.
///
/// # Examples
///
/// ```
/// use media_dl::engine::{Engine, ExtractOptions, NoOpEngine};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = NoOpEngine;
/// let result = engine
///     .extract_info("https://example.com/v", &ExtractOptions::single_item())
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct NoOpEngine;

#[async_trait]
impl Engine for NoOpEngine {
    async fn extract_info(&self, _url: &str, _options: &ExtractOptions) -> Result<RawMetadata> {
        Err(Error::NotSupported(
            "metadata extraction requires a retrieval engine binding".into(),
        ))
    }

    async fn transfer(
        &self,
        _url: &str,
        _config: &TransferConfig,
        _hook: ProgressHook<'_>,
    ) -> Result<()> {
        Err(Error::NotSupported(
            "transfers require a retrieval engine binding".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

//! Navigate, click, fill and upload with per-operation timeouts

use std::path::Path;
use std::time::Duration;

use cdp_adapter::{Locator, PageSurface};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    errors::ActionError,
    retry::retry_async,
    types::{ActionReport, RetryPolicy, Timeouts},
};

/// Primitive operations shared by every executor.
#[derive(Clone, Debug, Default)]
pub struct Primitives {
    timeouts: Timeouts,
    retry: RetryPolicy,
}

impl Primitives {
    pub fn new(timeouts: Timeouts, retry: RetryPolicy) -> Self {
        Self { timeouts, retry }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Same timeouts, one attempt per operation.
    pub fn without_retry(&self) -> Self {
        Self {
            timeouts: self.timeouts.clone(),
            retry: RetryPolicy::no_retry(),
        }
    }

    pub async fn navigate(
        &self,
        surface: &dyn PageSurface,
        url: &str,
    ) -> Result<ActionReport, ActionError> {
        if url.is_empty() {
            return Err(ActionError::Internal("URL cannot be empty".to_string()));
        }
        let started_at = Utc::now();
        let timeout = self.timeouts.navigation();
        let (_, attempts) = retry_async(&self.retry, "navigate", |attempt| async move {
            debug!(url, attempt, "goto");
            surface.goto(url, timeout).await.map_err(ActionError::from)
        })
        .await?;
        info!(url, attempts, "navigated");
        Ok(ActionReport::finish("navigate", url, attempts, started_at))
    }

    pub async fn click(
        &self,
        surface: &dyn PageSurface,
        locator: &Locator,
    ) -> Result<ActionReport, ActionError> {
        let started_at = Utc::now();
        let timeout = self.timeouts.element();
        let (_, attempts) = retry_async(&self.retry, "click", |_| async move {
            surface.click(locator, timeout).await.map_err(ActionError::from)
        })
        .await?;
        let descriptor = locator.to_descriptor();
        debug!(descriptor = %descriptor, attempts, "clicked");
        Ok(ActionReport::finish("click", &descriptor, attempts, started_at))
    }

    pub async fn fill(
        &self,
        surface: &dyn PageSurface,
        locator: &Locator,
        text: &str,
    ) -> Result<ActionReport, ActionError> {
        let started_at = Utc::now();
        let timeout = self.timeouts.element();
        let (_, attempts) = retry_async(&self.retry, "fill", |_| async move {
            surface
                .fill(locator, text, timeout)
                .await
                .map_err(ActionError::from)
        })
        .await?;
        let descriptor = locator.to_descriptor();
        debug!(descriptor = %descriptor, attempts, "filled");
        Ok(ActionReport::finish("fill", &descriptor, attempts, started_at))
    }

    /// Single attempt; the caller has already checked the file exists.
    pub async fn upload(
        &self,
        surface: &dyn PageSurface,
        selector: &str,
        path: &Path,
    ) -> Result<ActionReport, ActionError> {
        let started_at = Utc::now();
        surface
            .set_input_files(selector, path, self.timeouts.upload())
            .await?;
        info!(selector, path = %path.display(), "uploaded");
        Ok(ActionReport::finish("upload", selector, 1, started_at))
    }

    /// Reads the target's text, waiting for it to attach.
    pub async fn read_text(
        &self,
        surface: &dyn PageSurface,
        selector: &str,
    ) -> Result<String, ActionError> {
        Ok(surface.read_text(selector, self.timeouts.element()).await?)
    }
}

/// Suspends for `millis`, treating negative values as zero.
pub async fn pause(millis: i64) -> Duration {
    let duration = Duration::from_millis(millis.max(0) as u64);
    tokio::time::sleep(duration).await;
    duration
}

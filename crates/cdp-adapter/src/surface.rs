use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webpilot_core_types::HandleId;

use crate::error::SurfaceError;
use crate::locator::Locator;

/// Which family of live elements to enumerate for semantic ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateScope {
    /// Links, buttons and anything with a button role.
    Actionable,
    /// Inputs, textareas and editable regions.
    Editable,
}

/// Visible text and identifying attributes of one live element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCandidate {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl ElementCandidate {
    /// Text used when indexing the candidate for similarity ranking.
    pub fn document(&self) -> String {
        std::iter::once(self.text.as_str())
            .chain(self.attributes.iter().map(String::as_str))
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Best short label for a follow-up lookup by text.
    pub fn label(&self) -> Option<String> {
        let text = self.text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
        self.attributes
            .iter()
            .map(|attr| attr.trim())
            .find(|attr| !attr.is_empty())
            .map(str::to_string)
    }
}

/// A controllable page session. Holds one or more tabs with one active.
#[async_trait]
pub trait PageSurface: Send + Sync {
    fn id(&self) -> &HandleId;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), SurfaceError>;

    async fn current_url(&self) -> Result<String, SurfaceError>;

    /// Waits for a visible match, then clicks it.
    async fn click(&self, locator: &Locator, timeout: Duration) -> Result<(), SurfaceError>;

    /// Waits for a visible match, clears it and types `text`.
    async fn fill(&self, locator: &Locator, text: &str, timeout: Duration)
        -> Result<(), SurfaceError>;

    /// Waits for an attached match and returns its visible text.
    async fn read_text(&self, selector: &str, timeout: Duration) -> Result<String, SurfaceError>;

    async fn candidates(
        &self,
        scope: CandidateScope,
        limit: usize,
    ) -> Result<Vec<ElementCandidate>, SurfaceError>;

    async fn scroll_by(&self, pixels: i64) -> Result<(), SurfaceError>;

    async fn set_input_files(
        &self,
        selector: &str,
        path: &Path,
        timeout: Duration,
    ) -> Result<(), SurfaceError>;

    /// Opens a tab in the same session, activates it and navigates it.
    async fn open_tab(&self, url: &str, timeout: Duration) -> Result<(), SurfaceError>;

    /// Returns `false` without changing the active tab when `index` is out of range.
    async fn switch_tab(&self, index: usize) -> Result<bool, SurfaceError>;

    async fn content(&self) -> Result<String, SurfaceError>;

    async fn screenshot(&self, path: &Path) -> Result<(), SurfaceError>;

    async fn close(&self) -> Result<(), SurfaceError>;
}

pub type SharedSurface = Arc<dyn PageSurface>;

/// One launched browser process able to mint page surfaces.
#[async_trait]
pub trait BrowserSlot: Send + Sync {
    fn index(&self) -> usize;

    async fn open_surface(&self) -> Result<SharedSurface, SurfaceError>;

    async fn shutdown(&self) -> Result<(), SurfaceError>;
}

/// Launches browser slots. Chosen once when the pool is built.
#[async_trait]
pub trait SurfaceDriver: Send + Sync {
    async fn launch(&self, index: usize) -> Result<Arc<dyn BrowserSlot>, SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_document_skips_blanks() {
        let candidate = ElementCandidate {
            text: "".into(),
            attributes: vec!["Search".into(), " ".into(), "q".into()],
        };
        assert_eq!(candidate.document(), "Search q");
        assert_eq!(candidate.label().as_deref(), Some("Search"));
    }
}

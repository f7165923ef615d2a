//! Page-surface boundary for WebPilot.
//!
//! Higher layers talk to pages only through [`PageSurface`]. Two drivers are
//! provided: [`ChromiumDriver`] for real browsers and [`StubDriver`], an
//! in-memory site used for offline runs and tests.

pub mod chromium;
pub mod config;
pub mod error;
pub mod locator;
pub mod stub;
pub mod surface;

pub use chromium::{ChromiumDriver, ChromiumSurface};
pub use config::{detect_chrome_executable, ChromiumConfig};
pub use error::{SurfaceError, SurfaceErrorKind};
pub use locator::Locator;
pub use stub::{StubDocument, StubDriver, StubElement, StubEvent, StubSite, StubSurface};
pub use surface::{
    BrowserSlot, CandidateScope, ElementCandidate, PageSurface, SharedSurface, SurfaceDriver,
};

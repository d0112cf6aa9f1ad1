//! Browser driver abstraction consumed by the scenario runner
//!
//! The browser is an external collaborator. Everything the runner needs
//! from it is captured by [`PageDriver`]; a driver instance is one
//! browser session (cookies, storage) and is exclusively owned by the
//! scenario driving it — the `&mut` receiver enforces that.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out waiting for: {0}")]
    Timeout(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// One browser cookie as reported by the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    /// Unix seconds; `None` for session cookies.
    pub expires: Option<f64>,
}

/// Capability set of the browser automation collaborator.
///
/// All waits are bounded: `wait_for` and `wait_for_any` return rather
/// than hang when the timeout expires. These are the runner's only
/// suspension points.
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    async fn fill(&mut self, selector: &str, value: &str) -> DriverResult<()>;

    async fn check(&mut self, selector: &str) -> DriverResult<()>;

    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    async fn select_option(&mut self, selector: &str, value: &str) -> DriverResult<()>;

    /// Wait until the selector is visible. `false` on timeout.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> DriverResult<bool>;

    /// Race several selectors; the index of whichever becomes visible
    /// first, or `None` if the timeout expires with none visible.
    async fn wait_for_any(
        &mut self,
        selectors: &[&str],
        timeout: Duration,
    ) -> DriverResult<Option<usize>>;

    /// Text content of the first match.
    async fn text_of(&mut self, selector: &str) -> DriverResult<String>;

    /// Text content of every match, in document order.
    async fn text_of_all(&mut self, selector: &str) -> DriverResult<Vec<String>>;

    async fn is_visible(&mut self, selector: &str) -> DriverResult<bool>;

    async fn current_url(&mut self) -> DriverResult<String>;

    async fn cookies(&mut self) -> DriverResult<Vec<Cookie>>;
}

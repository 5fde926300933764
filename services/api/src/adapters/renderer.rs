//! services/api/src/adapters/renderer.rs
//!
//! This module contains the headless browser adapter. It implements the
//! `RenderService` port from the `core` crate using Chromium driven over CDP.
//!
//! Every render launches its own browser process with a throwaway profile and
//! tears it down afterwards. A semaphore bounds how many browsers run at once;
//! extra renders queue for a free slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;
use web_summarizer_core::ports::{RenderError, RenderService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `RenderService` with a bounded pool of one-shot
/// Chromium processes.
#[derive(Clone)]
pub struct ChromiumRenderer {
    slots: Arc<Semaphore>,
    settle: Duration,
    timeout: Duration,
    chrome_path: Option<PathBuf>,
    profile_root: PathBuf,
}

impl ChromiumRenderer {
    /// Creates a new `ChromiumRenderer`.
    ///
    /// `settle` is how long to wait after navigation for scripts to finish
    /// populating the page; `timeout` bounds a whole render, settle included.
    pub fn new(
        pool_size: usize,
        settle: Duration,
        timeout: Duration,
        chrome_path: Option<PathBuf>,
    ) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(pool_size.max(1))),
            settle,
            timeout,
            chrome_path,
            profile_root: std::env::temp_dir(),
        }
    }

    /// Where the per-render profile directories are created. Defaults to the
    /// system temp dir.
    pub fn with_profile_root(mut self, profile_root: PathBuf) -> Self {
        self.profile_root = profile_root;
        self
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .user_data_dir(profile_dir);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::Launch)
    }

    async fn render_once(&self, url: &Url) -> Result<String, RenderError> {
        // Owned by the launch future from here on, so a timeout while the
        // browser is still starting removes it too.
        let profile_dir = ProfileDir::create(&self.profile_root)?;
        let config = self.browser_config(profile_dir.path())?;

        let mut session = BrowserSession::launch(config, profile_dir).await?;
        let result = session.capture(url, self.settle).await;
        session.shutdown().await;
        result
    }
}

//=========================================================================================
// `RenderService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RenderService for ChromiumRenderer {
    async fn render(&self, url: &Url) -> Result<String, RenderError> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let start = Instant::now();
        match tokio::time::timeout(self.timeout, self.render_once(url)).await {
            Ok(result) => {
                if result.is_ok() {
                    info!(url = %url, elapsed = ?start.elapsed(), "Browser render finished");
                }
                result
            }
            Err(_) => {
                warn!(url = %url, timeout = ?self.timeout, "Browser render timed out");
                Err(RenderError::Timeout(self.timeout))
            }
        }
    }
}

//=========================================================================================
// Browser Lifetime
//=========================================================================================

/// A throwaway browser profile, removed from disk when dropped.
#[derive(Debug)]
struct ProfileDir(PathBuf);

impl ProfileDir {
    fn create(root: &Path) -> Result<Self, RenderError> {
        let path = root.join(format!("web-summarizer-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path)
            .map_err(|e| RenderError::Launch(format!("Failed to create browser profile: {}", e)))?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.0.display(), "Failed to remove browser profile: {}", e);
            }
        }
    }
}

/// One launched browser process.
///
/// Dropping it (for instance when the render future is cancelled or times
/// out) stops the CDP event loop, which kills the child, and then drops the
/// profile directory.
struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    _profile_dir: ProfileDir,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig, profile_dir: ProfileDir) -> Result<Self, RenderError> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The handler must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler_task,
            _profile_dir: profile_dir,
        })
    }

    async fn capture(&self, url: &Url, settle: Duration) -> Result<String, RenderError> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        tokio::time::sleep(settle).await;

        page.content()
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {:?}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {:?}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_browser_binary_is_a_launch_error() {
        let renderer = ChromiumRenderer::new(
            1,
            Duration::ZERO,
            Duration::from_secs(10),
            Some(PathBuf::from("/nonexistent/web-summarizer/chrome")),
        );
        let url = Url::parse("https://example.com").unwrap();

        let err = renderer.render(&url).await.unwrap_err();
        assert!(matches!(err, RenderError::Launch(_)), "{err:?}");
        assert_eq!(renderer.slots.available_permits(), 1);
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("web-summarizer-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn profile_dir_is_removed_on_drop() {
        let root = scratch_dir();
        let profile = ProfileDir::create(&root).unwrap();
        std::fs::write(profile.path().join("Local State"), "{}").unwrap();
        assert_eq!(entries(&root), 1);

        drop(profile);
        assert_eq!(entries(&root), 0);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn failed_launch_leaves_no_profile_behind() {
        let root = scratch_dir();
        let renderer = ChromiumRenderer::new(
            1,
            Duration::ZERO,
            Duration::from_secs(10),
            Some(PathBuf::from("/nonexistent/web-summarizer/chrome")),
        )
        .with_profile_root(root.clone());
        let url = Url::parse("https://example.com").unwrap();

        assert!(renderer.render(&url).await.is_err());
        assert_eq!(entries(&root), 0);
        std::fs::remove_dir_all(&root).unwrap();
    }

    /// A "browser" that never prints its DevTools address keeps the launch
    /// pending until the render deadline fires.
    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_during_launch_leaves_no_profile_behind() {
        use std::os::unix::fs::PermissionsExt;

        let scratch = scratch_dir();
        let chrome = scratch.join("hanging-chrome");
        std::fs::write(&chrome, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&chrome, std::fs::Permissions::from_mode(0o755)).unwrap();
        let profiles = scratch.join("profiles");
        std::fs::create_dir_all(&profiles).unwrap();

        let renderer = ChromiumRenderer::new(1, Duration::ZERO, Duration::from_millis(500), Some(chrome))
            .with_profile_root(profiles.clone());
        let url = Url::parse("https://example.com").unwrap();

        let err = renderer.render(&url).await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)), "{err:?}");
        assert_eq!(entries(&profiles), 0);
        assert_eq!(renderer.slots.available_permits(), 1);
        std::fs::remove_dir_all(&scratch).unwrap();
    }

    #[test]
    fn pool_always_has_at_least_one_slot() {
        let renderer = ChromiumRenderer::new(0, Duration::ZERO, Duration::from_secs(1), None);
        assert_eq!(renderer.slots.available_permits(), 1);
    }
}

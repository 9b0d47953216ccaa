//! WebDriver browser driver
//!
//! This module implements [`BrowserDriver`] on top of a W3C WebDriver session
//! (chromedriver, geckodriver, Selenium grid) through the `fantoccini`
//! client. Scrolling and measuring use the default JavaScript-backed trait
//! methods; this backend only supplies script execution, screenshots,
//! navigation and frame switching.
//!
//! # Examples
//!
//! ```rust,ignore
//! use webshot::capture::{BrowserDriver, WebDriverBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let driver = WebDriverBackend::connect("http://localhost:4444").await?;
//!     driver.navigate("https://example.com").await?;
//!     let shot = driver.capture_viewport().await?;
//!     println!("{}x{}", shot.width(), shot.height());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator, error::CmdError};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{BrowserDriver, raw_image::RawImage};
use crate::error::{CaptureError, CaptureResult};

/// Browser driver backed by a remote WebDriver session
#[derive(Debug, Clone)]
pub struct WebDriverBackend {
    client:   Client,
    endpoint: String,
}

impl WebDriverBackend {
    /// Opens a new session on the WebDriver server at `endpoint`
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::DriverUnavailable`] if the server cannot be
    /// reached or refuses the session.
    pub async fn connect(endpoint: &str) -> CaptureResult<Self> {
        Self::connect_with_capabilities(endpoint, Map::new()).await
    }

    /// Opens a new session requesting the given W3C capabilities
    pub async fn connect_with_capabilities(
        endpoint: &str,
        capabilities: Map<String, Value>,
    ) -> CaptureResult<Self> {
        debug!(endpoint, "connecting to WebDriver");

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(endpoint)
            .await
            .map_err(|e| CaptureError::DriverUnavailable {
                reason: format!("cannot open a session at {endpoint}: {e}"),
            })?;

        info!(endpoint, "WebDriver session opened");
        Ok(Self::from_client(client, endpoint))
    }

    /// Wraps an existing session
    pub fn from_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint of the WebDriver server
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ends the WebDriver session
    pub async fn close(self) -> CaptureResult<()> {
        self.client.close().await.map_err(unavailable)
    }
}

fn unavailable(error: CmdError) -> CaptureError {
    CaptureError::DriverUnavailable {
        reason: error.to_string(),
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBackend {
    fn name(&self) -> &str {
        "webdriver"
    }

    async fn evaluate_script(&self, script: &str, args: Vec<Value>) -> CaptureResult<Value> {
        self.client
            .execute(script, args)
            .await
            .map_err(|error| match error {
                CmdError::Standard(e) => CaptureError::ScriptFailed {
                    reason: e.to_string(),
                },
                other => unavailable(other),
            })
    }

    async fn capture_viewport(&self) -> CaptureResult<RawImage> {
        let png = self.client.screenshot().await.map_err(unavailable)?;
        RawImage::from_png_bytes(&png)
    }

    async fn navigate(&self, url: &str) -> CaptureResult<()> {
        self.client.goto(url).await.map_err(unavailable)
    }

    async fn current_url(&self) -> CaptureResult<String> {
        let url = self.client.current_url().await.map_err(unavailable)?;
        Ok(url.to_string())
    }

    async fn enter_frame(&self, selector: &str) -> CaptureResult<()> {
        let not_found = || CaptureError::FrameNotFound {
            selector: selector.to_string(),
        };

        let frame = self
            .client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| if e.is_no_such_element() { not_found() } else { unavailable(e) })?;

        frame
            .enter_frame()
            .await
            .map(|_| ())
            .map_err(|e| if e.is_no_such_element() { not_found() } else { unavailable(e) })
    }

    async fn exit_frame(&self) -> CaptureResult<()> {
        self.client
            .enter_parent_frame()
            .await
            .map(|_| ())
            .map_err(unavailable)
    }
}

//! Browser automation for authenticating and joining Google Meet sessions.
//!
//! A session owns one chromedriver subprocess and one WebDriver connection.
//! The driver pair is acquired through an ordered list of strategies
//! (configured paths first, PATH discovery second), and `close` releases
//! both regardless of how far the session got.

pub mod wait;

use async_trait::async_trait;
use serde_json::json;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thirtyfour::error::WebDriverResult;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use which::which;

use crate::config::BrowserConfig;
use crate::session::SessionError;
use self::wait::wait_for;

const CREDENTIAL_WAIT: Duration = Duration::from_secs(20);
const LANDING_WAIT: Duration = Duration::from_secs(15);
const JOIN_WAIT: Duration = Duration::from_secs(15);
const DRIVER_STARTUP_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

const LOGIN_URL: &str = "https://accounts.google.com/";
const LANDING_HOST: &str = "myaccount.google.com";
const JOIN_BUTTON_XPATH: &str =
    "//span[contains(text(),'Join now') or contains(text(),'Ask to join')]/ancestor::button";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

/// A live automation session: authenticate, join, then close. `close` must
/// be safe to call at any point after `open`, any number of times.
#[async_trait]
pub trait MeetingAutomation: Send {
    async fn authenticate(&mut self, identity: &str, secret: &str) -> Result<(), SessionError>;
    async fn join(&mut self, meeting_url: &str) -> Result<(), SessionError>;
    async fn close(&mut self);
}

/// Factory seam the orchestrator acquires sessions through.
#[async_trait]
pub trait AutomationLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn MeetingAutomation>, SessionError>;
}

/// One way of locating a chromedriver/browser pair.
struct DriverStrategy {
    label: &'static str,
    driver: PathBuf,
    /// `None` lets the driver discover the browser binary itself.
    binary: Option<PathBuf>,
}

pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Acquisition strategies in preference order: the configured pair, then
    /// a PATH-discovered chromedriver with browser auto-discovery.
    fn strategies(&self) -> Vec<DriverStrategy> {
        let mut strategies = vec![DriverStrategy {
            label: "configured",
            driver: PathBuf::from(&self.config.driver_path),
            binary: Some(PathBuf::from(&self.config.binary_path)),
        }];
        if let Ok(found) = which("chromedriver") {
            if found != Path::new(&self.config.driver_path) {
                strategies.push(DriverStrategy {
                    label: "discovered",
                    driver: found,
                    binary: None,
                });
            }
        }
        strategies
    }

    fn capabilities(&self, binary: Option<&Path>) -> Result<ChromeCapabilities, SessionError> {
        build_capabilities(binary, self.config.headless).map_err(|e| {
            SessionError::EnvironmentUnavailable(format!("invalid browser capabilities: {e}"))
        })
    }

    async fn launch(&self, strategy: &DriverStrategy) -> Result<ChromeSession, SessionError> {
        if !strategy.driver.exists() {
            return Err(SessionError::EnvironmentUnavailable(format!(
                "chromedriver not found at {}",
                strategy.driver.display()
            )));
        }

        let caps = self.capabilities(strategy.binary.as_deref())?;
        let port = free_port()?;
        let driver_process = Command::new(&strategy.driver)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SessionError::EnvironmentUnavailable(format!(
                    "failed to start chromedriver at {}: {e}",
                    strategy.driver.display()
                ))
            })?;

        let server = format!("http://127.0.0.1:{port}");
        let driver = wait_for(
            "webdriver session",
            DRIVER_STARTUP_WAIT,
            POLL_INTERVAL,
            || {
                let server = server.clone();
                let caps = caps.clone();
                async move { WebDriver::new(&server, caps).await.ok() }
            },
        )
        .await
        .map_err(|e| {
            // driver_process is dropped on this path and killed with it
            SessionError::EnvironmentUnavailable(format!(
                "browser did not start via {} chromedriver: {e}",
                strategy.label
            ))
        })?;

        debug!("webdriver session established on port {port}");
        Ok(ChromeSession {
            driver: Some(driver),
            driver_process,
        })
    }
}

#[async_trait]
impl AutomationLauncher for ChromeLauncher {
    async fn open(&self) -> Result<Box<dyn MeetingAutomation>, SessionError> {
        let mut failures = Vec::new();
        for strategy in self.strategies() {
            match self.launch(&strategy).await {
                Ok(session) => {
                    info!("browser session ready via {} chromedriver", strategy.label);
                    return Ok(Box::new(session));
                }
                Err(err) => {
                    warn!("{} chromedriver strategy failed: {err}", strategy.label);
                    failures.push(format!("{}: {err}", strategy.label));
                }
            }
        }
        Err(SessionError::EnvironmentUnavailable(format!(
            "no usable chromedriver/browser pair ({})",
            failures.join("; ")
        )))
    }
}

/// Headless Chrome tuned for unattended meeting joins: media permissions
/// auto-granted, automation fingerprinting suppressed, sandbox disabled for
/// containerized execution.
fn build_capabilities(binary: Option<&Path>, headless: bool) -> WebDriverResult<ChromeCapabilities> {
    let mut caps = DesiredCapabilities::chrome();
    if let Some(binary) = binary {
        caps.set_binary(&binary.to_string_lossy())?;
    }
    if headless {
        caps.add_arg("--headless=new")?;
    }
    caps.add_arg("--no-sandbox")?;
    caps.add_arg("--disable-dev-shm-usage")?;
    caps.add_arg("--use-fake-ui-for-media-stream")?;
    caps.add_arg("--use-fake-device-for-media-stream")?;
    caps.add_arg("--disable-blink-features=AutomationControlled")?;
    caps.add_arg(&format!("--user-agent={USER_AGENT}"))?;
    caps.add_experimental_option("excludeSwitches", json!(["enable-automation"]))?;
    caps.add_experimental_option("useAutomationExtension", json!(false))?;
    caps.add_experimental_option(
        "prefs",
        json!({
            "profile.default_content_setting_values.media_stream_mic": 0,
            "profile.default_content_setting_values.media_stream_camera": 0,
            "profile.default_content_setting_values.geolocation": 0,
            "profile.default_content_setting_values.notifications": 0,
        }),
    )?;
    Ok(caps)
}

/// Picks a free localhost port for a per-session chromedriver so concurrent
/// sessions do not collide.
fn free_port() -> Result<u16, SessionError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(|e| {
        SessionError::EnvironmentUnavailable(format!("no free port for chromedriver: {e}"))
    })?;
    let port = listener
        .local_addr()
        .map_err(|e| {
            SessionError::EnvironmentUnavailable(format!("could not read local address: {e}"))
        })?
        .port();
    Ok(port)
}

pub struct ChromeSession {
    driver: Option<WebDriver>,
    driver_process: Child,
}

impl ChromeSession {
    fn driver(&self) -> Result<&WebDriver, SessionError> {
        self.driver
            .as_ref()
            .ok_or_else(|| SessionError::Internal("browser session already closed".to_string()))
    }
}

#[async_trait]
impl MeetingAutomation for ChromeSession {
    /// Two-step Google login: identifier, advance, password, advance, then
    /// wait for the account landing page.
    async fn authenticate(&mut self, identity: &str, secret: &str) -> Result<(), SessionError> {
        let driver = self.driver()?;
        let auth_err =
            |step: &str, e: &dyn std::fmt::Display| SessionError::AuthenticationFailed(format!("{step}: {e}"));

        driver
            .goto(LOGIN_URL)
            .await
            .map_err(|e| auth_err("could not open login page", &e))?;

        let identifier = wait_for("identifier field", CREDENTIAL_WAIT, POLL_INTERVAL, || async move {
            driver.find(By::Id("identifierId")).await.ok()
        })
        .await
        .map_err(|e| auth_err("identifier entry", &e))?;
        identifier
            .send_keys(identity)
            .await
            .map_err(|e| auth_err("identifier entry", &e))?;
        click(driver, By::Id("identifierNext"))
            .await
            .map_err(|e| auth_err("identifier advance", &e))?;

        let password = wait_for("password field", CREDENTIAL_WAIT, POLL_INTERVAL, || async move {
            driver.find(By::Name("Passwd")).await.ok()
        })
        .await
        .map_err(|e| auth_err("password entry", &e))?;
        password
            .send_keys(secret)
            .await
            .map_err(|e| auth_err("password entry", &e))?;
        click(driver, By::Id("passwordNext"))
            .await
            .map_err(|e| auth_err("password advance", &e))?;

        wait_for("post-login landing", LANDING_WAIT, POLL_INTERVAL, || async move {
            match driver.current_url().await {
                Ok(url) if url.as_str().contains(LANDING_HOST) => Some(()),
                _ => None,
            }
        })
        .await
        .map_err(|e| auth_err("login never completed", &e))?;

        info!("authenticated as {identity}");
        Ok(())
    }

    /// Navigates to the meeting and activates the affirmative join control
    /// ("Join now" or "Ask to join"). Host admission after the click is out
    /// of scope.
    async fn join(&mut self, meeting_url: &str) -> Result<(), SessionError> {
        let driver = self.driver()?;

        driver
            .goto(meeting_url)
            .await
            .map_err(|e| SessionError::JoinFailed(format!("could not open meeting page: {e}")))?;

        let join_button = wait_for("join button", JOIN_WAIT, POLL_INTERVAL, || async move {
            match driver.find(By::XPath(JOIN_BUTTON_XPATH)).await {
                Ok(button) => match button.is_clickable().await {
                    Ok(true) => Some(button),
                    _ => None,
                },
                Err(_) => None,
            }
        })
        .await
        .map_err(|e| SessionError::JoinFailed(e.to_string()))?;

        join_button
            .click()
            .await
            .map_err(|e| SessionError::JoinFailed(format!("join control click failed: {e}")))?;

        info!("activated join control for {meeting_url}");
        Ok(())
    }

    /// Quits the browser and reaps the chromedriver subprocess. Idempotent;
    /// safe after partial initialization.
    async fn close(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.quit().await {
                warn!("browser quit failed: {e}");
            }
        }
        if self.driver_process.start_kill().is_ok() {
            let _ = self.driver_process.wait().await;
        }
    }
}

async fn click(driver: &WebDriver, locator: By) -> WebDriverResult<()> {
    driver.find(locator).await?.click().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> ChromeLauncher {
        ChromeLauncher::new(BrowserConfig::default())
    }

    #[test]
    fn configured_strategy_is_tried_first() {
        let strategies = launcher().strategies();
        assert_eq!(strategies[0].label, "configured");
        assert_eq!(strategies[0].driver, Path::new("/usr/bin/chromedriver"));
        assert_eq!(
            strategies[0].binary.as_deref(),
            Some(Path::new("/usr/bin/chromium"))
        );
    }

    #[test]
    fn discovered_strategy_omits_explicit_binary() {
        for strategy in launcher().strategies().iter().skip(1) {
            assert_eq!(strategy.label, "discovered");
            assert!(strategy.binary.is_none());
        }
    }

    #[test]
    fn capabilities_build_with_and_without_binary() {
        assert!(build_capabilities(Some(Path::new("/usr/bin/chromium")), true).is_ok());
        assert!(build_capabilities(None, false).is_ok());
    }

    #[test]
    fn free_ports_are_distinct_enough() {
        let a = free_port().unwrap();
        let b = free_port().unwrap();
        assert!(a > 0);
        assert!(b > 0);
    }

    #[test]
    fn join_xpath_matches_both_button_texts() {
        assert!(JOIN_BUTTON_XPATH.contains("Join now"));
        assert!(JOIN_BUTTON_XPATH.contains("Ask to join"));
    }
}

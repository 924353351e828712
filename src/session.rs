//! Getting the browser into a logged-in state before the run starts.
//!
//! Two strategies share the [`SessionManager`] trait: [`ManualLogin`] replays
//! saved cookies or waits for the user to sign in by hand, and
//! [`CredentialLogin`] fills the login form itself with bounded retries.
//! Either way a failure here is fatal to the run.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

use crate::browser::{BrowserError, BrowserSession, Cookie};
use crate::prompt::Prompter;
use crate::site::SiteProfile;

/// Upper bound on looking for the sign-in link before assuming a session.
const SIGN_IN_PROBE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser error during login: {0}")]
    Browser(#[from] BrowserError),

    #[error("login not detected within {}s", .0.as_secs())]
    LoginTimeout(Duration),

    #[error("login failed after {attempts} attempts: {last}")]
    CredentialsRejected { attempts: u32, last: BrowserError },

    #[error("cookie file {}: {source}", path.display())]
    CookieIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cookie file {} is not valid: {source}", path.display())]
    CookieFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read answer from terminal: {0}")]
    Prompt(#[source] io::Error),
}

/// Establishes an authenticated session in the browser.
pub trait SessionManager {
    async fn establish<B: BrowserSession>(
        &self,
        browser: &B,
        site: &SiteProfile,
    ) -> Result<(), SessionError>;
}

/// Saved browser cookies as a JSON array.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Vec<Cookie>>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::CookieIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| SessionError::CookieFormat {
                path: self.path.clone(),
                source,
            })
    }

    pub fn save(&self, cookies: &[Cookie]) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(cookies).map_err(|source| {
            SessionError::CookieFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|source| SessionError::CookieIo {
            path: self.path.clone(),
            source,
        })
    }
}

/// Cookie replay, falling back to a sign-in done by hand in the browser
/// window.
pub struct ManualLogin<P> {
    prompter: P,
    jar: CookieJar,
    login_wait: Duration,
}

impl<P: Prompter> ManualLogin<P> {
    pub fn new(prompter: P, jar: CookieJar, login_wait: Duration) -> Self {
        Self {
            prompter,
            jar,
            login_wait,
        }
    }

    fn ask(&self, question: &str) -> Result<String, SessionError> {
        self.prompter.ask(question).map_err(SessionError::Prompt)
    }

    async fn replay<B: BrowserSession>(&self, browser: &B, cookies: &[Cookie]) -> Result<(), SessionError> {
        for cookie in cookies {
            if let Err(err) = browser.add_cookie(cookie).await {
                tracing::warn!(cookie = %cookie.name, error = %err, "saved cookie rejected");
            }
        }
        browser.refresh().await?;
        tracing::info!(count = cookies.len(), "saved cookies loaded");
        Ok(())
    }
}

impl<P: Prompter> SessionManager for ManualLogin<P> {
    async fn establish<B: BrowserSession>(
        &self,
        browser: &B,
        site: &SiteProfile,
    ) -> Result<(), SessionError> {
        browser.navigate(&site.base_url).await?;

        let replayed = match self.jar.load()? {
            Some(cookies) => {
                let answer = self.ask(
                    "Press Enter to load saved cookies and continue, or type 'login' to log in manually: ",
                )?;
                if answer.trim().is_empty() {
                    self.replay(browser, &cookies).await?;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if !replayed {
            self.ask("Log in to the site in the opened browser window, then press Enter to continue.")?;
        }

        wait_for_login(browser, site, self.login_wait).await?;

        if !replayed {
            self.jar.save(&browser.cookies().await?)?;
            tracing::info!(path = %self.jar.path().display(), "cookies saved");
        }
        Ok(())
    }
}

/// Looks for the sign-in link; if it is showing, waits up to `login_wait`
/// for it to go away.
async fn wait_for_login<B: BrowserSession>(
    browser: &B,
    site: &SiteProfile,
    login_wait: Duration,
) -> Result<(), SessionError> {
    match browser
        .wait_for_present(&site.sign_in_link, SIGN_IN_PROBE.min(login_wait))
        .await
    {
        Ok(_) => {}
        Err(err) if err.is_missing() => {
            tracing::info!("already logged in");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(wait_secs = login_wait.as_secs(), "not logged in, waiting for manual login");
    match browser.wait_until_absent(&site.sign_in_link, login_wait).await {
        Ok(()) => {
            tracing::info!("login detected");
            Ok(())
        }
        Err(BrowserError::Timeout { .. }) => Err(SessionError::LoginTimeout(login_wait)),
        Err(err) => Err(err.into()),
    }
}

/// Bounded attempts with exponential backoff between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt - 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Fills the site's login form with stored credentials.
pub struct CredentialLogin {
    email: String,
    password: String,
    retry: RetryConfig,
    wait: Duration,
}

impl CredentialLogin {
    pub fn new(email: String, password: String, retry: RetryConfig, wait: Duration) -> Self {
        Self {
            email,
            password,
            retry,
            wait,
        }
    }

    async fn attempt<B: BrowserSession>(&self, browser: &B, site: &SiteProfile) -> Result<(), BrowserError> {
        browser.navigate(&site.login_url).await?;

        let email = browser.wait_for_clickable(&site.login_email, self.wait).await?;
        browser.clear(&email).await?;
        browser.send_keys(&email, &self.email).await?;

        let password = browser.wait_for_clickable(&site.login_password, self.wait).await?;
        browser.clear(&password).await?;
        browser.send_keys(&password, &self.password).await?;

        let submit = browser.wait_for_clickable(&site.login_submit, self.wait).await?;
        browser.click(&submit).await?;

        browser.wait_for_present(&site.logged_in_marker, self.wait).await?;
        Ok(())
    }
}

impl SessionManager for CredentialLogin {
    async fn establish<B: BrowserSession>(
        &self,
        browser: &B,
        site: &SiteProfile,
    ) -> Result<(), SessionError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(browser, site).await {
                Ok(()) => {
                    tracing::info!(attempt, "logged in with credentials");
                    return Ok(());
                }
                Err(last) if attempt >= attempts => {
                    return Err(SessionError::CredentialsRejected { attempts, last });
                }
                Err(err) => {
                    let delay_ms = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(attempt, max = attempts, delay_ms, error = %err, "login attempt failed, retrying");
                    sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }
}

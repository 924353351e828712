mod applicant;
mod browser;
mod cli;
mod config;
mod criteria;
mod discovery;
mod error;
mod forms;
mod geo;
mod notify;
mod orchestrator;
mod pacing;
mod prompt;
mod session;
mod site;
mod state_machine;
mod store;
mod telemetry;
mod ui;

use anyhow::Context;
use clap::Parser;
use console::Term;

use applicant::{Applicant, ApplySettings};
use browser::{BrowserSession, WebDriverClient, WebDriverOptions};
use cli::Cli;
use config::Config;
use error::AppError;
use geo::{DistanceCalculator, NominatimGeocoder};
use notify::ConsoleNotifier;
use orchestrator::{RunController, RunSettings, RunStores, RunSummary};
use session::{CookieJar, CredentialLogin, ManualLogin, RetryConfig, SessionError, SessionManager};
use site::SiteProfile;
use store::{ActivityLog, AppliedRegistry, QueueStore};
use ui::RunProgress;

const USER_AGENT: &str = concat!("quickapply/", env!("CARGO_PKG_VERSION"));

/// Base delay between credential login attempts; doubles after each failure.
const LOGIN_RETRY_BASE_MS: u64 = 2000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;

    run(&cli).await.context("quickapply run aborted")?;
    Ok(())
}

/// Loads everything, starts the browser, and always quits it again.
async fn run(cli: &Cli) -> Result<RunSummary, AppError> {
    let config = Config::load(&cli.config, cli.yes, &Term::stdout())?;
    let site = SiteProfile::indeed(&config.base_url);
    let stores = RunStores {
        registry: AppliedRegistry::load(&config.registry_path)?,
        log: ActivityLog::new(&config.log_path),
        queue: QueueStore::new(&config.queue_path),
    };
    if stores.registry.is_empty() {
        tracing::info!("no previous applications recorded");
    }
    tracing::info!(
        applied_before = stores.registry.len(),
        queue_only = cli.queue_only,
        "starting run"
    );
    let geocoder = NominatimGeocoder::new(USER_AGENT)?;

    let options = WebDriverOptions {
        user_data_dir: config
            .browser_profile_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned()),
        ..WebDriverOptions::default()
    };
    let browser = WebDriverClient::start(&config.webdriver_url, &options).await?;

    let result = drive(&browser, &config, site, stores, geocoder, cli.queue_only).await;

    if let Err(err) = browser.quit().await {
        tracing::warn!(error = %err, "could not close the browser session");
    }
    result
}

async fn drive(
    browser: &WebDriverClient,
    config: &Config,
    site: SiteProfile,
    stores: RunStores,
    geocoder: NominatimGeocoder,
    queue_only: bool,
) -> Result<RunSummary, AppError> {
    establish_session(browser, &site, config).await?;

    let timing = &config.timing;
    let applicant = Applicant::new(
        site.clone(),
        DistanceCalculator::new(geocoder),
        timing.pacing(),
        ApplySettings {
            min_salary: config.min_salary,
            resume_path: config.resume_path.clone(),
            user_address: config.user_address.clone(),
            wait: timing.wait(),
            upload_wait: timing.upload_wait(),
        },
    );
    let settings = RunSettings {
        locations: config.locations.clone(),
        search_keywords: config.search_keywords.clone(),
        max_applications: config.max_applications,
        queue_only,
        wait: timing.wait(),
        pacing: timing.pacing(),
    };

    let mut controller = RunController::new(
        browser,
        site,
        applicant,
        ConsoleNotifier::new(),
        stores,
        settings,
    )
    .with_progress(RunProgress::start());
    Ok(controller.run().await?)
}

async fn establish_session<B: BrowserSession>(
    browser: &B,
    site: &SiteProfile,
    config: &Config,
) -> Result<(), SessionError> {
    match &config.credentials {
        Some(credentials) => {
            let retry = RetryConfig {
                max_attempts: config.timing.login_attempts,
                base_delay_ms: LOGIN_RETRY_BASE_MS,
            };
            CredentialLogin::new(
                credentials.email.clone(),
                credentials.password.clone(),
                retry,
                config.timing.wait(),
            )
            .establish(browser, site)
            .await
        }
        None => {
            ManualLogin::new(
                Term::stdout(),
                CookieJar::new(&config.cookies_path),
                config.timing.login_wait(),
            )
            .establish(browser, site)
            .await
        }
    }
}

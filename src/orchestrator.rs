use std::collections::HashSet;
use std::time::Duration;

use crate::applicant::{Applicant, queued};
use crate::browser::{BrowserError, BrowserSession};
use crate::discovery::{JobDiscovery, SeenInRun, scrape_listings};
use crate::geo::Geocoder;
use crate::notify::{APPLIED_TITLE, Notifier, applied_message};
use crate::pacing::Pacing;
use crate::site::SiteProfile;
use crate::state_machine::{ApplicationOutcome, ApplicationRecord, Attempt, JobCandidate};
use crate::store::{ActivityLog, AppliedRegistry, QueueStore, StoreError};
use crate::ui::RunProgress;

/// WebDriver key code for Return.
const RETURN_KEY: &str = "\u{E006}";

/// Applications confirmed so far against the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunQuota {
    applied: u32,
    max: u32,
}

impl RunQuota {
    pub fn new(max: u32) -> Self {
        Self { applied: 0, max }
    }

    pub fn applied(&self) -> u32 {
        self.applied
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.max - self.applied
    }

    pub fn is_exhausted(&self) -> bool {
        self.applied >= self.max
    }

    /// Counts one confirmed application. Never moves past `max`.
    fn consume(&mut self) {
        if self.is_exhausted() {
            tracing::error!(applied = self.applied, max = self.max, "application counted past quota");
            return;
        }
        self.applied += 1;
    }
}

/// Outcome counts for the end-of-run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: u32,
    pub skipped: u32,
    pub queued: u32,
    pub errors: u32,
}

impl RunSummary {
    fn count(&mut self, outcome: ApplicationOutcome) {
        match outcome {
            ApplicationOutcome::Applied => self.applied += 1,
            ApplicationOutcome::Skipped => self.skipped += 1,
            ApplicationOutcome::Queued => self.queued += 1,
            ApplicationOutcome::Error => self.errors += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.applied + self.skipped + self.queued + self.errors
    }
}

/// Persistent state a run reads and appends to.
pub struct RunStores {
    pub registry: AppliedRegistry,
    pub log: ActivityLog,
    pub queue: QueueStore,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Searched in order.
    pub locations: Vec<String>,
    pub search_keywords: Option<String>,
    pub max_applications: u32,
    /// Enqueue candidates for a separate executor instead of applying.
    pub queue_only: bool,
    pub wait: Duration,
    pub pacing: Pacing,
}

/// Walks every target location, discovers candidates page by page and
/// settles each one, stopping once the quota is used up.
pub struct RunController<'a, B, G, N> {
    browser: &'a B,
    site: SiteProfile,
    applicant: Applicant<G>,
    notifier: N,
    stores: RunStores,
    discovery: JobDiscovery,
    settings: RunSettings,
    quota: RunQuota,
    /// Every id handed to the state machine or the queue during this run.
    attempted: HashSet<String>,
    summary: RunSummary,
    progress: RunProgress,
}

impl<'a, B, G, N> RunController<'a, B, G, N>
where
    B: BrowserSession,
    G: Geocoder,
    N: Notifier,
{
    pub fn new(
        browser: &'a B,
        site: SiteProfile,
        applicant: Applicant<G>,
        notifier: N,
        stores: RunStores,
        settings: RunSettings,
    ) -> Self {
        Self {
            browser,
            site,
            applicant,
            notifier,
            stores,
            discovery: JobDiscovery::new(&settings.locations),
            quota: RunQuota::new(settings.max_applications),
            settings,
            attempted: HashSet::new(),
            summary: RunSummary::default(),
            progress: RunProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: RunProgress) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    fn quota(&self) -> RunQuota {
        self.quota
    }

    #[cfg(test)]
    fn stores(&self) -> &RunStores {
        &self.stores
    }

    /// Runs every location. Only storage failures abort the run.
    pub async fn run(&mut self) -> Result<RunSummary, StoreError> {
        if !self.settings.queue_only {
            self.progress.remaining(&self.quota);
        }

        let locations = self.settings.locations.clone();
        for city in &locations {
            if self.quota.is_exhausted() {
                tracing::info!(
                    applied = self.quota.applied(),
                    max = self.quota.max(),
                    "application limit reached"
                );
                break;
            }
            self.progress.searching(city);
            if let Err(err) = self.search(city).await {
                tracing::warn!(%city, error = %err, "search failed, moving to next location");
                continue;
            }
            self.work_location(city).await?;
        }

        let summary = self.summary;
        tracing::info!(
            applied = summary.applied,
            skipped = summary.skipped,
            queued = summary.queued,
            errors = summary.errors,
            "run finished"
        );
        self.progress.finish(&summary);
        Ok(summary)
    }

    async fn search(&self, city: &str) -> Result<(), BrowserError> {
        let browser = self.browser;
        let pacing = &self.settings.pacing;
        tracing::info!(%city, "searching");

        browser.navigate(&self.site.base_url).await?;
        pacing.pause().await;

        let what = browser
            .wait_for_clickable(&self.site.search_what, self.settings.wait)
            .await?;
        browser.clear(&what).await?;
        if let Some(keywords) = &self.settings.search_keywords {
            browser.send_keys(&what, keywords).await?;
        }

        let place = browser
            .find_first(&self.site.search_where)
            .await?
            .ok_or_else(|| BrowserError::NoSuchElement(self.site.search_where.to_string()))?;
        browser.clear(&place).await?;
        pacing.pause().await;
        browser.send_keys(&place, city).await?;
        pacing.pause().await;
        browser.send_keys(&place, RETURN_KEY).await?;

        browser
            .wait_for_present(&self.site.results_container, self.settings.wait)
            .await?;

        let page = browser.page_text().await?.to_lowercase();
        if page.contains(&self.site.captcha_marker) {
            tracing::warn!(%city, "CAPTCHA detected; scanning whatever results are visible");
        }
        Ok(())
    }

    /// Discovery rounds for one location until a round finds nothing new or
    /// the quota runs out.
    async fn work_location(&mut self, city: &str) -> Result<(), StoreError> {
        while !self.quota.is_exhausted() {
            let listings = match scrape_listings(self.browser, &self.site).await {
                Ok(listings) => listings,
                Err(err) => {
                    tracing::warn!(%city, error = %err, "could not read results page");
                    return Ok(());
                }
            };
            let seen = SeenInRun {
                registry: &self.stores.registry,
                attempted: &self.attempted,
            };
            let candidates = self.discovery.discover(listings, &seen);
            if candidates.is_empty() {
                tracing::info!(%city, "no new quick-apply jobs");
                return Ok(());
            }
            tracing::info!(%city, count = candidates.len(), "found quick-apply jobs");

            for candidate in candidates {
                if self.quota.is_exhausted() {
                    return Ok(());
                }
                self.attempted.insert(candidate.id.clone());
                let attempt = self.attempt(candidate, city).await?;
                self.settle(&attempt).await?;
            }

            if let Err(err) = self.browser.scroll_to_bottom().await {
                tracing::warn!(error = %err, "could not scroll for more results");
            }
            self.settings.pacing.page_pause().await;
        }
        Ok(())
    }

    async fn attempt(&mut self, candidate: JobCandidate, city: &str) -> Result<Attempt, StoreError> {
        if self.settings.queue_only {
            if !self.stores.queue.enqueue(&candidate)? {
                tracing::debug!(job_id = %candidate.id, "already queued");
            }
            return Ok(queued(candidate, city));
        }
        self.progress.evaluating(&candidate);
        Ok(self.applicant.process(self.browser, candidate, city).await)
    }

    /// Applies the side effects of a finished attempt: registry and quota on
    /// `Applied`, then exactly one log row.
    async fn settle(&mut self, attempt: &Attempt) -> Result<(), StoreError> {
        let Some(record) = ApplicationRecord::from_attempt(attempt) else {
            tracing::error!(job_id = %attempt.candidate.id, state = %attempt.state, "attempt ended in a non-terminal state");
            return Ok(());
        };

        if record.status == ApplicationOutcome::Applied {
            self.stores.registry.record(&record.job_id)?;
            self.quota.consume();
            if let Err(err) = self
                .notifier
                .notify(APPLIED_TITLE, &applied_message(&record))
                .await
            {
                tracing::warn!(error = %err, "notification failed");
            }
        }

        self.stores.log.append(&record)?;
        self.summary.count(record.status);

        self.progress.outcome(attempt);
        if !self.settings.queue_only {
            self.progress.remaining(&self.quota);
        }
        Ok(())
    }
}

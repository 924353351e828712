//! Drives one [`JobCandidate`] through evaluation and submission.
//!
//! The browser work happens here; every state change goes through
//! [`StateMachine::next`], so an attempt always ends in exactly one terminal
//! state. The listing is opened in its own tab and that tab is closed again
//! whatever the outcome.

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{BrowserError, BrowserSession};
use crate::criteria::{is_acceptable_employment_type, meets_salary_floor};
use crate::forms::fill_required_fields;
use crate::geo::{DistanceCalculator, Geocoder};
use crate::pacing::Pacing;
use crate::site::SiteProfile;
use crate::state_machine::{Attempt, Event, JobCandidate, SkipReason, StateMachine, Transition};

/// Per-run inputs to evaluation and submission.
#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub min_salary: f64,
    pub resume_path: PathBuf,
    /// Home address for distance lookups; distances stay unknown without it.
    pub user_address: Option<String>,
    /// Bound on every page wait (body, buttons, confirmation).
    pub wait: Duration,
    /// Bound on looking for a resume upload field.
    pub upload_wait: Duration,
}

pub struct Applicant<G> {
    site: SiteProfile,
    distance: DistanceCalculator<G>,
    pacing: Pacing,
    settings: ApplySettings,
}

impl<G: Geocoder> Applicant<G> {
    pub fn new(
        site: SiteProfile,
        distance: DistanceCalculator<G>,
        pacing: Pacing,
        settings: ApplySettings,
    ) -> Self {
        Self {
            site,
            distance,
            pacing,
            settings,
        }
    }

    /// Runs the full evaluate/apply flow for `candidate`, found while
    /// searching `city`, and returns the finished attempt.
    pub async fn process<B: BrowserSession>(
        &self,
        browser: &B,
        candidate: JobCandidate,
        city: &str,
    ) -> Attempt {
        let mut attempt = Attempt::new(candidate, city);
        advance(&mut attempt, Event::Evaluate);

        if let Err(err) = browser.open_context(&attempt.candidate.link).await {
            advance(&mut attempt, Event::Fail(format!("could not open listing: {err}")));
            return attempt;
        }

        self.evaluate_and_apply(browser, &mut attempt).await;

        if let Err(err) = browser.close_context().await {
            tracing::warn!(job_id = %attempt.candidate.id, error = %err, "could not close listing tab");
        }
        tracing::debug!(job_id = %attempt.candidate.id, path = ?attempt.transitions(), "attempt finished");
        attempt
    }

    async fn evaluate_and_apply<B: BrowserSession>(&self, browser: &B, attempt: &mut Attempt) {
        if let Err(err) = browser
            .wait_for_present(&self.site.page_body, self.settings.wait)
            .await
        {
            advance(attempt, Event::Fail(format!("listing did not load: {err}")));
            return;
        }

        if let Err(reason) = self.check_criteria(browser).await {
            tracing::info!(job_id = %attempt.candidate.id, %reason, "skipping job");
            advance(attempt, Event::Reject(reason));
            return;
        }

        attempt.distance_miles = self.distance_to(browser, &attempt.candidate).await;
        advance(attempt, Event::Qualify);

        match self.submit(browser).await {
            Ok(phrase) => {
                advance(attempt, Event::Confirm(phrase));
            }
            Err(err) => {
                tracing::warn!(job_id = %attempt.candidate.id, error = %err, "application failed");
                advance(attempt, Event::Fail(err.to_string()));
            }
        }
    }

    /// Employment type, then salary presence, then the salary floor.
    async fn check_criteria<B: BrowserSession>(&self, browser: &B) -> Result<(), SkipReason> {
        let job_type = browser
            .find_text(&self.site.job_type)
            .await
            .ok_or(SkipReason::JobTypeMissing)?;
        if !is_acceptable_employment_type(&job_type) {
            return Err(SkipReason::JobTypeRejected(job_type));
        }

        let salary = browser
            .find_text(&self.site.salary)
            .await
            .ok_or(SkipReason::SalaryMissing)?;
        if !meets_salary_floor(&salary, self.settings.min_salary) {
            return Err(SkipReason::SalaryBelowFloor {
                listed: salary,
                minimum: self.settings.min_salary,
            });
        }
        Ok(())
    }

    async fn distance_to<B: BrowserSession>(
        &self,
        browser: &B,
        candidate: &JobCandidate,
    ) -> Option<f64> {
        let home = self.settings.user_address.as_deref()?;
        let mut location = None;
        for selector in &self.site.job_location {
            if let Some(text) = browser.find_text(selector).await {
                location = Some(text);
                break;
            }
        }
        let location = location.unwrap_or_else(|| candidate.location.clone());
        if location.trim().is_empty() {
            return None;
        }
        self.distance.distance_miles(home, &location).await
    }

    /// Apply, upload, fill, submit; returns the confirmation phrase seen.
    async fn submit<B: BrowserSession>(&self, browser: &B) -> Result<String, BrowserError> {
        let apply = browser
            .wait_for_clickable(&self.site.apply_button, self.settings.wait)
            .await?;
        self.pacing.pause().await;
        browser.click(&apply).await?;

        self.upload_resume(browser).await?;

        let report = fill_required_fields(browser, &self.site, &self.pacing).await;
        tracing::debug!(?report, "form fields filled");

        let submit = browser
            .wait_for_clickable(&self.site.submit_button, self.settings.wait)
            .await?;
        self.pacing.pause().await;
        let before = browser.page_text().await?;
        browser.click(&submit).await?;

        browser
            .wait_for_new_text(&self.site.confirmation_phrases, &before, self.settings.wait)
            .await
    }

    /// A missing upload field is fine; anything else is an error.
    async fn upload_resume<B: BrowserSession>(&self, browser: &B) -> Result<(), BrowserError> {
        match browser
            .wait_for_present(&self.site.resume_upload, self.settings.upload_wait)
            .await
        {
            Ok(field) => {
                let path = self.settings.resume_path.to_string_lossy();
                browser.send_keys(&field, &path).await?;
                tracing::info!(resume = %path, "resume uploaded");
                Ok(())
            }
            Err(err) if err.is_missing() => {
                tracing::info!("no resume upload field");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Queue-only mode: the candidate goes straight to `Queued` without opening
/// the listing.
pub fn queued(candidate: JobCandidate, city: &str) -> Attempt {
    let mut attempt = Attempt::new(candidate, city);
    advance(&mut attempt, Event::Enqueue);
    attempt
}

fn advance(attempt: &mut Attempt, event: Event) {
    match StateMachine::next(attempt, event) {
        Transition::Rejected { state, event } => {
            tracing::warn!(job_id = %attempt.candidate.id, %state, event, "ignored out-of-order event");
        }
        transition => {
            tracing::debug!(job_id = %attempt.candidate.id, ?transition, "state changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{Action, ClickEffect, FakeBrowser, FakeElement, FakePage};
    use crate::geo::{Coordinates, GeoError};
    use crate::state_machine::{ApplicationOutcome, ApplicationState, Rationale, candidate};

    const SEARCH: &str = "https://jobs.test/jobs?q=&l=Austin";

    struct FixedGeocoder;

    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError> {
            Ok(match address {
                "1 Main St, Austin, TX" => Some(Coordinates { latitude: 30.2672, longitude: -97.7431 }),
                "Round Rock, TX" => Some(Coordinates { latitude: 30.5083, longitude: -97.6789 }),
                _ => None,
            })
        }
    }

    fn applicant(min_salary: f64, user_address: Option<&str>) -> Applicant<FixedGeocoder> {
        Applicant::new(
            SiteProfile::indeed("https://jobs.test"),
            DistanceCalculator::new(FixedGeocoder),
            Pacing::disabled(),
            ApplySettings {
                min_salary,
                resume_path: PathBuf::from("/home/me/resume.pdf"),
                user_address: user_address.map(str::to_string),
                wait: Duration::from_millis(40),
                upload_wait: Duration::from_millis(20),
            },
        )
    }

    /// A listing whose apply button reveals an upload field and a submit
    /// button; submitting shows `confirmation`.
    fn listing(job_type: &str, salary: &str, confirmation: &str) -> FakePage {
        let site = SiteProfile::indeed("https://jobs.test");
        let mut page = FakePage::new()
            .with(FakeElement::new(site.page_body.clone()))
            .with(
                FakeElement::new(site.apply_button.clone())
                    .id("apply")
                    .on_click(ClickEffect::Reveal("upload".into()))
                    .on_click(ClickEffect::Reveal("submit".into())),
            )
            .with(FakeElement::new(site.resume_upload.clone()).id("upload").absent())
            .with(
                FakeElement::new(site.submit_button.clone())
                    .id("submit")
                    .absent()
                    .on_click(ClickEffect::AppendText(confirmation.into())),
            );
        if !job_type.is_empty() {
            page = page.with(FakeElement::new(site.job_type.clone()).text(job_type));
        }
        if !salary.is_empty() {
            page = page.with(FakeElement::new(site.salary.clone()).text(salary));
        }
        page
    }

    fn browser_with(id: &str, page: FakePage) -> FakeBrowser {
        let browser = FakeBrowser::with_page(SEARCH, FakePage::new());
        browser.add_page(&candidate(id, "Austin").link, page);
        browser
    }

    #[tokio::test]
    async fn qualifying_listing_is_applied() {
        let browser = browser_with(
            "jk1",
            listing("Full-time", "$25 an hour", "Your application has been submitted!"),
        );

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk1", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Applied));
        assert_eq!(
            attempt.transitions(),
            vec![
                ApplicationState::Discovered,
                ApplicationState::Evaluating,
                ApplicationState::Applying,
                ApplicationState::Applied,
            ]
        );
        assert!(browser.actions().contains(&Action::Keys(
            "upload".into(),
            "/home/me/resume.pdf".into()
        )));
        assert_eq!(browser.tab_count(), 1);
        assert_eq!(browser.actions().last(), Some(&Action::Close));
    }

    #[tokio::test]
    async fn low_salary_is_skipped_without_applying() {
        let browser = browser_with("jk2", listing("Full-time", "$15 an hour", "Thank you"));

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk2", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Skipped));
        assert!(matches!(
            attempt.rationale,
            Some(Rationale::Skipped(SkipReason::SalaryBelowFloor { .. }))
        ));
        assert!(!browser.actions().contains(&Action::Click("apply".into())));
        assert_eq!(browser.tab_count(), 1);
    }

    #[tokio::test]
    async fn excluded_job_type_wins_over_full_time() {
        let browser = browser_with(
            "jk3",
            listing("Full-time, Contract", "$40 an hour", "Thank you"),
        );

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk3", "Austin"), "Austin")
            .await;

        assert_eq!(
            attempt.rationale,
            Some(Rationale::Skipped(SkipReason::JobTypeRejected(
                "Full-time, Contract".into()
            )))
        );
    }

    #[tokio::test]
    async fn missing_job_type_or_salary_is_skipped() {
        let no_type = browser_with("jk4", listing("", "$30 an hour", "Thank you"));
        let attempt = applicant(20.0, None)
            .process(&no_type, candidate("jk4", "Austin"), "Austin")
            .await;
        assert_eq!(
            attempt.rationale,
            Some(Rationale::Skipped(SkipReason::JobTypeMissing))
        );

        let no_salary = browser_with("jk5", listing("Part-time", "", "Thank you"));
        let attempt = applicant(20.0, None)
            .process(&no_salary, candidate("jk5", "Austin"), "Austin")
            .await;
        assert_eq!(
            attempt.rationale,
            Some(Rationale::Skipped(SkipReason::SalaryMissing))
        );
    }

    #[tokio::test]
    async fn open_failure_is_an_error_and_leaves_tabs_alone() {
        let browser = browser_with("jk6", listing("Full-time", "$25 an hour", "Thank you"));
        browser.break_url(&candidate("jk6", "Austin").link);

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk6", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Error));
        assert_eq!(browser.tab_count(), 1);
        assert!(!browser.actions().contains(&Action::Close));
    }

    #[tokio::test]
    async fn missing_confirmation_is_an_error() {
        let browser = browser_with(
            "jk7",
            listing("Full-time", "$25 an hour", "Something went wrong"),
        );

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk7", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Error));
        assert!(browser.actions().contains(&Action::Click("submit".into())));
        assert_eq!(browser.tab_count(), 1);
        assert_eq!(browser.actions().last(), Some(&Action::Close));
    }

    #[tokio::test]
    async fn phrase_already_in_description_does_not_confirm() {
        let description = "Thank you for your interest. Previously applied? Apply again.";
        let page =
            listing("Full-time", "$25 an hour", "Something went wrong").page_text(description);
        let browser = browser_with("jk9", page);

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk9", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Error));
    }

    #[tokio::test]
    async fn repeated_phrase_after_submit_confirms() {
        let page = listing("Full-time", "$25 an hour", "Thank you, we got it")
            .page_text("Thank you for your interest.");
        let browser = browser_with("jk10", page);

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk10", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Applied));
        assert_eq!(attempt.rationale, Some(Rationale::Confirmed("thank you".into())));
    }

    #[tokio::test]
    async fn missing_upload_field_is_not_a_failure() {
        let site = SiteProfile::indeed("https://jobs.test");
        let page = FakePage::new()
            .with(FakeElement::new(site.page_body.clone()))
            .with(FakeElement::new(site.job_type.clone()).text("Full-time"))
            .with(FakeElement::new(site.salary.clone()).text("$22 an hour"))
            .with(FakeElement::new(site.apply_button.clone()).id("apply"))
            .with(
                FakeElement::new(site.submit_button.clone())
                    .id("submit")
                    .on_click(ClickEffect::AppendText("Thank you for applying".into())),
            );
        let browser = browser_with("jk8", page);

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk8", "Austin"), "Austin")
            .await;

        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Applied));
        assert!(
            !browser
                .actions()
                .iter()
                .any(|a| matches!(a, Action::Keys(_, text) if text.ends_with("resume.pdf")))
        );
    }

    #[tokio::test]
    async fn distance_uses_page_location_when_home_is_known() {
        let site = SiteProfile::indeed("https://jobs.test");
        let page = listing("Full-time", "$25 an hour", "Applied").with(
            FakeElement::new(site.job_location[0].clone()).text("Round Rock, TX"),
        );
        let browser = browser_with("jk9", page);

        let attempt = applicant(20.0, Some("1 Main St, Austin, TX"))
            .process(&browser, candidate("jk9", "Austin"), "Austin")
            .await;

        let miles = attempt.distance_miles.unwrap();
        assert!(miles > 10.0 && miles < 25.0, "got {miles}");
    }

    #[tokio::test]
    async fn distance_unknown_without_home_address() {
        let browser = browser_with("jk10", listing("Full-time", "$25 an hour", "Applied"));

        let attempt = applicant(20.0, None)
            .process(&browser, candidate("jk10", "Round Rock, TX"), "Austin")
            .await;

        assert_eq!(attempt.distance_miles, None);
        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Applied));
    }

    #[test]
    fn queued_skips_evaluation() {
        let attempt = queued(candidate("jk11", "Austin"), "Austin");
        assert_eq!(attempt.outcome(), Some(ApplicationOutcome::Queued));
        assert_eq!(
            attempt.transitions(),
            vec![ApplicationState::Discovered, ApplicationState::Queued]
        );
    }
}

//! Neutral placeholder answers for whatever required fields an application
//! form still has empty, so submission is not blocked by them.
//!
//! Filling is best-effort: a field that cannot be read or set is skipped and
//! counted, never an error.

use crate::browser::{BrowserError, BrowserSession, ElementHandle};
use crate::pacing::Pacing;
use crate::site::SiteProfile;

pub const TEXT_PLACEHOLDER: &str = "N/A";
pub const PHONE_PLACEHOLDER: &str = "555-555-5555";
const AFFIRMATIVE: &str = "yes";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub text_fields: usize,
    pub selects: usize,
    pub radio_groups: usize,
    pub checkboxes: usize,
    pub skipped: usize,
}

impl FillReport {
    fn tally(&mut self, result: Result<bool, BrowserError>, counter: fn(&mut Self) -> &mut usize) {
        match result {
            Ok(true) => *counter(self) += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = %err, "unknown form element skipped");
                self.skipped += 1;
            }
        }
    }
}

pub async fn fill_required_fields<B: BrowserSession>(
    browser: &B,
    site: &SiteProfile,
    pacing: &Pacing,
) -> FillReport {
    let mut report = FillReport::default();

    for field in browser.find_all(&site.text_fields).await.unwrap_or_default() {
        let result = fill_text(browser, &field, pacing).await;
        report.tally(result, |r| &mut r.text_fields);
    }

    for select in browser.find_all(&site.select_fields).await.unwrap_or_default() {
        let result = choose_option(browser, site, &select).await;
        report.tally(result, |r| &mut r.selects);
    }

    let radios = browser.find_all(&site.radio_buttons).await.unwrap_or_default();
    for (name, group) in group_radios(browser, radios).await {
        let result = choose_radio(browser, &name, &group).await;
        report.tally(result, |r| &mut r.radio_groups);
    }

    for checkbox in browser.find_all(&site.checkboxes).await.unwrap_or_default() {
        let result = tick_required(browser, &checkbox).await;
        report.tally(result, |r| &mut r.checkboxes);
    }

    report
}

async fn label_of<B: BrowserSession>(browser: &B, element: &ElementHandle, fallback: &str) -> String {
    for name in ["aria-label", "placeholder", "name"] {
        if let Ok(Some(value)) = browser.attribute(element, name).await
            && !value.is_empty()
        {
            return value;
        }
    }
    fallback.to_string()
}

async fn fill_text<B: BrowserSession>(
    browser: &B,
    field: &ElementHandle,
    pacing: &Pacing,
) -> Result<bool, BrowserError> {
    if !browser.is_interactable(field).await? {
        return Ok(false);
    }
    if browser
        .attribute(field, "value")
        .await?
        .is_some_and(|v| !v.is_empty())
    {
        return Ok(false);
    }

    let label = label_of(browser, field, "input").await;
    let is_phone = browser.attribute(field, "type").await?.as_deref() == Some("tel");
    tracing::info!(field = %label, "filling input");

    browser.clear(field).await?;
    pacing.pause().await;
    let value = if is_phone { PHONE_PLACEHOLDER } else { TEXT_PLACEHOLDER };
    browser.send_keys(field, value).await?;
    Ok(true)
}

async fn choose_option<B: BrowserSession>(
    browser: &B,
    site: &SiteProfile,
    select: &ElementHandle,
) -> Result<bool, BrowserError> {
    if !browser.is_interactable(select).await? {
        return Ok(false);
    }
    let label = label_of(browser, select, "dropdown").await;

    for option in browser.find_within(select, &site.select_options).await? {
        let value = browser.attribute(&option, "value").await?.unwrap_or_default();
        let disabled = browser.attribute(&option, "disabled").await?.is_some();
        if !value.is_empty() && !disabled {
            tracing::info!(field = %label, %value, "selecting from dropdown");
            browser.click(&option).await?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Visible, enabled radios grouped by `name`, in page order.
async fn group_radios<B: BrowserSession>(
    browser: &B,
    radios: Vec<ElementHandle>,
) -> Vec<(String, Vec<ElementHandle>)> {
    let mut groups: Vec<(String, Vec<ElementHandle>)> = Vec::new();
    for radio in radios {
        if !browser.is_interactable(&radio).await.unwrap_or(false) {
            continue;
        }
        let name = browser
            .attribute(&radio, "name")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        match groups.iter_mut().find(|(group, _)| *group == name) {
            Some((_, members)) => members.push(radio),
            None => groups.push((name, vec![radio])),
        }
    }
    groups
}

async fn choose_radio<B: BrowserSession>(
    browser: &B,
    name: &str,
    group: &[ElementHandle],
) -> Result<bool, BrowserError> {
    for radio in group {
        if browser.is_selected(radio).await? {
            return Ok(false);
        }
    }

    let mut choice = None;
    for radio in group {
        let label = browser
            .attribute(radio, "aria-label")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        if label.contains(AFFIRMATIVE) {
            choice = Some(radio);
            break;
        }
    }
    let Some(choice) = choice.or_else(|| group.first()) else {
        return Ok(false);
    };

    let label = if name.is_empty() { "radio" } else { name };
    tracing::info!(field = %label, "selecting radio option");
    browser.click(choice).await?;
    Ok(true)
}

async fn tick_required<B: BrowserSession>(
    browser: &B,
    checkbox: &ElementHandle,
) -> Result<bool, BrowserError> {
    if !browser.is_interactable(checkbox).await? || browser.is_selected(checkbox).await? {
        return Ok(false);
    }
    let required = browser.attribute(checkbox, "required").await?.is_some()
        || browser.attribute(checkbox, "aria-required").await?.is_some();
    if !required {
        return Ok(false);
    }

    let label = label_of(browser, checkbox, "checkbox").await;
    tracing::info!(field = %label, "checking checkbox");
    browser.click(checkbox).await?;
    Ok(true)
}

//! Turns the quick-apply cards on a results page into [`JobCandidate`]s.
//!
//! Scraping and filtering are separate steps: [`scrape_listings`] reads raw
//! card data from the browser, [`JobDiscovery::discover`] applies the dedup
//! and location policy. Neither keeps state between calls.

use std::collections::HashSet;

use crate::browser::{BrowserError, BrowserSession, ElementHandle, Selector};
use crate::site::SiteProfile;
use crate::state_machine::JobCandidate;
use crate::store::AppliedRegistry;

/// Card data as read from the page, before any policy is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub id: Option<String>,
    pub link: String,
    pub title: String,
    pub company: String,
    pub location: String,
}

/// Ids that must not be offered again.
pub trait SeenJobs {
    fn has_seen(&self, id: &str) -> bool;
}

impl SeenJobs for AppliedRegistry {
    fn has_seen(&self, id: &str) -> bool {
        self.contains(id)
    }
}

/// The registry plus every id already attempted during this run.
pub struct SeenInRun<'a> {
    pub registry: &'a AppliedRegistry,
    pub attempted: &'a HashSet<String>,
}

impl SeenJobs for SeenInRun<'_> {
    fn has_seen(&self, id: &str) -> bool {
        self.registry.contains(id) || self.attempted.contains(id)
    }
}

/// Dedup and location policy over scraped listings.
#[derive(Debug, Clone)]
pub struct JobDiscovery {
    allow_list: Vec<String>,
}

impl JobDiscovery {
    pub fn new(locations: &[String]) -> Self {
        Self {
            allow_list: locations.iter().map(|l| normalize(l)).collect(),
        }
    }

    /// Candidates in page order, minus listings without an id, listings
    /// already seen, and listings located outside the allow-list.
    pub fn discover(&self, listings: Vec<RawListing>, seen: &impl SeenJobs) -> Vec<JobCandidate> {
        listings
            .into_iter()
            .filter_map(|listing| {
                let id = listing.id.filter(|id| !id.trim().is_empty())?;
                if seen.has_seen(&id) {
                    tracing::debug!(job_id = %id, "skipping previously processed job");
                    return None;
                }
                if !self.allows(&listing.location) {
                    tracing::info!(job_id = %id, location = %listing.location, "skipping job outside target cities");
                    return None;
                }
                Some(JobCandidate {
                    id,
                    title: listing.title,
                    company: listing.company,
                    location: listing.location,
                    link: listing.link,
                })
            })
            .collect()
    }

    fn allows(&self, location: &str) -> bool {
        let location = normalize(location);
        location.is_empty() || self.allow_list.contains(&location)
    }
}

fn normalize(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Reads every quick-apply card on the current page.
pub async fn scrape_listings<B: BrowserSession>(
    browser: &B,
    site: &SiteProfile,
) -> Result<Vec<RawListing>, BrowserError> {
    let cards = browser.find_all(&site.listing_card).await?;
    let mut listings = Vec::with_capacity(cards.len());

    for card in cards {
        let id = browser
            .attribute(&card, &site.listing_id_attribute)
            .await?
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let href = browser.attribute(&card, "href").await?;
        let link = match (&href, &id) {
            (Some(href), _) if !href.is_empty() => href.clone(),
            (_, Some(id)) => site.job_url(id),
            _ => String::new(),
        };
        let title = browser
            .text(&card)
            .await?
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        listings.push(RawListing {
            id,
            link,
            title,
            company: card_text(browser, &card, &site.card_company).await,
            location: card_text(browser, &card, &site.card_location).await,
        });
    }
    Ok(listings)
}

async fn card_text<B: BrowserSession>(browser: &B, card: &ElementHandle, selector: &Selector) -> String {
    let Ok(found) = browser.find_within(card, selector).await else {
        return String::new();
    };
    match found.first() {
        Some(element) => browser
            .text(element)
            .await
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        None => String::new(),
    }
}

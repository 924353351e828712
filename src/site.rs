//! Where things live on the listings site.
//!
//! Every selector, URL and phrase the run depends on is collected in a
//! [`SiteProfile`] so the evaluation logic never hard-codes page structure.

use crate::browser::Selector;

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: String,
    pub login_url: String,

    pub search_what: Selector,
    pub search_where: Selector,
    pub results_container: Selector,

    /// A result card carrying the quick-apply badge.
    pub listing_card: Selector,
    /// Attribute of the card holding the stable listing id.
    pub listing_id_attribute: String,
    pub card_company: Selector,
    pub card_location: Selector,

    pub page_body: Selector,
    pub job_type: Selector,
    pub salary: Selector,
    /// Tried in order; the first non-empty text wins.
    pub job_location: Vec<Selector>,

    pub apply_button: Selector,
    pub resume_upload: Selector,
    pub submit_button: Selector,
    pub confirmation_phrases: Vec<String>,

    pub text_fields: Selector,
    pub select_fields: Selector,
    pub select_options: Selector,
    pub radio_buttons: Selector,
    pub checkboxes: Selector,

    pub sign_in_link: Selector,
    pub login_email: Selector,
    pub login_password: Selector,
    pub login_submit: Selector,
    pub logged_in_marker: Selector,

    /// Page-text marker of a CAPTCHA interstitial.
    pub captcha_marker: String,
}

impl SiteProfile {
    pub fn indeed(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            login_url: "https://secure.indeed.com/account/login".to_string(),

            search_what: Selector::css("#text-input-what"),
            search_where: Selector::css("#text-input-where"),
            results_container: Selector::css("#resultsCol"),

            listing_card: Selector::xpath(
                "//span[contains(text(),'Easily apply')]/ancestor::a[@data-jk]",
            ),
            listing_id_attribute: "data-jk".to_string(),
            card_company: Selector::css(".companyName"),
            card_location: Selector::css(".companyLocation"),

            page_body: Selector::css("body"),
            job_type: Selector::xpath(
                "//*[contains(text(),'Job Type') or contains(text(),'Job type')]/following-sibling::*",
            ),
            salary: Selector::css(".salary-snippet"),
            job_location: vec![
                Selector::css(".jobsearch-JobInfoHeader-subtitle div"),
                Selector::css(".jobsearch-DesktopStickyContainer-subtitle div"),
                Selector::css(".companyLocation"),
            ],

            apply_button: Selector::xpath(
                "//button[contains(., 'Apply') or contains(., 'Submit')]",
            ),
            resume_upload: Selector::css("input[type='file']"),
            submit_button: Selector::xpath("//button[contains(., 'Submit')]"),
            confirmation_phrases: vec![
                "application has been submitted".to_string(),
                "applied".to_string(),
                "thank you".to_string(),
            ],

            text_fields: Selector::css(
                "input[type='text'], input[type='tel'], textarea, input:not([type])",
            ),
            select_fields: Selector::css("select"),
            select_options: Selector::css("option"),
            radio_buttons: Selector::css("input[type='radio']"),
            checkboxes: Selector::css("input[type='checkbox']"),

            sign_in_link: Selector::link_text("Sign in"),
            login_email: Selector::css("#login-email-input"),
            login_password: Selector::css("#login-password-input"),
            login_submit: Selector::css("button[type='submit']"),
            logged_in_marker: Selector::css("#gnav-header-inner"),

            captcha_marker: "captcha".to_string(),
            base_url,
        }
    }

    /// Canonical view page of a listing id.
    pub fn job_url(&self, id: &str) -> String {
        format!("{}/viewjob?jk={id}", self.base_url)
    }
}

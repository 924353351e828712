use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{Coordinates, GeoError, Geocoder};

const API_URL: &str = "https://nominatim.openstreetmap.org/search";

/// OpenStreetMap Nominatim search client.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(user_agent: &str) -> Result<Self, GeoError> {
        Self::with_base_url(user_agent, API_URL)
    }

    /// Create a client pointing at a custom search URL (useful for testing).
    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self, GeoError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            user_agent: user_agent.to_string(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError> {
        let response = self
            .client
            .get(&self.base_url)
            .header("user-agent", &self.user_agent)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let places = response.json::<Vec<Place>>().await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        let parse = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| GeoError::BadCoordinate(raw.to_string()))
        };
        Ok(Some(Coordinates {
            latitude: parse(&place.lat)?,
            longitude: parse(&place.lon)?,
        }))
    }
}

//! Distance between the applicant's home and a job location.
//!
//! The provider is constructed explicitly and handed to whoever needs it.
//! Every failure degrades to an unknown distance: geocoding is ancillary and
//! never decides whether an application goes ahead.

mod nominatim;

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

pub use nominatim::NominatimGeocoder;

/// Mean Earth radius in statute miles.
const EARTH_RADIUS_MILES: f64 = 3958.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Great-circle (haversine) distance in miles.
    pub fn miles_to(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
    }
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geocoding request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("geocoder returned status {0}")]
    Status(u16),

    #[error("unparseable coordinate `{0}`")]
    BadCoordinate(String),
}

/// Resolves a free-form address to coordinates. `Ok(None)` means the address
/// is unknown to the provider.
pub trait Geocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError>;
}

/// Best-effort distance lookups with a per-run cache of resolved addresses.
pub struct DistanceCalculator<G> {
    geocoder: G,
    cache: Mutex<HashMap<String, Option<Coordinates>>>,
}

impl<G: Geocoder> DistanceCalculator<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Miles between two addresses rounded to one decimal, or `None` when
    /// either side cannot be resolved.
    pub async fn distance_miles(&self, home: &str, job: &str) -> Option<f64> {
        let from = self.resolve(home).await?;
        let to = self.resolve(job).await?;
        Some((from.miles_to(&to) * 10.0).round() / 10.0)
    }

    async fn resolve(&self, address: &str) -> Option<Coordinates> {
        let key = address.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(hit) = self.lock_cache().get(&key) {
            return *hit;
        }

        let resolved = match self.geocoder.geocode(address.trim()).await {
            Ok(coords) => {
                if coords.is_none() {
                    tracing::debug!(address, "address not found by geocoder");
                }
                coords
            }
            Err(err) => {
                // Transient; not cached so a later lookup can succeed.
                tracing::warn!(address, error = %err, "geocoding failed");
                return None;
            }
        };
        self.lock_cache().insert(key, resolved);
        resolved
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<Coordinates>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TableGeocoder {
        calls: AtomicUsize,
    }

    impl Geocoder for TableGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match address {
                "Austin, TX" => Ok(Some(Coordinates { latitude: 30.2672, longitude: -97.7431 })),
                "Dallas, TX" => Ok(Some(Coordinates { latitude: 32.7767, longitude: -96.7970 })),
                "offline" => Err(GeoError::Status(503)),
                _ => Ok(None),
            }
        }
    }

    fn calculator() -> DistanceCalculator<TableGeocoder> {
        DistanceCalculator::new(TableGeocoder { calls: AtomicUsize::new(0) })
    }

    #[test]
    fn haversine_austin_dallas() {
        let austin = Coordinates { latitude: 30.2672, longitude: -97.7431 };
        let dallas = Coordinates { latitude: 32.7767, longitude: -96.7970 };
        let miles = austin.miles_to(&dallas);
        assert!((miles - 182.0).abs() < 3.0, "got {miles}");
        assert_eq!(austin.miles_to(&austin), 0.0);
    }

    #[tokio::test]
    async fn distance_is_rounded_to_one_decimal() {
        let calc = calculator();
        let miles = calc.distance_miles("Austin, TX", "Dallas, TX").await.unwrap();
        assert_eq!(miles, (miles * 10.0).round() / 10.0);
    }

    #[tokio::test]
    async fn unknown_or_failing_address_yields_none() {
        let calc = calculator();
        assert_eq!(calc.distance_miles("Austin, TX", "Atlantis").await, None);
        assert_eq!(calc.distance_miles("offline", "Austin, TX").await, None);
        assert_eq!(calc.distance_miles("", "Austin, TX").await, None);
    }

    #[tokio::test]
    async fn resolved_addresses_are_cached() {
        let calc = calculator();
        calc.distance_miles("Austin, TX", "Dallas, TX").await;
        calc.distance_miles("austin, tx", "Dallas, TX").await;
        assert_eq!(calc.geocoder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let calc = calculator();
        calc.distance_miles("offline", "Austin, TX").await;
        calc.distance_miles("offline", "Austin, TX").await;
        assert_eq!(calc.geocoder.calls.load(Ordering::SeqCst), 2);
    }
}

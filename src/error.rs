use thiserror::Error;

use crate::browser::BrowserError;
use crate::config::ConfigError;
use crate::geo::GeoError;
use crate::session::SessionError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;

/// Failures that end a run. Anything that only affects one job is settled
/// inside the state machine and never reaches this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Browser session could not be started: {0}")]
    Browser(#[from] BrowserError),

    #[error("Login failed: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Geocoder setup failed: {0}")]
    Geo(#[from] GeoError),
}

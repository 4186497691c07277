use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to submit a poster generation job.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[garde(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub lon: f64,

    #[garde(length(min = 1, max = 100))]
    pub theme: String,

    /// Map radius in meters.
    #[garde(range(min = 1000, max = 50000))]
    #[serde(default = "default_distance")]
    pub distance: u32,

    #[garde(skip)]
    #[serde(default = "default_city")]
    pub city: String,

    #[garde(skip)]
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_distance() -> u32 {
    10_000
}

fn default_city() -> String {
    "City".to_string()
}

fn default_country() -> String {
    "Country".to_string()
}

/// Response after submitting a generation job.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub job_id: Uuid,
}

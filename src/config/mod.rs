use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory for cached geocoding and map-data payloads
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Output directory for rendered posters
    #[serde(default = "default_posters_dir")]
    pub posters_dir: String,

    /// Directory containing theme JSON assets
    #[serde(default = "default_themes_dir")]
    pub themes_dir: String,

    /// Directory containing Roboto font files
    #[serde(default = "default_fonts_dir")]
    pub fonts_dir: String,

    /// Nominatim geocoding endpoint
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,

    /// Overpass API endpoint for street network and feature data
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

fn default_posters_dir() -> String {
    "posters".to_string()
}

fn default_themes_dir() -> String {
    "themes".to_string()
}

fn default_fonts_dir() -> String {
    "fonts".to_string()
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

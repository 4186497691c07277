use serde::{Deserialize, Serialize};

/// A poster color theme with a fixed field shape.
///
/// Loaded from JSON assets; every consumer must tolerate an unknown theme id,
/// which resolves through the fallback chain in `services::themes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub bg: String,
    pub text: String,
    pub gradient_color: String,
    pub water: String,
    pub parks: String,
    pub road_motorway: String,
    pub road_primary: String,
    pub road_secondary: String,
    pub road_tertiary: String,
    pub road_residential: String,
    pub road_default: String,
}

impl Theme {
    /// Hard-coded default used when even the default theme asset is
    /// unreadable or malformed.
    pub fn fallback() -> Self {
        Self {
            name: "Terracotta".to_string(),
            description: "Default fallback theme".to_string(),
            bg: "#E8D4C4".to_string(),
            text: "#3D2817".to_string(),
            gradient_color: "#E8D4C4".to_string(),
            water: "#A8C5D1".to_string(),
            parks: "#B8D4A8".to_string(),
            road_motorway: "#5C3D2E".to_string(),
            road_primary: "#6D4E3F".to_string(),
            road_secondary: "#7D5E4F".to_string(),
            road_tertiary: "#8D6E5F".to_string(),
            road_residential: "#9D7E6F".to_string(),
            road_default: "#8D6E5F".to_string(),
        }
    }
}

/// Summary row for the theme listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

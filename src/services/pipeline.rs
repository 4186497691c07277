use std::path::PathBuf;
use std::sync::Arc;

use crate::models::job::PosterParams;
use crate::services::geocoder::{GeocodeError, Geocoder};
use crate::services::map_data::{MapDataProvider, TagFilter};
use crate::services::renderer::{self, CanvasSize, RenderError, RenderJob};
use crate::services::themes::ThemeStore;
use crate::services::typography::PosterFonts;

/// The full poster generation pipeline: coordinate resolution, map data
/// retrieval, and rendering. One instance is shared by all workers.
pub struct PosterPipeline {
    geocoder: Arc<dyn Geocoder>,
    map_data: Arc<dyn MapDataProvider>,
    themes: Arc<ThemeStore>,
    canvas: CanvasSize,
    posters_dir: PathBuf,
    fonts: Option<PosterFonts>,
}

/// A finished poster: the file on disk and its public URL.
#[derive(Debug)]
pub struct RenderedPoster {
    pub path: PathBuf,
    pub url: String,
}

impl PosterPipeline {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        map_data: Arc<dyn MapDataProvider>,
        themes: Arc<ThemeStore>,
        canvas: CanvasSize,
        posters_dir: impl Into<PathBuf>,
        fonts: Option<PosterFonts>,
    ) -> Self {
        Self {
            geocoder,
            map_data,
            themes,
            canvas,
            posters_dir: posters_dir.into(),
            fonts,
        }
    }

    /// Generate one poster.
    ///
    /// Missing water or park layers degrade to empty layers; a missing street
    /// network is the only fatal upstream condition.
    pub async fn generate(&self, params: &PosterParams) -> Result<RenderedPoster, PipelineError> {
        let center = match params.coords {
            Some(coords) => coords,
            None => self.geocoder.resolve(&params.city, &params.country).await?,
        };

        let theme = self.themes.load(&params.theme);
        let fetch_radius = renderer::compensated_radius(params.distance, &self.canvas);

        let network = self
            .map_data
            .fetch_network(center, fetch_radius)
            .await
            .ok_or(PipelineError::MissingNetwork)?;

        let water = self
            .map_data
            .fetch_features(center, fetch_radius, &TagFilter::water(), "water")
            .await;
        let parks = self
            .map_data
            .fetch_features(center, fetch_radius, &TagFilter::parks(), "parks")
            .await;

        let job = RenderJob {
            network,
            water,
            parks,
            theme,
            theme_id: params.theme.to_lowercase(),
            center,
            radius: fetch_radius,
            city: params.city.clone(),
            country: params.country.clone(),
            canvas: self.canvas,
            fonts: self.fonts.clone(),
            posters_dir: self.posters_dir.clone(),
        };

        // Rasterization is CPU-bound; keep it off the async runtime.
        let path = tokio::task::spawn_blocking(move || renderer::render_poster(job))
            .await
            .map_err(|e| PipelineError::Canceled(e.to_string()))??;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(RenderedPoster { url: format!("/api/posters/{filename}"), path })
    }
}

/// Worker-visible failure classes; the message distinguishes upstream fetch
/// problems from render problems for the job record's error detail.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Failed to retrieve street network data")]
    MissingNetwork,

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Render task canceled: {0}")]
    Canceled(String),
}

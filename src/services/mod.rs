pub mod cache;
pub mod dispatcher;
pub mod geocoder;
pub mod jobs;
pub mod map_data;
pub mod pipeline;
pub mod renderer;
pub mod themes;
pub mod typography;

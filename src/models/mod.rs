pub mod generate;
pub mod geo;
pub mod job;
pub mod theme;

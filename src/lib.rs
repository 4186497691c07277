//! Map Poster Generation Service
//!
//! This library provides the core functionality for the map-poster-api
//! system: an asynchronous job pipeline that turns a geographic point and a
//! theme into a rendered map poster, backed by OpenStreetMap data.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

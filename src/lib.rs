#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod images;

use std::sync::Arc;

use rocket::figment::Figment;
use rocket::{Build, Rocket};

use cache::CacheResolver;
use config::AppConfig;

/// Assemble the server: one catch-all route over the uploads directory.
pub fn build_rocket(figment: Figment, config: AppConfig) -> Rocket<Build> {
    let resolver = Arc::new(CacheResolver::new(config.cache_settings()));

    rocket::custom(figment)
        .manage(resolver)
        .manage(config)
        .mount("/", routes![api::uploads::serve_upload])
}

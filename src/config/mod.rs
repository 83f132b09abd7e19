use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use rocket::figment::{
    providers::{Format, Serialized, Toml},
    Figment, Profile,
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;

/// What to do when `s` is present but not an allow-listed size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidSizePolicy {
    /// Answer 400 Bad Request.
    #[default]
    Reject,
    /// Ignore the parameter and serve the original.
    Original,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub address: String,
    pub uploads_path: PathBuf,
    pub allowed_file_types: Vec<String>,
    pub allowed_sizes: Vec<u32>,
    #[serde(default)]
    pub invalid_size_policy: InvalidSizePolicy,
    pub jpeg_quality: u8,
    pub cache_max_age: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 9990,
            address: "0.0.0.0".to_string(),
            uploads_path: PathBuf::from("./uploads/"),
            allowed_file_types: vec!["jpg".into(), "jpeg".into(), "png".into()],
            allowed_sizes: vec![100, 200, 600],
            invalid_size_policy: InvalidSizePolicy::Reject,
            jpeg_quality: 75,
            cache_max_age: 86400,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Layer the app defaults, `App.toml` and environment overrides on top of `base`.
    /// Also returns the `ALLOWED_SIZES` entries that were skipped as non-integers,
    /// so they can be reported once logging is up.
    pub fn figment(base: Figment) -> (Figment, Vec<String>) {
        let mut rejected_sizes = Vec::new();
        let mut figment = base
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("App.toml").nested());

        if let Ok(path) = env::var("UPLOADS_PATH") {
            figment = figment.merge(("uploads_path", path));
        }

        if let Ok(sizes) = env::var("ALLOWED_SIZES") {
            let (sizes, rejected) = parse_sizes(&sizes);
            rejected_sizes = rejected;
            figment = figment.merge(("allowed_sizes", sizes));
        }

        if let Ok(types) = env::var("ALLOWED_FILE_TYPES") {
            figment = figment.merge(("allowed_file_types", split_list(&types)));
        }

        (
            figment.select(Profile::from_env_or("APP_PROFILE", "default")),
            rejected_sizes,
        )
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        figment.extract::<AppConfig>()
    }

    /// The read-only view handed to the cache resolver.
    pub fn cache_settings(&self) -> CacheSettings {
        let allowed_file_types: BTreeSet<String> = self
            .allowed_file_types
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        CacheSettings {
            uploads_path: self.uploads_path.clone(),
            allowed_file_types,
            allowed_sizes: self.allowed_sizes.iter().copied().filter(|s| *s > 0).collect(),
            invalid_size_policy: self.invalid_size_policy,
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }
}

/// Split a comma separated size list into valid sizes and rejected entries.
fn parse_sizes(value: &str) -> (Vec<u32>, Vec<String>) {
    let mut sizes = Vec::new();
    let mut rejected = Vec::new();
    for entry in split_list(value) {
        match entry.parse::<u32>() {
            Ok(size) => sizes.push(size),
            Err(_) => rejected.push(entry),
        }
    }
    (sizes, rejected)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

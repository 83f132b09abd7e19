#[macro_use]
extern crate rocket;

use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use rocket::figment::Figment;
use rocket::Config;

use imgcache::build_rocket;
use imgcache::config::AppConfig;

#[launch]
fn rocket() -> _ {
    dotenv().ok();

    // Load config
    let (figment, rejected_sizes) = AppConfig::figment(Figment::from(Config::default()));
    let config = match AppConfig::from_figment(&figment) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or(config.log_filter.as_str()));
    info!("Configuration loaded successfully");
    for size in &rejected_sizes {
        warn!("Ignoring invalid size '{}' in ALLOWED_SIZES", size);
    }

    if !config.uploads_path.is_dir() {
        warn!(
            "Uploads directory {} does not exist, every request will 404",
            config.uploads_path.display()
        );
    }

    info!(
        "Serving {} with sizes {:?} and file types {:?}",
        config.uploads_path.display(),
        config.allowed_sizes,
        config.allowed_file_types
    );
    info!("Starting image cache on {}:{}", config.address, config.port);

    build_rocket(figment, config)
}

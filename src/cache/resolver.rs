use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::InvalidSizePolicy;
use crate::images::{self, EncodeFormat, ProcessingError};

use super::locks::VariantLocks;
use super::variant::variant_path;

/// Immutable settings the resolver consults on every request.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub uploads_path: PathBuf,
    /// Lowercase, without the leading dot.
    pub allowed_file_types: BTreeSet<String>,
    pub allowed_sizes: BTreeSet<u32>,
    pub invalid_size_policy: InvalidSizePolicy,
    pub jpeg_quality: u8,
}

/// Outcome of resolving a request. Every variant except `NotFound` and
/// `InvalidSize` names a file that existed when it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    InvalidSize(String),
    Original(PathBuf),
    Hit(PathBuf),
    Generated(PathBuf),
    /// Generation failed; the original is served instead.
    Fallback(PathBuf),
}

impl Resolution {
    /// Value of the `X-Image-Cache` response header.
    pub fn cache_status(&self) -> &'static str {
        match self {
            Resolution::Original(_) => "original",
            Resolution::Hit(_) => "hit",
            Resolution::Generated(_) => "miss",
            Resolution::Fallback(_) => "fallback",
            Resolution::NotFound => "not-found",
            Resolution::InvalidSize(_) => "invalid-size",
        }
    }
}

/// Decides between serving the original, an existing variant, or a freshly
/// generated one. All filesystem checks are point-in-time; generation for a
/// given variant path is serialised and published by atomic rename.
pub struct CacheResolver {
    settings: CacheSettings,
    locks: VariantLocks,
}

impl CacheResolver {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            locks: VariantLocks::new(),
        }
    }

    /// Path of the original under the uploads root. Only the basename of
    /// `requested` is kept; `None` when there is no usable basename or the
    /// extension is not allow-listed.
    pub fn original_path(&self, requested: &str) -> Option<PathBuf> {
        let basename = Path::new(requested).file_name()?;
        let candidate = Path::new(basename);

        let ext = candidate.extension()?.to_str()?.to_ascii_lowercase();
        if !self.settings.allowed_file_types.contains(&ext) {
            log::debug!("Extension '{}' not allowed for {:?}", ext, basename);
            return None;
        }

        Some(self.settings.uploads_path.join(candidate))
    }

    /// Parse the `s` query value, accepting only allow-listed sizes.
    pub fn parse_size(&self, raw: &str) -> Option<u32> {
        raw.trim()
            .parse::<u32>()
            .ok()
            .filter(|size| self.settings.allowed_sizes.contains(size))
    }

    pub fn resolve(&self, requested: &str, size: Option<&str>) -> Resolution {
        let original = match self.original_path(requested) {
            Some(path) => path,
            None => return Resolution::NotFound,
        };

        log::debug!("Searching for: {}", original.display());

        if !original.is_file() {
            log::debug!("File not found: {}", original.display());
            return Resolution::NotFound;
        }

        let raw_size = match size {
            Some(raw) => raw,
            None => return Resolution::Original(original),
        };

        let size = match self.parse_size(raw_size) {
            Some(size) => size,
            None => {
                return match self.settings.invalid_size_policy {
                    InvalidSizePolicy::Reject => {
                        log::debug!("Rejecting size '{}' for {}", raw_size, original.display());
                        Resolution::InvalidSize(raw_size.to_string())
                    }
                    InvalidSizePolicy::Original => {
                        log::debug!("Ignoring size '{}' for {}", raw_size, original.display());
                        Resolution::Original(original)
                    }
                };
            }
        };

        let variant = variant_path(&original, size);
        if variant.is_file() {
            log::debug!("Resized file exists already: {}", variant.display());
            return Resolution::Hit(variant);
        }

        self.locks.with_lock(&variant, || {
            // Another request may have produced it while we waited
            if variant.is_file() {
                return Resolution::Hit(variant.clone());
            }

            match self.generate(&original, &variant, size) {
                Ok(()) => {
                    log::info!("Generated {} at width {}", variant.display(), size);
                    Resolution::Generated(variant.clone())
                }
                Err(e) => {
                    log::warn!(
                        "Unable to generate {}, serving original: {}",
                        variant.display(),
                        e
                    );
                    Resolution::Fallback(original.clone())
                }
            }
        })
    }

    fn generate(&self, original: &Path, variant: &Path, size: u32) -> Result<(), ProcessingError> {
        let format = EncodeFormat::from_path(original)?;
        let bytes = fs::read(original)?;
        let img = images::decode(&bytes)?;
        let resized = images::resize_to_width(&img, size)?;
        let encoded = images::encode(&resized, format, self.settings.jpeg_quality)?;
        // Variants are as readable as the original they derive from
        let permissions = fs::metadata(original)?.permissions();
        write_atomically(variant, &encoded, permissions)
    }
}

/// Write to a hidden temp file next to `target`, then rename over it.
fn write_atomically(
    target: &Path,
    data: &[u8],
    permissions: fs::Permissions,
) -> Result<(), ProcessingError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| ProcessingError::Io(e.error))?;

    Ok(())
}

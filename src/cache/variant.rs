//! Naming of cached variants.
//!
//! A variant of `<dir>/<stem>.<ext>` at size `N` lives at
//! `<dir>/<stem>_s<N>.<ext>`. The stem and extension are split structurally,
//! so extension text appearing earlier in the path (`/img.jpg.d/cat.jpg`,
//! `jpg-cat.jpg`) is never touched. Pure: no filesystem access.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Map an original path and a size class to the variant path.
pub fn variant_path(original: &Path, size: u32) -> PathBuf {
    let mut name = OsString::new();
    if let Some(stem) = original.file_stem() {
        name.push(stem);
    }
    name.push(format!("_s{}", size));
    if let Some(ext) = original.extension() {
        name.push(".");
        name.push(ext);
    }

    match original.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

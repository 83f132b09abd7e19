pub mod locks;
pub mod resolver;
pub mod variant;

pub use locks::VariantLocks;
pub use resolver::{CacheResolver, CacheSettings, Resolution};
pub use variant::variant_path;

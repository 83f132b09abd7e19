pub mod error;
pub mod uploads;

pub use error::ApiError;
pub use uploads::ImageResponse;

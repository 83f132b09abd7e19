use std::io::{Cursor, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;

use rocket::http::uri::{fmt::Path, Segments};
use rocket::http::{ContentType, Header, Status};
use rocket::{request::Request, response::{self, Responder, Response}, State};

use crate::api::ApiError;
use crate::cache::{CacheResolver, Resolution};
use crate::config::AppConfig;

// Responder for image bytes read from the uploads directory
pub struct ImageResponse {
    pub data: Vec<u8>,
    pub content_type: ContentType,
    pub cache_status: &'static str,
    pub max_age: u64,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let etag = format!("\"{:x}\"", md5::compute(&self.data));
        let cache_control = format!("public, max-age={}", self.max_age);

        let not_modified = req
            .headers()
            .get("If-None-Match")
            .any(|value| etag_matches(value, &etag));
        if not_modified {
            return Response::build()
                .status(Status::NotModified)
                .header(Header::new("ETag", etag))
                .header(Header::new("Cache-Control", cache_control))
                .header(Header::new("X-Image-Cache", self.cache_status))
                .ok();
        }

        Response::build()
            .header(self.content_type)
            .header(Header::new("Cache-Control", cache_control))
            .header(Header::new("ETag", etag))
            .header(Header::new("X-Image-Cache", self.cache_status))
            .sized_body(None, Cursor::new(self.data))
            .ok()
    }
}

/// Whether an `If-None-Match` value (`*` or a list of possibly weak tags)
/// matches `etag`.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Serve an upload, optionally as a resized variant (`?s=<width>`).
/// Only the last path segment is used to locate the file.
#[get("/<path..>?<s>")]
pub async fn serve_upload(
    path: Segments<'_, Path>,
    s: Option<&str>,
    resolver: &State<Arc<CacheResolver>>,
    config: &State<AppConfig>,
) -> Result<ImageResponse, ApiError> {
    let requested = path.collect::<Vec<_>>().join("/");
    let size = s.map(str::to_owned);

    log::debug!("Request for '{}' with size {:?}", requested, size);

    let resolver = Arc::clone(resolver.inner());
    let resolution = tokio::task::spawn_blocking(move || resolver.resolve(&requested, size.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Resize task failed: {}", e)))?;

    let file_path: PathBuf = match &resolution {
        Resolution::NotFound => return Err(ApiError::NotFound),
        Resolution::InvalidSize(raw) => return Err(ApiError::InvalidSize(raw.clone())),
        Resolution::Original(path)
        | Resolution::Hit(path)
        | Resolution::Generated(path)
        | Resolution::Fallback(path) => path.clone(),
    };

    let data = tokio::fs::read(&file_path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ApiError::NotFound,
        _ => ApiError::Internal(format!("Unable to read {}: {}", file_path.display(), e)),
    })?;

    let content_type = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentType::from_extension)
        .unwrap_or(ContentType::Binary);

    Ok(ImageResponse {
        data,
        content_type,
        cache_status: resolution.cache_status(),
        max_age: config.cache_max_age,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETAG: &str = "\"0123abcd\"";

    #[test]
    fn exact_tag_matches() {
        assert!(etag_matches("\"0123abcd\"", ETAG));
        assert!(!etag_matches("\"ffff\"", ETAG));
    }

    #[test]
    fn any_tag_in_a_list_matches() {
        assert!(etag_matches("\"ffff\", \"0123abcd\"", ETAG));
        assert!(etag_matches("\"ffff\",\"0123abcd\"", ETAG));
        assert!(!etag_matches("\"ffff\", \"eeee\"", ETAG));
    }

    #[test]
    fn wildcard_and_weak_tags_match() {
        assert!(etag_matches("*", ETAG));
        assert!(etag_matches("W/\"0123abcd\"", ETAG));
    }
}

use rocket::http::{ContentType, Status};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    InvalidSize(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::NotFound => Status::NotFound,
            ApiError::InvalidSize(_) => Status::BadRequest,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        let body = match self {
            ApiError::NotFound => json!({
                "error": "Not found",
                "message": "The requested image does not exist"
            }),
            ApiError::InvalidSize(size) => json!({
                "error": "Invalid size",
                "message": format!("Size '{}' is not an allowed size", size)
            }),
            ApiError::Internal(message) => {
                log::error!("Internal error while serving image: {}", message);
                json!({
                    "error": "Internal error",
                    "message": message
                })
            }
        }
        .to_string();

        rocket::Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(None, std::io::Cursor::new(body))
            .ok()
    }
}

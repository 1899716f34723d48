use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use std::fmt;
use std::io::Cursor;

#[derive(Debug, Clone)]
pub enum Error {
    /// Login page no longer carries the CSRF marker.
    ProtocolError(String),
    /// Credentials rejected, no session cookie after login.
    AuthError(String),
    /// Aggregate energy fetch failed; the session is likely stale.
    AuthOrNetworkError(String),
    /// Metric name, cause.
    MetricFetchError(String, String),
    /// System description has not been fetched yet.
    NotReadyError,
    ApiError(String),
    InvalidResponse(String, String),
    FormatError,
    InternalError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProtocolError(s) => write!(f, "portal protocol error: {}", s),
            Error::AuthError(s) => write!(f, "authentication failed: {}", s),
            Error::AuthOrNetworkError(s) => write!(f, "authentication or network error: {}", s),
            Error::MetricFetchError(metric, s) => {
                write!(f, "failed to fetch metric {}: {}", metric, s)
            }
            Error::NotReadyError => write!(f, "system description not fetched yet"),
            Error::ApiError(s) => write!(f, "API error: {}", s),
            Error::InvalidResponse(response, e) => {
                write!(f, "invalid API response ({}): {}", e, response)
            }
            Error::FormatError => write!(f, "format error"),
            Error::InternalError => write!(f, "internal error"),
        }
    }
}

impl std::error::Error for Error {}

fn html_response(status: Status, title: &str, detail: String) -> response::Result<'static> {
    let error = format!(
        "<html><body><h3>{}</h3><code>{}</code></body></html>",
        title, detail
    );
    Response::build()
        .status(status)
        .sized_body(error.len(), Cursor::new(error))
        .header(ContentType::new("text", "html"))
        .ok()
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Error::NotReadyError => html_response(
                Status::ServiceUnavailable,
                "503 Service Unavailable",
                self.to_string(),
            ),
            Error::AuthError(_) => {
                html_response(Status::Forbidden, "403 Forbidden", self.to_string())
            }
            Error::ProtocolError(_) | Error::AuthOrNetworkError(_) => {
                html_response(Status::BadGateway, "502 Bad Gateway", self.to_string())
            }
            _ => html_response(
                Status::InternalServerError,
                "Unknown exception",
                format!("{:?}", self),
            ),
        }
    }
}

use actix_web::{cookie::Cookie, http::header, HttpResponse};

use crate::error::AuthFailureReason;

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// 302 to `location` carrying `cookies`
    #[must_use]
    pub fn redirect(location: &str, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        for cookie in cookies {
            builder.cookie(cookie);
        }
        builder
            .insert_header((header::LOCATION, location))
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }

    /// 302 to `location` with `error=<reason>` appended
    #[must_use]
    pub fn error_redirect(
        location: &str,
        reason: AuthFailureReason,
        cookies: Vec<Cookie<'static>>,
    ) -> HttpResponse {
        let separator = if location.contains('?') { '&' } else { '?' };
        let redirect_url = format!("{location}{separator}error={reason}");
        Self::redirect(&redirect_url, cookies)
    }

    /// Plain 500 with no detail
    #[must_use]
    pub fn internal_error() -> HttpResponse {
        HttpResponse::InternalServerError()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .json(serde_json::json!({
                "error": "server_error",
                "error_description": "An internal server error occurred"
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_redirect_appends_to_existing_query() {
        let response = ResponseBuilder::error_redirect(
            "/login?next=%2Fdashboard",
            AuthFailureReason::MissingParams,
            Vec::new(),
        );
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login?next=%2Fdashboard&error=missing_params"
        );
    }

    #[test]
    fn test_redirects_are_not_cached() {
        let response = ResponseBuilder::redirect("/dashboard", Vec::new());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }

    #[test]
    fn test_internal_error() {
        assert_eq!(
            ResponseBuilder::internal_error().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

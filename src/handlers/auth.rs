// Handshake handlers: start, callback and logout
use actix_web::{web, HttpRequest, HttpResponse, Result};

use crate::broker::AuthBroker;

/// Begin the authorization flow
///
/// Sets the `auth_state` cookie and redirects to the provider's authorize
/// endpoint.
///
/// # Errors
///
/// Never fails at the actix level; an entropy failure becomes a 500 response.
pub async fn auth_start(req: HttpRequest, broker: web::Data<AuthBroker>) -> Result<HttpResponse> {
    Ok(broker.start(&req).await)
}

/// Provider redirect target
///
/// The raw query string is parsed by the broker so that malformed callbacks
/// end in a login redirect instead of an actix 400.
///
/// # Errors
///
/// Never fails at the actix level; every outcome is a redirect.
pub async fn auth_callback(
    req: HttpRequest,
    broker: web::Data<AuthBroker>,
) -> Result<HttpResponse> {
    Ok(broker.callback(&req).await)
}

/// Clear the session indicator cookie
///
/// # Errors
///
/// Never fails at the actix level.
pub async fn auth_logout(req: HttpRequest, broker: web::Data<AuthBroker>) -> Result<HttpResponse> {
    Ok(broker.sign_out(&req))
}

use actix_web::HttpRequest;

/// Optional lookup of the signed-in application user, used only to attribute
/// audit entries
pub trait IdentityLookup: Send + Sync {
    fn actor_id(&self, req: &HttpRequest) -> Option<String>;
}

/// No user identity available
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousIdentity;

impl IdentityLookup for AnonymousIdentity {
    fn actor_id(&self, _req: &HttpRequest) -> Option<String> {
        None
    }
}

/// Reads the user id from a header set by the fronting gateway
///
/// The header must be stripped from client traffic by that gateway.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header_name: String,
}

impl HeaderIdentity {
    #[must_use]
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl IdentityLookup for HeaderIdentity {
    fn actor_id(&self, req: &HttpRequest) -> Option<String> {
        req.headers()
            .get(self.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    }
}

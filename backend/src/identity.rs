// Identity resolution for vote attribution.
//
// Votes are attributed to the client's network address, resolved once per
// request. Clients behind a shared address (office NAT, carrier-grade NAT)
// share one identity and therefore one daily allowance; that is a known
// limitation of the scheme, not something this layer tries to repair.

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

/// Stable per-request voter identity.
///
/// Resolved from [`Request::client_ip`], which honors Rocket's `ip_header`
/// configuration when the app runs behind a reverse proxy. A request whose
/// origin cannot be determined is refused outright: an unattributable vote
/// must never bypass the rate limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity(pub String);

impl VoterIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterIdentity {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.client_ip() {
            Some(ip) => Outcome::Success(VoterIdentity(ip.to_string())),
            None => Outcome::Error((Status::BadRequest, ())),
        }
    }
}

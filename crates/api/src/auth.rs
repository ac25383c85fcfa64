use base64::{engine::general_purpose::STANDARD, Engine as _};
use hyper::{header::AUTHORIZATION, HeaderMap, StatusCode};

/// Extracts the username and password from a `Basic` authorization header.
fn parse_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.into(), password.into()))
}

/// The administrator's credentials. Every admin request must present them again.
pub struct Credentials {
    username: Box<str>,
    password: Box<str>,
}

impl Credentials {
    pub fn new(username: Box<str>, password: Box<str>) -> Self {
        Self { username, password }
    }

    /// Returns the authenticated username. Missing, malformed, and mismatched credentials all
    /// yield [`StatusCode::UNAUTHORIZED`].
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Box<str>, StatusCode> {
        let (username, password) = parse_basic(headers).ok_or(StatusCode::UNAUTHORIZED)?;
        if *username != *self.username || *password != *self.password {
            log::warn!("Rejected admin credentials for user {username:?}.");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(username.into_boxed_str())
    }
}

//! Carrying the session id between client and server.

use std::time::Duration;

use http::header::{HeaderValue, COOKIE, SET_COOKIE};
use trellis_core::Context;

use crate::error::SessionError;

/// Default cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "session_id";

/// Moves session ids in and out of HTTP messages.
pub trait Propagator: Send + Sync {
    /// Writes `id` into the buffered response.
    ///
    /// # Errors
    ///
    /// Fails when `id` cannot be encoded into a header.
    fn inject(&self, id: &str, ctx: &mut Context) -> Result<(), SessionError>;

    /// Reads the session id from the request.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingId`] when the request carries none.
    fn extract(&self, ctx: &Context) -> Result<String, SessionError>;

    /// Instructs the client to forget its session id.
    ///
    /// # Errors
    ///
    /// Fails when the response header cannot be written.
    fn clean(&self, ctx: &mut Context) -> Result<(), SessionError>;
}

/// Carries the session id in a cookie.
///
/// Injected cookies are scoped to `Path=/`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_session::CookiePropagator;
///
/// let propagator = CookiePropagator::new()
///     .cookie_name("sid")
///     .http_only(true)
///     .max_age(Duration::from_secs(3600));
///
/// assert_eq!(
///     propagator.set_cookie_value("abc"),
///     "sid=abc; Path=/; Max-Age=3600; HttpOnly"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CookiePropagator {
    name: String,
    http_only: bool,
    secure: bool,
    max_age: Option<Duration>,
}

impl Default for CookiePropagator {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            http_only: false,
            secure: false,
            max_age: None,
        }
    }
}

impl CookiePropagator {
    /// Creates a propagator using the `session_id` cookie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cookie name.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds the `HttpOnly` attribute.
    #[must_use]
    pub fn http_only(mut self, enabled: bool) -> Self {
        self.http_only = enabled;
        self
    }

    /// Adds the `Secure` attribute.
    #[must_use]
    pub fn secure(mut self, enabled: bool) -> Self {
        self.secure = enabled;
        self
    }

    /// Adds a `Max-Age` attribute, in whole seconds.
    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// The cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the `Set-Cookie` value that carries `id`.
    #[must_use]
    pub fn set_cookie_value(&self, id: &str) -> String {
        let mut parts = vec![format!("{}={id}", self.name), "Path=/".to_string()];
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age.as_secs()));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.join("; ")
    }
}

impl Propagator for CookiePropagator {
    fn inject(&self, id: &str, ctx: &mut Context) -> Result<(), SessionError> {
        let value = HeaderValue::try_from(self.set_cookie_value(id))?;
        ctx.append_header(SET_COOKIE, value)?;
        Ok(())
    }

    fn extract(&self, ctx: &Context) -> Result<String, SessionError> {
        ctx.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.name)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
            .ok_or(SessionError::MissingId)
    }

    fn clean(&self, ctx: &mut Context) -> Result<(), SessionError> {
        let value = HeaderValue::try_from(format!("{}=; Path=/; Max-Age=0", self.name))?;
        ctx.append_header(SET_COOKIE, value)?;
        Ok(())
    }
}

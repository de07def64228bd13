//! Request context and handler chain.
//!
//! The [`Context`] carries all per-request state through the handler chain:
//! the parsed request, bound path parameters, a typed scratch store, the
//! chain cursor, and the buffered response that the dispatcher flushes once
//! the chain has finished.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{AsHeaderName, HeaderName, HeaderValue, CONTENT_TYPE, HOST};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use trellis_router::Params;
use uuid::Uuid;

use crate::error::Fault;
use crate::handler::{Handler, HandlerResult};

/// Cursor value marking an aborted chain.
///
/// Any cursor at or beyond this value stops `next()` immediately.
const ABORT_INDEX: usize = usize::MAX / 2;

/// Request header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps access logs sortable by id.
///
/// # Example
///
/// ```
/// use trellis_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request id supplied by the caller.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request state threaded through the handler chain.
///
/// A `Context` is created once per inbound request, owned by the dispatcher
/// for that request's lifetime, and discarded after the response is flushed.
/// It is never shared between requests, so nothing in it needs locking.
///
/// # Chain execution
///
/// [`next`](Self::next) runs the remaining handlers in the current call
/// frame. Code placed before `next()` runs top-down in registration order;
/// code placed after it runs bottom-up once the downstream handlers return:
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use trellis_core::{handler, Context, Params};
///
/// let timing = handler(|ctx: &mut Context| {
///     ctx.set("before", true);
///     ctx.next()?;
///     ctx.set_header("x-after", "yes")
/// });
/// let endpoint = handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "done"));
///
/// let mut ctx = Context::new(Request::new(Bytes::new()));
/// ctx.install_route("/", Params::new(), vec![timing, endpoint]);
/// ctx.next().unwrap();
///
/// let response = ctx.into_response();
/// assert_eq!(response.headers()["x-after"], "yes");
/// assert_eq!(response.body().as_ref(), b"done");
/// ```
pub struct Context {
    request: Request<Bytes>,
    request_id: RequestId,
    params: Params,
    /// Registered pattern, empty when unmatched
    matched_route: String,
    keys: HashMap<String, Box<dyn Any + Send + Sync>>,
    handlers: Vec<Handler>,
    cursor: usize,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Bytes,
    started_at: Instant,
}

impl Context {
    /// Creates a context for `request` with an empty chain.
    ///
    /// The request id is taken from the `x-request-id` header when it holds
    /// a valid UUID, otherwise a fresh one is generated.
    #[must_use]
    pub fn new(request: Request<Bytes>) -> Self {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();

        Self {
            request,
            request_id,
            params: Params::new(),
            matched_route: String::new(),
            keys: HashMap::new(),
            handlers: Vec::new(),
            cursor: 0,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Bytes::new(),
            started_at: Instant::now(),
        }
    }

    /// Installs the resolved route: its pattern, bound parameters and chain.
    ///
    /// Called by the dispatcher before driving the chain; resets the cursor.
    pub fn install_route(
        &mut self,
        pattern: impl Into<String>,
        params: Params,
        handlers: Vec<Handler>,
    ) {
        self.matched_route = pattern.into();
        self.params = params;
        self.handlers = handlers;
        self.cursor = 0;
    }

    // ------------------------------------------------------------------
    // Chain control
    // ------------------------------------------------------------------

    /// Runs the remaining handlers in order.
    ///
    /// Returns as soon as the chain is exhausted or aborted. A fault from any
    /// downstream handler stops forward progress and is returned to the
    /// caller unchanged.
    pub fn next(&mut self) -> HandlerResult {
        while self.cursor < self.handlers.len() {
            let handler = self.handlers[self.cursor].clone();
            self.cursor += 1;
            handler.call(self)?;
        }
        Ok(())
    }

    /// Stops forward progress through the chain.
    ///
    /// Handlers already on the stack still run their code after `next()`.
    pub fn abort(&mut self) {
        self.cursor = ABORT_INDEX;
    }

    /// Sets the response status, then aborts.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status = status;
        self.abort();
    }

    /// Returns true once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.cursor >= ABORT_INDEX
    }

    // ------------------------------------------------------------------
    // Scratch store
    // ------------------------------------------------------------------

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.keys.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.get(key).and_then(|v| (**v).downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.keys.get_mut(key).and_then(|v| (**v).downcast_mut::<T>())
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.keys.get(key).is_some_and(|v| (**v).is::<T>()) {
            return None;
        }
        let boxed: Box<dyn Any + Send + Sync> = self.keys.remove(key)?;
        boxed.downcast::<T>().ok().map(|v| *v)
    }

    /// Returns true if anything is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    // ------------------------------------------------------------------
    // Request accessors
    // ------------------------------------------------------------------

    /// Returns the request id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the full request.
    #[must_use]
    pub const fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns a request header as text, if present and valid UTF-8.
    #[must_use]
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the request host from the `Host` header or the URI authority.
    #[must_use]
    pub fn host(&self) -> &str {
        self.header(HOST)
            .or_else(|| self.request.uri().host())
            .unwrap_or_default()
    }

    /// Returns the collected request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Returns the path parameter bound to `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns every bound path parameter.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the first query-string value for `name`, percent-decoded.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<String> {
        let query = self.request.uri().query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Deserializes the query string into `T`.
    pub fn bind_query<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        let query = self.request.uri().query().unwrap_or_default();
        serde_urlencoded::from_str(query).map_err(Fault::decode)
    }

    /// Deserializes a JSON request body into `T`.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        serde_json::from_slice(self.request.body()).map_err(Fault::decode)
    }

    /// Deserializes a `application/x-www-form-urlencoded` body into `T`.
    pub fn bind_form<T: DeserializeOwned>(&self) -> Result<T, Fault> {
        serde_urlencoded::from_bytes(self.request.body()).map_err(Fault::decode)
    }

    /// Returns the registered pattern that matched, e.g. `/user/:id`.
    ///
    /// Empty when no route matched.
    #[must_use]
    pub fn matched_route(&self) -> &str {
        &self.matched_route
    }

    /// Returns when the context was created.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    // ------------------------------------------------------------------
    // Response assembly
    // ------------------------------------------------------------------

    /// Sets the response status.
    pub fn status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the buffered response status.
    #[must_use]
    pub const fn response_status(&self) -> StatusCode {
        self.status
    }

    /// Returns the buffered response headers.
    #[must_use]
    pub const fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Returns the buffered response body.
    #[must_use]
    pub const fn response_body(&self) -> &Bytes {
        &self.response_body
    }

    /// Sets a response header, replacing existing values.
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> HandlerResult
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let (name, value) = header_pair(name, value)?;
        self.response_headers.insert(name, value);
        Ok(())
    }

    /// Appends a response header, keeping existing values.
    pub fn append_header<K, V>(&mut self, name: K, value: V) -> HandlerResult
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let (name, value) = header_pair(name, value)?;
        self.response_headers.append(name, value);
        Ok(())
    }

    /// Writes `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value).map_err(Fault::Encode)?;
        self.write(status, JSON_CONTENT_TYPE, Bytes::from(body));
        Ok(())
    }

    /// Writes a plain-text body.
    pub fn string(&mut self, status: StatusCode, text: impl Into<String>) -> HandlerResult {
        self.write(status, TEXT_CONTENT_TYPE, Bytes::from(text.into()));
        Ok(())
    }

    /// Writes an HTML body.
    pub fn html(&mut self, status: StatusCode, html: impl Into<String>) -> HandlerResult {
        self.write(status, HTML_CONTENT_TYPE, Bytes::from(html.into()));
        Ok(())
    }

    /// Writes raw bytes with an explicit content type.
    pub fn data(
        &mut self,
        status: StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> HandlerResult {
        let value = HeaderValue::from_str(content_type).map_err(http::Error::from)?;
        self.status = status;
        self.response_headers.insert(CONTENT_TYPE, value);
        self.response_body = body.into();
        Ok(())
    }

    fn write(&mut self, status: StatusCode, content_type: &'static str, body: Bytes) {
        self.status = status;
        self.response_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.response_body = body;
    }

    /// Converts the buffered response into an [`http::Response`].
    ///
    /// Consumes the context; this is the single flush point.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.response_body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

fn header_pair<K, V>(name: K, value: V) -> Result<(HeaderName, HeaderValue), Fault>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = HeaderName::try_from(name).map_err(Into::into)?;
    let value = HeaderValue::try_from(value).map_err(Into::into)?;
    Ok((name, value))
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("matched_route", &self.matched_route)
            .field("params", &self.params)
            .field("cursor", &self.cursor)
            .field("handlers", &self.handlers.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

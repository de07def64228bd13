//! Per-method segment trie router for Trellis.
//!
//! Each HTTP method owns an independent trie keyed by path segment. Nodes
//! hold the ordered handler chain registered for a pattern, and lookups
//! return that chain together with any bound path parameters.
//!
//! # Features
//!
//! - **Segment Trie Matching**: O(k) lookup where k is the segment count
//! - **Path Parameters**: Named single-segment captures (`/users/:id`)
//! - **Wildcards**: Anonymous single-segment matches (`/files/*`)
//! - **Method-Based Routing**: One tree per HTTP method
//! - **Conflict Detection**: Duplicate and ambiguous routes fail at registration
//!
//! # Example
//!
//! ```rust
//! use trellis_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//!
//! router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();
//! router.add_route(Method::GET, "/users/:id", vec!["getUser"]).unwrap();
//! router.add_route(Method::GET, "/files/*", vec!["serveFile"]).unwrap();
//!
//! let found = router.find_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(found.handlers(), &["getUser"]);
//! assert_eq!(found.params().get("id"), Some("123"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!             GET (root "/")
//!                  │
//!          ┌───────┴───────┐
//!          │               │
//!       "users"         "files"
//!       [list]             │
//!          │              "*"
//!        ":id"          [serve]
//!        [get]
//! ```

mod error;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use node::{Node, SegmentKind, PARAM_PREFIX, WILDCARD};
pub use params::Params;
pub use router::{RouteMatch, Router};

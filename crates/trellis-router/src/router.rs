//! High-level router API.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for registering handler chains and resolving requests.

use std::collections::HashMap;

use http::Method;

use crate::error::RouteError;
use crate::node::Node;
use crate::params::Params;

/// A per-method segment trie router.
///
/// Each HTTP method owns an independent tree, created lazily on the first
/// registration for that method. Routes are resolved in O(k) time where k is
/// the number of path segments.
///
/// The router is generic over the handler type `H` so it stays independent
/// of the request context that eventually runs the chain.
///
/// # Example
///
/// ```rust
/// use trellis_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();
/// router.add_route(Method::GET, "/users/:id", vec!["getUser"]).unwrap();
///
/// let found = router.find_route(&Method::GET, "/users/123").unwrap();
/// assert_eq!(found.handlers(), &["getUser"]);
/// assert_eq!(found.params().get("id"), Some("123"));
/// ```
///
/// # Route Priority
///
/// At every level the router tries, in order:
///
/// 1. **Static segments** (e.g., `/users/me`)
/// 2. **Parameter segments** (e.g., `/users/:id`)
/// 3. **Wildcard segments** (e.g., `/files/*`)
///
/// The first branch taken is final; resolution never backtracks.
#[derive(Debug, Clone)]
pub struct Router<H> {
    /// One tree per method
    trees: HashMap<Method, Node<H>>,
    /// Number of routes registered
    route_count: usize,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Router<H> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            route_count: 0,
        }
    }

    /// Registers `handlers` for `method` and `pattern`.
    ///
    /// Patterns are split on `/` with empty segments dropped, so `/a/b`,
    /// `a/b` and `/a//b/` all name the same route. A segment starting with
    /// `:` binds a named parameter; a segment equal to `*` matches any single
    /// segment without binding.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the chain is empty, the route is already
    /// registered, or the pattern conflicts with an existing parameter or
    /// wildcard at the same position.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trellis_router::{RouteError, Router};
    /// use http::Method;
    ///
    /// let mut router = Router::new();
    /// router.add_route(Method::GET, "/user/:id", vec![1]).unwrap();
    ///
    /// let err = router.add_route(Method::GET, "/user/*", vec![2]).unwrap_err();
    /// assert!(matches!(err, RouteError::WildcardParamConflict { .. }));
    /// ```
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handlers: Vec<H>,
    ) -> Result<(), RouteError> {
        let tree = self.trees.entry(method).or_insert_with(Node::root);
        tree.insert(pattern, handlers)?;
        self.route_count += 1;
        Ok(())
    }

    /// Resolves `path` against the tree for `method`.
    ///
    /// Returns `None` when no tree exists for the method, when no branch
    /// matches, or when the reached node carries no handler chain.
    #[must_use]
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H>> {
        let (node, params) = self.trees.get(method)?.find(path)?;
        Some(RouteMatch { node, params })
    }

    /// Returns the root node of the tree for `method`, if any route exists.
    #[must_use]
    pub fn tree(&self, method: &Method) -> Option<&Node<H>> {
        self.trees.get(method)
    }

    /// Lists every registered `(method, pattern)` pair.
    ///
    /// Order is unspecified across methods.
    #[must_use]
    pub fn routes(&self) -> Vec<(&Method, &str)> {
        let mut routes = Vec::with_capacity(self.route_count);
        for (method, tree) in &self.trees {
            let mut patterns = Vec::new();
            tree.collect_patterns(&mut patterns);
            routes.extend(patterns.into_iter().map(|p| (method, p)));
        }
        routes
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}

/// A resolved route: the endpoint node and the parameters bound on the way.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    node: &'a Node<H>,
    params: Params,
}

impl<'a, H> RouteMatch<'a, H> {
    /// Returns the matched endpoint node.
    #[must_use]
    pub fn node(&self) -> &'a Node<H> {
        self.node
    }

    /// Returns the handler chain registered on the endpoint.
    #[must_use]
    pub fn handlers(&self) -> &'a [H] {
        self.node.handlers()
    }

    /// Returns the registered pattern, e.g. `/user/:id`.
    #[must_use]
    pub fn pattern(&self) -> &'a str {
        self.node.pattern().unwrap_or_default()
    }

    /// Returns the bound path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consumes the match, returning the bound parameters.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_new() {
        let router: Router<&str> = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn test_router_add_route() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();
        assert_eq!(router.len(), 1);
        assert!(!router.is_empty());
    }

    #[test]
    fn test_router_match_static() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();

        let found = router.find_route(&Method::GET, "/users").unwrap();
        assert_eq!(found.handlers(), &["listUsers"]);
        assert_eq!(found.pattern(), "/users");
        assert!(found.params().is_empty());
    }

    #[test]
    fn test_router_match_param() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users/:id", vec!["getUser"]).unwrap();

        let found = router.find_route(&Method::GET, "/users/123").unwrap();
        assert_eq!(found.handlers(), &["getUser"]);
        assert_eq!(found.pattern(), "/users/:id");
        assert_eq!(found.params().get("id"), Some("123"));
    }

    #[test]
    fn test_router_match_wildcard_binds_nothing() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/files/*", vec!["serveFile"]).unwrap();

        let found = router.find_route(&Method::GET, "/files/logo.png").unwrap();
        assert_eq!(found.handlers(), &["serveFile"]);
        assert!(found.params().is_empty());
    }

    #[test]
    fn test_router_methods_are_independent() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();

        assert!(router.find_route(&Method::POST, "/users").is_none());

        // same pattern on another method is not a duplicate
        router.add_route(Method::POST, "/users", vec!["createUser"]).unwrap();
        assert_eq!(
            router.find_route(&Method::POST, "/users").unwrap().handlers(),
            &["createUser"]
        );
        assert_eq!(
            router.find_route(&Method::GET, "/users").unwrap().handlers(),
            &["listUsers"]
        );
    }

    #[test]
    fn test_router_no_match() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();
        assert!(router.find_route(&Method::GET, "/posts").is_none());
    }

    #[test]
    fn test_router_unknown_method() {
        let router: Router<&str> = Router::new();
        assert!(router.find_route(&Method::PATCH, "/").is_none());
        assert!(router.tree(&Method::PATCH).is_none());
    }

    #[test]
    fn test_router_duplicate_is_rejected_and_not_counted() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/", vec!["root"]).unwrap();
        let err = router.add_route(Method::GET, "/", vec!["again"]).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                pattern: "/".to_string()
            }
        );
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_router_complex_paths() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/api/v1/users", vec!["listUsers"]).unwrap();
        router
            .add_route(Method::GET, "/api/v1/users/:userId", vec!["getUser"])
            .unwrap();
        router
            .add_route(Method::GET, "/api/v1/users/:userId/posts", vec!["listUserPosts"])
            .unwrap();
        router
            .add_route(
                Method::GET,
                "/api/v1/users/:userId/posts/:postId",
                vec!["getUserPost"],
            )
            .unwrap();

        let found = router
            .find_route(&Method::GET, "/api/v1/users/123/posts/456")
            .unwrap();
        assert_eq!(found.handlers(), &["getUserPost"]);
        assert_eq!(found.params().get("userId"), Some("123"));
        assert_eq!(found.params().get("postId"), Some("456"));
    }

    #[test]
    fn test_router_trailing_slash() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();

        // empty segments are dropped on both sides
        assert!(router.find_route(&Method::GET, "/users").is_some());
        assert!(router.find_route(&Method::GET, "/users/").is_some());
    }

    #[test]
    fn test_router_root_path() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/", vec!["root"]).unwrap();

        assert_eq!(
            router.find_route(&Method::GET, "/").unwrap().handlers(),
            &["root"]
        );
        assert_eq!(
            router.find_route(&Method::GET, "").unwrap().handlers(),
            &["root"]
        );
    }

    #[test]
    fn test_router_keeps_chain_order() {
        let mut router = Router::new();
        router
            .add_route(Method::GET, "/chain", vec!["auth", "log", "handler"])
            .unwrap();
        assert_eq!(
            router.find_route(&Method::GET, "/chain").unwrap().handlers(),
            &["auth", "log", "handler"]
        );
    }

    #[test]
    fn test_router_routes_listing() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/a", vec![1]).unwrap();
        router.add_route(Method::GET, "/a/:b", vec![2]).unwrap();
        router.add_route(Method::POST, "/c", vec![3]).unwrap();

        let mut routes: Vec<_> = router
            .routes()
            .into_iter()
            .map(|(m, p)| (m.as_str().to_string(), p.to_string()))
            .collect();
        routes.sort();
        assert_eq!(
            routes,
            vec![
                ("GET".to_string(), "/a".to_string()),
                ("GET".to_string(), "/a/:b".to_string()),
                ("POST".to_string(), "/c".to_string()),
            ]
        );
    }

    #[test]
    fn test_router_clone() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/users", vec!["listUsers"]).unwrap();

        let cloned = router.clone();
        assert!(cloned.find_route(&Method::GET, "/users").is_some());
    }
}

//! Segment trie node implementation.
//!
//! Each node represents one path segment. Static children are kept sorted so
//! lookups can binary search; a node carries at most one parameter child or
//! one wildcard child, never both.

use std::borrow::Cow;

use crate::error::RouteError;
use crate::params::Params;

/// Prefix marking a named-parameter segment (`:id`).
pub const PARAM_PREFIX: char = ':';

/// Token marking a wildcard segment.
pub const WILDCARD: &str = "*";

/// Type of path segment a node matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., ":id"), carrying the declared name
    Param(String),
    /// Wildcard matching exactly one segment without binding it
    Wildcard,
}

/// A parsed segment of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard,
}

/// A node in a method's routing trie.
///
/// A node with a non-empty handler chain is a registered endpoint; a node
/// with no handlers only exists as the ancestor of deeper routes and is never
/// returned by a lookup.
#[derive(Debug, Clone)]
pub struct Node<H> {
    segment: String,
    kind: SegmentKind,
    /// Original pattern, set on endpoints only
    pattern: Option<String>,
    handlers: Vec<H>,
    /// Sorted by segment for binary search
    static_children: Vec<Node<H>>,
    param_child: Option<Box<Node<H>>>,
    wildcard_child: Option<Box<Node<H>>>,
}

impl<H> Node<H> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            pattern: None,
            handlers: Vec::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node of a method tree (path `/`).
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind("/".to_string(), SegmentKind::Static)
    }

    fn new_static(segment: &str) -> Self {
        Self::with_kind(segment.to_string(), SegmentKind::Static)
    }

    fn new_param(name: &str) -> Self {
        Self::with_kind(
            format!("{PARAM_PREFIX}{name}"),
            SegmentKind::Param(name.to_string()),
        )
    }

    fn new_wildcard() -> Self {
        Self::with_kind(WILDCARD.to_string(), SegmentKind::Wildcard)
    }

    /// Returns the segment text this node matches (`users`, `:id`, `*`).
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Returns the kind of segment this node matches.
    #[must_use]
    pub fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Returns the pattern registered on this node, if it is an endpoint.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Returns the handler chain; empty for ancestor-only nodes.
    #[must_use]
    pub fn handlers(&self) -> &[H] {
        &self.handlers
    }

    /// Returns true if a handler chain is registered on this node.
    #[must_use]
    pub fn is_endpoint(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Returns the literal children, sorted by segment.
    #[must_use]
    pub fn static_children(&self) -> &[Node<H>] {
        &self.static_children
    }

    /// Returns the literal child matching `segment` exactly.
    #[must_use]
    pub fn static_child(&self, segment: &str) -> Option<&Node<H>> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }

    /// Returns the named-parameter child.
    #[must_use]
    pub fn param_child(&self) -> Option<&Node<H>> {
        self.param_child.as_deref()
    }

    /// Returns the wildcard child.
    #[must_use]
    pub fn wildcard_child(&self) -> Option<&Node<H>> {
        self.wildcard_child.as_deref()
    }

    fn param_name(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Param(name) => Some(name),
            _ => None,
        }
    }

    /// Registers `handlers` under `pattern`, creating missing nodes.
    ///
    /// # Errors
    ///
    /// Fails on an empty chain, a nameless parameter, a wildcard/parameter
    /// conflict, a parameter-name conflict, or an existing chain on the
    /// terminal node. Ancestor nodes created before a failure stay in the
    /// tree without handlers and are therefore never routable.
    pub fn insert(&mut self, pattern: &str, handlers: Vec<H>) -> Result<(), RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::EmptyHandlers {
                pattern: pattern.to_string(),
            });
        }

        let segments = parse_pattern(pattern)?;
        let mut node = self;
        for segment in segments {
            node = node.child_for_insert(pattern, segment)?;
        }

        if node.is_endpoint() {
            return Err(RouteError::Duplicate {
                pattern: pattern.to_string(),
            });
        }
        node.handlers = handlers;
        node.pattern = Some(pattern.to_string());
        Ok(())
    }

    /// Finds or creates the child for one pattern segment.
    fn child_for_insert(
        &mut self,
        pattern: &str,
        segment: Segment<'_>,
    ) -> Result<&mut Self, RouteError> {
        match segment {
            Segment::Static(text) => {
                // literals are stored decoded, the form lookups compare against
                let text = decode_segment(text);
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(&*text))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children.insert(index, Node::new_static(&text));
                        index
                    }
                };
                Ok(&mut self.static_children[index])
            }
            Segment::Param(name) => {
                if self.wildcard_child.is_some() {
                    return Err(RouteError::WildcardParamConflict {
                        pattern: pattern.to_string(),
                        segment: format!("{PARAM_PREFIX}{name}"),
                        existing: "wildcard",
                    });
                }
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new_param(name)));
                if let Some(existing) = child.param_name() {
                    if existing != name {
                        return Err(RouteError::ParamNameConflict {
                            pattern: pattern.to_string(),
                            name: name.to_string(),
                            existing: existing.to_string(),
                        });
                    }
                }
                Ok(&mut **child)
            }
            Segment::Wildcard => {
                if self.param_child.is_some() {
                    return Err(RouteError::WildcardParamConflict {
                        pattern: pattern.to_string(),
                        segment: WILDCARD.to_string(),
                        existing: "parameter",
                    });
                }
                let child = self
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(Node::new_wildcard()));
                Ok(&mut **child)
            }
        }
    }

    /// Resolves `path` against this subtree.
    ///
    /// Each segment is percent-decoded before it is compared or bound, so
    /// `/order/det%61il` reaches the literal `detail`. A segment that does
    /// not decode to UTF-8 is matched as written.
    ///
    /// At each level a literal child wins over the parameter child, which
    /// wins over the wildcard child. There is no backtracking: once a branch
    /// is taken, a later mismatch means "not found" even if a sibling branch
    /// would have matched.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<(&Self, Params)> {
        let mut node = self;
        let mut params = Params::new();

        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = decode_segment(raw);
            node = if let Some(child) = node.static_child(&segment) {
                child
            } else if let Some(child) = node.param_child.as_deref() {
                if let Some(name) = child.param_name() {
                    params.push(name, segment);
                }
                child
            } else if let Some(child) = node.wildcard_child.as_deref() {
                child
            } else {
                return None;
            };
        }

        node.is_endpoint().then_some((node, params))
    }

    /// Collects the patterns of every endpoint in this subtree.
    pub(crate) fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(pattern) = self.pattern() {
            out.push(pattern);
        }
        for child in &self.static_children {
            child.collect_patterns(out);
        }
        if let Some(child) = &self.param_child {
            child.collect_patterns(out);
        }
        if let Some(child) = &self.wildcard_child {
            child.collect_patterns(out);
        }
    }
}

fn decode_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Splits a pattern into segments, dropping empty ones.
fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s == WILDCARD {
                Ok(Segment::Wildcard)
            } else if let Some(name) = s.strip_prefix(PARAM_PREFIX) {
                if name.is_empty() {
                    Err(RouteError::EmptyParamName {
                        pattern: pattern.to_string(),
                    })
                } else {
                    Ok(Segment::Param(name))
                }
            } else {
                Ok(Segment::Static(s))
            }
        })
        .collect()
}

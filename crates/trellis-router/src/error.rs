//! Route registration errors.

use thiserror::Error;

/// Errors raised while registering a route.
///
/// Every variant describes a programmer error in the routing table. The
/// engine treats them as fatal at startup; the `try_*` registration APIs
/// hand them back to the caller instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The route was registered without any handler.
    #[error("route '{pattern}' must have at least one handler")]
    EmptyHandlers {
        /// The offending route pattern.
        pattern: String,
    },

    /// A handler chain already exists for this method and pattern.
    #[error("duplicated route '{pattern}'")]
    Duplicate {
        /// The offending route pattern.
        pattern: String,
    },

    /// A wildcard and a named parameter were registered at the same position.
    #[error(
        "route '{pattern}': segment '{segment}' conflicts with an existing \
         {existing} at the same position; wildcard and parameter segments are mutually exclusive"
    )]
    WildcardParamConflict {
        /// The offending route pattern.
        pattern: String,
        /// The segment being registered.
        segment: String,
        /// Description of the sibling already present.
        existing: &'static str,
    },

    /// Two differently named parameters were registered at the same position.
    #[error("route '{pattern}': parameter ':{name}' conflicts with existing parameter ':{existing}'")]
    ParamNameConflict {
        /// The offending route pattern.
        pattern: String,
        /// The parameter name being registered.
        name: String,
        /// The parameter name already registered at this position.
        existing: String,
    },

    /// A parameter segment (`:`) carried no name.
    #[error("route '{pattern}': parameter segment is missing a name")]
    EmptyParamName {
        /// The offending route pattern.
        pattern: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RouteError::Duplicate {
            pattern: "/users".to_string(),
        };
        assert_eq!(err.to_string(), "duplicated route '/users'");

        let err = RouteError::ParamNameConflict {
            pattern: "/user/:name".to_string(),
            name: "name".to_string(),
            existing: "id".to_string(),
        };
        assert!(err.to_string().contains(":name"));
        assert!(err.to_string().contains(":id"));
    }
}

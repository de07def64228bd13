//! The session value.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::SessionError;

/// Per-client state shared between the store and the requests using it.
///
/// Values are stored as JSON. Every write marks the session as modified;
/// the manager clears the flag once the session has been saved.
///
/// # Example
///
/// ```
/// use trellis_session::Session;
///
/// let session = Session::new("abc");
/// session.set("cart", &vec![3, 5]).unwrap();
///
/// let cart: Vec<u32> = session.get("cart").unwrap();
/// assert_eq!(cart, [3, 5]);
/// assert!(session.is_modified());
/// ```
pub struct Session {
    id: String,
    values: RwLock<HashMap<String, Value>>,
    modified: AtomicBool,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: RwLock::new(HashMap::new()),
            modified: AtomicBool::new(false),
        }
    }

    /// The session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads and deserializes the value under `key`.
    ///
    /// # Errors
    ///
    /// [`SessionError::KeyNotFound`] when absent, [`SessionError::Value`]
    /// when the stored value does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, SessionError> {
        let value = self.get_value(key).ok_or_else(|| SessionError::KeyNotFound {
            key: key.to_string(),
        })?;
        Ok(serde_json::from_value(value)?)
    }

    /// Returns a copy of the raw JSON value under `key`.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`SessionError::Value`] when `value` cannot be serialized.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.values.write().insert(key.into(), value);
        self.modified.store(true, Ordering::Release);
        Ok(())
    }

    /// Removes `key`. Removing an absent key still marks the session modified.
    pub fn delete(&self, key: &str) {
        self.values.write().remove(key);
        self.modified.store(true, Ordering::Release);
    }

    /// Returns `true` when the session is holding a value under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` when no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Whether the session changed since it was created or last saved.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    pub(crate) fn mark_saved(&self) {
        self.modified.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("keys", &self.values.read().keys().collect::<Vec<_>>())
            .field("modified", &self.is_modified())
            .finish()
    }
}

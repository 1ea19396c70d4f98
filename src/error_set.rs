//! Named, mergeable error collections
//!
//! Extraction never stops at the first failing selector. Every failure is
//! recorded in an [`ErrorSet`] under the name of the path that produced it,
//! and sets nest to mirror the selector tree.

use crate::Error;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A mapping of names to errors or nested error sets
///
/// Adding an error under a name that is already taken stores it under
/// `name#1`, `name#2`, ... so no failure is ever overwritten.
#[derive(Debug, Default)]
pub struct ErrorSet {
    errors: BTreeMap<String, Error>,
}

impl ErrorSet {
    /// Creates an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error under `key`
    ///
    /// An empty key is ignored. Returns the key the error was stored under.
    pub fn add(&mut self, key: impl Into<String>, err: Error) -> Option<String> {
        let base = key.into();
        if base.is_empty() {
            return None;
        }

        let mut key = base.clone();
        let mut counter = 1;
        while self.errors.contains_key(&key) {
            key = format!("{}#{}", base, counter);
            counter += 1;
        }

        self.errors.insert(key.clone(), err);
        Some(key)
    }

    /// Adds a nested error set under `key`, skipping empty sets
    pub fn add_set(&mut self, key: impl Into<String>, set: ErrorSet) -> Option<String> {
        if set.is_empty() {
            return None;
        }
        self.add(key, Error::Set(set))
    }

    /// Returns the error stored under `key`
    pub fn get(&self, key: &str) -> Option<&Error> {
        self.errors.get(key)
    }

    /// Returns the nested set stored under `key`, if the entry is a set
    pub fn get_set(&self, key: &str) -> Option<&ErrorSet> {
        match self.errors.get(key)? {
            Error::Set(set) => Some(set),
            Error::Extraction { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Converts an empty set into `Ok(())` and anything else into [`Error::Set`]
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Set(self))
        }
    }

    /// Returns the name -> message (or nested object) representation
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.errors.len());
        for (key, err) in &self.errors {
            map.insert(key.clone(), error_to_json(err));
        }
        Value::Object(map)
    }
}

/// Renders a single error the way it appears inside a serialized [`ErrorSet`]
pub fn error_to_json(err: &Error) -> Value {
    match err {
        Error::Set(set) => set.to_json(),
        Error::Extraction { errors, .. } => errors.to_json(),
        other => Value::String(other.to_string()),
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for ErrorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<K: Into<String>> FromIterator<(K, Error)> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = (K, Error)>>(iter: I) -> Self {
        let mut set = ErrorSet::new();
        for (key, err) in iter {
            set.add(key, err);
        }
        set
    }
}

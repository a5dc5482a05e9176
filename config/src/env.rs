//! Reading configuration parameters from the environment.

use std::{
    borrow::Cow,
    cell::RefCell,
    collections::{HashMap, HashSet},
};

/// Source of environment variables
pub trait ReadEnv {
    /// Value of `key`, if set
    fn read_env(&self, key: &str) -> Option<Cow<'_, str>>;
}

impl<F> ReadEnv for F
where
    F: Fn(&str) -> Option<Cow<'static, str>>,
{
    fn read_env(&self, key: &str) -> Option<Cow<'static, str>> {
        self(key)
    }
}

/// Process environment.
///
/// Variables holding non-unicode data are reported and treated as unset.
pub fn std_env(key: &str) -> Option<Cow<'static, str>> {
    match std::env::var(key) {
        Ok(value) => Some(Cow::from(value)),
        Err(std::env::VarError::NotPresent) => None,
        Err(_) => {
            tracing::error!(key, "Found non-unicode characters in env var, ignoring");
            None
        }
    }
}

/// An implementation of [`ReadEnv`] for testing convenience.
#[derive(Debug, Default)]
pub struct TestEnv {
    map: HashMap<String, String>,
    visited: RefCell<HashSet<String>>,
}

impl TestEnv {
    /// Create new empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key-value pair
    #[must_use]
    pub fn set(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.map
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Keys not read yet by [`ReadEnv::read_env`]
    pub fn unvisited(&self) -> HashSet<String> {
        let visited = self.visited.borrow();
        self.map
            .keys()
            .filter(|key| !visited.contains(*key))
            .cloned()
            .collect()
    }
}

impl ReadEnv for TestEnv {
    fn read_env(&self, key: &str) -> Option<Cow<'_, str>> {
        self.visited.borrow_mut().insert(key.to_string());
        self.map.get(key).map(Cow::from)
    }
}

//! Live read-only projections of shared state.
//!
//! A [`StateView`] is the only sanctioned way to read state outside a
//! commit. It holds the shared state handle plus a base path, and every
//! read locks the state and clones the addressed subtree at that moment.
//! There is no snapshot: a commit landing between two reads is visible to
//! the second read. The type exposes no mutators, so writing through a
//! view is impossible at compile time, and every value handed out is an
//! owned clone that cannot reach the canonical tree.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde_json::Value;
use tracing::debug;

use crate::path::{get_path, Path};

pub(crate) type SharedState = Arc<RwLock<Value>>;

/// A live, non-cloning, read-only projection over the canonical state.
#[derive(Clone)]
pub struct StateView {
    state: SharedState,
    base: Option<Path>,
}

impl StateView {
    pub(crate) fn root(state: SharedState) -> Self {
        Self { state, base: None }
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        match &self.base {
            None => Some(root),
            Some(base) => get_path(root, base),
        }
    }

    /// Clone the entire subtree this view is anchored at.
    ///
    /// Returns `Value::Null` when the anchor path no longer resolves.
    pub fn snapshot(&self) -> Value {
        let root = self.read();
        self.resolve(&root).cloned().unwrap_or(Value::Null)
    }

    /// Read the value at a dotted name below this view's anchor.
    ///
    /// Unparseable names and unresolvable paths both read as `None`.
    pub fn get(&self, name: &str) -> Option<Value> {
        match Path::parse(name) {
            Ok(path) => self.get_at(&path),
            Err(err) => {
                debug!(name, %err, "ignoring state read with invalid path");
                None
            }
        }
    }

    /// Read the value at an already-parsed path below this view's anchor.
    pub fn get_at(&self, path: &Path) -> Option<Value> {
        let root = self.read();
        get_path(self.resolve(&root)?, path).cloned()
    }

    /// Narrow this view to a nested anchor. The result is still live: the
    /// addressed subtree may appear, change, or vanish between reads.
    pub fn at(&self, name: &str) -> Option<StateView> {
        let path = match Path::parse(name) {
            Ok(path) => path,
            Err(err) => {
                debug!(name, %err, "ignoring view narrowing with invalid path");
                return None;
            }
        };
        let base = match &self.base {
            None => path,
            Some(base) => base.join(&path),
        };
        Some(StateView {
            state: Arc::clone(&self.state),
            base: Some(base),
        })
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_i64()
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name)?.as_u64()
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_f64()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }
}

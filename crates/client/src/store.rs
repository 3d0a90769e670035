//! Observable state tree.
//!
//! A JSON tree with path-based `get`/`set`/`merge`/`remove` and a watch
//! channel that ticks on every change so views can re-render. The tree is
//! owned by the dispatcher; presentation code only reads.

use serde_json::{Map, Value};
use tokio::sync::watch;

/// The shared observable state tree.
pub struct StateTree {
    root: Value,
    revision: watch::Sender<u64>,
}

impl StateTree {
    /// Create an empty tree (root is `{}`, revision 0).
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            root: Value::Object(Map::new()),
            revision,
        }
    }

    /// Read the value at `path`, if present.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Read and deserialize the value at `path`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, path: &[&str]) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    pub fn set(&mut self, path: &[&str], value: Value) {
        if path.is_empty() {
            self.root = value;
        } else {
            let slot = Self::ensure_path(&mut self.root, path);
            *slot = value;
        }
        self.bump();
    }

    /// Shallow-merge the object `partial` into the object at `path`.
    ///
    /// Missing intermediate objects are created; a non-object at `path`
    /// is replaced.
    pub fn merge(&mut self, path: &[&str], partial: Value) {
        let slot = Self::ensure_path(&mut self.root, path);
        match partial {
            Value::Object(entries) if slot.is_object() => {
                let target = slot.as_object_mut().expect("checked object above");
                for (key, value) in entries {
                    target.insert(key, value);
                }
            }
            partial => *slot = partial,
        }
        self.bump();
    }

    /// Remove the value at `path`, if present.
    pub fn remove(&mut self, path: &[&str]) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut current = &mut self.root;
        for segment in parents {
            let Some(next) = current.as_object_mut().and_then(|o| o.get_mut(*segment)) else {
                return;
            };
            current = next;
        }
        if let Some(object) = current.as_object_mut() {
            if object.remove(*last).is_some() {
                self.bump();
            }
        }
    }

    /// Subscribe to change notifications. The value is a revision counter;
    /// every mutation increments it.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn ensure_path<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Value {
        let mut current = root;
        for segment in path {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .expect("just ensured an object")
                .entry(segment.to_string())
                .or_insert(Value::Object(Map::new()));
        }
        current
    }

    fn bump(&mut self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

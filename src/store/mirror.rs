//! ==============================================================================
//! store/mirror.rs - local copy of a streamed subtree
//! ==============================================================================
//!
//! the firebase stream sends deltas relative to the subscribed path:
//!
//!     put   {"path": "/a/b", "data": X}   replace the node at /a/b with X
//!     patch {"path": "/a",   "data": {k: v, ...}}   put each child k
//!
//! null deletes. like the real database, a map left with no children
//! disappears too, so an emptied path reads as "no value".
//!
//! ==============================================================================

use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct Mirror {
    root: Option<Value>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    pub fn put(&mut self, path: &str, data: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if segments.is_empty() {
            self.root = if data.is_null() { None } else { Some(data) };
            return;
        }

        let root = self.root.take().unwrap_or(Value::Null);
        self.root = set_at(root, &segments, data);
    }

    pub fn patch(&mut self, path: &str, data: Value) {
        match data {
            Value::Object(children) => {
                let base = path.trim_end_matches('/');
                for (key, value) in children {
                    self.put(&format!("{}/{}", base, key), value);
                }
            }
            // not a map: nothing to merge child-by-child
            other => self.put(path, other),
        }
    }
}

/// returns the new node, or None when it ended up empty
fn set_at(node: Value, segments: &[&str], data: Value) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return if data.is_null() { None } else { Some(data) };
    };

    let mut map = match node {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let child = map.remove(*head).unwrap_or(Value::Null);
    if let Some(child) = set_at(child, rest, data) {
        map.insert((*head).to_string(), child);
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

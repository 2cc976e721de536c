// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DEF name tracking
//!
//! Each buffering stage owns one [`DefMap`] per document run. A duplicate
//! DEF is a format violation: it is reported and the later node wins.

use crate::node::SceneNode;
use rustc_hash::FxHashMap;
use tracing::warn;

#[derive(Debug, Default)]
pub struct DefMap {
    map: FxHashMap<String, SceneNode>,
}

impl DefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, node: SceneNode) {
        if self.map.insert(name.to_string(), node).is_some() {
            warn!(def = name, "duplicate DEF name, later node overwrites");
        }
    }

    pub fn get(&self, name: &str) -> Option<&SceneNode> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

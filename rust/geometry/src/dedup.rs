// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Epsilon coordinate deduplication
//!
//! Points closer than the tolerance on every component collapse onto their
//! first occurrence. Index buffers referencing the compacted points are
//! remapped in two phases: replace each duplicate with its keeper, then
//! shift by the number of removed points numerically below it. Both phases
//! must be applied to every index array touching the buffer, or the
//! index-validity invariant breaks.

use rustc_hash::FxHashMap;

pub const DEFAULT_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct CoordinateDedup {
    epsilon: f32,
}

impl Default for CoordinateDedup {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Remap table produced by a compaction.
#[derive(Debug, Clone)]
pub struct DedupMap {
    /// duplicate index -> first-occurrence index (pre-compaction numbering)
    replace: FxHashMap<u32, u32>,
    /// removed indices, sorted ascending
    removed: Vec<u32>,
}

impl DedupMap {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Applies the replace-then-shift remap in place. `-1` separators pass
    /// through untouched.
    pub fn remap(&self, indices: &mut [i32]) {
        for idx in indices.iter_mut() {
            if *idx < 0 {
                continue;
            }
            let mut v = *idx as u32;
            if let Some(&keeper) = self.replace.get(&v) {
                v = keeper;
            }
            let shift = self.removed.partition_point(|&r| r < v) as u32;
            *idx = (v - shift) as i32;
        }
    }
}

impl CoordinateDedup {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }

    fn close(&self, points: &[f32], i: usize, j: usize) -> bool {
        (points[i * 3] - points[j * 3]).abs() <= self.epsilon
            && (points[i * 3 + 1] - points[j * 3 + 1]).abs() <= self.epsilon
            && (points[i * 3 + 2] - points[j * 3 + 2]).abs() <= self.epsilon
    }

    /// Compacts a flat point buffer in place, dropping points within
    /// epsilon of an earlier point. Returns `None` when nothing matched.
    pub fn compact(&self, points: &mut Vec<f32>) -> Option<DedupMap> {
        let n = points.len() / 3;
        let mut replace: FxHashMap<u32, u32> = FxHashMap::default();

        for i in 0..n {
            if replace.contains_key(&(i as u32)) {
                continue;
            }
            for j in (i + 1)..n {
                if replace.contains_key(&(j as u32)) {
                    continue;
                }
                if self.close(points, i, j) {
                    replace.insert(j as u32, i as u32);
                }
            }
        }

        if replace.is_empty() {
            return None;
        }

        let mut removed: Vec<u32> = replace.keys().copied().collect();
        removed.sort_unstable();

        let mut write = 0usize;
        for read in 0..n {
            if replace.contains_key(&(read as u32)) {
                continue;
            }
            if write != read {
                points.copy_within(read * 3..read * 3 + 3, write * 3);
            }
            write += 1;
        }
        points.truncate(write * 3);

        Some(DedupMap { replace, removed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_duplicates_collapse() {
        let mut pts = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, // dup of 0
            2.0, 0.0, 0.0,
        ];
        let map = CoordinateDedup::default().compact(&mut pts).unwrap();
        assert_eq!(pts.len(), 9);
        assert_eq!(map.removed_count(), 1);

        let mut idx = vec![0, 1, 2, -1, 2, 3, 1];
        map.remap(&mut idx);
        assert_eq!(idx, vec![0, 1, 0, -1, 0, 2, 1]);
    }

    #[test]
    fn within_epsilon_collapses() {
        let mut pts = vec![
            0.0, 0.0, 0.0, //
            0.00005, 0.00005, 0.0, // inside 1e-4 on every component
            0.5, 0.0, 0.0,
        ];
        let map = CoordinateDedup::default().compact(&mut pts).unwrap();
        assert_eq!(pts.len() / 3, 2);
        let mut idx = vec![1, 2];
        map.remap(&mut idx);
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn outside_epsilon_survives() {
        let mut pts = vec![0.0, 0.0, 0.0, 0.001, 0.0, 0.0];
        assert!(CoordinateDedup::default().compact(&mut pts).is_none());
        assert_eq!(pts.len() / 3, 2);
    }

    #[test]
    fn first_occurrence_wins_chains() {
        // 1 and 2 both collapse onto 0; indices to either land on 0.
        let mut pts = vec![
            0.0, 0.0, 0.0, //
            0.00003, 0.0, 0.0, //
            -0.00003, 0.0, 0.0, //
            9.0, 9.0, 9.0,
        ];
        let map = CoordinateDedup::default().compact(&mut pts).unwrap();
        assert_eq!(pts.len() / 3, 2);
        let mut idx = vec![0, 1, 2, 3];
        map.remap(&mut idx);
        assert_eq!(idx, vec![0, 0, 0, 1]);
    }

    #[test]
    fn remapped_indices_stay_in_range() {
        let mut pts = vec![
            0.0, 0.0, 0.0, //
            1.0, 1.0, 1.0, //
            1.0, 1.0, 1.0, //
            0.0, 0.0, 0.0, //
            2.0, 2.0, 2.0,
        ];
        let map = CoordinateDedup::default().compact(&mut pts).unwrap();
        let count = pts.len() / 3;
        let mut idx: Vec<i32> = (0..5).collect();
        map.remap(&mut idx);
        assert!(idx.iter().all(|&i| (i as usize) < count));
        // Distinct positions referenced before and after stay the same.
        assert_eq!(count, 3);
    }
}

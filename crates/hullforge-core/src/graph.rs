//! Adjacency between parts and connected-component splitting.
//!
//! The adjacency relation is read from each part's neighbor set, which the
//! assembly keeps in sync with the occupancy field. `split` never mutates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::components::PartId;

/// Anything that can list a part's neighbors.
pub trait Adjacency {
    /// Neighbors of `id`, or `None` if the part is unknown.
    fn neighbors(&self, id: PartId) -> Option<&BTreeSet<PartId>>;
}

impl Adjacency for BTreeMap<PartId, BTreeSet<PartId>> {
    fn neighbors(&self, id: PartId) -> Option<&BTreeSet<PartId>> {
        self.get(&id)
    }
}

impl Adjacency for HashMap<PartId, BTreeSet<PartId>> {
    fn neighbors(&self, id: PartId) -> Option<&BTreeSet<PartId>> {
        self.get(&id)
    }
}

/// Partition `members` into maximal connected components.
///
/// Only edges between members count. Components are seeded in input order
/// and each lists its parts in traversal order. Duplicate
/// inputs are collapsed. O(V + E).
pub fn split(graph: &impl Adjacency, members: &[PartId]) -> Vec<Vec<PartId>> {
    let member_set: HashSet<PartId> = members.iter().copied().collect();
    let mut visited: HashSet<PartId> = HashSet::with_capacity(member_set.len());
    let mut components = Vec::new();

    for &seed in members {
        if !visited.insert(seed) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![seed];
        while let Some(id) = stack.pop() {
            component.push(id);
            let Some(neighbors) = graph.neighbors(id) else {
                continue;
            };
            for &next in neighbors.iter().rev() {
                if member_set.contains(&next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Whether `members` form a single component. An empty set is connected.
pub fn is_connected(graph: &impl Adjacency, members: &[PartId]) -> bool {
    split(graph, members).len() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(u32, u32)], nodes: u32) -> BTreeMap<PartId, BTreeSet<PartId>> {
        let mut g: BTreeMap<PartId, BTreeSet<PartId>> =
            (0..nodes).map(|i| (PartId(i), BTreeSet::new())).collect();
        for &(a, b) in edges {
            g.entry(PartId(a)).or_default().insert(PartId(b));
            g.entry(PartId(b)).or_default().insert(PartId(a));
        }
        g
    }

    fn ids(raw: &[u32]) -> Vec<PartId> {
        raw.iter().map(|&i| PartId(i)).collect()
    }

    #[test]
    fn test_split_chain_and_island() {
        let g = graph(&[(0, 1), (1, 2)], 4);
        let parts = split(&g, &ids(&[0, 1, 2, 3]));
        assert_eq!(parts, vec![ids(&[0, 1, 2]), ids(&[3])]);
    }

    #[test]
    fn test_split_ignores_non_members() {
        // 1 bridges 0 and 2 but is not part of the set.
        let g = graph(&[(0, 1), (1, 2)], 3);
        let parts = split(&g, &ids(&[0, 2]));
        assert_eq!(parts, vec![ids(&[0]), ids(&[2])]);
    }

    #[test]
    fn test_split_seeds_in_input_order() {
        let g = graph(&[(0, 1)], 3);
        let parts = split(&g, &ids(&[2, 1, 0]));
        assert_eq!(parts, vec![ids(&[2]), ids(&[1, 0])]);
    }

    #[test]
    fn test_split_collapses_duplicates() {
        let g = graph(&[(0, 1)], 2);
        let parts = split(&g, &ids(&[0, 0, 1, 1]));
        assert_eq!(parts, vec![ids(&[0, 1])]);
    }

    #[test]
    fn test_empty_and_unknown() {
        let g = graph(&[], 0);
        assert!(split(&g, &[]).is_empty());
        assert!(is_connected(&g, &[]));
        assert_eq!(split(&g, &ids(&[5])), vec![ids(&[5])]);
    }
}

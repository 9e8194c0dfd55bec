// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic implementation of Kahn's algorithm for topological sorting.
//!
//! Ties between nodes that become ready at the same time are broken by their
//! position in the input, so the result is deterministic and follows insertion order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError;

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The graph contains a cycle")
    }
}

impl std::error::Error for CycleError {}

/// Performs a topological sort on a generic directed graph.
///
/// # Arguments
///
/// * `nodes`: An iterator over the unique nodes in the graph, in insertion order.
/// * `edges`: An iterator over the directed edges, as `(parent, child)` tuples.
///   Edges that mention a node not listed in `nodes` are ignored.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: The nodes in an order where every parent precedes its children.
///   Among nodes that are ready together, the one listed first in `nodes` comes first.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let position: HashMap<T, usize> = node_list
        .iter()
        .enumerate()
        .map(|(i, node)| (*node, i))
        .collect();
    let mut adjacency_list: Vec<Vec<usize>> = vec![Vec::new(); node_list.len()];
    let mut in_degree = vec![0usize; node_list.len()];

    // 1. Build adjacency list and in-degree counts from edges.
    for (parent, child) in edges {
        if let (Some(&p), Some(&c)) = (position.get(&parent), position.get(&child)) {
            adjacency_list[p].push(c);
            in_degree[c] += 1;
        }
    }

    // 2. Seed the ready set with all root nodes (in-degree of 0).
    let mut ready: BTreeSet<usize> = (0..node_list.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();

    // 3. Always take the earliest ready node.
    let mut sorted_list = Vec::with_capacity(node_list.len());
    while let Some(index) = ready.pop_first() {
        sorted_list.push(node_list[index]);
        for &child in &adjacency_list[index] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    // 4. Check for cycles.
    if sorted_list.len() != node_list.len() {
        Err(CycleError)
    } else {
        Ok(sorted_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let sorted = topological_sort(Vec::<u32>::new(), Vec::new()).unwrap();
        assert!(sorted.is_empty());
    }

    #[test]
    fn test_parents_precede_children() {
        // 3 -> 1 -> 0, 3 -> 2
        let sorted = topological_sort([0, 1, 2, 3], [(3, 1), (1, 0), (3, 2)]).unwrap();
        assert_eq!(sorted, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let sorted = topological_sort(["c", "a", "b"], Vec::new()).unwrap();
        assert_eq!(sorted, vec!["c", "a", "b"]);

        // Both children become ready together; insertion order decides.
        let sorted = topological_sort(["root", "z", "y"], [("root", "y"), ("root", "z")]).unwrap();
        assert_eq!(sorted, vec!["root", "z", "y"]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let result = topological_sort([1, 2, 3], [(1, 2), (2, 3), (3, 2)]);
        assert_eq!(result, Err(CycleError));
    }

    #[test]
    fn test_unknown_edges_are_ignored() {
        let sorted = topological_sort([1, 2], [(9, 1), (1, 2)]).unwrap();
        assert_eq!(sorted, vec![1, 2]);
    }
}

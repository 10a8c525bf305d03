//! Connected-component discovery.
//!
//! Components are derived on demand from the current edge set and never
//! cached: every call is a fresh breadth-first traversal.

use std::collections::VecDeque;

use super::Graph;

/// Node indices of one component, in visitation order
pub type Component = Vec<usize>;

/// Find the connected components of `graph`.
///
/// Seeds are taken lowest index first and each component lists its nodes in
/// breadth-first visitation order. Isolated nodes form singleton components.
///
/// `max_components` stops discovery once that many components have been
/// found; `None` or `Some(0)` means no cap.
pub fn find_connected_components(graph: &Graph, max_components: Option<usize>) -> Vec<Component> {
    let mut visited = Vec::new();
    find_connected_components_with(graph, max_components, &mut visited)
}

/// Same as [`find_connected_components`], reusing a caller-owned visited buffer.
///
/// The buffer is reset on entry, so stale contents from a previous call are harmless.
pub fn find_connected_components_with(
    graph: &Graph,
    max_components: Option<usize>,
    visited: &mut Vec<bool>,
) -> Vec<Component> {
    let node_count = graph.node_count();
    visited.clear();
    visited.resize(node_count, false);

    let cap = max_components.filter(|&cap| cap > 0);
    let adjacency = graph.adjacency_list();
    let mut components: Vec<Component> = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..node_count {
        if visited[seed] {
            continue;
        }

        if let Some(cap) = cap {
            if components.len() >= cap {
                log::debug!(
                    "Component discovery stopped at cap of {} components",
                    cap
                );
                break;
            }
        }

        let mut component = Vec::new();
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(node) = queue.pop_front() {
            component.push(node);
            for &neighbor in &adjacency[node] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        components.push(component);
    }

    components
}

/// Number of connected components, without a cap
pub fn count_components(graph: &Graph) -> usize {
    find_connected_components(graph, None).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_partition(graph: &Graph, components: &[Component]) {
        let mut seen = HashSet::new();
        for component in components {
            for &node in component {
                assert!(seen.insert(node), "node {} appears twice", node);
            }
        }
        assert_eq!(seen.len(), graph.node_count());

        let mut owner = vec![usize::MAX; graph.node_count()];
        for (id, component) in components.iter().enumerate() {
            for &node in component {
                owner[node] = id;
            }
        }
        for (row, col) in graph.edge_list() {
            assert_eq!(owner[row], owner[col], "edge ({}, {}) crosses components", row, col);
        }
    }

    #[test]
    fn test_two_components_and_isolated_node() {
        // 0-1-2 chain, 3 isolated, 4-5 pair
        let graph = Graph::parse("1,1,1\n1,1,2\n1,1\n1,1\n1,1,5\n1,1").unwrap();
        let components = find_connected_components(&graph, None);

        assert_eq!(components, vec![vec![0, 1, 2], vec![3], vec![4, 5]]);
        assert_partition(&graph, &components);
        assert_eq!(count_components(&graph), 3);
    }

    #[test]
    fn test_breadth_first_order() {
        // Star around 0 with a tail 3-4
        let graph = Graph::parse("1,1,1,2,3\n1,1\n1,1\n1,1,4\n1,1").unwrap();
        let components = find_connected_components(&graph, None);

        assert_eq!(components, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_edgeless_graph_is_all_singletons() {
        let graph = Graph::parse("1,1\n2,2\n3,3").unwrap();
        let components = find_connected_components(&graph, None);

        assert_eq!(components, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_component_cap() {
        let graph = Graph::parse("1,1\n2,2\n3,3\n4,4").unwrap();

        assert_eq!(find_connected_components(&graph, Some(2)).len(), 2);
        assert_eq!(find_connected_components(&graph, Some(0)).len(), 4);
        assert_eq!(find_connected_components(&graph, Some(10)).len(), 4);
    }

    #[test]
    fn test_reused_buffer_is_reset() {
        let graph = Graph::parse("1,1,1\n1,1\n1,1").unwrap();
        let mut visited = vec![true; 10];

        let components = find_connected_components_with(&graph, None, &mut visited);
        assert_eq!(components, vec![vec![0, 1], vec![2]]);
        assert_eq!(visited.len(), 3);

        let again = find_connected_components_with(&graph, None, &mut visited);
        assert_eq!(again, components);
    }

    #[test]
    fn test_empty_graph_has_no_components() {
        assert!(find_connected_components(&Graph::new(), None).is_empty());
    }
}

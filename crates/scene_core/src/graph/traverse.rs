//! Traversal, hierarchy dump and derived queries

use std::fmt::Write;

use super::{Graph, GraphError};
use crate::components::ComponentTransform;
use crate::events::{Event, EventType};
use crate::foundation::collections::NodeId;
use crate::foundation::math::Mat4;

/// Pre-order walk over a subtree that does not borrow the graph
///
/// Children are read when their parent is yielded, so the graph may be
/// modified between steps. Nodes removed before they are reached are skipped.
#[derive(Debug, Clone)]
pub struct GraphWalker {
    root: NodeId,
    stack: Vec<(NodeId, usize)>,
    active_only: bool,
}

impl GraphWalker {
    /// Walk every node below and including `root`
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            stack: vec![(root, 0)],
            active_only: false,
        }
    }

    /// Walk only active nodes, skipping the subtrees of inactive ones
    pub fn active_only(root: NodeId) -> Self {
        Self {
            active_only: true,
            ..Self::new(root)
        }
    }

    /// Start over from the root
    pub fn restart(&mut self) {
        self.stack.clear();
        self.stack.push((self.root, 0));
    }

    /// Next node with its depth below the root
    pub fn next_with_depth(&mut self, graph: &Graph) -> Option<(NodeId, usize)> {
        while let Some((node, depth)) = self.stack.pop() {
            let Some(data) = graph.node(node) else {
                continue;
            };
            if self.active_only && !data.is_active() {
                continue;
            }
            self.stack
                .extend(data.children().iter().rev().map(|&child| (child, depth + 1)));
            return Some((node, depth));
        }
        None
    }

    /// Next node
    pub fn next(&mut self, graph: &Graph) -> Option<NodeId> {
        self.next_with_depth(graph).map(|(node, _)| node)
    }
}

/// Borrowing pre-order iterator, see [`Graph::iter_graph`]
#[derive(Debug)]
pub struct GraphIter<'g> {
    graph: &'g Graph,
    walker: GraphWalker,
}

impl Iterator for GraphIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.walker.next(self.graph)
    }
}

impl Graph {
    /// Iterate `root` and all its descendants in pre-order
    pub fn iter_graph(&self, root: NodeId) -> GraphIter<'_> {
        GraphIter {
            graph: self,
            walker: GraphWalker::new(root),
        }
    }

    /// Iterate the active part of the subtree at `root` in pre-order
    pub fn iter_active(&self, root: NodeId) -> GraphIter<'_> {
        GraphIter {
            graph: self,
            walker: GraphWalker::active_only(root),
        }
    }

    /// Activate or deactivate a node
    ///
    /// Broadcasts `NodeActivate` or `NodeDeactivate` to the subtree when the
    /// flag changes.
    pub fn set_active(&mut self, node: NodeId, active: bool) -> Result<(), GraphError> {
        let data = self.data_mut(node)?;
        if data.active == active {
            return Ok(());
        }
        data.active = active;
        self.fire_activation(node, active)
    }

    pub(crate) fn fire_activation(&mut self, node: NodeId, active: bool) -> Result<(), GraphError> {
        let event_type = if active {
            EventType::NodeActivate
        } else {
            EventType::NodeDeactivate
        };
        self.broadcast_event(&Event::new(event_type, node))
    }

    /// Whether the node and all its ancestors are active
    pub fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        let path = self.path(node);
        !path.is_empty() && path.iter().all(|&id| self.is_active(id))
    }

    /// Human readable dump of the subtree at `root`
    ///
    /// One line per node: a `+` per depth level, the name, then the
    /// component counts per type with the `Component` prefix dropped.
    pub fn hierarchy_string(&self, root: NodeId) -> String {
        let mut output = String::new();
        let mut walker = GraphWalker::new(root);
        while let Some((node, depth)) = walker.next_with_depth(self) {
            let Some(data) = self.node(node) else {
                continue;
            };
            if depth > 0 {
                output.push_str(&"+".repeat(depth));
                output.push(' ');
            }
            output.push_str(data.name());
            let counts: Vec<String> = data
                .component_types()
                .map(|(type_name, ids)| {
                    let short = type_name.strip_prefix("Component").unwrap_or(type_name);
                    format!("{} {short}", ids.len())
                })
                .collect();
            if !counts.is_empty() {
                let _ = write!(output, " | {}", counts.join(", "));
            }
            output.push('\n');
        }
        output
    }

    /// Product of the local matrices from the root down to `node`
    ///
    /// Nodes without a [`ComponentTransform`] contribute the identity.
    pub fn world_matrix(&self, node: NodeId) -> Result<Mat4, GraphError> {
        let path = self.path(node);
        if path.is_empty() {
            return Err(GraphError::UnknownNode(node));
        }
        Ok(path.into_iter().fold(Mat4::identity(), |world, id| {
            match self.component_of::<ComponentTransform>(id) {
                Some(transform) => world * transform.matrix(),
                None => world,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentLight;
    use crate::foundation::math::{Transform, Vec3};
    use approx::assert_relative_eq;

    fn sample(graph: &mut Graph) -> Vec<NodeId> {
        // root
        // + a
        // ++ a1
        // + b
        let names = ["root", "a", "a1", "b"];
        let ids: Vec<NodeId> = names.iter().map(|name| graph.create_node(*name)).collect();
        graph.add_child(ids[0], ids[1]).unwrap();
        graph.add_child(ids[1], ids[2]).unwrap();
        graph.add_child(ids[0], ids[3]).unwrap();
        ids
    }

    #[test]
    fn test_pre_order_iteration() {
        let mut graph = Graph::new();
        let ids = sample(&mut graph);
        let visited: Vec<NodeId> = graph.iter_graph(ids[0]).collect();
        assert_eq!(visited, ids);

        let from_a: Vec<NodeId> = graph.iter_graph(ids[1]).collect();
        assert_eq!(from_a, [ids[1], ids[2]]);
    }

    #[test]
    fn test_active_only_skips_inactive_subtrees() {
        let mut graph = Graph::new();
        let ids = sample(&mut graph);
        graph.set_active(ids[1], false).unwrap();

        let visited: Vec<NodeId> = graph.iter_active(ids[0]).collect();
        assert_eq!(visited, [ids[0], ids[3]]);
        assert!(graph.is_active(ids[2]));
        assert!(!graph.is_active_in_hierarchy(ids[2]));
    }

    #[test]
    fn test_walker_tolerates_mutation_between_steps() {
        let mut graph = Graph::new();
        let ids = sample(&mut graph);
        let mut walker = GraphWalker::new(ids[0]);
        assert_eq!(walker.next(&graph), Some(ids[0]));
        graph.destroy_node(ids[1]).unwrap();
        assert_eq!(walker.next(&graph), Some(ids[3]));
        assert_eq!(walker.next(&graph), None);

        walker.restart();
        assert_eq!(walker.next(&graph), Some(ids[0]));
    }

    #[test]
    fn test_hierarchy_string() {
        let mut graph = Graph::new();
        let ids = sample(&mut graph);
        graph.add(ids[1], ComponentLight::default()).unwrap();
        graph.add(ids[1], ComponentLight::default()).unwrap();
        graph.add(ids[1], ComponentTransform::default()).unwrap();

        assert_eq!(
            graph.hierarchy_string(ids[0]),
            "root\n+ a | 2 Light, 1 Transform\n++ a1\n+ b\n"
        );
    }

    #[test]
    fn test_world_matrix_accumulates_translations() {
        let mut graph = Graph::new();
        let ids = sample(&mut graph);
        graph
            .add(ids[0], ComponentTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        graph
            .add(ids[2], ComponentTransform::from_translation(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();

        let world = graph.world_matrix(ids[2]).unwrap();
        let origin = world.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(origin.coords, Vec3::new(1.0, 2.0, 0.0));

        let b = graph.world_matrix(ids[3]).unwrap();
        assert_relative_eq!(b, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)).matrix());
    }
}

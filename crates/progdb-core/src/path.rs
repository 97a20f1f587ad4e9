//! Connectivity-checked paths over the element graph.
//!
//! A [`Path`] is a stack of edges. Each pushed edge must end where the
//! current top edge starts:
//!
//! ```text
//! push(B -> C); push(A -> B)
//! edges (push order): [B -> C, A -> B]
//! top_node = A   first_node = B   last_node = B
//! ```
//!
//! `first_node` and `last_node` read the edge container front to back
//! (`edges[0].from`, `edges[n-1].to`); `top_node` is the source of the most
//! recent push.
//!
//! The edge container is private; only validated `push` and read access are
//! exposed.

use std::fmt;

use crate::element::ElementRef;
use crate::error::{FactError, FactResult};
use crate::relation::Relation;

// ============================================================================
// Edges
// ============================================================================

/// A directed, typed edge between two nodes.
pub trait Edge: fmt::Display {
    type Node: Clone + PartialEq + fmt::Display;
    type Kind: PartialEq;

    fn from_node(&self) -> &Self::Node;
    fn to_node(&self) -> &Self::Node;
    fn kind(&self) -> Self::Kind;
}

/// An element-to-element edge through a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    from: ElementRef,
    relation: Relation,
    to: ElementRef,
}

impl RelationEdge {
    pub fn new(from: ElementRef, relation: Relation, to: ElementRef) -> Self {
        RelationEdge { from, relation, to }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }
}

impl Edge for RelationEdge {
    type Node = ElementRef;
    type Kind = Relation;

    fn from_node(&self) -> &ElementRef {
        &self.from
    }

    fn to_node(&self) -> &ElementRef {
        &self.to
    }

    fn kind(&self) -> Relation {
        self.relation
    }
}

impl fmt::Display for RelationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.from, self.relation, self.to)
    }
}

// ============================================================================
// Path
// ============================================================================

/// A connected sequence of edges, built by stack pushes.
#[derive(Debug, Clone, PartialEq)]
pub struct Path<E> {
    edges: Vec<E>,
}

impl<E> Default for Path<E> {
    fn default() -> Self {
        Path { edges: Vec::new() }
    }
}

impl<E: Edge> Path<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `edge` on top of the path.
    ///
    /// Fails with [`FactError::DisconnectedEdge`] unless the path is empty or
    /// `edge.to_node()` equals the current top node.
    pub fn push(&mut self, edge: E) -> FactResult<()> {
        if let Some(top) = self.edges.last() {
            if top.from_node() != edge.to_node() {
                return Err(FactError::DisconnectedEdge {
                    edge: edge.to_string(),
                    top: top.from_node().to_string(),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Source of the most recently pushed edge.
    pub fn top_node(&self) -> FactResult<&E::Node> {
        self.edges
            .last()
            .map(Edge::from_node)
            .ok_or(FactError::EmptyPath)
    }

    /// Source of the first pushed edge.
    pub fn first_node(&self) -> FactResult<&E::Node> {
        self.edges
            .first()
            .map(Edge::from_node)
            .ok_or(FactError::EmptyPath)
    }

    /// Destination of the most recently pushed edge.
    pub fn last_node(&self) -> FactResult<&E::Node> {
        self.edges
            .last()
            .map(Edge::to_node)
            .ok_or(FactError::EmptyPath)
    }

    /// Distinct nodes touched by the path, in first-seen order.
    pub fn nodes(&self) -> Vec<E::Node> {
        let mut nodes: Vec<E::Node> = Vec::new();
        for edge in &self.edges {
            for node in [edge.from_node(), edge.to_node()] {
                if !nodes.contains(node) {
                    nodes.push(node.clone());
                }
            }
        }
        nodes
    }

    /// First node, then `(from, to)` of every edge in push order.
    ///
    /// Junction nodes appear more than once.
    pub fn ordered_nodes(&self) -> Vec<E::Node> {
        let Ok(first) = self.first_node() else {
            return Vec::new();
        };
        let mut nodes = Vec::with_capacity(1 + 2 * self.edges.len());
        nodes.push(first.clone());
        for edge in &self.edges {
            nodes.push(edge.from_node().clone());
            nodes.push(edge.to_node().clone());
        }
        nodes
    }

    /// Destination of edge 0, then `(from, to)` of every later edge.
    pub fn tail_nodes(&self) -> Vec<E::Node> {
        let mut nodes = Vec::new();
        if let Some(first) = self.edges.first() {
            nodes.push(first.to_node().clone());
        }
        for edge in self.edges.iter().skip(1) {
            nodes.push(edge.from_node().clone());
            nodes.push(edge.to_node().clone());
        }
        nodes
    }

    /// Top node followed by the tail nodes.
    pub fn path_elements(&self) -> FactResult<Vec<E::Node>> {
        let mut nodes = vec![self.top_node()?.clone()];
        nodes.extend(self.tail_nodes());
        Ok(nodes)
    }

    /// Same length and, position by position, the same edge kinds.
    pub fn type_equivalent(&self, other: &Path<E>) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(a, b)| a.kind() == b.kind())
    }

    /// Edges in push order.
    pub fn edges(&self) -> &[E] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.edges.iter()
    }
}

impl<'a, E: Edge> IntoIterator for &'a Path<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Edge> fmt::Display for Path<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if let Ok(first) = self.first_node() {
            write!(f, "{}", first)?;
            for edge in &self.edges {
                write!(f, ", {}, {}", edge, edge.to_node())?;
            }
        }
        f.write_str("]")
    }
}

// ============================================================================
// Tests
// ============================================================================

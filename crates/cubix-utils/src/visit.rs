use std::{collections::HashMap, hash::Hash};

use derive_more::Display;

/// Colouring used by depth-first searches.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

#[derive(Debug, Clone)]
pub struct VisitMap<T>(HashMap<T, VisitState>);

impl<T> VisitMap<T>
where
    T: Eq + Hash,
{
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, key: &T) -> VisitState {
        self.0.get(key).copied().unwrap_or(VisitState::Unvisited)
    }

    pub fn set(&mut self, key: T, state: VisitState) {
        self.0.insert(key, state);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for VisitMap<T>
where
    T: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if the directed graph restricted to `nodes` contains a cycle.
///
/// `edges` yields the successors of a node; successors outside `nodes` are ignored.
pub fn has_cycle<T, I, F>(nodes: &[T], mut edges: F) -> bool
where
    T: Eq + Hash + Copy,
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> I,
{
    fn visit<T, I, F>(node: T, nodes: &[T], edges: &mut F, visits: &mut VisitMap<T>) -> bool
    where
        T: Eq + Hash + Copy,
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> I,
    {
        match visits.get(&node) {
            VisitState::Visiting => return true,
            VisitState::Visited => return false,
            VisitState::Unvisited => {}
        }

        visits.set(node, VisitState::Visiting);
        for next in edges(node) {
            if nodes.contains(&next) && visit(next, nodes, edges, visits) {
                return true;
            }
        }
        visits.set(node, VisitState::Visited);
        false
    }

    let mut visits = VisitMap::new();
    nodes
        .iter()
        .any(|&node| visit(node, nodes, &mut edges, &mut visits))
}

/// Orders `nodes` so that every node comes after its successors.
///
/// Successors outside `nodes` are ignored. Nodes on a cycle are emitted in discovery
/// order.
pub fn post_order<T, I, F>(nodes: &[T], mut edges: F) -> Vec<T>
where
    T: Eq + Hash + Copy,
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> I,
{
    fn visit<T, I, F>(node: T, nodes: &[T], edges: &mut F, visits: &mut VisitMap<T>, out: &mut Vec<T>)
    where
        T: Eq + Hash + Copy,
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> I,
    {
        if visits.get(&node) != VisitState::Unvisited {
            return;
        }

        visits.set(node, VisitState::Visiting);
        for next in edges(node) {
            if nodes.contains(&next) {
                visit(next, nodes, edges, visits, out);
            }
        }
        visits.set(node, VisitState::Visited);
        out.push(node);
    }

    let mut visits = VisitMap::new();
    let mut out = Vec::with_capacity(nodes.len());
    for &node in nodes {
        visit(node, nodes, &mut edges, &mut visits, &mut out);
    }
    out
}

//! Parent/child relations between tickets
//!
//! Tickets live in an arena and edges are stored as indices, so traversal
//! never holds references into other tickets. Edges are merged from both
//! sides: a child's `parent_ids` and a parent's `child_ids` describe the same
//! link.

use crate::models::Ticket;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
struct Node {
    id: u64,
    parents: Vec<usize>,
    children: Vec<usize>,
}

/// Ticket hierarchy keyed by ticket id
///
/// Ids referenced by an edge but absent from the ticket list are still
/// nodes; they are reported by [`TaskGraph::dangling`].
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<Node>,
    index: HashMap<u64, usize>,
    present: HashSet<u64>,
}

impl TaskGraph {
    #[must_use]
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut graph = Self::default();
        for ticket in tickets {
            graph.node(ticket.id);
            graph.present.insert(ticket.id);
        }
        for ticket in tickets {
            for &parent in &ticket.parent_ids {
                graph.link(parent, ticket.id);
            }
            for &child in &ticket.child_ids {
                graph.link(ticket.id, child);
            }
        }
        graph
    }

    fn node(&mut self, id: u64) -> usize {
        if let Some(&index) = self.index.get(&id) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            id,
            ..Node::default()
        });
        self.index.insert(id, index);
        index
    }

    fn link(&mut self, parent: u64, child: u64) {
        let p = self.node(parent);
        let c = self.node(child);
        if !self.nodes[p].children.contains(&c) {
            self.nodes[p].children.push(c);
        }
        if !self.nodes[c].parents.contains(&p) {
            self.nodes[c].parents.push(p);
        }
    }

    fn ids(&self, indices: &[usize]) -> Vec<u64> {
        indices.iter().map(|&i| self.nodes[i].id).collect()
    }

    /// Number of nodes, dangling references included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` belongs to a ticket in the source list
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.present.contains(&id)
    }

    #[must_use]
    pub fn parents_of(&self, id: u64) -> Vec<u64> {
        self.index
            .get(&id)
            .map(|&i| self.ids(&self.nodes[i].parents))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn children_of(&self, id: u64) -> Vec<u64> {
        self.index
            .get(&id)
            .map(|&i| self.ids(&self.nodes[i].children))
            .unwrap_or_default()
    }

    /// All transitive children in breadth-first order, excluding `id`
    #[must_use]
    pub fn descendants(&self, id: u64) -> Vec<u64> {
        self.walk(id, true)
    }

    /// All transitive parents in breadth-first order, excluding `id`
    #[must_use]
    pub fn ancestors(&self, id: u64) -> Vec<u64> {
        self.walk(id, false)
    }

    fn walk(&self, id: u64, downward: bool) -> Vec<u64> {
        let Some(&start) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.nodes.len()];
        visited[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            let node = &self.nodes[current];
            let next = if downward { &node.children } else { &node.parents };
            for &neighbour in next {
                if !visited[neighbour] {
                    visited[neighbour] = true;
                    found.push(self.nodes[neighbour].id);
                    queue.push_back(neighbour);
                }
            }
        }
        found
    }

    /// Present tickets without parents, in insertion order
    #[must_use]
    pub fn roots(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|node| node.parents.is_empty() && self.present.contains(&node.id))
            .map(|node| node.id)
            .collect()
    }

    /// Ids referenced by edges without a matching ticket
    #[must_use]
    pub fn dangling(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|node| !self.present.contains(&node.id))
            .map(|node| node.id)
            .collect()
    }

    /// First parent-to-child cycle found, as a closed id path
    ///
    /// The returned path starts and ends with the same id, e.g. `[1, 2, 1]`.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<u64>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] != Mark::New {
                continue;
            }
            // Iterative DFS; each frame is (node, next child position)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::Active;

            while let Some(frame) = stack.last_mut() {
                let (node, position) = *frame;
                let Some(&child) = self.nodes[node].children.get(position) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[child] {
                    Mark::New => {
                        marks[child] = Mark::Active;
                        stack.push((child, 0));
                    }
                    Mark::Active => {
                        let from = stack.iter().position(|&(n, _)| n == child).unwrap_or(0);
                        let mut path: Vec<u64> =
                            stack[from..].iter().map(|&(n, _)| self.nodes[n].id).collect();
                        path.push(self.nodes[child].id);
                        return Some(path);
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }
}

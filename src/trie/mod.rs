//! Incremental route aggregation over a binary trie.
//!
//! The trie keeps one node per bit-length prefix on the path from the root to
//! every inserted prefix. A node is an *aggregate* when both of its children
//! are covered (leaf or aggregate) and, for prefixes carrying route attributes,
//! the attributes of both children can be merged. After every batch a single
//! top-down pass decides which aggregates are announced, so that no announced
//! prefix covers another.
//!
//! The trie is a single-writer structure: `apply` takes `&mut self` and runs to
//! completion. Callers sharing a trie between threads must serialize access
//! themselves, e.g. behind a `Mutex`.

mod dot;
mod reconcile;

pub use dot::DotGraph;

use crate::attributes::{RouteAttributes, merge};
use crate::error::{AppError, AppErrorKind};
use crate::prefix::{AddressFamily, Prefix};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone)]
struct TrieNode {
    /// The plain path prefix of this node.
    network: Prefix,
    /// The exact prefix inserted here; `Some` iff the node is a leaf.
    route: Option<Prefix>,
    /// The aggregate route; `Some` iff the node is an aggregate.
    aggregate: Option<Prefix>,
    /// The value last announced for this node.
    exported: Option<Prefix>,
    /// Whether an ancestor covered this node during the last reconciliation.
    covered: bool,
    subtree_changed: bool,
    parent: Option<NodeId>,
    children: [Option<NodeId>; 2],
}

impl TrieNode {
    fn new(network: Prefix, parent: Option<NodeId>) -> Self {
        Self {
            network,
            route: None,
            aggregate: None,
            exported: None,
            covered: false,
            subtree_changed: true,
            parent,
            children: [None, None],
        }
    }

    fn is_leaf(&self) -> bool {
        self.route.is_some()
    }

    fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    fn is_childless(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// The route this node contributes to its parent's aggregate, if it is covered.
    fn contribution(&self) -> Option<&Prefix> {
        self.aggregate.as_ref().or(self.route.as_ref())
    }
}

/// The net change of announced prefixes produced by one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Announcements {
    /// Prefixes newly announced (or re-announced with changed attributes).
    pub exported: Vec<Prefix>,
    /// Prefixes whose announcement is revoked.
    pub withdrawn: Vec<Prefix>,
}

impl Announcements {
    pub fn is_empty(&self) -> bool {
        self.exported.is_empty() && self.withdrawn.is_empty()
    }
}

/// Maintains the minimal set of aggregate prefixes covering a changing set of
/// specific prefixes of one address family.
#[derive(Debug, Clone)]
pub struct AggregationTrie {
    family: AddressFamily,
    table: Vec<TrieNode>,
    free: Vec<NodeId>,
}

impl AggregationTrie {
    /// Creates an empty trie rooted at `0.0.0.0/0` or `::/0`.
    pub fn new(family: AddressFamily) -> Self {
        let mut root = TrieNode::new(family.root(), None);
        root.subtree_changed = false;
        Self {
            family,
            table: vec![root],
            free: Vec::new(),
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Applies a batch of additions and removals and returns the resulting
    /// change in announced prefixes.
    ///
    /// All additions are applied before any removal, regardless of order.
    /// Re-adding an existing prefix replaces its route attributes.
    ///
    /// # Errors
    /// The whole batch is rejected, leaving the trie untouched, if a prefix
    /// belongs to another address family (`AddressFamilyError`) or if a removal
    /// does not name a leaf (`InvalidOperationError`).
    pub fn apply(
        &mut self,
        to_add: &[Prefix],
        to_remove: &[Prefix],
    ) -> Result<Announcements, AppError> {
        self.validate_batch(to_add, to_remove)
            .inspect_err(|e| warn!("batch rejected: {}", e))?;

        let mut announcements = Announcements::default();
        for prefix in to_add {
            self.insert(prefix);
        }
        for prefix in to_remove {
            self.remove(prefix, &mut announcements.withdrawn);
        }
        self.reconcile(&mut announcements);

        debug!(
            "applied {} additions and {} removals: {} exported, {} withdrawn",
            to_add.len(),
            to_remove.len(),
            announcements.exported.len(),
            announcements.withdrawn.len()
        );
        Ok(announcements)
    }

    fn validate_batch(&self, to_add: &[Prefix], to_remove: &[Prefix]) -> Result<(), AppError> {
        if let Some(prefix) = to_add
            .iter()
            .chain(to_remove)
            .find(|prefix| prefix.family() != self.family)
        {
            return Err(AppError::new(
                AppErrorKind::AddressFamilyError,
                format!("{} is not an {} prefix", prefix, self.family).as_str(),
            ));
        }

        let adding: HashSet<&Prefix> = to_add.iter().collect();
        let mut removing = HashSet::with_capacity(to_remove.len());
        for prefix in to_remove {
            if !removing.insert(prefix) {
                return Err(AppError::new(
                    AppErrorKind::InvalidOperationError,
                    format!("{prefix} is removed more than once in the same batch").as_str(),
                ));
            }
            if !adding.contains(prefix) && !self.contains_leaf(prefix) {
                return Err(AppError::new(
                    AppErrorKind::InvalidOperationError,
                    format!("{prefix} does not exist in the trie as a leaf").as_str(),
                ));
            }
        }
        Ok(())
    }

    fn insert(&mut self, prefix: &Prefix) {
        let mut current = ROOT;
        self.table[current].subtree_changed = true;

        for depth in 0..prefix.prefix_len() {
            let bit = prefix.bit(depth);
            current = match self.table[current].children[bit] {
                Some(child) => child,
                None => {
                    let child = self.new_node(prefix.truncate(depth + 1), current);
                    self.table[current].children[bit] = Some(child);
                    child
                }
            };
            self.table[current].subtree_changed = true;
        }

        self.table[current].route = Some(prefix.clone());

        // Nothing above can change once an ancestor's aggregate stays the same.
        let mut next = self.table[current].parent;
        while let Some(id) = next {
            if self.table[id].children.iter().any(Option::is_none) {
                break;
            }
            let aggregate = self.evaluate_aggregate(id);
            if same_route(aggregate.as_ref(), self.table[id].aggregate.as_ref()) {
                break;
            }
            self.table[id].aggregate = aggregate;
            next = self.table[id].parent;
        }
    }

    fn remove(&mut self, prefix: &Prefix, withdrawn: &mut Vec<Prefix>) {
        let mut current = ROOT;
        self.table[current].subtree_changed = true;

        for depth in 0..prefix.prefix_len() {
            let Some(child) = self.table[current].children[prefix.bit(depth)] else {
                // validated before any mutation
                return;
            };
            current = child;
            self.table[current].subtree_changed = true;
        }

        self.table[current].route = None;

        let mut next = self.table[current].parent;
        while let Some(id) = next {
            self.prune_children(id, withdrawn);
            self.table[id].aggregate = self.evaluate_aggregate(id);
            next = self.table[id].parent;
        }
    }

    /// Drops children that are neither leaves nor have children of their own.
    fn prune_children(&mut self, id: NodeId, withdrawn: &mut Vec<Prefix>) {
        for slot in 0..2 {
            let Some(child) = self.table[id].children[slot] else {
                continue;
            };
            let node = &mut self.table[child];
            if node.is_leaf() || !node.is_childless() {
                continue;
            }
            if let Some(announced) = node.exported.take() {
                trace!("withdrawing pruned {}", announced);
                withdrawn.push(announced);
            }
            trace!("pruning {}", node.network);
            self.table[id].children[slot] = None;
            self.free.push(child);
        }
    }

    /// Computes the aggregate route of a node from its children, if it qualifies.
    fn evaluate_aggregate(&self, id: NodeId) -> Option<Prefix> {
        let node = &self.table[id];
        let [Some(left), Some(right)] = node.children else {
            return None;
        };
        let left = self.table[left].contribution()?;
        let right = self.table[right].contribution()?;

        match (left.attributes(), right.attributes()) {
            (None, None) => Some(node.network.clone()),
            (left, right) => {
                let absent = RouteAttributes::default();
                merge(left.unwrap_or(&absent), right.unwrap_or(&absent))
                    .map(|attributes| node.network.clone().with_attributes(attributes))
            }
        }
    }

    fn new_node(&mut self, network: Prefix, parent: NodeId) -> NodeId {
        let node = TrieNode::new(network, Some(parent));
        if let Some(id) = self.free.pop() {
            self.table[id] = node;
            id
        } else {
            self.table.push(node);
            self.table.len() - 1
        }
    }

    fn find(&self, prefix: &Prefix) -> Option<NodeId> {
        if prefix.family() != self.family {
            return None;
        }
        let mut current = ROOT;
        for depth in 0..prefix.prefix_len() {
            current = self.table[current].children[prefix.bit(depth)]?;
        }
        Some(current)
    }

    /// Checks whether `prefix` is currently inserted as a leaf.
    pub fn contains_leaf(&self, prefix: &Prefix) -> bool {
        self.find(prefix)
            .is_some_and(|id| self.table[id].is_leaf())
    }

    /// Returns the current covering set: a depth-first walk that stops at the
    /// first aggregate or leaf on every path.
    pub fn collect_aggregates(&self) -> Vec<Prefix> {
        let mut result = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.table[id];
            if let Some(prefix) = node.contribution() {
                result.push(prefix.clone());
                continue;
            }
            stack.extend(node.children.iter().rev().flatten());
        }
        result
    }

    /// Returns every prefix currently announced, in address order.
    pub fn announced(&self) -> Vec<Prefix> {
        let mut result = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.table[id];
            if let Some(prefix) = &node.exported {
                result.push(prefix.clone());
            }
            stack.extend(node.children.iter().rev().flatten());
        }
        result
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.table.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 1 && !self.table[ROOT].is_leaf()
    }
}

fn same_route(a: Option<&Prefix>, b: Option<&Prefix>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.is_identical(b),
        (None, None) => true,
        _ => false,
    }
}

use super::{AggregationTrie, Announcements, ROOT, TrieNode};
use crate::prefix::Prefix;
use tracing::trace;

enum Transition {
    Export(Prefix),
    Withdraw,
    Keep,
}

/// Decides the export state of a node given whether an ancestor already covers it.
fn transition(node: &TrieNode, covered: bool) -> Transition {
    match (&node.aggregate, &node.exported) {
        (Some(aggregate), announced) if !covered => match announced {
            Some(announced) if announced.is_identical(aggregate) => Transition::Keep,
            _ => Transition::Export(aggregate.clone()),
        },
        (Some(_), Some(_)) => Transition::Withdraw,
        (None, Some(_)) => Transition::Withdraw,
        _ => Transition::Keep,
    }
}

impl AggregationTrie {
    /// Walks the trie top-down and updates which nodes are announced.
    ///
    /// Only nodes below a changed node are visited, plus the subtree of any
    /// node whose coverage by an ancestor flipped since the previous pass.
    pub(super) fn reconcile(&mut self, announcements: &mut Announcements) {
        let mut stack = vec![(ROOT, false)];

        while let Some((id, covered)) = stack.pop() {
            let node = &mut self.table[id];

            match transition(node, covered) {
                Transition::Export(prefix) => {
                    trace!("exporting {}", prefix);
                    announcements.exported.push(prefix.clone());
                    node.exported = Some(prefix);
                }
                Transition::Withdraw => {
                    if let Some(prefix) = node.exported.take() {
                        trace!("withdrawing {}", prefix);
                        announcements.withdrawn.push(prefix);
                    }
                }
                Transition::Keep => {}
            }

            let descend = node.subtree_changed || node.covered != covered;
            node.covered = covered;
            node.subtree_changed = false;

            if descend {
                let covered = covered || node.is_aggregate();
                for child in node.children.into_iter().rev().flatten() {
                    stack.push((child, covered));
                }
            }
        }
    }
}

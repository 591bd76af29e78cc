use super::{AggregationTrie, ROOT};
use std::fmt::{Display, Formatter};

/// Graphviz rendering of the current node states, for visualization tooling.
///
/// Leaves are marked `(L)`, aggregates `(A)` and announced nodes `(E)`.
pub struct DotGraph<'a> {
    trie: &'a AggregationTrie,
}

impl AggregationTrie {
    pub fn dot_graph(&self) -> DotGraph<'_> {
        DotGraph { trie: self }
    }

    pub fn to_dot_graph(&self) -> String {
        self.dot_graph().to_string()
    }
}

impl Display for DotGraph<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "digraph IPAggregation {{")?;
        writeln!(f, "node [shape=box];")?;
        writeln!(f, "edge [arrowhead=normal];")?;

        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.trie.table[id];
            let mut label = node.network.to_string();
            let mut color = "white";
            if node.is_leaf() {
                label.push_str(" (L)");
                color = "lightgreen";
            }
            if node.is_aggregate() {
                label.push_str(" (A)");
                color = "orange";
            }
            if node.exported.is_some() {
                label.push_str(" (E)");
                color = "lightblue";
            }

            writeln!(
                f,
                "\"{}\" [label=\"{}\" style=filled fillcolor={} rank={}];",
                node.network,
                label,
                color,
                node.network.prefix_len()
            )?;
            if let Some(parent) = node.parent {
                writeln!(
                    f,
                    "\"{}\" -> \"{}\";",
                    self.trie.table[parent].network, node.network
                )?;
            }

            stack.extend(node.children.iter().rev().flatten());
        }

        writeln!(f, "}}")
    }
}

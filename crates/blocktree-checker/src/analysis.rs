//! The analysis snapshot.

use std::collections::{BTreeMap, BTreeSet};

use blocktree_types::{Diagnostic, ErrorCode, NodeId};
use serde::{Deserialize, Serialize};

use crate::ty::Type;

/// Everything the analyzer learned about one tree.
///
/// Built fresh for every tree version and never updated in place. Maps are
/// ordered so that two runs over the same input serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Actual types, cumulative with the outer environment.
    pub node_type: BTreeMap<NodeId, Type>,
    /// Display names, cumulative with the outer environment.
    pub var_name: BTreeMap<NodeId, String>,
    /// The type each position demands.
    pub expected_type: BTreeMap<NodeId, Type>,
    /// Program errors per node. Nodes without errors have no entry.
    pub errors: BTreeMap<NodeId, Vec<Diagnostic>>,
    /// Nodes that can never take effect. Styling only.
    pub inactive: BTreeSet<NodeId>,
}

impl Analysis {
    /// True if no node has an error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn errors_for(&self, id: &NodeId) -> &[Diagnostic] {
        self.errors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Error codes on one node, in the order they were reported.
    pub fn codes_for(&self, id: &NodeId) -> Vec<ErrorCode> {
        self.errors_for(id).iter().map(|d| d.code).collect()
    }

    pub fn has_error(&self, id: &NodeId, code: ErrorCode) -> bool {
        self.errors_for(id).iter().any(|d| d.code == code)
    }

    pub fn type_of(&self, id: &NodeId) -> Option<&Type> {
        self.node_type.get(id)
    }

    pub fn expected_type_of(&self, id: &NodeId) -> Option<&Type> {
        self.expected_type.get(id)
    }

    pub fn name_of(&self, id: &NodeId) -> Option<&str> {
        self.var_name.get(id).map(String::as_str)
    }

    pub fn is_inactive(&self, id: &NodeId) -> bool {
        self.inactive.contains(id)
    }

    /// Every `(node, diagnostic)` pair, ordered by node id.
    pub fn all_errors(&self) -> impl Iterator<Item = (&NodeId, &Diagnostic)> {
        self.errors
            .iter()
            .flat_map(|(id, diags)| diags.iter().map(move |d| (id, d)))
    }

    pub(crate) fn push_error(&mut self, id: &NodeId, diagnostic: Diagnostic) {
        self.errors.entry(id.clone()).or_default().push(diagnostic);
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_per_node() {
        let mut analysis = Analysis::default();
        assert!(analysis.is_clean());
        let id = NodeId::from("n");
        analysis.push_error(&id, Diagnostic::new(ErrorCode::TYPE_MISMATCH, "a"));
        analysis.push_error(&id, Diagnostic::new(ErrorCode::UNKNOWN_ARGUMENT, "b"));
        assert!(!analysis.is_clean());
        assert_eq!(analysis.error_count(), 2);
        assert_eq!(
            analysis.codes_for(&id),
            vec![ErrorCode::TYPE_MISMATCH, ErrorCode::UNKNOWN_ARGUMENT]
        );
        assert!(analysis.errors_for(&NodeId::from("other")).is_empty());
    }

    #[test]
    fn json_is_ordered() {
        let mut analysis = Analysis::default();
        analysis.node_type.insert(NodeId::from("b"), Type::Num);
        analysis.node_type.insert(NodeId::from("a"), Type::Text);
        let json = analysis.to_json();
        let a = json.find("\"a\"").unwrap();
        let b = json.find("\"b\"").unwrap();
        assert!(a < b, "{json}");
    }
}

//! The outer static environment.
//!
//! [`OuterStaticEnv`] is supplied by the host once per editing session and
//! never changes during it: the types and display names of every built-in
//! symbol, and the set of named returns a program may assign into.

use std::collections::{BTreeMap, BTreeSet};

use blocktree_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::ty::{FnInterface, Type};

/// Built-in symbols visible to every program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OuterStaticEnv {
    #[serde(default)]
    pub types: BTreeMap<NodeId, Type>,
    #[serde(default)]
    pub names: BTreeMap<NodeId, String>,
    #[serde(default)]
    pub named_returns: BTreeSet<NodeId>,
}

impl OuterStaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a readable symbol.
    pub fn with_symbol(mut self, id: impl Into<NodeId>, name: impl Into<String>, ty: Type) -> Self {
        let id = id.into();
        self.types.insert(id.clone(), ty);
        self.names.insert(id, name.into());
        self
    }

    /// Declare a function symbol.
    pub fn with_function(
        self,
        id: impl Into<NodeId>,
        name: impl Into<String>,
        iface: FnInterface,
    ) -> Self {
        self.with_symbol(id, name, Type::Fn(iface))
    }

    /// Declare a named return: an output declarations may assign into.
    pub fn with_named_return(
        mut self,
        id: impl Into<NodeId>,
        name: impl Into<String>,
        ty: Type,
    ) -> Self {
        let id = id.into();
        self.named_returns.insert(id.clone());
        self.with_symbol(id, name, ty)
    }

    pub fn type_of(&self, id: &NodeId) -> Option<&Type> {
        self.types.get(id)
    }

    pub fn name_of(&self, id: &NodeId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn is_named_return(&self, id: &NodeId) -> bool {
        self.named_returns.contains(id)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

//! Node-identity-keyed `AST node → TypeId` side table.
//!
//! Grounded on `original_source/src/typetable.c`'s shape: the original hangs
//! a type descriptor off each expression node by its pointer identity. Here
//! that becomes a `HashMap` keyed by the node's address — `tau_types` stays
//! free of any dependency on `tau_syntax`, so this table (and not the store
//! itself) is the only place that knows an AST node's address is a valid key.

use std::collections::HashMap;

use tau_types::TypeId;

#[derive(Default)]
pub struct NodeTypeTable {
    map: HashMap<usize, TypeId>,
}

impl NodeTypeTable {
    pub fn new() -> Self {
        NodeTypeTable { map: HashMap::new() }
    }

    pub fn insert<T>(&mut self, node: &T, ty: TypeId) {
        self.map.insert(node as *const T as usize, ty);
    }

    pub fn get<T>(&self, node: &T) -> Option<TypeId> {
        self.map.get(&(node as *const T as usize)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tau_types::TypeStore;

    #[test]
    fn lookup_by_node_address_round_trips() {
        let store = TypeStore::new();
        let mut table = NodeTypeTable::new();
        let node = 42u64;
        table.insert(&node, store.i32());
        assert_eq!(table.get(&node), Some(store.i32()));
    }

    #[test]
    fn distinct_nodes_never_alias() {
        let store = TypeStore::new();
        let mut table = NodeTypeTable::new();
        let a = 1u64;
        let b = 2u64;
        table.insert(&a, store.i32());
        assert_eq!(table.get(&b), None);
    }
}

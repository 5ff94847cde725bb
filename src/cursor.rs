//! A cursor for walking a `LoopIr`'s body via the `Addr`/`Compute`/`Phi`/
//! `LoopIr` sibling chains built by [`crate::reconstruct::topo_sort`].
//!
//! Grounded on `cranelift-codegen`'s `cursor.rs`: rather than holding a
//! `Vec<NodeId>` snapshot (which would go stale the moment a pass inserts or
//! removes a node), a cursor holds only the current position and walks the
//! intrusive `prev`/`next` links directly, so mutation during a single pass
//! (the common case: CSE dropping a node mid-walk) is safe and cheap.

use crate::ir::{Cache, NodeId};

pub struct Cursor<'a> {
    cache: &'a mut Cache,
    position: Option<NodeId>,
}

impl<'a> Cursor<'a> {
    pub fn at(cache: &'a mut Cache, start: Option<NodeId>) -> Self {
        Cursor { cache, position: start }
    }

    pub fn current(&self) -> Option<NodeId> {
        self.position
    }

    pub fn cache(&mut self) -> &mut Cache {
        self.cache
    }

    pub fn next(&mut self) -> Option<NodeId> {
        let cur = self.position?;
        self.position = crate::ir::node::next(self.cache, cur);
        self.position
    }

    pub fn prev(&mut self) -> Option<NodeId> {
        let cur = self.position?;
        self.position = crate::ir::node::prev(self.cache, cur);
        self.position
    }

    pub fn goto(&mut self, node: Option<NodeId>) {
        self.position = node;
    }

    /// Remove the node currently under the cursor, advancing to what was
    /// its `next` so a caller can keep walking forward without having to
    /// re-derive position after the unlink.
    pub fn remove_current(&mut self) -> Option<NodeId> {
        let cur = self.position?;
        let next = crate::ir::node::next(self.cache, cur);
        crate::ir::node::unlink(self.cache, cur);
        self.position = next;
        Some(cur)
    }

    /// Insert `node` immediately before the current position.
    pub fn insert_before(&mut self, node: NodeId) {
        if let Some(cur) = self.position {
            crate::ir::node::insert_before(self.cache, cur, node);
        }
    }
}

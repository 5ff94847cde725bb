//! End-to-end smoke test for temporary elimination: a loop writes to a
//! locally-allocated buffer `tmp` that is read by nothing after the loop's
//! exit, so every `Addr` touching it should be dropped by
//! `eliminate_temporaries` and the allocation itself offered up for
//! removal (modeled here by the `AliasQuery` reporting it as both
//! non-escaping and removable — the actual erase-candidate bookkeeping on
//! the host's allocation object is out of scope for this crate, which only
//! drops the `Addr`s and counts the elimination in `Stats`).

mod common;

use cranelift_entity::EntityRef;
use polysched::host::AliasQuery;
use polysched::ir::{ArrayId, Cache};
use polysched::schedule::{add_scheduled_node, LoopBlock, ScheduledNode, ScheduledNodeId};
use polysched::{deps::Dependencies, Config, Stats};

struct OnlyArrayIsRemovable(ArrayId);

impl AliasQuery<ArrayId> for OnlyArrayIsRemovable {
    fn is_non_escaping_local_object(&self, array: ArrayId) -> bool {
        array == self.0
    }
    fn is_removable_alloc(&self, array: ArrayId) -> bool {
        array == self.0
    }
}

#[test]
fn unread_local_buffer_is_dropped_by_elimination() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();
    let config = Config::default();

    let loop_handle = common::push_flat_loop(&mut cache, 64);

    let tmp = ArrayId::new(0);

    // `tmp[i] = <something>`: no load feeds the store in this fixture, so
    // `tmp_store` is the whole chain (`stored_value` stays `None`, matching
    // a store whose value comes from outside any tracked load).
    let tmp_store = common::push_1d_addr(&mut cache, tmp, loop_handle, true, 1, 0, 0);

    let mut attached = std::collections::HashSet::new();
    let mut nodes: cranelift_entity::PrimaryMap<ScheduledNodeId, ScheduledNode> = cranelift_entity::PrimaryMap::new();
    nodes.push(add_scheduled_node(&mut cache, &mut deps, &mut stats, &mut attached, tmp_store));

    let block = LoopBlock::new(&mut cache, &mut deps, &config, &mut stats, nodes);
    let result = block.optimize();

    let alias_query = OnlyArrayIsRemovable(tmp);
    let program = polysched::reconstruct::optimize_with_alias_query(&mut cache, &mut deps, &mut stats, result, &alias_query);

    assert_eq!(program.roots.len(), 1);
    assert!(cache.addrs[tmp_store].dropped, "the only access to `tmp` has no consumer after the loop and should be eliminated");
    assert_eq!(stats.temporaries_eliminated, 1);
}

//! `Dependencies`: the structure-of-arrays table of dependence edges.
//!
//! A literal `ManagedSOA<Tuple>` realization: `DepEdge`'s fields live in one
//! `PrimaryMap<DepId, DepEdge>` rather than being split into one `PrimaryMap`
//! per column, because `cranelift_entity::PrimaryMap` already gives us O(1)
//! push/index without per-field bookkeeping, and every field of `DepEdge` is
//! always read/written together at each call site in this module. The
//! structure-of-arrays framing from the distilled spec is preserved at the
//! *ownership* level (the table, not the `Addr`, owns the edge), which is
//! the property the rest of the engine actually relies on.

use cranelift_entity::{EntityRef, PrimaryMap};
use log::{debug, trace};

use crate::deppoly::DepPoly;
use crate::deps::edge::{DepEdge, DepId, DepMeta, SatLevel, NO_EDGE, PEEL_NONE};
use crate::ir::{Addr, AddrId, Cache};
use crate::stats::Stats;

#[derive(Default)]
pub struct Dependencies {
    edges: PrimaryMap<DepId, DepEdge>,
}

impl Dependencies {
    pub fn new() -> Self {
        Dependencies {
            edges: PrimaryMap::new(),
        }
    }

    pub fn get(&self, id: DepId) -> &DepEdge {
        &self.edges[id]
    }

    /// Every edge id currently in the table, dropped or not. Used by the
    /// position & legality pass, which needs to visit every edge once to
    /// bucket it by the loop level that satisfied it.
    pub fn all_ids(&self) -> impl Iterator<Item = DepId> + '_ {
        self.edges.keys()
    }

    pub fn get_mut(&mut self, id: DepId) -> &mut DepEdge {
        &mut self.edges[id]
    }

    pub fn get_meta(&self, id: DepId) -> DepMeta {
        self.edges[id].meta
    }

    pub fn set_sat_level_lp(&mut self, id: DepId, depth: u8) {
        let e = &mut self.edges[id];
        e.sat_level = SatLevel::at_depth(depth, true);
    }

    pub fn set_sat_level_parallel(&mut self, id: DepId, depth: u8) {
        let e = &mut self.edges[id];
        e.sat_level = SatLevel::at_depth(depth, false);
    }

    pub fn stash_sat_level(&mut self, id: DepId) {
        let e = &mut self.edges[id];
        e.stashed_sat_level = e.sat_level;
    }

    pub fn restore_sat_level(&mut self, id: DepId) {
        let e = &mut self.edges[id];
        e.sat_level = e.stashed_sat_level;
    }

    /// Build a `DepPoly` for `(x, y)`, compute its Farkas pair, decide the
    /// happens-before direction from current `fusion_omega` tuples, then
    /// link the edge(s) into both addresses' chains.
    ///
    /// Returns the ids of every edge created: exactly one for a time-dim-0
    /// dependence, or one forward plus one reverse-time edge per time
    /// dimension otherwise.
    pub fn check(&mut self, cache: &mut Cache, x: AddrId, y: AddrId, stats: &mut Stats) -> Vec<DepId> {
        trace!("Dependencies::check({x:?}, {y:?})");
        let dep_poly = match DepPoly::dependence(cache, &cache.addrs[x], &cache.addrs[y]) {
            Some(p) => p,
            None => return Vec::new(),
        };

        let (forward_first, _) = self.check_direction(cache, x, y);
        let (input, output) = if forward_first { (x, y) } else { (y, x) };
        // `dep_poly` was built from the original `(x, y)` pair, so `dim0`
        // is `x`; `input` is `x` exactly when `forward_first`.
        let dim0_is_input = forward_first;

        stats.dep_checks += 1;

        if dep_poly.time_dim == 0 {
            let id = self.add_ordered(cache, input, output, dep_poly, dim0_is_input, stats);
            vec![id]
        } else {
            self.time_check(cache, input, output, dep_poly, dim0_is_input, stats)
        }
    }

    /// Iterate the common depth comparing `fusion_omega`; at the first
    /// difference the lexicographically-smaller side is the predecessor. If
    /// equal through the common depth, the deeper instruction's
    /// `fusion_omega` breaks the tie. Returns `(x_is_predecessor, equal)`.
    pub fn check_direction(&self, cache: &Cache, x: AddrId, y: AddrId) -> (bool, bool) {
        let xo = &cache.addrs[x].access.fusion_omega;
        let yo = &cache.addrs[y].access.fusion_omega;
        let common = xo.len().min(yo.len());
        for i in 0..common {
            if xo[i] != yo[i] {
                return (xo[i] < yo[i], false);
            }
        }
        if xo.len() != yo.len() {
            return (xo.len() < yo.len(), false);
        }
        (true, true)
    }

    fn add_ordered(
        &mut self,
        cache: &mut Cache,
        input: AddrId,
        output: AddrId,
        dep_poly: DepPoly,
        dim0_is_input: bool,
        _stats: &mut Stats,
    ) -> DepId {
        let (sat_simplex, bnd_simplex) = dep_poly.farkas_pair();
        let id = self.edges.push(DepEdge {
            input,
            output,
            dim0_is_input,
            dep_poly,
            sat_simplex,
            bnd_simplex,
            next_out: NO_EDGE,
            prev_out: NO_EDGE,
            next_in: NO_EDGE,
            prev_in: NO_EDGE,
            rev_time_edge: NO_EDGE,
            sat_level: SatLevel::UNSATISFIED,
            stashed_sat_level: SatLevel::UNSATISFIED,
            meta: {
                let mut m = DepMeta::default();
                m.set(DepMeta::FORWARD);
                m
            },
            peel: PEEL_NONE,
        });
        self.link_out(cache, input, id);
        self.link_in(cache, output, id);
        id
    }

    fn time_check(
        &mut self,
        cache: &mut Cache,
        input: AddrId,
        output: AddrId,
        dep_poly: DepPoly,
        dim0_is_input: bool,
        stats: &mut Stats,
    ) -> Vec<DepId> {
        debug!("time_check: {} time dimensions", dep_poly.time_dim);
        let forward_id = self.add_ordered(cache, input, output, dep_poly.clone(), dim0_is_input, stats);

        let mut ids = vec![forward_id];
        for _ in 0..dep_poly.time_dim {
            let (sat_simplex, bnd_simplex) = dep_poly.farkas_pair();
            let rev_id = self.edges.push(DepEdge {
                input: output,
                output: input,
                // The reverse-time edge swaps input/output relative to the
                // same `dep_poly`, so dim0's side flips too.
                dim0_is_input: !dim0_is_input,
                dep_poly: dep_poly.clone(),
                sat_simplex,
                bnd_simplex,
                next_out: NO_EDGE,
                prev_out: NO_EDGE,
                next_in: NO_EDGE,
                prev_in: NO_EDGE,
                rev_time_edge: forward_id.index() as i32,
                sat_level: SatLevel::UNSATISFIED,
                stashed_sat_level: SatLevel::UNSATISFIED,
                meta: {
                    let mut m = DepMeta::default();
                    m.set(DepMeta::REVERSE_TIME);
                    m
                },
                peel: PEEL_NONE,
            });
            self.edges[forward_id].rev_time_edge = rev_id.index() as i32;
            self.link_out(cache, output, rev_id);
            self.link_in(cache, input, rev_id);
            ids.push(rev_id);
        }
        ids
    }

    fn link_out(&mut self, cache: &mut Cache, addr: AddrId, id: DepId) {
        let head = cache.addrs[addr].edge_out;
        self.edges[id].next_out = head;
        self.edges[id].prev_out = NO_EDGE;
        if head != NO_EDGE {
            self.edges[DepId::from_u32(head as u32)].prev_out = id.index() as i32;
        }
        cache.addrs[addr].edge_out = id.index() as i32;
    }

    fn link_in(&mut self, cache: &mut Cache, addr: AddrId, id: DepId) {
        let head = cache.addrs[addr].edge_in;
        self.edges[id].next_in = head;
        self.edges[id].prev_in = NO_EDGE;
        if head != NO_EDGE {
            self.edges[DepId::from_u32(head as u32)].prev_in = id.index() as i32;
        }
        cache.addrs[addr].edge_in = id.index() as i32;
    }

    /// Unlink an edge from its two adjacency chains, patching `Addr.edge_in`
    /// / `Addr.edge_out` if they pointed at it. `in_?`/`out_?` select which
    /// chain(s) to patch, since a caller may already know one endpoint was
    /// dropped separately.
    pub fn remove_edge(&mut self, cache: &mut Cache, id: DepId, patch_in: bool, patch_out: bool) {
        let (input, output, next_out, prev_out, next_in, prev_in) = {
            let e = &self.edges[id];
            (e.input, e.output, e.next_out, e.prev_out, e.next_in, e.prev_in)
        };

        if patch_out {
            if prev_out != NO_EDGE {
                self.edges[DepId::from_u32(prev_out as u32)].next_out = next_out;
            } else {
                cache.addrs[input].edge_out = next_out;
            }
            if next_out != NO_EDGE {
                self.edges[DepId::from_u32(next_out as u32)].prev_out = prev_out;
            }
        }
        if patch_in {
            if prev_in != NO_EDGE {
                self.edges[DepId::from_u32(prev_in as u32)].next_in = next_in;
            } else {
                cache.addrs[output].edge_in = next_in;
            }
            if next_in != NO_EDGE {
                self.edges[DepId::from_u32(next_in as u32)].prev_in = prev_in;
            }
        }
    }

    /// Re-point an edge's input and/or output endpoint onto a different
    /// `Addr`, unlinking it from the old endpoint's adjacency chain and
    /// relinking it onto the new one. Used by CSE merges (`IROptimizer::
    /// prune_redundant_addrs`) to redirect a dropped address's edges onto
    /// the address it was folded into, without disturbing the edge's
    /// `dep_poly`/`sat_level`.
    pub fn rebind(&mut self, cache: &mut Cache, id: DepId, new_input: Option<AddrId>, new_output: Option<AddrId>) {
        if let Some(new_input) = new_input {
            self.remove_edge(cache, id, false, true);
            self.edges[id].input = new_input;
            self.link_out(cache, new_input, id);
        }
        if let Some(new_output) = new_output {
            self.remove_edge(cache, id, true, false);
            self.edges[id].output = new_output;
            self.link_in(cache, new_output, id);
        }
    }

    /// Clone `store`'s `Addr` into a load at the same place, duplicating its
    /// outbound dependency chain onto the new load and adding a
    /// self-dependence from the original store to the reload. Used to break
    /// transitively-shared load chains that crossed code motion
    /// (`ScheduledNode::add_scheduled_node`).
    pub fn reload(&mut self, cache: &mut Cache, store: AddrId, stats: &mut Stats) -> AddrId {
        debug!("Dependencies::reload({store:?})");
        let mut cloned: Addr = cache.addrs[store].clone();
        cloned.is_store = false;
        cloned.stored_value = None;
        cloned.is_reload = true;
        cloned.reload_source = Some(store);
        cloned.edge_in = NO_EDGE;
        cloned.edge_out = NO_EDGE;
        cloned.prev = None;
        cloned.next = None;
        let reload_id = cache.push_addr(cloned);

        // Duplicate the store's outgoing edges onto the reload: each
        // downstream consumer of the store's value now also depends on the
        // reload reading back what the store just wrote.
        let mut cursor = cache.addrs[store].edge_out;
        let mut to_duplicate = Vec::new();
        while cursor != NO_EDGE {
            let id = DepId::from_u32(cursor as u32);
            to_duplicate.push(id);
            cursor = self.edges[id].next_out;
        }
        for id in to_duplicate {
            let dep_poly = self.edges[id].dep_poly.clone();
            let output = self.edges[id].output;
            // `reload_id` takes over `store`'s positional slot in the
            // duplicated edge, so dim0's side is unchanged from the
            // original edge.
            let dim0_is_input = self.edges[id].dim0_is_input;
            self.add_ordered(cache, reload_id, output, dep_poly, dim0_is_input, stats);
        }

        // Self-dependence: store happens-before reload at the innermost
        // shared depth.
        if let Some(dep_poly) = DepPoly::dependence(cache, &cache.addrs[store], &cache.addrs[reload_id]) {
            // Built from (store, reload_id), so dim0 is store = input.
            self.add_ordered(cache, store, reload_id, dep_poly, true, stats);
        }

        reload_id
    }

    pub fn input_edges<'a>(&'a self, cache: &'a Cache, addr: AddrId) -> EdgeChainIter<'a> {
        EdgeChainIter {
            edges: &self.edges,
            cursor: cache.addrs[addr].edge_in,
            via_in: true,
        }
    }

    pub fn output_edges<'a>(&'a self, cache: &'a Cache, addr: AddrId) -> EdgeChainIter<'a> {
        EdgeChainIter {
            edges: &self.edges,
            cursor: cache.addrs[addr].edge_out,
            via_in: false,
        }
    }

    pub fn output_edges_at_depth<'a>(
        &'a self,
        cache: &'a Cache,
        addr: AddrId,
        depth: u8,
    ) -> impl Iterator<Item = DepId> + 'a {
        self.output_edges(cache, addr)
            .filter(move |&id| self.edges[id].sat_level.depth().map_or(true, |d| d >= depth))
    }

    pub fn unhoistable_outputs<'a>(&'a self, cache: &'a Cache, addr: AddrId, depth: u8) -> impl Iterator<Item = DepId> + 'a {
        self.output_edges_at_depth(cache, addr, depth)
            .filter(move |&id| !self.edges[id].meta.contains(DepMeta::REGISTER_ELIGIBLE))
    }

    /// Returns `Some(loop_idx)` iff exactly one of `{input, output}` depends
    /// on `target_loop_var`'s induction variable AND the other has a
    /// nonzero component at a deeper-indexed loop. Otherwise `None`.
    /// Updates `peel` on the edge.
    ///
    /// We do not emit a force-scalarization flag for inner dependencies
    /// that prevent hoisting; we simply return `None` for them rather than
    /// inventing a richer classification.
    pub fn determine_peel_depth(&mut self, cache: &Cache, id: DepId, target_loop_var: usize) -> Option<usize> {
        let e = &self.edges[id];
        let input_loop = cache.addrs[e.input].loopdeps;
        let output_loop = cache.addrs[e.output].loopdeps;

        let input_depends = input_loop.contains(target_loop_var as u8);
        let output_depends = output_loop.contains(target_loop_var as u8);

        let result = if input_depends != output_depends {
            let deeper = if input_depends { output_loop } else { input_loop };
            let has_deeper = (target_loop_var as u8 + 1..32).any(|d| deeper.contains(d));
            if has_deeper {
                Some(target_loop_var)
            } else {
                None
            }
        } else {
            None
        };

        let e = &mut self.edges[id];
        e.peel = result.map(|d| d as u8).unwrap_or(PEEL_NONE);
        result
    }
}

pub struct EdgeChainIter<'a> {
    edges: &'a PrimaryMap<DepId, DepEdge>,
    cursor: i32,
    via_in: bool,
}

impl<'a> Iterator for EdgeChainIter<'a> {
    type Item = DepId;

    fn next(&mut self) -> Option<DepId> {
        if self.cursor == NO_EDGE {
            return None;
        }
        let id = DepId::from_u32(self.cursor as u32);
        self.cursor = if self.via_in {
            self.edges[id].next_in
        } else {
            self.edges[id].next_out
        };
        Some(id)
    }
}

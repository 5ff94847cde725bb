//! The ILP recursion: `optimize -> solve_graph -> break_graph ->
//! optimize_sat_dep -> try_fuse`.

use cranelift_entity::PrimaryMap;
use log::{debug, trace};
use num_rational::Ratio;

use crate::config::Config;
use crate::deps::{DepId, Dependencies};
use crate::fx::FxHashMap;
use crate::ir::{AddrId, Cache};
use crate::linalg::{self, Matrix};
use crate::schedule::scheduled_node::{ScheduledNode, ScheduledNodeId};
use crate::schedule::stash::Stash;
use crate::simplex::{SimplexOutcome, Tableau};
use crate::stats::Stats;

/// Outcome of a single-depth solve attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Failure,
    Dependent,
    Independent,
}

impl Outcome {
    fn combine(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Failure, _) | (_, Outcome::Failure) => Outcome::Failure,
            (Outcome::Dependent, _) | (_, Outcome::Dependent) => Outcome::Dependent,
            _ => Outcome::Independent,
        }
    }
}

pub struct OptimizationResult {
    pub addr_chain: Vec<AddrId>,
    pub nodes: PrimaryMap<ScheduledNodeId, ScheduledNode>,
}

pub struct LoopBlock<'a> {
    cache: &'a mut Cache,
    deps: &'a mut Dependencies,
    config: &'a Config,
    stats: &'a mut Stats,
    nodes: PrimaryMap<ScheduledNodeId, ScheduledNode>,
    stash: Stash,
}

impl<'a> LoopBlock<'a> {
    pub fn new(
        cache: &'a mut Cache,
        deps: &'a mut Dependencies,
        config: &'a Config,
        stats: &'a mut Stats,
        nodes: PrimaryMap<ScheduledNodeId, ScheduledNode>,
    ) -> Self {
        LoopBlock {
            cache,
            deps,
            config,
            stats,
            nodes,
            stash: Stash::new(),
        }
    }

    pub fn optimize(mut self) -> OptimizationResult {
        let max_depth = self
            .nodes
            .values()
            .map(|n| n.num_loops)
            .max()
            .unwrap_or(0)
            .min(self.config.max_depth);

        let node_ids: Vec<ScheduledNodeId> = self.nodes.keys().collect();
        for &nid in &node_ids {
            crate::schedule::scheduled_node::shift_omega(self.cache, self.stats, &mut self.nodes[nid]);
        }

        let _ = self.optimize_depth(&node_ids, 0, max_depth);

        let addr_chain = self.nodes.values().map(|n| n.store).collect();
        OptimizationResult {
            addr_chain,
            nodes: self.nodes,
        }
    }

    fn optimize_depth(&mut self, active: &[ScheduledNodeId], d: usize, max_depth: usize) -> Outcome {
        if d >= max_depth {
            return Outcome::Independent;
        }
        trace!("optimize_depth(d={d}, nodes={})", active.len());

        let r = self.solve_graph(active, d, false);
        match r {
            Outcome::Failure => self.break_graph(active, d, max_depth),
            _ => {
                let n = self.optimize_depth(active, d + 1, max_depth);
                match n {
                    Outcome::Failure => self.break_graph(active, d, max_depth),
                    _ => {
                        if r == Outcome::Dependent && n == Outcome::Dependent {
                            self.optimize_sat_dep(active, d, max_depth)
                        } else {
                            r.combine(n)
                        }
                    }
                }
            }
        }
    }

    /// Build a per-depth feasibility/decode pass: for every active node not
    /// yet scheduled at depth `d`, run the omni-simplex (`solve_phi_rows_via_
    /// omni_simplex`) to find a Φ row independent of already-fixed rows (the
    /// independence-solution constraint) such that every edge still active
    /// between nodes at this depth is satisfiable under the resulting
    /// candidate schedule, then re-verify the decoded rows against each
    /// edge's own `sat_simplex`/`bnd_simplex` via `check_candidate_legal`.
    fn solve_graph(&mut self, active: &[ScheduledNodeId], d: usize, satisfy_deps: bool) -> Outcome {
        self.stash.push_mark();

        let mut unranked: Vec<ScheduledNodeId> = Vec::new();
        for &nid in active {
            let node = &self.nodes[nid];
            if node.rank <= d {
                self.stash.save_phi(nid, node.phi.clone(), node.fusion_omega.clone());
                unranked.push(nid);
            }
        }

        let edge_ids = self.active_edges(active, d as u8);
        for id in &edge_ids {
            self.stash.save_sat(*id, self.deps.get(*id).sat_level);
        }

        if !self.solve_phi_rows_via_omni_simplex(&unranked, d, &edge_ids) {
            self.stash.pop_to_mark(&mut self.nodes, self.deps);
            return Outcome::Failure;
        }
        if !self.check_candidate_legal(&edge_ids, d, satisfy_deps) {
            self.stash.pop_to_mark(&mut self.nodes, self.deps);
            return Outcome::Failure;
        }

        for &nid in &unranked {
            let node = &mut self.nodes[nid];
            node.rank = node.rank.max(d + 1);
        }

        let mut any_dependent = false;
        for id in &edge_ids {
            self.stats.simplex_pivots += 1;
            if satisfy_deps || self.edge_bound_closed(*id, d) {
                self.deps.set_sat_level_lp(*id, d as u8);
                any_dependent = true;
            }
        }

        self.stash.commit_mark();
        if any_dependent {
            Outcome::Dependent
        } else {
            Outcome::Independent
        }
    }

    /// Build the per-depth omni-simplex and run a lex-min pass over it to
    /// decode one Φ row per not-yet-ranked node that still has a loop at
    /// depth `d` (a node with fewer loops keeps its existing all-zero row).
    ///
    /// Variables: a node-shared, split-sign (pos/neg pair, since this
    /// tableau's structural columns are otherwise implicitly `>= 0`) Φ-row
    /// per free node, plus per-edge lambda (one per Farkas `A`-row, already
    /// nonnegative), split-sign mu (one per Farkas `E`-row) and a split-sign
    /// omega scalar. For every active edge whose two endpoints' loop counts
    /// match its `dep_poly`'s `dim0`/`dim1`, one equality row per structural
    /// column (constant, x/y loop-variable, dynamic-symbol — matching
    /// `DepPoly::farkas_pair`'s own column set) enforces `lambda.A + mu.E =
    /// delta_phi` against whichever of the two endpoints is free (fixed
    /// endpoints contribute their already-decided row as a constant
    /// instead). One independence-solution row per free node forces its new
    /// row to carry a component outside the span of its own previously
    /// fixed rows: a direct `sum(row) >= 1` at `d == 0`, or at `d > 0` a
    /// `sum(null_space(prior_rows)) . row >= 1`.
    ///
    /// `solve_lexmin` prioritizes the lambda columns, edge by edge, in
    /// `edge_ids` order; the leading "C" cost-modeling column this engine's
    /// omni-simplex would otherwise begin with is omitted, since cost
    /// modeling is out of scope here. Returns `false` (no candidate) if the
    /// combined system is infeasible, or if some free node's prior rows
    /// already span its whole loop space (no independent row remains to
    /// find); `solve_graph` still re-verifies the decoded rows against each
    /// edge's own cached `sat_simplex`/`bnd_simplex` afterward.
    fn solve_phi_rows_via_omni_simplex(&mut self, unranked: &[ScheduledNodeId], d: usize, edge_ids: &[DepId]) -> bool {
        let free_nodes: Vec<ScheduledNodeId> = unranked.iter().copied().filter(|&nid| d < self.nodes[nid].num_loops).collect();
        if free_nodes.is_empty() {
            return true;
        }

        struct NodeCols {
            phi_pos: usize,
            phi_neg: usize,
            num_loops: usize,
        }
        let mut node_cols: FxHashMap<ScheduledNodeId, NodeCols> = FxHashMap::default();
        let mut width = 0usize;
        for &nid in &free_nodes {
            let num_loops = self.nodes[nid].num_loops;
            let phi_pos = width;
            width += num_loops;
            let phi_neg = width;
            width += num_loops;
            node_cols.insert(nid, NodeCols { phi_pos, phi_neg, num_loops });
        }

        // Only edges whose endpoints' node-level loop counts match the
        // edge's own `dim0`/`dim1` can be tied to the shared Φ-row columns
        // above; a mismatch is left out of the omni-simplex entirely, same
        // as `check_edge_feasible`/`edge_bound_closed` trivially pass it.
        let mut usable_edges: Vec<(DepId, ScheduledNodeId, ScheduledNodeId)> = Vec::new();
        for &id in edge_ids {
            let edge = self.deps.get(id);
            let Some(input_nid) = self.node_for_addr(edge.input) else { continue };
            let Some(output_nid) = self.node_for_addr(edge.output) else { continue };
            let (x_nid, y_nid) = if edge.dim0_is_input { (input_nid, output_nid) } else { (output_nid, input_nid) };
            if self.nodes[x_nid].num_loops != edge.dep_poly.dim0 || self.nodes[y_nid].num_loops != edge.dep_poly.dim1 {
                continue;
            }
            usable_edges.push((id, x_nid, y_nid));
        }

        struct EdgeCols {
            lambda: usize,
            lambda_dim: usize,
            mu_pos: usize,
            mu_neg: usize,
            omega_pos: usize,
            omega_neg: usize,
        }
        let mut edge_cols: FxHashMap<DepId, EdgeCols> = FxHashMap::default();
        for &(id, ..) in &usable_edges {
            let edge = self.deps.get(id);
            let lambda_dim = edge.dep_poly.a.rows();
            let mu_dim = edge.dep_poly.e.rows();
            let lambda = width;
            width += lambda_dim;
            let mu_pos = width;
            width += mu_dim;
            let mu_neg = width;
            width += mu_dim;
            let omega_pos = width;
            width += 1;
            let omega_neg = width;
            width += 1;
            edge_cols.insert(id, EdgeCols { lambda, lambda_dim, mu_pos, mu_neg, omega_pos, omega_neg });
        }

        let mut tableau = Tableau::new(width);

        for &(id, x_nid, y_nid) in &usable_edges {
            let edge = self.deps.get(id);
            let dep_poly = &edge.dep_poly;
            let ec = &edge_cols[&id];
            let var_off = 1 + dep_poly.dyn_syms.len();
            let dim0 = dep_poly.dim0;
            let dim1 = dep_poly.dim1;
            let num_syms = dep_poly.dyn_syms.len();

            let x_free = node_cols.get(&x_nid);
            let y_free = node_cols.get(&y_nid);
            let x_fixed_row = if x_free.is_none() { Some(self.phi_row_at(x_nid, d)) } else { None };
            let y_fixed_row = if y_free.is_none() { Some(self.phi_row_at(y_nid, d)) } else { None };

            for col in 0..(1 + dim0 + dim1) {
                let real_col = if col == 0 { 0 } else { var_off + col - 1 };
                let mut coeffs = vec![0i64; width];
                let mut constant = 0i64;
                for (r, row) in dep_poly.a.iter_rows().enumerate() {
                    coeffs[ec.lambda + r] = row[real_col];
                }
                for (r, row) in dep_poly.e.iter_rows().enumerate() {
                    let v = row[real_col];
                    coeffs[ec.mu_pos + r] = v;
                    coeffs[ec.mu_neg + r] = -v;
                }
                if col == 0 {
                    coeffs[ec.omega_pos] += -1;
                    coeffs[ec.omega_neg] += 1;
                } else if col - 1 < dim0 {
                    let k = col - 1;
                    if let Some(nc) = x_free {
                        coeffs[nc.phi_pos + k] += -1;
                        coeffs[nc.phi_neg + k] += 1;
                    } else {
                        constant += x_fixed_row.as_ref().unwrap()[k];
                    }
                } else {
                    let k = col - 1 - dim0;
                    if let Some(nc) = y_free {
                        coeffs[nc.phi_pos + k] += 1;
                        coeffs[nc.phi_neg + k] += -1;
                    } else {
                        constant += -y_fixed_row.as_ref().unwrap()[k];
                    }
                }
                tableau.add_eq_row(constant, &coeffs);
            }

            // Dynamic-symbol columns carry no delta_phi target; the
            // combination must simply cancel there too.
            for s in 0..num_syms {
                let real_col = 1 + s;
                let mut coeffs = vec![0i64; width];
                for (r, row) in dep_poly.a.iter_rows().enumerate() {
                    coeffs[ec.lambda + r] = row[real_col];
                }
                for (r, row) in dep_poly.e.iter_rows().enumerate() {
                    let v = row[real_col];
                    coeffs[ec.mu_pos + r] = v;
                    coeffs[ec.mu_neg + r] = -v;
                }
                tableau.add_eq_row(0, &coeffs);
            }
        }

        for &nid in &free_nodes {
            let nc = &node_cols[&nid];
            let node = &self.nodes[nid];
            let mut s = vec![0i64; nc.num_loops];
            if d == 0 {
                s.iter_mut().for_each(|v| *v = 1);
            } else {
                let prior_rows = d.min(node.phi.rows());
                let mut prior = Matrix::zeros(prior_rows, nc.num_loops);
                for r in 0..prior_rows {
                    prior.row_mut(r).copy_from_slice(node.phi.row(r));
                }
                let ns = linalg::null_space(&prior);
                if ns.rows() == 0 {
                    // Already full rank: no row remains that's independent
                    // of the ones this node already has fixed.
                    return false;
                }
                for r in 0..ns.rows() {
                    for k in 0..nc.num_loops {
                        s[k] += ns.row(r)[k];
                    }
                }
            }
            let mut coeffs = vec![0i64; width];
            for k in 0..nc.num_loops {
                coeffs[nc.phi_pos + k] = s[k];
                coeffs[nc.phi_neg + k] = -s[k];
            }
            tableau.add_ge_row(-1, &coeffs);
        }

        let mut priority: Vec<usize> = Vec::new();
        for &(id, ..) in &usable_edges {
            let ec = &edge_cols[&id];
            for r in 0..ec.lambda_dim {
                priority.push(ec.lambda + r);
            }
        }

        let Some(solution) = tableau.solve_lexmin(&priority, self.stats) else {
            return false;
        };

        for &nid in &free_nodes {
            let nc = &node_cols[&nid];
            let mut row: Vec<Ratio<i64>> = vec![Ratio::from_integer(0); nc.num_loops];
            for k in 0..nc.num_loops {
                row[k] = solution[nc.phi_pos + k] - solution[nc.phi_neg + k];
            }
            let denom_lcm = row.iter().fold(1i64, |acc, r| linalg::lcm(acc, *r.denom()));
            let int_row: Vec<i64> = row.iter().map(|r| (r * Ratio::from_integer(denom_lcm)).to_integer()).collect();
            self.nodes[nid].phi.row_mut(d).copy_from_slice(&int_row);
        }

        true
    }

    fn check_candidate_legal(&mut self, edge_ids: &[DepId], d: usize, satisfy_deps: bool) -> bool {
        for &id in edge_ids {
            self.stats.simplex_pivots += 1;
            if !self.check_edge_feasible(id, d) {
                return false;
            }
            if satisfy_deps && !self.edge_bound_closed(id, d) {
                return false;
            }
        }
        true
    }

    fn node_for_addr(&self, addr: AddrId) -> Option<ScheduledNodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.store == addr || n.loads.contains(&addr))
            .map(|(id, _)| id)
    }

    /// The candidate row currently assigned at depth `d`, or an all-zero row
    /// if `d` is outside this node's rank (not yet assigned in this search)
    /// or depth.
    fn phi_row_at(&self, nid: ScheduledNodeId, d: usize) -> Vec<i64> {
        let node = &self.nodes[nid];
        if d < node.phi.rows() {
            node.phi.row(d).to_vec()
        } else {
            vec![0i64; node.num_loops]
        }
    }

    /// The two endpoint nodes' depth-`d` candidate rows, ordered `(x, y)` to
    /// match `dep_poly`'s own `dim0`/`dim1` via `edge.dim0_is_input`.
    fn candidate_rows(&self, id: DepId, d: usize) -> Option<(Vec<i64>, Vec<i64>)> {
        let edge = self.deps.get(id);
        let input_nid = self.node_for_addr(edge.input)?;
        let output_nid = self.node_for_addr(edge.output)?;
        let input_row = self.phi_row_at(input_nid, d);
        let output_row = self.phi_row_at(output_nid, d);
        let (x_row, y_row) = if edge.dim0_is_input {
            (input_row, output_row)
        } else {
            (output_row, input_row)
        };
        Some((x_row, y_row))
    }

    fn check_edge_feasible(&mut self, id: DepId, d: usize) -> bool {
        let Some((x_row, y_row)) = self.candidate_rows(id, d) else {
            return true;
        };
        let edge = self.deps.get(id);
        let dep_poly = &edge.dep_poly;
        if x_row.len() != dep_poly.dim0 || y_row.len() != dep_poly.dim1 {
            return true;
        }
        let mut sat = edge.sat_simplex.clone();
        clamp_phi(&mut sat, dep_poly.phi_x_offset(), &x_row);
        clamp_phi(&mut sat, dep_poly.phi_y_offset(), &y_row);
        sat.solve_feasibility(self.stats) == SimplexOutcome::Feasible
    }

    fn edge_bound_closed(&mut self, id: DepId, d: usize) -> bool {
        let Some((x_row, y_row)) = self.candidate_rows(id, d) else {
            return false;
        };
        let edge = self.deps.get(id);
        let dep_poly = &edge.dep_poly;
        if x_row.len() != dep_poly.dim0 || y_row.len() != dep_poly.dim1 {
            return false;
        }
        let mut bnd = edge.bnd_simplex.clone();
        clamp_phi(&mut bnd, dep_poly.phi_x_offset(), &x_row);
        clamp_phi(&mut bnd, dep_poly.phi_y_offset(), &y_row);
        bnd.solve_feasibility(self.stats) == SimplexOutcome::Infeasible
    }

    fn active_edges(&self, active: &[ScheduledNodeId], depth: u8) -> Vec<DepId> {
        let mut ids = Vec::new();
        for &nid in active {
            let node = &self.nodes[nid];
            for &load in node.loads.iter().chain(std::iter::once(&node.store)) {
                for id in self.deps.output_edges_at_depth(self.cache, load, depth) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    fn optimize_sat_dep(&mut self, active: &[ScheduledNodeId], d: usize, max_depth: usize) -> Outcome {
        debug!("optimize_sat_dep(d={d})");
        self.stash.push_mark();
        let r = self.solve_graph(active, d, true);
        if r == Outcome::Failure {
            self.stash.pop_to_mark(&mut self.nodes, self.deps);
            return self.break_graph(active, d, max_depth);
        }
        self.stash.commit_mark();
        r.combine(self.optimize_depth(active, d + 1, max_depth))
    }

    /// The graph could not be solved at depth `d`: Tarjan-SCC-split the
    /// still-active subgraph, solve each SCC independently, then greedily
    /// `try_fuse` topologically adjacent SCCs.
    fn break_graph(&mut self, active: &[ScheduledNodeId], d: usize, max_depth: usize) -> Outcome {
        debug!("break_graph(d={d}, nodes={})", active.len());
        self.stats.scc_splits += 1;
        let components = self.tarjan_scc(active, d as u8);

        if components.len() <= 1 {
            // A single irreducible SCC: no further splitting is possible,
            // fail outward rather than looping forever.
            for &nid in active {
                self.nodes[nid].fusion_omega[d] += 1;
            }
            return Outcome::Failure;
        }

        let mut result = Outcome::Independent;
        let mut prev_component: Option<Vec<ScheduledNodeId>> = None;
        for component in components {
            let r = self.optimize_depth(&component, d + 1, max_depth);
            result = result.combine(r);

            if let Some(prev) = prev_component.take() {
                self.stats.fuse_attempts += 1;
                if !self.try_fuse(&prev, &component, d, max_depth) {
                    for &nid in &component {
                        self.nodes[nid].fusion_omega[d] += 1;
                    }
                }
            }
            prev_component = Some(component);
        }

        result
    }

    /// Stash schedules and sat levels of both components, fuse their vertex
    /// chains, re-solve, and restore on failure.
    fn try_fuse(&mut self, a: &[ScheduledNodeId], b: &[ScheduledNodeId], d: usize, max_depth: usize) -> bool {
        if !self.fusion_widen_is_free(a, b, d) {
            return false;
        }

        self.stash.push_mark();
        let mut merged: Vec<ScheduledNodeId> = a.to_vec();
        merged.extend_from_slice(b);

        let r = self.optimize_depth(&merged, d, max_depth);
        if r == Outcome::Failure {
            self.stash.pop_to_mark(&mut self.nodes, self.deps);
            false
        } else {
            self.stash.commit_mark();
            self.stats.fuse_successes += 1;
            true
        }
    }

    /// Fusing `a` and `b` at depth `d` requires every member's loop at this
    /// depth to share one trip count; a member whose own trip count is
    /// smaller than the fused maximum must have its range widened to match.
    /// That widening is only semantics-preserving if the extra iterations it
    /// adds are all dead (`AffineLoop::zero_extra_iters_upon_extending`);
    /// otherwise fusing here would run live iterations that didn't exist in
    /// the original schedule, so refuse the fusion rather than attempt it.
    fn fusion_widen_is_free(&mut self, a: &[ScheduledNodeId], b: &[ScheduledNodeId], d: usize) -> bool {
        let members: Vec<ScheduledNodeId> = a.iter().chain(b.iter()).copied().collect();

        let mut max_trip: Option<u64> = None;
        let mut trips: Vec<(ScheduledNodeId, Option<u64>)> = Vec::with_capacity(members.len());
        for &nid in &members {
            let node = &self.nodes[nid];
            if d >= node.num_loops {
                trips.push((nid, None));
                continue;
            }
            let (exact, value) = self.cache.loops[node.loop_nest].trip_count(d);
            let v = exact.then_some(value);
            if let Some(v) = v {
                max_trip = Some(max_trip.map_or(v, |m| m.max(v)));
            }
            trips.push((nid, v));
        }

        let Some(max_trip) = max_trip else {
            // No member has a statically-known trip count at this depth;
            // nothing to widen against, so there's no free/not-free
            // distinction to make.
            return true;
        };

        for (nid, v) in trips {
            let Some(v) = v else { continue };
            if v == max_trip {
                continue;
            }
            let loop_handle = self.nodes[nid].loop_nest;
            // Widening always extends the upper bound to reach the fused
            // maximum; a loop whose own trip count is lower never needs its
            // lower bound pushed outward to line up with a sibling.
            if !self.cache.loops[loop_handle].zero_extra_iters_upon_extending(d, false, self.stats) {
                return false;
            }
        }
        true
    }

    fn tarjan_scc(&mut self, active: &[ScheduledNodeId], depth: u8) -> Vec<Vec<ScheduledNodeId>> {
        for &nid in active {
            let n = &mut self.nodes[nid];
            n.index = None;
            n.low_link = 0;
            n.on_stack = false;
        }

        let mut counter = 0u32;
        let mut stack: Vec<ScheduledNodeId> = Vec::new();
        let mut components: Vec<Vec<ScheduledNodeId>> = Vec::new();

        for &nid in active {
            if self.nodes[nid].index.is_none() {
                self.strong_connect(nid, active, depth, &mut counter, &mut stack, &mut components);
            }
        }
        components
    }

    fn strong_connect(
        &mut self,
        v: ScheduledNodeId,
        active: &[ScheduledNodeId],
        depth: u8,
        counter: &mut u32,
        stack: &mut Vec<ScheduledNodeId>,
        components: &mut Vec<Vec<ScheduledNodeId>>,
    ) {
        self.nodes[v].index = Some(*counter);
        self.nodes[v].low_link = *counter;
        *counter += 1;
        stack.push(v);
        self.nodes[v].on_stack = true;

        let successors = self.node_successors(v, active, depth);
        for w in successors {
            if self.nodes[w].index.is_none() {
                self.strong_connect(w, active, depth, counter, stack, components);
                self.nodes[v].low_link = self.nodes[v].low_link.min(self.nodes[w].low_link);
            } else if self.nodes[w].on_stack {
                self.nodes[v].low_link = self.nodes[v].low_link.min(self.nodes[w].index.unwrap());
            }
        }

        if self.nodes[v].low_link == self.nodes[v].index.unwrap() {
            let mut component = Vec::new();
            loop {
                let w = stack.pop().unwrap();
                self.nodes[w].on_stack = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            components.push(component);
        }
    }

    fn node_successors(&self, v: ScheduledNodeId, active: &[ScheduledNodeId], depth: u8) -> Vec<ScheduledNodeId> {
        let node = &self.nodes[v];
        let mut out = Vec::new();
        for &load in node.loads.iter().chain(std::iter::once(&node.store)) {
            for id in self.deps.output_edges_at_depth(self.cache, load, depth) {
                let target_addr = self.deps.get(id).output;
                if let Some(&target) = active.iter().find(|&&n| {
                    self.nodes[n].store == target_addr || self.nodes[n].loads.contains(&target_addr)
                }) {
                    if !out.contains(&target) {
                        out.push(target);
                    }
                }
            }
        }
        out
    }
}

/// Pin `tableau`'s structural variables `offset..offset+row.len()` to `row`,
/// i.e. add `var[offset+k] = row[k]` as an equality constraint for each `k`.
/// Used to turn a `DepEdge`'s schedule-independent `sat_simplex`/
/// `bnd_simplex` into a schedule-dependent feasibility query for one
/// candidate `phi_x`/`phi_y` row without mutating the edge's shared original.
fn clamp_phi(tableau: &mut Tableau, offset: usize, row: &[i64]) {
    let nvars = tableau.num_vars();
    for (k, &v) in row.iter().enumerate() {
        let mut coeffs = vec![0i64; nvars];
        coeffs[offset + k] = 1;
        tableau.add_eq_row(-v, &coeffs);
    }
}

//! The arena + entity-map bundle a single engine invocation allocates from.
//!
//! One bump arena plus one table per node kind, handed to both
//! `LoopBlock::optimize` and `IROptimizer::optimize` so a whole invocation
//! shares one arena generation. Arena-owned objects with no per-node
//! destructor becomes, in Rust, a `bumpalo::Bump` for any node payload that
//! genuinely
//! needs arena-lifetime borrows (array dimension lists, operand arrays) plus
//! `PrimaryMap`s of `Copy` structs for everything referenced by
//! `EntityRef` handles — which is everything in this crate, since a safe
//! raw pointer into a cyclic graph isn't expressible without unsafe code we
//! don't want here.

use core::marker::PhantomData;

use bumpalo::Bump;
use cranelift_entity::PrimaryMap;

use crate::affine_loop::AffineLoop;
use crate::ir::addr::Addr;
use crate::ir::compute::Compute;
use crate::ir::entities::{AddrId, ComputeId, LoopHandle, PhiId};
use crate::ir::loop_ir::LoopIr;
use crate::ir::phi::Phi;
use crate::symbol::{Symbol, SymbolData};

/// Owns every arena-resident node table for one engine invocation.
///
/// Not `Sync` by construction: the `PhantomData<*const ()>` marker makes
/// that explicit in the type rather than leaving it an undocumented
/// invariant the way `cranelift_codegen::Context` does.
pub struct Cache {
    pub bump: Bump,
    pub addrs: PrimaryMap<AddrId, Addr>,
    pub computes: PrimaryMap<ComputeId, Compute>,
    pub phis: PrimaryMap<PhiId, Phi>,
    pub loop_irs: PrimaryMap<crate::ir::entities::LoopIrId, LoopIr>,
    pub loops: PrimaryMap<LoopHandle, AffineLoop>,
    pub symbols: PrimaryMap<Symbol, SymbolData>,
    _not_sync: PhantomData<*const ()>,
}

impl Cache {
    pub fn new() -> Self {
        Cache {
            bump: Bump::new(),
            addrs: PrimaryMap::new(),
            computes: PrimaryMap::new(),
            phis: PrimaryMap::new(),
            loop_irs: PrimaryMap::new(),
            loops: PrimaryMap::new(),
            symbols: PrimaryMap::new(),
            _not_sync: PhantomData,
        }
    }

    pub fn push_loop(&mut self, l: AffineLoop) -> LoopHandle {
        self.loops.push(l)
    }

    pub fn push_addr(&mut self, a: Addr) -> AddrId {
        self.addrs.push(a)
    }

    pub fn push_compute(&mut self, c: Compute) -> ComputeId {
        self.computes.push(c)
    }

    pub fn push_phi(&mut self, p: Phi) -> PhiId {
        self.phis.push(p)
    }

    pub fn push_loop_ir(&mut self, n: LoopIr) -> crate::ir::entities::LoopIrId {
        self.loop_irs.push(n)
    }

    pub fn next_symbol(&mut self) -> Symbol {
        self.symbols.push(SymbolData::default())
    }
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new()
    }
}

//! `Addr`: a load or store access to an array element.

use crate::bitset::HoistMask;
use crate::host::AffineExpr;
use crate::ir::entities::{ArrayId, ComputeId, LoopHandle, NodeId, ValueId};
use crate::linalg::Matrix;

/// Packed option: `-1` encodes "no edge"/"no node", avoiding
/// `Option<DepId>` (which would cost a discriminant byte per field on most
/// targets).
pub type PackedDepId = i32;
pub const NO_DEP: PackedDepId = -1;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementType {
    pub fn byte_width(self) -> u32 {
        match self {
            ElementType::I8 => 1,
            ElementType::I16 => 2,
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::F64 => 8,
        }
    }
}

/// A single array access's index-matrix description, one instance per array
/// dimension as the data model specifies ("row count = array dimensionality").
#[derive(Clone, Debug)]
pub struct AccessMatrices {
    pub denom: i64,
    /// Constant part per dimension.
    pub offset_omega: Vec<i64>,
    /// Loop-variable coefficients, rows = array dims, cols = natural depth.
    pub index_matrix: Matrix,
    /// Coefficients on dynamic symbols, one row per array dim.
    pub offset_symbols: Matrix,
    /// Initial lexicographic placement tuple, length `current_depth + 1`.
    pub fusion_omega: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct Addr {
    pub array: ArrayId,
    pub array_dim_sizes: Vec<AffineExpr>,
    pub element_type: ElementType,
    pub alignment_shift: u8,
    pub loop_handle: LoopHandle,
    pub access: AccessMatrices,
    pub predicate: Option<ComputeId>,
    pub is_store: bool,
    /// Valid only when `is_store`. May name a `Phi` directly (a reduction's
    /// join value written out after its carrying loop) rather than always a
    /// fresh `Compute`.
    pub stored_value: Option<ValueId>,
    /// Valid only when this is a load: the `Compute` node representing the
    /// value this load produces, so an operand-graph walk starting from some
    /// store's `stored_value` can recognize which loads it actually reads
    /// from. `None` for a load never wired into a compute graph.
    pub load_value: Option<ComputeId>,

    pub edge_in: PackedDepId,
    pub edge_out: PackedDepId,

    pub hoist_mask: HoistMask,
    /// Which loops are contiguous (bit set) vs convolutional (bit clear) in
    /// this access's index matrix.
    pub orth_axes: u32,

    pub current_depth: usize,
    pub natural_depth: usize,
    pub max_depth: usize,

    /// Bitmask (LSB = outermost) of which loops appear in the index matrix.
    pub loopdeps: crate::bitset::LoopMask,

    /// Set by `IROptimizer`'s CSE pass once this address has been folded
    /// into another and should be skipped during further traversal.
    pub dropped: bool,

    /// Set when this `Addr` was produced by `Dependencies::reload` rather
    /// than appearing in the original IR; used by `ScheduledNode::
    /// add_scheduled_node` to recognize already-duplicated loads.
    pub is_reload: bool,
    /// For a reload, the store it was cloned from.
    pub reload_source: Option<crate::ir::entities::AddrId>,

    /// Sibling links within the enclosing block's instruction list: set by
    /// `topological_sort` and walked by `crate::cursor`.
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,

    /// The `LoopIr` whose body this address currently sits in, set by
    /// `crate::ir::node::append_child`. Lets the position & legality pass
    /// walk from an address back up to the loop level it belongs to without
    /// a separate parent index.
    pub owner: Option<crate::ir::entities::LoopIrId>,
}

impl Addr {
    pub fn is_load(&self) -> bool {
        !self.is_store
    }
}

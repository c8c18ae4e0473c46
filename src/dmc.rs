//! Dynamic Markov compression.
//!
//! Bit contexts are nodes of a graph that starts as an order-1 byte tree.
//! Edges that are traversed often get a private copy of their target node,
//! so frequently seen contexts specialize over time.

use crate::counters::{StateMap, StateMapKind};
use crate::logistic::stretch;
use crate::mixers::Mixer;
use crate::models::{Model, UNIT_SCALE};
use crate::shared::Shared;
use crate::state_table::{BitHistory, StateTable};
use crate::{u16, u32};
use tracing::debug;

/// Nodes of the initial graph: 256 trees of 255 nodes
pub const BASE_NODES: usize = 255 * 256;
pub const MAX_NODES: usize = (1 << 31) / std::mem::size_of::<DmcNode>();
const MAX_THRESHOLD: u32 = 8 * 1024;

/// One bit context.
///
/// `c0` and `c1` are decaying counts with 10 fractional bits.
#[derive(Clone, Copy, Default)]
pub struct DmcNode {
    pub c0: u16,
    pub c1: u16,
    pub next: [u32; 2],
    pub state: u8,
}

// x * (1 - 1/64) + inc
fn decay(x: u16, inc: u8) -> u16 {
    let x = u32::from(x);
    ((((x << 6) - x) >> 6) + (u32::from(inc) << 10)) as u16
}

pub struct DmcModel {
    nodes: Vec<DmcNode>,
    capacity: usize,
    current: usize,
    initial_threshold: u32,
    threshold: u32,
    // threshold << 11, for increasing it in finer steps
    threshold_fine: u32,
    // skipped clone volume once the graph is full
    extra: u64,
    state_map: StateMap,
}

impl DmcModel {
    /// `extra_nodes` nodes on top of the initial graph, cloning from `threshold`
    pub fn new(extra_nodes: usize, threshold: u32) -> Self {
        let capacity = (BASE_NODES + extra_nodes).min(MAX_NODES);
        let mut model = Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
            current: 0,
            initial_threshold: threshold,
            threshold,
            threshold_fine: threshold << 11,
            extra: 0,
            state_map: StateMap::new(1, 256, 256, StateMapKind::BitHistory),
        };
        model.reset();
        model
    }

    /// Back to the order-1 graph, keeps the state map
    pub fn reset(&mut self) {
        self.current = 0;
        self.extra = 0;
        self.threshold = self.initial_threshold;
        self.threshold_fine = self.initial_threshold << 11;
        let count = if self.initial_threshold < 1024 { 2048 } else { 512 };
        self.nodes.clear();
        for tree in 0..256 {
            for i in 0..255 {
                let top = tree * 255 + i;
                let next = if i < 127 {
                    [top + i + 1, top + i + 2]
                } else {
                    // leaves link to the roots of the next byte's trees
                    let root = (i - 127) * 2 * 255;
                    [root, root + 255]
                };
                self.nodes.push(DmcNode { c0: count, c1: count, next: [u32!(next[0]), u32!(next[1])], state: 0 });
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The graph is full and has stopped adapting for long enough to warrant a reset
    pub fn is_full(&self) -> bool {
        self.extra >> 7 > self.capacity as u64
    }

    pub fn update(&mut self, bit: u8) {
        self.state_map.update(bit);

        let y = usize::from(bit);
        let cur = self.current;
        let node = &mut self.nodes[cur];
        let n = u32::from(if bit == 0 { node.c0 } else { node.c1 });
        node.c0 = decay(node.c0, 1 - bit);
        node.c1 = decay(node.c1, bit);
        node.state = BitHistory::next(node.state, bit);
        let target = node.next[y] as usize;

        if n > self.threshold {
            let DmcNode { c0, c1, .. } = self.nodes[target];
            let (c0, c1) = (u32::from(c0), u32::from(c1));
            let nn = c0 + c1;
            if nn > n + self.threshold {
                if self.nodes.len() < self.capacity {
                    let top = self.nodes.len();
                    let c0_top = (u64::from(c0) * u64::from(n) / u64::from(nn)) as u32;
                    let c1_top = (u64::from(c1) * u64::from(n) / u64::from(nn)) as u32;
                    let source = &mut self.nodes[target];
                    source.c0 = u16!(c0 - c0_top);
                    source.c1 = u16!(c1 - c1_top);
                    let clone = DmcNode { c0: u16!(c0_top), c1: u16!(c1_top), ..*source };
                    self.nodes.push(clone);
                    self.nodes[cur].next[y] = u32!(top);
                    if self.threshold < MAX_THRESHOLD {
                        self.threshold_fine += 1;
                        self.threshold = self.threshold_fine >> 11;
                    }
                } else {
                    self.extra += u64::from(nn >> 10);
                }
            }
        }

        self.current = self.nodes[cur].next[y] as usize;
    }

    /// Sum of a count based and a bit history based prediction, stretched
    pub fn st(&mut self) -> i32 {
        let node = self.nodes[self.current];
        let n0 = u32::from(node.c0) + 1;
        let n1 = u32::from(node.c1) + 1;
        let p1 = ((n1 << 12) / (n0 + n1)) as i32;
        let p2 = i32::from(self.state_map.p(0, usize::from(node.state)));
        stretch(p1.clamp(1, 4095)) + stretch(p2)
    }
}

const MODELS: usize = 10;
// cloning thresholds and memory divisors, two slow models last
const THRESHOLDS: [u32; MODELS] = [2, 32, 64, 4, 128, 8, 256, 16, 1024, 1536];
const MEM_DIVISORS: [usize; MODELS] = [6, 10, 11, 7, 12, 8, 13, 9, 2, 2];

/// Ten DMC models with different thresholds and sizes.
///
/// The two slow ones are never reset, the others are reset at byte
/// boundaries once they report being full.
pub struct DmcForest {
    models: Vec<DmcModel>,
    scale: i32,
}

impl DmcForest {
    pub const MIXER_INPUTS: usize = 2 + (MODELS - 2) / 2;

    /// `mem` bytes of budget shared out between the models
    pub fn new(mem: usize) -> Self {
        let models: Vec<_> = (0..MODELS).map(|i| DmcModel::new(mem / MEM_DIVISORS[i], THRESHOLDS[i])).collect();
        debug!(
            nodes = models.iter().map(DmcModel::capacity).sum::<usize>(),
            node_size = std::mem::size_of::<DmcNode>(),
            "allocating dmc forest"
        );
        Self { models, scale: UNIT_SCALE }
    }

    pub fn models(&self) -> &[DmcModel] {
        &self.models
    }
}

impl Model for DmcForest {
    fn mixer_inputs(&self) -> usize {
        Self::MIXER_INPUTS
    }

    fn mix<M: Mixer>(&mut self, _shared: &Shared, m: &mut M) {
        let scale = self.scale;
        let (fast, slow) = self.models.split_at_mut(MODELS - 2);
        for model in slow.iter_mut().rev() {
            m.add(((model.st() * scale) >> 8) >> 3);
        }
        for pair in fast.rchunks_exact_mut(2) {
            let (a, b) = (pair[1].st(), pair[0].st());
            m.add((((a + b) * scale) >> 8) >> 4);
        }
    }

    fn update(&mut self, shared: &Shared) {
        for model in self.models.iter_mut().rev() {
            model.update(shared.y);
        }
        if shared.bit_position == 0 {
            for (i, model) in self.models.iter_mut().enumerate().take(MODELS - 2) {
                if model.is_full() {
                    debug!(model = i, nodes = model.node_count(), "dmc graph full, resetting");
                    model.reset();
                }
            }
        }
    }

    fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
    }
}

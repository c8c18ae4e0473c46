//! Clients of the prediction core.
//!
//! Every model derives its own contexts from [`Shared`], pushes a fixed
//! number of inputs into the mixer each bit and is updated once the bit is known.

mod matching;
mod normal;
mod sparse;

pub use self::{matching::MatchModel, normal::NormalModel, sparse::SparseModel};

use crate::config::Config;
use crate::dmc::DmcForest;
use crate::error::Result;
use crate::mixers::Mixer;
use crate::shared::Shared;

/// Neutral model scale
pub const UNIT_SCALE: i32 = 256;

pub trait Model {
    /// Inputs added by every `mix` call
    fn mixer_inputs(&self) -> usize;
    /// Sets contexts at byte boundaries and adds predictions for the next bit
    fn mix<M: Mixer>(&mut self, shared: &Shared, m: &mut M);
    /// Learns the bit `shared` has just seen
    fn update(&mut self, shared: &Shared);
    fn set_scale(&mut self, scale: i32);
}

/// The active models in the order they are mixed and updated.
///
/// Decoding replays the encoder's updates, so the order is fixed.
pub struct ModelSet {
    matcher: MatchModel,
    normal: NormalModel,
    sparse: Option<SparseModel>,
    dmc: Option<DmcForest>,
}

impl ModelSet {
    pub fn new(config: &Config) -> Result<Self> {
        let mem = config.mem();
        let sparse = match config.sparse {
            true => Some(SparseModel::new(mem * 2, config)?),
            false => None,
        };
        Ok(Self {
            matcher: MatchModel::new(mem * 4)?,
            normal: NormalModel::new(mem * 8, config)?,
            sparse,
            dmc: config.dmc.then(|| DmcForest::new(mem)),
        })
    }

    /// Known contexts of the normal model, `0..=NormalModel::CONTEXTS`
    pub fn order(&self) -> usize {
        self.normal.order()
    }
}

impl Model for ModelSet {
    fn mixer_inputs(&self) -> usize {
        self.matcher.mixer_inputs()
            + self.normal.mixer_inputs()
            + self.sparse.as_ref().map_or(0, Model::mixer_inputs)
            + self.dmc.as_ref().map_or(0, Model::mixer_inputs)
    }

    fn mix<M: Mixer>(&mut self, shared: &Shared, m: &mut M) {
        self.matcher.mix(shared, m);
        self.normal.mix(shared, m);
        if let Some(sparse) = &mut self.sparse {
            sparse.mix(shared, m);
        }
        if let Some(dmc) = &mut self.dmc {
            dmc.mix(shared, m);
        }
    }

    fn update(&mut self, shared: &Shared) {
        self.matcher.update(shared);
        self.normal.update(shared);
        if let Some(sparse) = &mut self.sparse {
            sparse.update(shared);
        }
        if let Some(dmc) = &mut self.dmc {
            dmc.update(shared);
        }
    }

    fn set_scale(&mut self, scale: i32) {
        self.matcher.set_scale(scale);
        self.normal.set_scale(scale);
        if let Some(sparse) = &mut self.sparse {
            sparse.set_scale(scale);
        }
        if let Some(dmc) = &mut self.dmc {
            dmc.set_scale(scale);
        }
    }
}

//! Adaptive probability maps shared by the models.

mod apm;
mod state_map;
mod stationary;

pub use self::{apm::*, state_map::*, stationary::*};

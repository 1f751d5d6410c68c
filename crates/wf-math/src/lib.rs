//! wavefit math utilities.

pub mod math;

pub use math::gamma::*;
pub use math::mixture::{weighted_mean_sd, weighted_quantile, GaussianMixture, MixtureComponent};
pub use math::normal::*;
pub use math::stable::*;

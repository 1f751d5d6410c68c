//! Report section data structures.

pub mod failures;
pub mod narrative;
pub mod overview;
pub mod wave;

pub use failures::FailureRow;
pub use overview::OverviewSection;
pub use wave::WaveSection;

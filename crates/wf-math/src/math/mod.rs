//! Core math modules.

pub mod gamma;
pub mod mixture;
pub mod normal;
pub mod stable;

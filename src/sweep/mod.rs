//! Parameter sweeps.
//!
//! - exact decimals (`decimal`)
//! - `start-stop-step` ranges and their sortable formatting (`range`)
//! - the tracer's parameter catalogue (`params`)
//! - cartesian grids and parameter-file output (`grid`)

pub mod decimal;
pub mod grid;
pub mod params;
pub mod range;

pub use decimal::*;
pub use grid::*;
pub use params::*;
pub use range::*;

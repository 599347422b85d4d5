pub mod error;
pub mod config;
pub mod logging;
pub mod utils;
pub mod lattice;
pub mod states;
pub mod thermo;
pub mod stats;
pub mod sampling;
pub mod data;
pub mod finite_size;
pub mod zoom;
pub mod plot;

pub use error::{IsingError, Result};

pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod geometry;
pub mod numeric;
pub mod trigger;

pub use config::{DaqConfig, DiagnosticsConfig};
pub use entity::*;
pub use error::*;
pub use event::*;
pub use geometry::{CellIndex, Half};
pub use trigger::*;

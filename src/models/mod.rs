//! # Data Layer
//!
//! The storm entity and the table mapping metadata used by schema generation.

pub mod mapping;
pub mod storm;

pub use mapping::{ColumnMapping, IdSequence, TableMapping};
pub use storm::{NewStorm, Storm};

//! The acquisition catalogue: recipes, smelting, data tables, routing.

pub mod catalogue;
pub mod recipe;
pub mod smelting;
pub mod tables;

pub use catalogue::{AcquisitionMethod, Derivation, ProviderFn, TaskCatalogue};

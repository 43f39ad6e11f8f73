#![deny(warnings)]

//! Rule-based pyrolysis yield model.
//!
//! Given a feedstock, a process mode, a heat source and an optional
//! catalyst, [`simulate`] adjusts the mode's base yields for temperature,
//! residence time and oxygen, renormalizes them to 100% and attaches the
//! heat source's precomputed indicators.

use thiserror::Error;

pub mod catalog;
pub mod conditions;
pub mod material;
pub mod simulate;

pub use catalog::{
    CarbonBalance, Catalog, CatalogDocument, Catalyst, HeatSource, Kpis, Material,
    MaterialCategory, MaterialProperties, ProcessMode, YieldModifiers, Yields,
};
pub use material::{resolve, EffectiveMaterial, Feedstock, MaterialSource};
pub use simulate::{
    simulate, GasComposition, PlantModel, PlantModelBasis, SimulationInputs, SimulationResult,
};

/// Errors raised while loading a catalog document.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Yaml(String),
    #[error("duplicate catalog id: {0}")]
    DuplicateId(String),
    /// Base yields of a mode must add up to 100.
    #[error("base yields of mode {mode} sum to {total}, expected 100")]
    YieldSum { mode: String, total: f64 },
}

//! Skylight and block-light generation for chunk columns, with flood-fill
//! propagation that crosses chunk borders through the [`LightWorld`] seam.

pub mod engine;
pub mod world;

pub use engine::LightEngine;
pub use world::LightWorld;

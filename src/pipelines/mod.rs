//! Render pipeline definitions.
//!
//! - `basic` is the lit, opaque pipeline used for every scene mesh
//! - `light` holds the hemispheric light uniform and its bind group

pub mod basic;
pub mod light;

//! Engine data structures: meshes, instances and render attachments.
//!
//! - `mesh` contains procedural geometry (sphere, ground) and the vertex layout
//! - `instance` holds per-mesh transformation data and its GPU layout
//! - `texture` wraps depth and multisample attachments

pub mod instance;
pub mod mesh;
pub mod texture;

//! Procedural meshes and the vertex layout the lit pipeline consumes.
//!
//! Meshes live on the CPU side of the scene: geometry plus a world transform
//! that the physics step rewrites each frame. GPU buffers for them are created
//! by [`crate::render::SceneRenderer`] once the scene is handed to the engine.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::instance::Instance;

/// Describes how the bytes of a vertex-like type map onto shader locations.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Indexed triangle list, counter-clockwise front faces.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned bounds in mesh space, `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let first: Vector3<f32> = self.vertices.first()?.position.into();
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            let p: Vector3<f32> = v.position.into();
            (
                Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        }))
    }

    pub fn extents(&self) -> Vector3<f32> {
        self.bounding_box()
            .map(|(min, max)| max - min)
            .unwrap_or(Vector3::new(0.0, 0.0, 0.0))
    }
}

/// A named renderable: geometry, world transform and a flat diffuse colour.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub data: MeshData,
    pub transform: Instance,
    pub colour: [f32; 3],
}

impl Mesh {
    pub fn new(name: impl Into<String>, data: MeshData) -> Self {
        Self {
            name: name.into(),
            data,
            transform: Instance::default(),
            // default material: plain white diffuse
            colour: [1.0, 1.0, 1.0],
        }
    }

    /// World-space size of the mesh (mesh extents times scale).
    pub fn world_extents(&self) -> Vector3<f32> {
        let extents = self.data.extents();
        let scale = self.transform.scale;
        Vector3::new(extents.x * scale.x, extents.y * scale.y, extents.z * scale.z)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SphereOptions {
    pub diameter: f32,
    /// Horizontal rings; each ring is split into twice as many slices.
    pub segments: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            diameter: 1.0,
            segments: 32,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GroundOptions {
    pub width: f32,
    pub height: f32,
    pub subdivisions: u32,
}

impl Default for GroundOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            subdivisions: 1,
        }
    }
}

pub struct MeshBuilder;

impl MeshBuilder {
    /// UV sphere centred on the origin.
    pub fn create_sphere(name: &str, options: SphereOptions) -> Mesh {
        let radius = options.diameter / 2.0;
        let stacks = options.segments.max(2);
        let slices = stacks * 2;

        let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        for i in 0..=stacks {
            let phi = PI * i as f32 / stacks as f32;
            for j in 0..=slices {
                let theta = 2.0 * PI * j as f32 / slices as f32;
                let normal = Vector3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(ModelVertex {
                    position: (normal * radius).into(),
                    normal: normal.into(),
                });
            }
        }

        let row = slices + 1;
        let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Mesh::new(name, MeshData { vertices, indices })
    }

    /// Flat grid in the XZ plane facing +Y; `width` runs along X, `height` along Z.
    pub fn create_ground(name: &str, options: GroundOptions) -> Mesh {
        let cells = options.subdivisions.max(1);
        let row = cells + 1;
        let normal = Vector3::new(0.0, 1.0, 0.0);

        let mut vertices = Vec::with_capacity((row * row) as usize);
        for r in 0..=cells {
            let z = (r as f32 / cells as f32 - 0.5) * options.height;
            for c in 0..=cells {
                let x = (c as f32 / cells as f32 - 0.5) * options.width;
                vertices.push(ModelVertex {
                    position: [x, 0.0, z],
                    normal: normal.normalize().into(),
                });
            }
        }

        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for r in 0..cells {
            for c in 0..cells {
                let v0 = r * row + c;
                let v1 = v0 + 1;
                let v3 = v0 + row;
                let v2 = v3 + 1;
                indices.extend_from_slice(&[v0, v2, v1, v0, v3, v2]);
            }
        }

        Mesh::new(name, MeshData { vertices, indices })
    }
}

//! GPU buffers for the meshes of a [`Scene`] and the draw calls that use them.
//!
//! Mesh geometry never changes after the scene is built, so vertex and index
//! buffers are uploaded once. Only the per-mesh instance data (world transform
//! and colour) is rewritten each frame.

use wgpu::{RenderPass, util::DeviceExt};

use crate::{data_structures::mesh::Mesh, scene::Scene};

/// Data for one instanced draw: geometry plus instance buffer.
pub struct Instanced<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub instance: &'a wgpu::Buffer,
    pub num_indices: u32,
    pub amount: u32,
}

struct MeshBuffers {
    name: String,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    instance: wgpu::Buffer,
    num_indices: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&[mesh.transform.to_raw(mesh.colour)]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: mesh.name.clone(),
            vertex,
            index,
            instance,
            num_indices: mesh.data.indices.len() as u32,
        }
    }
}

pub struct SceneRenderer {
    meshes: Vec<MeshBuffers>,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, scene: &Scene) -> Self {
        let meshes = scene
            .meshes()
            .iter()
            .filter(|mesh| !mesh.data.indices.is_empty())
            .map(|mesh| MeshBuffers::new(device, mesh))
            .collect::<Vec<_>>();
        log::debug!("uploaded {} meshes", meshes.len());
        Self { meshes }
    }

    /// Upload the current mesh transforms.
    pub fn write_to_buffers(&self, queue: &wgpu::Queue, scene: &Scene) {
        for buffers in &self.meshes {
            let Some(mesh) = scene.meshes().iter().find(|mesh| mesh.name == buffers.name) else {
                continue;
            };
            queue.write_buffer(
                &buffers.instance,
                0,
                bytemuck::cast_slice(&[mesh.transform.to_raw(mesh.colour)]),
            );
        }
    }

    pub fn instanced(&self) -> impl Iterator<Item = Instanced<'_>> {
        self.meshes.iter().map(|buffers| Instanced {
            vertex: &buffers.vertex,
            index: &buffers.index,
            instance: &buffers.instance,
            num_indices: buffers.num_indices,
            amount: 1,
        })
    }
}

pub trait DrawInstanced<'a> {
    fn draw_instanced(
        &mut self,
        instanced: Instanced<'a>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawInstanced<'b> for RenderPass<'a>
where
    'b: 'a,
{
    fn draw_instanced(
        &mut self,
        instanced: Instanced<'b>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, instanced.vertex.slice(..));
        self.set_vertex_buffer(1, instanced.instance.slice(..));
        self.set_index_buffer(instanced.index.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, camera_bind_group, &[]);
        self.set_bind_group(1, light_bind_group, &[]);
        self.draw_indexed(0..instanced.num_indices, 0, 0..instanced.amount);
    }
}

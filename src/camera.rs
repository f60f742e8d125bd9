//! Free camera, projection and the input control that can be attached to it.
//!
//! The camera itself is plain scene data. Its GPU side (uniform buffer and bind
//! group) lives in [`CameraResources`] and is owned by the engine.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Debug)]
pub struct Camera {
    pub name: String,
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    controller: Option<CameraController>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        name: &str,
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            name: name.to_string(),
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            controller: None,
        }
    }

    /// Turn the camera so that it looks at `target`. Does nothing when `target`
    /// is the camera position.
    pub fn set_target<T: Into<Point3<f32>>>(&mut self, target: T) {
        let direction = target.into() - self.position;
        if direction.magnitude2() < 1e-12 {
            return;
        }
        let forward = direction.normalize();
        self.yaw = Rad(forward.z.atan2(forward.x));
        self.pitch = Rad(forward.y.asin().clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    /// Let keyboard and pointer input move this camera.
    pub fn attach_control(&mut self, controller: CameraController) {
        self.controller = Some(controller);
    }

    pub fn has_control(&self) -> bool {
        self.controller.is_some()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.controller
            .as_mut()
            .map_or(false, |controller| controller.handle_window_events(event))
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if let Some(controller) = self.controller.as_mut() {
            controller.handle_mouse(dx, dy);
        }
    }

    /// Apply the input accumulated since the last frame.
    pub fn update(&mut self, dt: Duration) {
        if let Some(mut controller) = self.controller.take() {
            controller.update(self, dt);
            self.controller = Some(controller);
        }
    }
}

#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Keyboard (WASD / arrows, Space, Shift) and left-drag pointer control.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    dragging: bool,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
            dragging: false,
            speed,
            sensitivity,
        }
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.amount_forward = amount;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.amount_backward = amount;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.amount_left = amount;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.amount_right = amount;
                true
            }
            KeyCode::Space => {
                self.amount_up = amount;
                true
            }
            KeyCode::ShiftLeft => {
                self.amount_down = amount;
                true
            }
            _ => false,
        }
    }

    pub fn process_button(&mut self, button: MouseButton, state: ElementState) -> bool {
        if button == MouseButton::Left {
            self.dragging = state.is_pressed();
            true
        } else {
            false
        }
    }

    /// Raw pointer motion; only turns the camera while the left button is held.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if self.dragging {
            self.rotate_horizontal += dx as f32;
            self.rotate_vertical += dy as f32;
        }
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll = match delta {
            MouseScrollDelta::LineDelta(_, scroll) => scroll * 100.0,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => *scroll as f32,
        };
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            WindowEvent::MouseInput { state, button, .. } => self.process_button(*button, *state),
            WindowEvent::MouseWheel { delta, .. } => {
                self.handle_scroll(delta);
                true
            }
            _ => false,
        }
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        // Move forward/backward and left/right
        let (yaw_sin, yaw_cos) = camera.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin).normalize();
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos).normalize();
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;

        // Zoom along the view direction
        camera.position += camera.forward() * self.scroll * self.speed * self.sensitivity * dt;
        self.scroll = 0.0;

        camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;

        camera.yaw += Rad(self.rotate_horizontal) * self.sensitivity * dt;
        camera.pitch += Rad(-self.rotate_vertical) * self.sensitivity * dt;
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        camera.pitch = Rad(camera.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU side of the active camera.
#[derive(Debug)]
pub struct CameraResources {
    pub projection: Projection,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let projection = Projection::new(width, height, Rad(0.8), 0.1, 1000.0);
        let uniform = CameraUniform::new();

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            projection,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.uniform.update_view_proj(camera, &self.projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn set_target_points_the_camera_at_the_origin() {
        let mut camera = Camera::new("camera1", (0.0, 5.0, -10.0), Rad(0.0), Rad(0.0));
        camera.set_target((0.0, 0.0, 0.0));
        assert_close(camera.forward(), Vector3::new(0.0, -5.0, 10.0).normalize());
    }

    #[test]
    fn set_target_on_itself_keeps_the_orientation() {
        let mut camera = Camera::new("camera1", (1.0, 2.0, 3.0), Rad(0.5), Rad(0.25));
        camera.set_target((1.0, 2.0, 3.0));
        assert_eq!(camera.yaw, Rad(0.5));
        assert_eq!(camera.pitch, Rad(0.25));
    }

    #[test]
    fn input_is_ignored_without_attached_control() {
        let mut camera = Camera::new("camera1", (0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        camera.handle_mouse(100.0, 100.0);
        camera.update(Duration::from_secs(1));
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.yaw, Rad(0.0));
    }

    #[test]
    fn attached_control_moves_the_camera_forward() {
        let mut camera = Camera::new("camera1", (0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(2.0, 0.004);
        assert!(controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed));
        camera.attach_control(controller);

        camera.update(Duration::from_millis(500));

        // yaw 0 looks down +x
        assert!((camera.position.x - 1.0).abs() < 1e-5);
        assert!(camera.position.z.abs() < 1e-5);
        assert!(camera.has_control());
    }

    #[test]
    fn pointer_only_rotates_while_dragging() {
        let mut controller = CameraController::new(2.0, 1.0);
        let mut camera = Camera::new("camera1", (0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));

        controller.handle_mouse(10.0, 0.0);
        controller.update(&mut camera, Duration::from_secs(1));
        assert_eq!(camera.yaw, Rad(0.0));

        controller.process_button(MouseButton::Left, ElementState::Pressed);
        controller.handle_mouse(10.0, 0.0);
        controller.update(&mut camera, Duration::from_secs(1));
        assert_eq!(camera.yaw, Rad(10.0));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controller = CameraController::new(1.0, 1.0);
        let mut camera = Camera::new("camera1", (0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        controller.process_button(MouseButton::Left, ElementState::Pressed);
        controller.handle_mouse(0.0, -100.0);
        controller.update(&mut camera, Duration::from_secs(1));
        assert!(camera.pitch.0 < FRAC_PI_2);
    }
}

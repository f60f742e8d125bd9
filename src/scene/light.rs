use cgmath::{InnerSpace, Vector3};

/// Ambient light that blends a sky colour and a ground colour depending on how
/// much a surface faces `direction`.
#[derive(Clone, Debug, PartialEq)]
pub struct HemisphericLight {
    pub name: String,
    pub direction: Vector3<f32>,
    pub intensity: f32,
    pub diffuse: [f32; 3],
    pub ground_colour: [f32; 3],
}

impl HemisphericLight {
    pub fn new<D: Into<Vector3<f32>>>(name: &str, direction: D) -> Self {
        Self {
            name: name.to_string(),
            direction: direction.into(),
            intensity: 1.0,
            diffuse: [1.0, 1.0, 1.0],
            ground_colour: [0.0, 0.0, 0.0],
        }
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Unit direction; a zero vector falls back to straight up.
    pub fn direction_normalized(&self) -> Vector3<f32> {
        if self.direction.magnitude2() > 0.0 {
            self.direction.normalize()
        } else {
            Vector3::unit_y()
        }
    }
}

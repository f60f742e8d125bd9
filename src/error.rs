use thiserror::Error;

/// Why a mount could not produce a rendering scene.
///
/// This is what the owner of a [`crate::host::CanvasHost`] gets to inspect through
/// [`crate::lifecycle::MountStatus::Failed`] instead of a silently dropped future.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("rendering engine could not be created: {0:#}")]
    Engine(anyhow::Error),
    #[error("physics backend failed to load: {0:#}")]
    PhysicsLoad(anyhow::Error),
    #[error("scene construction was cancelled before `{0}`")]
    Cancelled(&'static str),
    #[error("physics is not enabled on this scene")]
    PhysicsNotEnabled,
    #[error("no mesh with id {0}")]
    UnknownMesh(usize),
    #[error("mesh `{0}` has no extent to derive a physics shape from")]
    DegenerateShape(String),
}

impl SceneError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SceneError::Cancelled(_))
    }
}

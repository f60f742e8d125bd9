//! Mount lifecycle bookkeeping: the per-mount cancellation flag and the status
//! the host reports to its owner.

use std::{cell::Cell, rc::Rc};

use crate::error::SceneError;

/// Cancellation flag shared between a mount and its in-flight scene construction.
///
/// The host cancels it on unmount; the scene builder checks it before every
/// step that touches the scene, so a late payload never lands on a torn-down
/// engine.
#[derive(Clone, Debug)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn cancel(&self) {
        self.0.set(false);
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    /// `Err(Cancelled(step))` once the owning mount is gone.
    pub fn ensure(&self, step: &'static str) -> Result<(), SceneError> {
        if self.is_alive() {
            Ok(())
        } else {
            log::debug!("mount went away, skipping `{}`", step);
            Err(SceneError::Cancelled(step))
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub enum MountStatus {
    #[default]
    Unmounted,
    /// Engine exists, scene construction is in flight.
    Constructing,
    /// The render loop runs against a fully built scene.
    Rendering,
    Failed(SceneError),
}

impl MountStatus {
    pub fn is_rendering(&self) -> bool {
        matches!(self, MountStatus::Rendering)
    }

    pub fn error(&self) -> Option<&SceneError> {
        match self {
            MountStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

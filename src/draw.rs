//! Draw forwarding
//!
//! Rendering backends live outside this crate. A scene only forwards
//! `draw` calls to systems that expose the [`Drawable`] capability.

use std::any::Any;

use glam::Mat4;

use crate::entity_manager::EntityManager;

/// Opaque render target supplied by the rendering backend.
pub trait RenderTarget: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Per-draw state handed down from the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    pub transform: Mat4,
}

impl RenderStates {
    pub fn with_transform(transform: Mat4) -> Self {
        Self { transform }
    }

    /// States for a child: parent transform applied after `local`.
    pub fn combined(&self, local: Mat4) -> Self {
        Self {
            transform: self.transform * local,
        }
    }
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
        }
    }
}

/// Something that can draw itself given the scene's components.
pub trait Drawable {
    fn draw(&self, entities: &EntityManager, target: &mut dyn RenderTarget, states: &RenderStates);
}

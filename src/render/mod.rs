//! Software renderer: ray casting into a character frame

pub mod compositor;
pub mod frame;
pub mod raycast;
pub mod sprites;
pub mod surface;

pub use compositor::{Compositor, Hud, RosterEntry, SceneView};
pub use frame::Frame;
pub use raycast::RayConfig;
pub use surface::{present, RenderSurface, TerminalSurface};

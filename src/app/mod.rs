//! Process-level state and the frame loop

pub mod frame_loop;
pub mod state;

pub use frame_loop::FrameLoop;
pub use state::AppState;

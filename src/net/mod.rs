//! Peer-to-peer networking: wire format, transport, session bookkeeping

pub mod mesh;
pub mod protocol;
pub mod session;

pub use mesh::{Mesh, MeshConfig, MeshEvent};
pub use protocol::WireState;
pub use session::Session;

//! Language Server Protocol implementation for calculation expressions and
//! scenario sentences

pub mod analysis;
pub mod backend;
pub mod capabilities;
pub mod engine;
pub mod transport;
pub mod workspace;

// Re-export main entry points
pub use analysis::language::{LanguageKind, LanguageProfile};
pub use backend::LspBackend;
pub use engine::Engine;
pub use transport::{run_stdio, run_websocket};
pub use workspace::{Workspace, WorkspaceConfig};

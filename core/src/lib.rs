pub mod adapter;
pub mod agent;
pub mod backends;
pub mod config;
pub mod error;
pub mod render;
pub mod tools;
pub mod traits;

pub use adapter::{BackendSession, RenderAdapter};
pub use agent::ToolRegistry;
pub use backends::*;
pub use config::*;
pub use error::DispatchError;
pub use render::*;
pub use tools::*;
pub use traits::*;

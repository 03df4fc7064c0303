//! Observer connection handles and the client registry.

pub mod handle;
pub mod registry;

pub use handle::{ClientHandle, ClientId};
pub use registry::ClientRegistry;

pub mod handler;
pub mod registry;
pub mod session;

pub use handler::{ws_index, GameSocket};
pub use registry::ConnectionRegistry;
pub use session::{Joined, SessionHandler};

pub mod controller;
pub mod coordinator;
pub mod session;

pub use controller::*;
pub use coordinator::*;
pub use session::*;

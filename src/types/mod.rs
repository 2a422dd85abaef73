pub mod account;
pub mod auth;
pub mod bot;
pub mod reports;
pub mod system;
pub mod time;

pub use account::*;
pub use auth::*;
pub use bot::*;
pub use reports::*;
pub use system::*;

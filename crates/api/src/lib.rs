extern crate alloc;

pub mod aggregate;
pub mod engine;
pub mod hub;
pub mod live;
pub mod lobby;
pub mod projector;
pub mod router;
pub mod store;
mod util;

pub use lobby::Lobby;

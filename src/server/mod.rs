//! Accept loop and connection dispatch

pub mod dispatcher;
pub mod listener;

pub use dispatcher::{Dispatcher, PoolPolicy};
pub use listener::Server;

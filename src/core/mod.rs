pub mod classify;
pub mod delta;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod notify;
pub mod registry;
pub mod session;
pub mod state;
pub mod types;

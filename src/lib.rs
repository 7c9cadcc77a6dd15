pub(crate) mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod observability;
pub mod rate_limit;
pub mod routing;
pub mod state;
pub mod stream;
pub mod transport;

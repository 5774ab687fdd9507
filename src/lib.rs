pub(crate) mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod segment;
pub mod state;
pub mod stream;
pub mod transport;

mod util;

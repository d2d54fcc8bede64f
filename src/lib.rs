#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod sim;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
pub mod player;
#[cfg(feature = "std")]
pub mod prelude;
#[cfg(feature = "std")]
pub mod protocol;
#[cfg(feature = "std")]
pub mod render;
#[cfg(feature = "std")]
pub mod scores;
#[cfg(feature = "std")]
pub mod session;
#[cfg(feature = "std")]
pub mod transport;

pub use sim::*;

#[cfg(feature = "std")]
pub use config::NetConfig;
#[cfg(feature = "std")]
pub use logging::init_logging;
#[cfg(feature = "std")]
pub use protocol::Message;

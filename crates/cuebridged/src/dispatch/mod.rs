//! JSON command dispatch for bridge sessions.
//!
//! Clients send JSON objects of the form
//!
//! ```json
//! {"type": "set_tempo", "params": {"tempo": 128.0}}
//! ```
//!
//! and receive exactly one JSON document per command, terminated by a newline:
//!
//! ```json
//! {"status": "success", "result": {"tempo": 128.0}}
//! {"status": "error", "message": "Unknown command: set_tempox"}
//! ```
//!
//! Requests are not newline-delimited. A session keeps reading until its
//! buffer holds a complete document, so a request may arrive split across any
//! number of reads. The [`CommandRouter`] decides where each command runs; see
//! its module for the routing order.

mod errors;
mod handler;
mod registry;
mod request;
mod response;
mod router;

pub use self::errors::DispatchError;
pub(crate) use self::handler::BridgeConnectionHandler;
pub use self::registry::{CommandRegistry, Handler, RegistryEntry};
pub use self::request::Command;
pub use self::response::{Response, ResponseWriter};
pub use self::router::{CREATE_LOCATOR, CommandClass, CommandRouter, RouterOptions};

//! Chat client for the user API.
//!
//! Two front ends share this crate: the interactive [`repl`] that maps typed
//! commands onto the HTTP API and sends everything else to Gemini, and the
//! [`agent`] that lets Gemini drive the tool bridge.

pub mod agent;
pub mod api_client;
pub mod command;
pub mod errors;
pub mod gemini;
pub mod repl;
pub mod schema;

pub use agent::{ToolAgent, ToolBackend};
pub use api_client::UserApiClient;
pub use command::ChatCommand;
pub use errors::ChatError;
pub use gemini::{ChatModel, GeminiClient, Unconfigured};

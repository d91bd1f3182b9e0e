//! Plain data types shared by the API, the bridge and the chat client.

pub mod errors;
pub mod user;
pub mod calc;

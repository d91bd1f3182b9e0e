//! Service layer providing the user record operations.
//! - Separates business rules (validation, not-found signalling) from storage.
//! - Storage is injected through `user::UserRepository`.

pub mod errors;
pub mod storage;
pub mod user;

//! User records keyed by email.

pub mod repository;
pub mod file_repo;
pub mod memory_repo;
pub mod service;

pub use file_repo::FileUserRepository;
pub use memory_repo::MemoryUserRepository;
pub use repository::UserRepository;
pub use service::UserService;

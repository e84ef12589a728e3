//! Concrete repository implementations.

pub mod message;
pub mod user;

pub use message::MessageRepository;
pub use user::UserRepository;

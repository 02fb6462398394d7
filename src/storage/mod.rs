//! Storage backends for users, roles and assignments

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{RoleStore, UserStore};

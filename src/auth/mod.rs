//! Authentication system
//!
//! Handles user identities, credential validation, and session management.

pub mod identity;
pub mod session;
pub mod validator;

pub use identity::{Identity, IdentityStore, UserRole};
pub use session::{Session, SessionHandle, SessionRegistry, SessionState};
pub use validator::{validate_password, validate_username};

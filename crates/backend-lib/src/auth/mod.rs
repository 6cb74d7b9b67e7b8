// ============================
// formguard-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod cookie;
pub mod password;
pub mod policy;
pub mod remember_me;
pub mod session;
pub mod token_generator;
pub mod users;
mod service;
mod service_impl;

pub use password::{
    hash_password_secure, Argon2Encoder, DelegatingPasswordEncoder, PasswordEncoder,
    PasswordVerifier, ScryptEncoder,
};
pub use policy::{AuthorizationPolicy, PathPattern};
pub use remember_me::{PersistentTokenStore, RememberMeLogin, RememberMeToken};
pub use service::{AuthService, ChallengeReason, Credentials, Decision, Established, LoginSuccess};
pub use service_impl::{AuthOptions, DefaultAuth};
pub use session::{Session, SessionManager};
pub use users::{CredentialLookup, InMemoryUserStore, Principal};

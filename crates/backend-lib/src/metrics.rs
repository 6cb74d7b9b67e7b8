// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "login.success";
pub const LOGIN_FAILURE: &str = "login.failure";
pub const LOGOUT: &str = "logout";
pub const REMEMBER_ME_ISSUED: &str = "rememberme.issued";
pub const REMEMBER_ME_ROTATED: &str = "rememberme.rotated";
pub const REMEMBER_ME_REJECTED: &str = "rememberme.rejected";
pub const REMEMBER_ME_SWEPT: &str = "rememberme.swept";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const SESSION_ACTIVE: &str = "session.active";

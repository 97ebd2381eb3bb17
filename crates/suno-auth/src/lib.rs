//! Suno session authentication library
//!
//! Provides account file storage, cookie jar handling, and Clerk session
//! token refresh for the Suno cookie relay. This crate is a standalone
//! library with no dependency on the relay binary, so it can be tested and
//! used independently.
//!
//! Credential flow:
//! 1. Accounts loaded via `accounts::AccountStore::load()`
//! 2. An account's raw cookie parsed via `cookie::CookieJar::parse()`
//! 3. Relay calls `token::refresh_session_token()` with the cookie header
//! 4. Rotated `Set-Cookie` values merged back via `cookie::CookieJar::load()`
//! 5. Background task repeats step 3 to keep the session token fresh
//! 6. Drained accounts retired via `accounts::AccountStore::disable()`

pub mod accounts;
pub mod constants;
pub mod cookie;
pub mod error;
pub mod token;

pub use accounts::{Account, AccountStore};
pub use constants::*;
pub use cookie::CookieJar;
pub use error::{Error, Result};
pub use token::{SessionToken, refresh_session_token};

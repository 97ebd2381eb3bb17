//! Account pool for Suno session credentials
//!
//! Manages a rotating pool of Suno accounts with front-of-list selection,
//! quota-driven rotation, and periodic session token refresh. The account
//! store is the single source of truth for credentials and the disabled
//! list; one account is active at a time and serves all traffic until its
//! credits drain.
//!
//! Account lifecycle:
//! 1. Operator adds the account to the accounts file → active at next load
//! 2. Pool selects the front active account and refreshes its token
//! 3. Upstream reports zero credits → account disabled, pool advances
//! 4. Background task re-refreshes the session token every few seconds
//! 5. Disabled accounts stay retired across restarts via the disabled list

pub mod error;
pub mod pool;
pub mod refresh;
pub mod session;

pub use error::{Error, Result};
pub use pool::Pool;
pub use refresh::spawn_refresh_task;
pub use session::{ActiveCredentials, Session};

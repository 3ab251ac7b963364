//! Local user identity lookup for the USER handshake.

use thiserror::Error;
use tracing::{debug, warn};

/// Username sent when the local identity cannot be determined.
pub const UNKNOWN_USER: &str = "unknown";

const USER_VARS: &[&str] = &["USER", "LOGNAME", "USERNAME"];

#[derive(Debug, Error)]
#[error("could not determine local username (no account entry; checked {})", USER_VARS.join(", "))]
pub struct IdentityError;

/// Look up the login name of the effective user.
///
/// The account database is consulted first; the `USER`, `LOGNAME` and
/// `USERNAME` variables are only used when it has no answer.
pub fn current_username() -> Result<String, IdentityError> {
    account_name()
        .or_else(env_username)
        .ok_or(IdentityError)
}

#[cfg(unix)]
fn account_name() -> Option<String> {
    use nix::unistd::{geteuid, User};

    let uid = geteuid();
    match User::from_uid(uid) {
        Ok(Some(user)) if !user.name.is_empty() => Some(user.name),
        Ok(_) => {
            debug!(uid = uid.as_raw(), "no account entry for uid");
            None
        }
        Err(e) => {
            debug!(uid = uid.as_raw(), error = %e, "account lookup failed");
            None
        }
    }
}

#[cfg(not(unix))]
fn account_name() -> Option<String> {
    None
}

fn env_username() -> Option<String> {
    USER_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// Like [`current_username`], falling back to [`UNKNOWN_USER`].
pub fn username_or_fallback() -> String {
    current_username().unwrap_or_else(|e| {
        warn!(error = %e, fallback = UNKNOWN_USER, "identity lookup failed");
        UNKNOWN_USER.to_string()
    })
}

//! # User Manager
//!
//! A small account service: registration with email activation, password
//! login issuing a signed session token, and a guard for protected routes.
//!
//! ## Tokens
//!
//! Activation and session tokens are HS256 JWTs signed with one process-wide
//! secret. They are verified statelessly: there is no session table and no
//! revocation list, so a leaked token stays valid until it expires. Activation
//! links live for days, sessions for hours.
//!
//! ## Passwords
//!
//! Passwords are stored as Argon2id PHC strings and compared with the
//! verifier's constant-time check. Login answers "invalid email or password"
//! for both unknown emails and wrong passwords.

pub mod accounts;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

use std::fmt;
use thiserror::Error;

use super::store::StoreError;

/// Why an activation token was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationFailure {
    Expired,
    Invalid,
}

impl fmt::Display for ActivationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Activation code is expired."),
            Self::Invalid => write!(f, "Activation code is not valid."),
        }
    }
}

/// Outcomes of account operations that are not success.
///
/// Everything except `StoreFailure` and `Internal` is a client error; the `Display` text is
/// the message returned to the caller.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Please enter a valid email.")]
    InvalidIdentifier,
    #[error("Password is too short.")]
    WeakPassword,
    #[error("Email is already used.")]
    AlreadyRegistered,
    #[error("{0}")]
    ActivationTokenInvalid(ActivationFailure),
    #[error("User is not found.")]
    AccountNotFound,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Unauthorized.")]
    Unauthorized,
    #[error("credential store failure")]
    StoreFailure(#[source] StoreError),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AccountError {
    /// Stable machine-readable code for logs and response bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::WeakPassword => "WEAK_PASSWORD",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::ActivationTokenInvalid(_) => "ACTIVATION_TOKEN_INVALID",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::StoreFailure(_) => "STORE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        Self::StoreFailure(err)
    }
}

//! Account core: registration, email activation and password login.
//!
//! The HTTP layer only talks to [`AccountService`]. Persistence and mail
//! delivery are reached through the [`CredentialStore`] and
//! [`NotificationSender`] traits so they can be swapped or faked.

pub mod error;
pub mod model;
pub mod notify;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use error::{AccountError, ActivationFailure};
pub use model::Account;
pub use notify::{EmailMessage, HttpEmailSender, LogEmailSender, NotificationSender};
pub use service::{AccountConfig, AccountService, LoginOutcome};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};
pub use token::{Claims, TokenCodec, TokenError, TokenKind};

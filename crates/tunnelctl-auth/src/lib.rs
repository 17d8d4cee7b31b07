//! Tunnel credentials
//!
//! Generates tunnel secrets and persists them next to the origin
//! certificate with owner-only permissions.

pub mod credentials;
pub mod error;
pub mod path;
pub mod secret;

pub use credentials::{is_regular_file, CredentialStore, TunnelCredentials};
pub use error::CredentialError;
pub use secret::{SecretError, TunnelSecret, SECRET_LEN};

// Authentication module
// Credential storage, startup token validation and the OAuth handshake

mod oauth;
mod store;
mod types;
mod validator;

pub use oauth::{exchange_code, OAuthClient, OAuthGrant};
pub use store::{CredentialStore, StoreError};
pub use types::{
    token_prefix, BotIdentity, Credential, DatabaseBindings, DatabaseKind, IntegrationKind,
    Session, INTERNAL_WORKSPACE_ID,
};
pub use validator::{verify_token, StartupError};

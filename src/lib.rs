//! Core library for an OpenID Connect 1.0 / OAuth 2.0 authorization
//! server: JOSE primitives, the token-issuance pipeline, the
//! grant-processing state machine, and a CIBA out-of-band delivery
//! engine, all independent of any particular HTTP transport.
//!
//! Collaborators the host application must supply (client storage,
//! token registries, session stores, outbound notification delivery,
//! ...) are expressed as traits in [`interfaces`]. Nothing in this
//! crate binds to a specific database, web framework, or clock beyond
//! `time::OffsetDateTime::now_utc()`.

pub mod ciba;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grant;
pub mod interfaces;
pub mod jose;
pub mod model;
pub mod token;
pub mod util;

pub use config::Options;
pub use error::{CryptoError, InfraError, JwtValidationError, OidcError, OidcErrorCode};

/*
 * Telestaff client - async client for Workforce Telestaff rosters and calendars
 */

// Internal modules
mod auth;
mod client;
mod config;
mod error;
pub mod models;
pub mod parser;
mod resource;
mod session;

// Re-export public types and interfaces
pub use auth::{Authentication, Credentials, FormAuth, NtlmAuth};
pub use client::TelestaffClient;
pub use config::{ClientConfig, DEFAULT_USER_AGENT};
pub use error::{TelestaffError, TelestaffResult};
pub use models::*;
pub use resource::{PortalUrl, ReportKind, Resource};
pub use session::Session;

// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ClientConfig, Credentials, Report, ReportKind, TelestaffClient, TelestaffError,
        TelestaffResult,
    };
}

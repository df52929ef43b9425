//! Portal Gate - session-driven access control for the PopupGenix admin
//! panel and client portal.
//!
//! The [`application::AccessGate`] decides, from the auth provider's session
//! and the `profiles` table, whether a route tree may render. The same
//! fail-closed check guards the HTTP API in [`adapters::http`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

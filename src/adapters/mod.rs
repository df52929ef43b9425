//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session providers (in-memory, Supabase GoTrue)
//! - `profile` - Profile stores (in-memory, PostgREST, PostgreSQL)
//! - `http` - Axum REST surface for the gated trees
//! - `supabase` - Shared HTTP client for the hosted project

pub mod auth;
pub mod http;
pub mod profile;
pub mod supabase;

pub use auth::{MockSessionProvider, SupabaseAuthClient};
pub use profile::{InMemoryProfileRepository, PgProfileRepository, PostgrestProfileRepository};
pub use supabase::SupabaseClient;

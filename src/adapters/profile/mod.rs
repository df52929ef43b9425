//! Profile adapters.
//!
//! Implementations of the `ProfileRepository` port:
//!
//! - `in_memory` - Test and local-development store
//! - `postgrest` - Hosted Supabase tables over PostgREST
//! - `postgres_repository` - Direct PostgreSQL access via sqlx

mod in_memory;
mod postgres_repository;
mod postgrest;

pub use in_memory::InMemoryProfileRepository;
pub use postgres_repository::PgProfileRepository;
pub use postgrest::PostgrestProfileRepository;

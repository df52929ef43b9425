//! Authentication adapters.
//!
//! Implementations of the `SessionProvider` and `SessionValidator` ports:
//!
//! - `mock` - In-memory implementation that doesn't require external services
//! - `supabase` - Supabase GoTrue implementation

mod mock;
mod supabase;

pub use mock::MockSessionProvider;
pub use supabase::SupabaseAuthClient;

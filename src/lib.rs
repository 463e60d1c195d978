pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;
pub use api::{AccessPolicy, Action, AppState, NoTeasers, RoleAccessPolicy, TeaserRenderer};

pub use error::{TaxonomyError, TaxonomyResult};

// Export logic types
pub use logic::{FieldConfiguration, ReorderMode};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store, StoreTransaction, TaxonomyStore};

use axum::Router;
use tokio::net::TcpListener;

/// Router with state attached, ready to serve
pub fn build_app<S: Store + 'static>(state: AppState<S>) -> Router {
    crate::api::routes::create_router().with_state(state)
}

/// Serve `app` on an already bound listener until the process stops
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

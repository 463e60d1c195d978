use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Vocabularies
        .route(
            "/api/vocabulary",
            get(handlers::list_vocabularies::<S>).post(handlers::create_vocabulary::<S>),
        )
        .route("/api/vocabulary/count", get(handlers::count_vocabularies::<S>))
        // `:vocabulary` is the numeric id here and the name on the term routes below
        .route(
            "/api/vocabulary/:vocabulary",
            get(handlers::get_vocabulary::<S>)
                .put(handlers::update_vocabulary::<S>)
                .delete(handlers::delete_vocabulary::<S>),
        )
        // Terms
        .route(
            "/api/vocabulary/:vocabulary/term",
            get(handlers::list_terms::<S>).post(handlers::create_term::<S>),
        )
        .route(
            "/api/vocabulary/:vocabulary/term/count",
            get(handlers::count_terms::<S>),
        )
        .route(
            "/api/vocabulary/:vocabulary/term/:id",
            get(handlers::get_term::<S>)
                .put(handlers::update_term::<S>)
                .delete(handlers::delete_term::<S>),
        )
        .route("/api/v1/term-texts", get(handlers::term_texts::<S>))
        // Human facing term page
        .route("/vocabulary/:vocabulary/term/:id", get(handlers::term_page::<S>))
}

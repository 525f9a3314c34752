use axum::{
    Router,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use campus_core::health::healthz;
use campus_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    access::{block_access, check_access, provision_access, unblock_access, update_access_period},
    auth::create_token,
    enrollment::{
        create_enrollment, get_enrollment, get_enrollment_history, list_enrollments,
        update_enrollment_status,
    },
    health::readyz,
    institution::{create_institution, get_institution, update_access_policy},
    simplified::{
        convert_simplified_enrollment, create_simplified_enrollment, get_simplified_enrollment,
        get_simplified_status_logs, update_simplified_status,
    },
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Token
        .route("/auth/token", post(create_token))
        // Access lifecycle
        .route("/provision-access/{id}", post(provision_access))
        .route("/update-access-period/{id}", put(update_access_period))
        .route("/block-access/{id}", post(block_access))
        .route("/unblock-access/{id}", post(unblock_access))
        .route("/check-access/{id}", get(check_access))
        // Enrollments
        .route("/enrollments", get(list_enrollments).post(create_enrollment))
        .route("/enrollments/{id}", get(get_enrollment))
        .route("/enrollments/{id}/status", patch(update_enrollment_status))
        .route("/enrollments/{id}/history", get(get_enrollment_history))
        // Simplified intake
        .route(
            "/v2/simplified-enrollments",
            post(create_simplified_enrollment),
        )
        .route(
            "/v2/simplified-enrollments/{id}",
            get(get_simplified_enrollment),
        )
        .route(
            "/v2/simplified-enrollments/{id}/status",
            patch(update_simplified_status),
        )
        .route(
            "/v2/simplified-enrollments/{id}/logs",
            get(get_simplified_status_logs),
        )
        .route(
            "/v2/simplified-enrollments/{id}/convert",
            post(convert_simplified_enrollment),
        )
        // Institutions
        .route("/institutions", post(create_institution))
        .route("/institutions/{id}", get(get_institution))
        .route(
            "/institutions/{id}/access-policy",
            put(update_access_policy),
        )
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::ServiceBuilder;

use crate::handlers::{auth, chats, questions, reviews, system, trust, users};
use crate::middleware::{cors, propagate_request_id, set_request_id, trace, track_metrics};
use crate::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/me/password", put(auth::change_password))
        .route("/users", get(users::list))
        .route("/users/{id}", get(users::get).delete(users::delete))
        .route("/users/{id}/roles", post(users::grant_role))
        .route("/users/{id}/roles/{role}", delete(users::revoke_role))
        .route("/users/{id}/ban", post(users::ban).delete(users::unban))
        .route("/questions", get(questions::search).post(questions::ask))
        .route(
            "/questions/{id}",
            get(questions::get).put(questions::edit).delete(questions::delete),
        )
        .route("/questions/{id}/sensitive", put(questions::set_sensitive))
        .route("/questions/{id}/vote", post(questions::vote))
        .route(
            "/questions/{id}/answers",
            get(questions::list_answers).post(questions::answer),
        )
        .route(
            "/answers/{id}",
            put(questions::edit_answer).delete(questions::delete_answer),
        )
        .route("/answers/{id}/correct", post(questions::mark_correct))
        .route("/answers/{id}/sensitive", put(questions::set_answer_sensitive))
        .route("/answers/{id}/vote", post(questions::vote_answer))
        .route("/answers/{id}/reviews", get(reviews::list).post(reviews::write))
        .route("/reviews/{id}", delete(reviews::delete))
        .route("/reviews/{id}/vote", post(reviews::vote))
        .route("/trusted", get(trust::list).post(trust::add))
        .route("/trusted/{username}", delete(trust::remove))
        .route("/chats", get(chats::list).post(chats::open))
        .route("/chats/unread", get(chats::unread))
        .route("/chats/{id}/messages", get(chats::history).post(chats::send))
        .route("/chats/{id}/read", post(chats::mark_read))
}

/// Builds the full application router.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(system::index))
        .route("/healthz", get(system::healthz))
        .route("/metrics", get(system::metrics))
        .nest("/api", api_routes())
        .route_layer(from_fn_with_state(state.metrics.clone(), track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id())
                .layer(trace())
                .layer(propagate_request_id())
                .layer(cors(cors_origins)),
        )
        .with_state(state)
}

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, instrument};

use super::{
    client::{is_game_id, UpstreamError},
    dto::GamesQuery,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn games_routes() -> Router<AppState> {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/:id", get(get_game))
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    List,
    Detail,
}

impl Resource {
    fn failure_message(self) -> &'static str {
        match self {
            Resource::List => "Failed to fetch games",
            Resource::Detail => "Failed to fetch game details",
        }
    }
}

fn upstream_error(e: UpstreamError, resource: Resource) -> AppError {
    match e {
        UpstreamError::MissingApiKey => AppError::internal("API key not configured", e),
        UpstreamError::Timeout(_) => AppError::GatewayTimeout {
            message: "Request timeout - RAWG API took too long to respond".into(),
            detail: e.to_string(),
        },
        UpstreamError::RateLimited => AppError::RateLimited(e.to_string()),
        UpstreamError::NotFound if matches!(resource, Resource::Detail) => {
            AppError::NotFound("Game not found".into())
        }
        other => AppError::Upstream {
            message: resource.failure_message().into(),
            detail: other.to_string(),
        },
    }
}

fn json_passthrough(body: bytes::Bytes) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

#[instrument(skip(state, user, query), fields(user_id = %user.0.id))]
pub async fn list_games(
    user: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<GamesQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    query.validate()?;

    match state.games.list_games(&query).await {
        Ok(body) => Ok(json_passthrough(body)),
        Err(e) => {
            error!(
                error = %e,
                page = query.page,
                page_size = query.page_size,
                search = ?query.search,
                "games list request failed"
            );
            Err(upstream_error(e, Resource::List))
        }
    }
}

#[instrument(skip(state, user, id), fields(user_id = %user.0.id))]
pub async fn get_game(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Response> {
    let Path(id) = id?;
    if !is_game_id(&id) {
        return Err(AppError::NotFound("Game not found".into()));
    }

    match state.games.game_details(&id).await {
        Ok(body) => Ok(json_passthrough(body)),
        Err(e) => {
            error!(error = %e, game_id = %id, "game detail request failed");
            Err(upstream_error(e, Resource::Detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    use axum::{
        body::Body,
        extract::RawQuery,
        http::{header::AUTHORIZATION, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{app::build_app, config::RawgConfig, games::client::GamesClient};

    const LIST_BODY: &str = r#"{"count":2,"next":null,"results":[{"id":3498,"name":"Grand Theft Auto V"},{"id":4200,"name":"Portal 2"}]}"#;

    /// Fake RAWG that records the last query string it saw and counts calls.
    #[derive(Clone, Default)]
    struct Upstream {
        calls: Arc<AtomicUsize>,
        last_query: Arc<std::sync::Mutex<Option<String>>>,
    }

    async fn spawn_upstream(upstream: Upstream) -> SocketAddr {
        let seen = upstream.clone();
        let app = Router::new()
            .route(
                "/api/games",
                get(move |RawQuery(q): RawQuery| {
                    let seen = seen.clone();
                    async move {
                        seen.calls.fetch_add(1, Ordering::SeqCst);
                        *seen.last_query.lock().unwrap() = q.clone();
                        let q = q.unwrap_or_default();
                        if q.contains("search=slow") {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                        if q.contains("key=bad") {
                            return (StatusCode::UNAUTHORIZED, r#"{"error":"bad key"}"#.to_string());
                        }
                        if q.contains("search=limit") {
                            return (StatusCode::TOO_MANY_REQUESTS, String::new());
                        }
                        if q.contains("search=boom") {
                            return (
                                StatusCode::BAD_GATEWAY,
                                r#"{"detail":"catalog offline"}"#.to_string(),
                            );
                        }
                        (StatusCode::OK, LIST_BODY.to_string())
                    }
                }),
            )
            .route(
                "/api/games/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "3498" => (StatusCode::OK, r#"{"id":3498,"name":"Grand Theft Auto V"}"#),
                        "html" => (StatusCode::OK, "<html>oops</html>"),
                        _ => (StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#),
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn state_for(addr: SocketAddr, key: Option<&str>, timeout_secs: u64) -> AppState {
        let mut state = AppState::fake();
        state.games = GamesClient::new(&RawgConfig {
            api_key: key.map(str::to_string),
            base_url: format!("http://{addr}/api"),
            timeout_secs,
        })
        .unwrap();
        state
    }

    fn bearer(state: &AppState) -> String {
        format!("Bearer {}", state.jwt.issue(Uuid::new_v4(), "ab").unwrap())
    }

    async fn get_raw(app: Router, uri: &str, auth: Option<String>) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().uri(uri);
        if let Some(a) = auth {
            req = req.header(AUTHORIZATION, a);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("json body")
    }

    #[tokio::test]
    async fn list_passes_upstream_body_through_unmodified() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, Some("k3y"), 30);
        let auth = bearer(&state);

        let (status, body) =
            get_raw(build_app(state), "/api/games?page=2&page_size=20", Some(auth)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, LIST_BODY.as_bytes());
        assert_eq!(
            upstream.last_query.lock().unwrap().as_deref(),
            Some("key=k3y&page=2&page_size=20")
        );
    }

    #[tokio::test]
    async fn list_defaults_paging_and_encodes_search() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, Some("k"), 30);
        let auth = bearer(&state);

        let (status, _) = get_raw(build_app(state), "/api/games?search=half%20life", Some(auth)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            upstream.last_query.lock().unwrap().as_deref(),
            Some("key=k&page=1&page_size=20&search=half+life")
        );
    }

    #[tokio::test]
    async fn auth_is_checked_before_any_upstream_call() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, Some("k"), 30);
        let app = build_app(state);

        let (status, body) = get_raw(app.clone(), "/api/games", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body), json!({"message": "Access token required"}));

        let (status, body) =
            get_raw(app.clone(), "/api/games/3498", Some("Bearer garbage".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json(&body), json!({"message": "Invalid or expired token"}));

        let (status, _) = get_raw(app, "/api/games?page=abc", Some("Basic xyz".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_paging_is_rejected_locally() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, Some("k"), 30);
        let auth = bearer(&state);
        let app = build_app(state);

        let (status, _) = get_raw(app.clone(), "/api/games?page=0", Some(auth.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_raw(app, "/api/games?page_size=lots", Some(auth)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_server_error_without_upstream_call() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, None, 30);
        let auth = bearer(&state);

        let (status, body) = get_raw(build_app(state), "/api/games", Some(auth)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&body)["message"], "API key not configured");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_timeout_becomes_gateway_timeout_promptly() {
        let addr = spawn_upstream(Upstream::default()).await;
        let state = state_for(addr, Some("k"), 1);
        let auth = bearer(&state);

        let started = Instant::now();
        let (status, body) = get_raw(build_app(state), "/api/games?search=slow", Some(auth)).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(4));
        let body = json(&body);
        assert_eq!(body["message"], "Request timeout - RAWG API took too long to respond");
        assert_eq!(body["error"], "The request to RAWG API timed out after 1 seconds");
    }

    #[tokio::test]
    async fn upstream_status_codes_are_translated() {
        let addr = spawn_upstream(Upstream::default()).await;

        let state = state_for(addr, Some("bad"), 30);
        let auth = bearer(&state);
        let (status, body) = get_raw(build_app(state), "/api/games", Some(auth)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&body);
        assert_eq!(body["message"], "Failed to fetch games");
        assert_eq!(body["error"], "RAWG API key is invalid or expired");

        let state = state_for(addr, Some("k"), 30);
        let auth = bearer(&state);
        let app = build_app(state);

        let (status, body) = get_raw(app.clone(), "/api/games?search=limit", Some(auth.clone())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            json(&body)["message"],
            "RAWG API rate limit exceeded. Please try again later."
        );

        let (status, body) = get_raw(app, "/api/games?search=boom", Some(auth)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&body)["error"], "RAWG API error: catalog offline");
    }

    #[tokio::test]
    async fn detail_passes_through_and_maps_not_found() {
        let addr = spawn_upstream(Upstream::default()).await;
        let state = state_for(addr, Some("k"), 30);
        let auth = bearer(&state);
        let app = build_app(state);

        let (status, body) = get_raw(app.clone(), "/api/games/3498", Some(auth.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"id":3498,"name":"Grand Theft Auto V"}"#);

        let (status, body) = get_raw(app.clone(), "/api/games/999999", Some(auth.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body), json!({"message": "Game not found"}));

        let (status, body) = get_raw(app, "/api/games/html", Some(auth)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&body)["message"], "Failed to fetch game details");
    }

    #[tokio::test]
    async fn dot_segment_ids_are_not_found_without_upstream_call() {
        let upstream = Upstream::default();
        let addr = spawn_upstream(upstream.clone()).await;
        let state = state_for(addr, Some("k"), 30);
        let auth = bearer(&state);
        let app = build_app(state);

        for uri in ["/api/games/%2E%2E", "/api/games/%2E", "/api/games/%2e%2e"] {
            let (status, body) = get_raw(app.clone(), uri, Some(auth.clone())).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(json(&body), json!({"message": "Game not found"}));
        }
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn list_not_found_is_a_generic_proxy_error() {
        let err = upstream_error(UpstreamError::NotFound, Resource::List);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to fetch games: RAWG API endpoint not found");
    }
}

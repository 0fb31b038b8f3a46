use crate::controller::{export_controller, health_check_controller};
use crate::AppState;
use axum::{routing::get, Router};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Remote View API"
        ),
        paths(
            export_controller::index,
            export_controller::read,
            health_check_controller::health_check,
        ),
        tags(
            (name = "remote_view", description = "Long-polled and streamed snapshots of exported views")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(export_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn export_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(export_controller::index))
        // GET /<export> and GET /<export>.png
        .route("/:name", get(export_controller::read))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use clap::Parser;
    use domain::export::ExportRegistry;
    use domain::ManualClock;
    use events::EventPublisher;
    use futures::StreamExt;
    use service::config::Config;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app_state_with(args: &[&str]) -> AppState {
        let config = Config::try_parse_from(
            std::iter::once("remote_view_server").chain(args.iter().copied()),
        )
        .unwrap();
        let sse_manager = Arc::new(::sse::Manager::new());
        let publisher = EventPublisher::new().with_handler(Arc::new(
            ::sse::SseDomainEventHandler::new(sse_manager.clone()),
        ));
        let exports = Arc::new(ExportRegistry::with_clock(
            publisher,
            Arc::new(ManualClock::new(1000)),
        ));
        exports
            .register("status", config.min_update_period())
            .await
            .unwrap();

        AppState::with_parts(config, exports, sse_manager)
    }

    async fn app_state() -> AppState {
        app_state_with(&["--long-poll-timeout-secs", "5"]).await
    }

    async fn get(app_state: &AppState, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn set_cookie(response: &Response) -> &str {
        response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_long_poll_returns_bytes_version_cookie_and_no_cache_headers() {
        let app_state = app_state().await;
        app_state
            .exports
            .publish("status", &[0x1u8, 0x2])
            .await
            .unwrap();

        let response = get(&app_state, "/status.png").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(
            set_cookie(&response),
            "LastUpdate.status.png=1000; Path=/; SameSite=Strict"
        );
        assert_eq!(body_bytes(response).await, vec![0x1u8, 0x2]);
    }

    #[tokio::test]
    async fn test_long_poll_blocks_on_current_cookie_until_publish() {
        let app_state = app_state().await;
        app_state.exports.publish("status", b"first").await.unwrap();

        let request = Request::builder()
            .uri("/status.png")
            .header(header::COOKIE, "LastUpdate.status.png=1000")
            .body(Body::empty())
            .unwrap();
        let pending = tokio::spawn(define_routes(app_state.clone()).oneshot(request));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        app_state.exports.publish("status", b"second").await.unwrap();
        let response = pending.await.unwrap().unwrap();

        assert_eq!(
            set_cookie(&response),
            "LastUpdate.status.png=1001; Path=/; SameSite=Strict"
        );
        assert_eq!(body_bytes(response).await, b"second".to_vec());
    }

    #[tokio::test]
    async fn test_query_version_takes_precedence_over_cookie() {
        let app_state = app_state().await;
        app_state.exports.publish("status", b"first").await.unwrap();

        let request = Request::builder()
            .uri("/status.png?version=0")
            .header(header::COOKIE, "LastUpdate.status.png=1000")
            .body(Body::empty())
            .unwrap();
        let response = define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(body_bytes(response).await, b"first".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_timeout_returns_current_snapshot() {
        let app_state = app_state().await;
        app_state.exports.publish("status", b"only").await.unwrap();

        let response = get(&app_state, "/status.png?version=1000").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            set_cookie(&response),
            "LastUpdate.status.png=1000; Path=/; SameSite=Strict"
        );
        assert_eq!(body_bytes(response).await, b"only".to_vec());
    }

    #[tokio::test]
    async fn test_malformed_token_is_served_then_limited_to_one_per_second() {
        let app_state = app_state().await;
        app_state.exports.publish("status", b"first").await.unwrap();

        let first = get(&app_state, "/status.png?version=abc").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(body_bytes(first).await, b"first".to_vec());

        let second = get(&app_state, "/status.png?version=abc").await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // A well-formed token from the same client is unaffected
        let third = get(&app_state, "/status.png?version=0").await;
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_general_rate_limit_rejects_excess_requests() {
        let app_state = app_state_with(&["--max-requests-per-window", "2"]).await;

        for _ in 0..2 {
            assert_eq!(get(&app_state, "/status").await.status(), StatusCode::OK);
        }
        assert_eq!(
            get(&app_state, "/status").await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    fn request_from(peer: [u8; 4], forwarded_for: &str, uri: &str) -> Request<Body> {
        let mut request = Request::builder()
            .uri(uri)
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 50000))));
        request
    }

    #[tokio::test]
    async fn test_clients_behind_loopback_proxy_are_limited_separately() {
        let app_state = app_state_with(&["--max-requests-per-window", "1"]).await;

        for client in ["203.0.113.1", "203.0.113.2"] {
            let request = request_from([127, 0, 0, 1], client, "/status");
            let response = define_routes(app_state.clone())
                .oneshot(request)
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_escape_malformed_token_limit() {
        let app_state = app_state().await;
        app_state.exports.publish("status", b"first").await.unwrap();

        let mut statuses = Vec::new();
        for forwarded_for in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            let request = request_from([198, 51, 100, 9], forwarded_for, "/status.png?version=abc");
            let response = define_routes(app_state.clone())
                .oneshot(request)
                .await
                .unwrap();
            statuses.push(response.status());
        }

        assert_eq!(
            statuses,
            vec![
                StatusCode::OK,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_escape_general_limit() {
        let app_state = app_state_with(&["--max-requests-per-window", "1"]).await;

        let first = request_from([198, 51, 100, 9], "1.1.1.1", "/status");
        let second = request_from([198, 51, 100, 9], "2.2.2.2", "/status");

        let first = define_routes(app_state.clone()).oneshot(first).await.unwrap();
        let second = define_routes(app_state.clone()).oneshot(second).await.unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unknown_export_is_not_found() {
        let app_state = app_state().await;

        assert_eq!(
            get(&app_state, "/nonexistent.png").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get(&app_state, "/nonexistent").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_torn_down_export_is_not_found() {
        let app_state = app_state().await;
        app_state.exports.teardown("status").await.unwrap();

        assert_eq!(
            get(&app_state, "/status.png").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_sse_stream_sends_connected_then_ping() {
        let app_state = app_state().await;
        let request = Request::builder()
            .uri("/status.png")
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap();

        let response = define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut frames = response.into_body().into_data_stream();
        let connected = frames.next().await.unwrap().unwrap();
        let connected = String::from_utf8(connected.to_vec()).unwrap();
        assert!(connected.contains("event: connected"));
        assert!(connected.contains("data: connected"));

        app_state
            .exports
            .publish("status", &[0x1u8, 0x2])
            .await
            .unwrap();
        let ping = frames.next().await.unwrap().unwrap();
        let ping = String::from_utf8(ping.to_vec()).unwrap();
        assert!(ping.contains("data: PING 1000"));

        assert_eq!(
            app_state
                .sse_manager
                .clients_for_topic("status.png")
                .unwrap()
                .len(),
            1
        );
        drop(frames);
        assert!(app_state
            .sse_manager
            .clients_for_topic("status.png")
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_sse_stream_ends_when_export_is_torn_down() {
        let app_state = app_state().await;
        let request = Request::builder()
            .uri("/status.png")
            .header(header::ACCEPT, "text/event-stream")
            .body(Body::empty())
            .unwrap();
        let response = define_routes(app_state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let mut frames = response.into_body().into_data_stream();
        frames.next().await.unwrap().unwrap();

        app_state.exports.teardown("status").await.unwrap();

        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_landing_page_floors_update_period() {
        let app_state = app_state().await;

        let response = get(&app_state, "/status?updatePeriod=100").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).starts_with("LastUpdate.status="));
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("setTimeout('refreshIt()', 500)"));
        assert!(html.contains("status.png?"));
    }

    #[tokio::test]
    async fn test_landing_page_defaults_update_period() {
        let app_state = app_state().await;

        for uri in ["/status", "/status?updatePeriod=soon"] {
            let response = get(&app_state, uri).await;
            let html = String::from_utf8(body_bytes(response).await).unwrap();
            assert!(html.contains("setTimeout('refreshIt()', 10000)"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_index_lists_end_points() {
        let app_state = app_state().await;
        app_state
            .exports
            .register("chart", Duration::from_millis(500))
            .await
            .unwrap();

        let response = get(&app_state, "/").await;

        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            "available end points[/chart, /chart.png, /status, /status.png]"
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let app_state = app_state().await;

        let response = get(&app_state, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"healthy".to_vec());
    }
}

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use log::*;

use crate::extractors::client_key::ClientKey;
use crate::headers::{
    accepts_event_stream, last_update_cookie_name, long_polling_cookie, read_cookie, NO_CACHE,
};
use crate::params::export::{parse_version_token, ImageParams, LandingPageParams};
use crate::sse::handler::sse_handler;
use crate::{AppState, Error};
use domain::export::{Export, IMAGE_SUFFIX};
use domain::{Clock, SystemClock};

/// Refresh period of the landing page when the client does not ask for one.
const DEFAULT_UPDATE_PERIOD_MS: u64 = 10_000;

/// Clients sending an unparsable version token get at most this many
/// requests per [`MALFORMED_TOKEN_WINDOW`].
const MALFORMED_TOKEN_LIMIT: u32 = 1;
const MALFORMED_TOKEN_WINDOW: Duration = Duration::from_secs(1);

/// GET the list of available end points
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Every landing page and image end point", body = String)
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    let end_points: Vec<String> = app_state
        .exports
        .names()
        .iter()
        .flat_map(|name| [format!("/{name}"), format!("/{name}{IMAGE_SUFFIX}")])
        .collect();

    format!("available end points[{}]", end_points.join(", "))
}

/// GET an export: `<export>.png` long-polls for the next snapshot (or opens
/// its notification stream when the client accepts `text/event-stream`),
/// `<export>` serves the landing page that keeps refreshing the image.
#[utoipa::path(
    get,
    path = "/{name}",
    params(
        ("name" = String, Path, description = "Export name, or `<export>.png` for its image"),
        ImageParams,
        LandingPageParams,
    ),
    responses(
        (status = 200, description = "Latest snapshot as image/png, the notification stream, or the landing page"),
        (status = 404, description = "No export with that name"),
        (status = 429, description = "Too many requests from this client")
    )
)]
pub async fn read(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
    client_key: ClientKey,
    headers: HeaderMap,
    Query(image_params): Query<ImageParams>,
    Query(landing_page_params): Query<LandingPageParams>,
) -> Result<Response, Error> {
    let config = &app_state.config;
    app_state.rate_limiter.check(
        &client_key.0,
        config.max_requests_per_window,
        config.rate_limit_window(),
    )?;

    match name.strip_suffix(IMAGE_SUFFIX) {
        Some(export_name) => {
            let export = app_state.exports.get(export_name)?;
            if accepts_event_stream(&headers) {
                sse_handler(&app_state, &export, &client_key).await
            } else {
                long_poll(&app_state, &export, &client_key, &headers, image_params).await
            }
        }
        None => {
            let export = app_state.exports.get(&name)?;
            Ok(landing_page(&export, landing_page_params))
        }
    }
}

async fn long_poll(
    app_state: &AppState,
    export: &Export,
    client_key: &ClientKey,
    headers: &HeaderMap,
    params: ImageParams,
) -> Result<Response, Error> {
    let cookie_name = last_update_cookie_name(export.topic());
    let token = params
        .version
        .or_else(|| read_cookie(headers, &cookie_name));

    let last_seen = match token.as_deref().map(parse_version_token) {
        None => 0,
        Some(Ok(version)) => version,
        Some(Err(e)) => {
            warn!(
                "Could not parse version token {:?} sent by client {client_key}: {e}",
                token.as_deref().unwrap_or_default()
            );
            app_state.rate_limiter.check(
                &format!("{client_key}|malformed-token"),
                MALFORMED_TOKEN_LIMIT,
                MALFORMED_TOKEN_WINDOW,
            )?;
            0
        }
    };

    let snapshot = export
        .await_newer_than(last_seen, Some(app_state.config.long_poll_timeout()))
        .await;
    trace!(
        "Long poll of {} by {client_key}: seen {last_seen}, serving {}",
        export.topic(),
        snapshot.version
    );

    Ok((
        NO_CACHE,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::SET_COOKIE,
                long_polling_cookie(&cookie_name, snapshot.version),
            ),
        ],
        snapshot.bytes,
    )
        .into_response())
}

fn landing_page(export: &Export, params: LandingPageParams) -> Response {
    let requested = match params.update_period.as_deref().map(str::trim) {
        None => DEFAULT_UPDATE_PERIOD_MS,
        Some(period) => period.parse::<u64>().unwrap_or_else(|e| {
            warn!("Could not parse 'updatePeriod'={period:?} for export {}: {e}", export.name());
            DEFAULT_UPDATE_PERIOD_MS
        }),
    };
    let floor = u64::try_from(export.min_update_period().as_millis()).unwrap_or(u64::MAX);
    let update_period = requested.max(floor);

    let cookie = long_polling_cookie(
        &last_update_cookie_name(export.name()),
        SystemClock.now_millis(),
    );

    (
        NO_CACHE,
        [(header::SET_COOKIE, cookie)],
        Html(render_landing_page(export.topic(), update_period)),
    )
        .into_response()
}

fn render_landing_page(image: &str, update_period: u64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><script language="JavaScript"><!--
function refreshIt() {{
  if (!document.images) return;
  document.images['myStatus'].src = '{image}?' + Math.random();
  setTimeout('refreshIt()', {update_period}); // refresh every n milliseconds
}}
//--></script></head>
<body onLoad=" setTimeout('refreshIt()', {update_period})">
<img src="{image}" name="myStatus" width="100%" border="0">
</body></html>
"#
    )
}

use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Accepts a client `x-request-id` up to 128 bytes, otherwise mints a UUID. The id is set
/// on the request, its extensions, the task-local scope and the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(RequestId::new);

    let request_id = match incoming {
        Some(id) => id,
        None => {
            let id = RequestId::default();
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                request
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            id
        }
    };

    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.as_str(),
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response = crate::tracing::scope_request_id(request_id.clone(), next.run(request))
        .instrument(span)
        .await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Extension, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(incoming: Option<&str>) -> (Option<String>, String) {
        let app = Router::new()
            .route(
                "/ping",
                get(|Extension(id): Extension<RequestId>| async move { id.to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware));

        let mut request = axum::http::Request::get("/ping");
        if let Some(id) = incoming {
            request = request.header(REQUEST_ID_HEADER, id);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generated_id_reaches_handler_and_response() {
        let (header, seen) = send(None).await;
        assert_eq!(header.as_deref(), Some(seen.as_str()));
        assert!(uuid::Uuid::parse_str(&seen).is_ok());
    }

    #[tokio::test]
    async fn client_id_is_kept() {
        let (header, seen) = send(Some("client-7")).await;
        assert_eq!(header.as_deref(), Some("client-7"));
        assert_eq!(seen, "client-7");
    }

    #[tokio::test]
    async fn oversized_client_id_is_replaced() {
        let long = "x".repeat(200);
        let (header, seen) = send(Some(&long)).await;
        assert_ne!(seen, long);
        assert_eq!(header.as_deref(), Some(seen.as_str()));
    }
}

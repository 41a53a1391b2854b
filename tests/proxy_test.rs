//! End-to-end tests: a real reqwest origin client against a local axum origin

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt; // for `oneshot`

use decryptbox::api::{router, state::AppState};
use decryptbox::crypto::{KeyManager, SecretKey};
use decryptbox::origin::{HttpConfig, HttpOrigin};
use decryptbox::pipeline::Pipeline;
use decryptbox::response::CachePolicy;

const KEY: &[u8] = b"my2ecret782ecret";
const ETAG: &str = "\"photo-v3\"";
const LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake png body";

fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    cbc::Encryptor::<aes::Aes128>::new_from_slices(KEY, KEY)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Headers seen by the origin, one entry per request
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<HeaderMap>>>);

impl Seen {
    fn last(&self) -> HeaderMap {
        self.0.lock().unwrap().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

async fn photo(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    let matches = headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|value| value == ETAG);
    seen.0.lock().unwrap().push(headers);

    if matches {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, ETAG)]).into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::ETAG, ETAG),
            (header::LAST_MODIFIED, LAST_MODIFIED),
        ],
        encrypt(PNG_BYTES),
    )
        .into_response()
}

async fn large(State(seen): State<Seen>, headers: HeaderMap) -> Vec<u8> {
    seen.0.lock().unwrap().push(headers);
    encrypt(&[0u8; 4096])
}

async fn spawn_origin() -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/img/photo.png", get(photo))
        .route("/img/large.bin", get(large))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, seen)
}

fn proxy(http: HttpConfig) -> Router {
    let pipeline = Pipeline::builder()
        .keys(Arc::new(KeyManager::new(Some(SecretKey::new(KEY)))))
        .origin(Arc::new(HttpOrigin::new(http).unwrap()))
        .cache(CachePolicy::public(600))
        .build();
    router(AppState::new(pipeline))
}

/// `/?imageUrl=<value>` with the value form-encoded
fn image_query(value: &str) -> String {
    let mut uri = Url::parse("http://proxy.invalid/").unwrap();
    uri.query_pairs_mut().append_pair("imageUrl", value);
    format!("/?{}", uri.query().unwrap())
}

fn request_for(addr: SocketAddr, path: &str) -> axum::http::request::Builder {
    Request::builder().uri(image_query(&format!("http://{addr}{path}")))
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_decrypts_and_passes_validators() {
    let (addr, _seen) = spawn_origin().await;
    let app = proxy(HttpConfig::default());

    let response = app
        .oneshot(request_for(addr, "/img/photo.png").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    // Extension beats the origin's octet-stream
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CONTENT_DISPOSITION], "inline");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=600");
    assert_eq!(headers[header::ETAG], ETAG);
    assert_eq!(headers[header::LAST_MODIFIED], LAST_MODIFIED);
    assert_eq!(body_bytes(response).await, PNG_BYTES);
}

#[tokio::test]
async fn test_conditional_request_yields_304() {
    let (addr, seen) = spawn_origin().await;
    let app = proxy(HttpConfig::default());

    let response = app
        .oneshot(
            request_for(addr, "/img/photo.png")
                .header(header::IF_NONE_MATCH, ETAG)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers()[header::ETAG], ETAG);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=600");
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(seen.last()[header::IF_NONE_MATCH], ETAG);
}

#[tokio::test]
async fn test_only_conditional_headers_reach_origin() {
    let (addr, seen) = spawn_origin().await;
    let app = proxy(HttpConfig::default());

    let response = app
        .oneshot(
            request_for(addr, "/img/photo.png")
                .header(header::COOKIE, "session=secret")
                .header(header::AUTHORIZATION, "Bearer token")
                .header(header::USER_AGENT, "curl/8.0")
                .header(header::RANGE, "bytes=0-")
                .header(header::IF_MODIFIED_SINCE, LAST_MODIFIED)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let forwarded = seen.last();
    assert!(forwarded.get(header::COOKIE).is_none());
    assert!(forwarded.get(header::AUTHORIZATION).is_none());
    assert!(forwarded.get(header::USER_AGENT).is_none());
    assert!(forwarded.get(header::IF_NONE_MATCH).is_none());
    assert_eq!(forwarded[header::RANGE], "bytes=0-");
    assert_eq!(forwarded[header::IF_MODIFIED_SINCE], LAST_MODIFIED);
}

#[tokio::test]
async fn test_origin_404_is_500() {
    let (addr, seen) = spawn_origin().await;
    let app = proxy(HttpConfig::default());

    let response = app
        .oneshot(request_for(addr, "/img/missing.png").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("404"));
    assert_eq!(seen.count(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (addr, seen) = spawn_origin().await;
    let app = proxy(HttpConfig {
        max_body_bytes: 1024,
        ..HttpConfig::default()
    });

    let response = app
        .oneshot(request_for(addr, "/img/large.bin").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(seen.count(), 1);
}

#[tokio::test]
async fn test_unreachable_origin_is_500() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = proxy(HttpConfig::default());
    let response = app
        .oneshot(request_for(addr, "/img/photo.png").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_double_encoded_url_reaches_origin() {
    let (addr, seen) = spawn_origin().await;
    let app = proxy(HttpConfig::default());

    // Encode the already-encoded target once more
    let once = image_query(&format!("http://{addr}/img/photo.png"));
    let once = once.trim_start_matches("/?imageUrl=");
    let response = app
        .oneshot(Request::builder().uri(image_query(once)).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, PNG_BYTES);
    assert_eq!(seen.count(), 1);
}

/// Origin that answers every connection with a fixed raw HTTP/1.1 response
async fn spawn_raw_origin(reply: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    addr
}

#[tokio::test]
async fn test_origin_status_text_is_reported() {
    let addr = spawn_raw_origin(
        "HTTP/1.1 403 Signature Expired\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let app = proxy(HttpConfig::default());

    let response = app
        .oneshot(request_for(addr, "/img/photo.png").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "origin responded 403 Signature Expired");
}

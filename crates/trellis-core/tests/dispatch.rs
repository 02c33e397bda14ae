//! End-to-end dispatch through the public API.

use bytes::Bytes;
use http_body::{Body, Frame};
use http_body_util::{BodyExt, Empty, Full};
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use trellis_core::{
    json_body, Config, Context, Handler, Response, Route, RouteTable, Router, StatusCode,
};

#[derive(Debug, Default, Deserialize)]
struct Member {
    name: String,
    #[serde(default)]
    role: String,
}

/// Sends one chunk, then fails
struct Reset {
    sent: bool,
}

impl Body for Reset {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        if self.sent {
            return Poll::Ready(Some(Err(std::io::Error::other("connection reset"))));
        }
        self.sent = true;
        Poll::Ready(Some(Ok(Frame::data(Bytes::from_static(b"{\"name\":")))))
    }
}

fn build_router(pool_size: usize) -> Router<Handler, Context<Handler>> {
    let mut table = RouteTable::new();

    table.insert(
        "v1",
        "members",
        Route::new(
            "LIST",
            Handler::new(|ctx: Context<Handler>| async move {
                let org = ctx.parent_id()?.to_string();
                let sort = ctx.query("sort").unwrap_or("name").to_string();
                Some(Response::json(
                    format!(r#"{{"org":"{org}","sort":"{sort}"}}"#),
                    StatusCode::OK,
                ))
            }),
        ),
    );
    table.insert(
        "v1",
        "members",
        Route::new(
            "POST",
            Handler::new(|mut ctx: Context<Handler>| async move {
                let member = ctx.take_body::<Member>()?;
                let role = if member.role.is_empty() { "member" } else { member.role.as_str() };
                Some(Response::json(
                    format!(r#"{{"name":"{}","role":"{role}"}}"#, member.name),
                    StatusCode::CREATED,
                ))
            }),
        )
        .with_body(json_body::<Member>()),
    );
    table.insert(
        "v1",
        "members",
        Route::new("DELETE", Handler::new(|_ctx: Context<Handler>| async { None })),
    );

    let config = Config::default().max_body_size(64).body_pool_size(pool_size);
    Router::with_handlers(table, &config)
}

fn post(uri: &str, body: &str) -> http::Request<Full<Bytes>> {
    http::Request::post(uri)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn body_string(res: http::Response<Full<Bytes>>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn nested_list_with_query() {
    let router = build_router(2);
    let req = http::Request::get("/v1/Orgs/7/Members.json?SORT=joined%20at")
        .body(Empty::<Bytes>::new())
        .unwrap();

    let res = router.serve(req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(body_string(res).await, r#"{"org":"7","sort":"joined at"}"#);
}

#[tokio::test]
async fn create_member_and_failures() {
    let router = build_router(2);

    let res = router.handle(post("/v1/orgs/7/members", r#"{"name":"lin"}"#)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body_string().as_deref(), Some(r#"{"name":"lin","role":"member"}"#));
    assert_eq!(res.header("content-length"), Some("30"));

    let res = router.handle(post("/v1/orgs/7/members", "[1,2")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let oversize = format!(r#"{{"name":"{}"}}"#, "x".repeat(100));
    let res = router.handle(post("/v1/orgs/7/members", &oversize)).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);

    let res = router
        .handle(http::Request::post("/v1/orgs/7/members").body(Reset { sent: false }).unwrap())
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = router
        .handle(http::Request::delete("/v1/orgs/7/members/1").body(Empty::<Bytes>::new()).unwrap())
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!res.body_string().unwrap_or_default().contains("/v1/orgs"));

    let stats = router.pool().stats();
    assert_eq!(stats.checkouts, 4);
    assert_eq!(stats.releases, 4);
    assert_eq!(stats.available, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_balanced_under_concurrent_load() {
    let router = Arc::new(build_router(3));
    let oversize = Arc::new(format!(r#"{{"name":"{}"}}"#, "y".repeat(80)));

    let mut tasks = Vec::new();
    for i in 0..200u32 {
        let router = Arc::clone(&router);
        let oversize = Arc::clone(&oversize);
        tasks.push(tokio::spawn(async move {
            match i % 5 {
                0 => router.handle(post("/v1/orgs/1/members", &format!(r#"{{"name":"m{i}"}}"#))).await.status,
                1 => router.handle(post("/v1/orgs/1/members", "{oops")).await.status,
                2 => router.handle(post("/v1/orgs/1/members", &oversize)).await.status,
                3 => {
                    let req = http::Request::post("/v1/orgs/1/members").body(Reset { sent: false }).unwrap();
                    router.handle(req).await.status
                }
                _ => {
                    let req = http::Request::get("/v1/orgs/1/members").body(Empty::<Bytes>::new()).unwrap();
                    router.handle(req).await.status
                }
            }
        }));
    }

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }
    assert_eq!(created, 40);

    // 4 of every 5 requests lease a buffer
    let stats = router.pool().stats();
    assert_eq!(stats.checkouts, 160);
    assert_eq!(stats.releases, 160);
    assert_eq!(stats.available, 3);
}

//! Route table for the demo API
//!
//! - `GET    /v1/users[?limit=n]`
//! - `GET    /v1/users/{id}`
//! - `POST   /v1/users`
//! - `PUT    /v1/users/{id}`
//! - `DELETE /v1/users/{id}`
//! - `GET    /v1/orgs/{org}/members`
//! - `POST   /v1/orgs/{org}/members`

use crate::store::{MemberInput, Store, UserInput};
use serde::Serialize;
use std::future::ready;
use std::sync::Arc;
use trellis_core::{json_body, Context, Handler, Response, Route, RouteTable, StatusCode};

pub fn routes(store: Arc<Store>) -> RouteTable<Handler> {
    let mut table = RouteTable::new();

    table.insert("v1", "users", Route::new("LIST", handler(&store, list_users)));
    table.insert("v1", "users", Route::new("GET", handler(&store, get_user)));
    table.insert(
        "v1",
        "users",
        Route::new("POST", handler(&store, create_user)).with_body(json_body::<UserInput>()),
    );
    table.insert(
        "v1",
        "users",
        Route::new("PUT", handler(&store, update_user)).with_body(json_body::<UserInput>()),
    );
    table.insert("v1", "users", Route::new("DELETE", handler(&store, delete_user)));

    table.insert("v1", "members", Route::new("LIST", handler(&store, list_members)));
    table.insert(
        "v1",
        "members",
        Route::new("POST", handler(&store, add_member)).with_body(json_body::<MemberInput>()),
    );

    table
}

fn handler<F>(store: &Arc<Store>, f: F) -> Handler
where
    F: Fn(&Store, Context<Handler>) -> Option<Response> + Send + Sync + 'static,
{
    let store = Arc::clone(store);
    Handler::new(move |ctx| ready(f(&store, ctx)))
}

fn to_json<T: Serialize>(value: &T, status: StatusCode) -> Response {
    match serde_json::to_string(value) {
        Ok(raw) => Response::json(raw, status),
        Err(e) => Response::fatal(e),
    }
}

fn error(message: &str, status: StatusCode) -> Response {
    to_json(&serde_json::json!({ "error": message }), status)
}

fn user_id(ctx: &Context<Handler>) -> Option<u64> {
    ctx.id()?.parse().ok()
}

fn list_users(store: &Store, ctx: Context<Handler>) -> Option<Response> {
    let limit = match ctx.query("limit").map(str::parse::<usize>) {
        None => None,
        Some(Ok(limit)) => Some(limit),
        Some(Err(_)) => return Some(error("limit must be a number", StatusCode::BAD_REQUEST)),
    };
    Some(to_json(&store.users(limit), StatusCode::OK))
}

fn get_user(store: &Store, ctx: Context<Handler>) -> Option<Response> {
    let user = user_id(&ctx).and_then(|id| store.user(id));
    Some(match user {
        Some(user) => to_json(&user, StatusCode::OK),
        None => error("user not found", StatusCode::NOT_FOUND),
    })
}

fn create_user(store: &Store, mut ctx: Context<Handler>) -> Option<Response> {
    let input = ctx.take_body::<UserInput>()?;
    if input.name.is_empty() {
        return Some(error("name is required", StatusCode::UNPROCESSABLE_ENTITY));
    }
    let user = store.create_user(input);
    tracing::info!(id = user.id, "user created");
    Some(to_json(&user, StatusCode::CREATED))
}

fn update_user(store: &Store, mut ctx: Context<Handler>) -> Option<Response> {
    let id = user_id(&ctx);
    let input = ctx.take_body::<UserInput>()?;
    Some(match id.and_then(|id| store.update_user(id, input)) {
        Some(user) => to_json(&user, StatusCode::OK),
        None => error("user not found", StatusCode::NOT_FOUND),
    })
}

fn delete_user(store: &Store, ctx: Context<Handler>) -> Option<Response> {
    Some(match user_id(&ctx) {
        Some(id) if store.delete_user(id) => Response::new(StatusCode::NO_CONTENT),
        _ => error("user not found", StatusCode::NOT_FOUND),
    })
}

fn list_members(store: &Store, ctx: Context<Handler>) -> Option<Response> {
    Some(match ctx.parent_id() {
        Some(org) => to_json(&store.members(org), StatusCode::OK),
        None => error("organisation required", StatusCode::NOT_FOUND),
    })
}

fn add_member(store: &Store, mut ctx: Context<Handler>) -> Option<Response> {
    let Some(org) = ctx.parent_id().map(str::to_string) else {
        return Some(error("organisation required", StatusCode::NOT_FOUND));
    };
    let input = ctx.take_body::<MemberInput>()?;
    let role = input.role.unwrap_or_else(|| "member".to_string());
    Some(match store.add_member(&org, input.user_id, role) {
        Some(member) => to_json(&member, StatusCode::CREATED),
        None => error("user missing or already a member", StatusCode::CONFLICT),
    })
}

//! trellis-router: Zero-dependency versioned REST route table
//!
//! Resolves request paths of a fixed REST shape against a three-level table
//! (version -> resource -> pseudo-verb) and extracts positional parameters.
//! Shared by trellis-core and anything else that needs to reason about routes
//! without pulling in an HTTP stack.
//!
//! ## Path Shape
//! - `/{version}/{resource}[/{id}]`
//! - `/{version}/{parentResource}/{parentId}/{resource}[/{id}]`
//! - A trailing `.{format}` is ignored, matching is case-insensitive
//!
//! ## Pseudo-verbs
//! The HTTP method is used verbatim, except `GET` without an id, which
//! becomes `LIST`.
//!
//! ## Example
//! ```
//! use trellis_router::{Route, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table.insert("v1", "users", Route::new("LIST", 0));
//! table.insert("v1", "users", Route::new("GET", 1));
//!
//! let m = table.resolve("GET", "/v1/Users/42.json").unwrap();
//! assert_eq!(*m.route.action(), 1);
//! assert_eq!(m.params.resource, "users");
//! assert_eq!(m.params.id.as_deref(), Some("42"));
//! ```

pub mod query;

pub use query::{parse_query, percent_decode, percent_decode_path, Query};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pseudo-verb used for `GET` requests that carry no id
pub const LIST: &str = "LIST";

/// Type-erased request body target
pub type Payload = Box<dyn Any + Send>;

/// Error produced when a body cannot be decoded into its target
pub type DecodeError = Box<dyn std::error::Error + Send + Sync>;

/// Produces body targets for a route.
///
/// The router crate only knows the shape of this seam; the serialization
/// format lives in trellis-core.
pub trait BodyFactory: Send + Sync {
    /// A zero-value target, used when the request body is empty
    fn empty(&self) -> Payload;

    /// Decode raw body bytes into a populated target
    fn decode(&self, bytes: &[u8]) -> Result<Payload, DecodeError>;
}

/// Immutable registration entry
pub struct Route<A> {
    verb: String,
    body: Option<Arc<dyn BodyFactory>>,
    action: A,
}

impl<A> Route<A> {
    /// Create a route answering to `verb` (uppercased)
    pub fn new(verb: &str, action: A) -> Self {
        Self {
            verb: verb.to_uppercase(),
            body: None,
            action,
        }
    }

    /// Declare a body target for this route
    pub fn with_body(mut self, factory: Arc<dyn BodyFactory>) -> Self {
        self.body = Some(factory);
        self
    }

    /// The pseudo-verb this route answers to
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The application action bound to this route
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Body target factory, if the route takes a payload
    pub fn body_factory(&self) -> Option<&dyn BodyFactory> {
        self.body.as_deref()
    }
}

impl<A> fmt::Debug for Route<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("verb", &self.verb)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

/// Positional values extracted from a request path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub version: String,
    pub parent_resource: Option<String>,
    pub parent_id: Option<String>,
    pub resource: String,
    pub id: Option<String>,
}

impl Params {
    /// Map the segments following the version onto params.
    ///
    /// Empty optional segments (e.g. a trailing slash) count as absent.
    fn from_segments(parts: Vec<String>) -> Self {
        let len = parts.len();
        let mut parts = parts.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        let mut params = Params::default();

        match len {
            1 => {
                params.resource = next();
            }
            2 => {
                params.resource = next();
                params.id = non_empty(next());
            }
            3 => {
                params.parent_resource = non_empty(next());
                params.parent_id = non_empty(next());
                params.resource = next();
            }
            4 => {
                params.parent_resource = non_empty(next());
                params.parent_id = non_empty(next());
                params.resource = next();
                params.id = non_empty(next());
            }
            _ => {}
        }
        params
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Derive the dispatch key for a request method
#[inline]
pub fn pseudo_verb(method: &str, has_id: bool) -> &str {
    if method == "GET" && !has_id {
        LIST
    } else {
        method
    }
}

/// Split a request path into lowercase segments.
///
/// Returns `None` for paths that can never match: shorter than 4 bytes, or
/// with a segment count outside 2..=5 once the format suffix is dropped.
pub fn split_path(path: &str) -> Option<Vec<String>> {
    if path.len() < 4 {
        return None;
    }

    // last dot, so ids containing dots survive
    let end = path.rfind('.').unwrap_or(path.len());
    let trimmed = path.get(1..end)?;

    let count = trimmed.split('/').count();
    if !(2..=5).contains(&count) {
        return None;
    }
    Some(trimmed.split('/').map(str::to_lowercase).collect())
}

/// Result of a successful resolution
#[derive(Debug)]
pub struct Match<'a, A> {
    pub route: &'a Arc<Route<A>>,
    pub params: Params,
}

type Verbs<A> = HashMap<String, Arc<Route<A>>>;
type Resources<A> = HashMap<String, Verbs<A>>;

/// version -> resource -> pseudo-verb -> route
///
/// Built once at startup; lookups take `&self` only, so a table behind an
/// `Arc` is safe to share between concurrent requests.
pub struct RouteTable<A> {
    versions: HashMap<String, Resources<A>>,
}

impl<A> Default for RouteTable<A> {
    fn default() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }
}

impl<A> fmt::Debug for RouteTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("versions", &self.versions.keys().collect::<Vec<_>>())
            .field("routes", &self.len())
            .finish()
    }
}

impl<A> RouteTable<A> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route under `version` and `resource`.
    ///
    /// Keys are lowercased. A route already registered for the same
    /// (version, resource, verb) triple is replaced and returned.
    pub fn insert(&mut self, version: &str, resource: &str, route: Route<A>) -> Option<Arc<Route<A>>> {
        self.versions
            .entry(version.to_lowercase())
            .or_default()
            .entry(resource.to_lowercase())
            .or_default()
            .insert(route.verb.clone(), Arc::new(route))
    }

    /// Resolve a request to its route and params
    pub fn resolve(&self, method: &str, path: &str) -> Option<Match<'_, A>> {
        let mut segments = split_path(path)?;
        let resources = self.versions.get(&segments[0])?;

        let rest = segments.split_off(1);
        let mut params = Params::from_segments(rest);
        let verbs = resources.get(&params.resource)?;

        let verb = pseudo_verb(method, params.id.is_some());
        let route = verbs.get(verb)?;

        params.version = segments.swap_remove(0);
        Some(Match { route, params })
    }

    /// Check whether a (version, resource, verb) triple is registered
    pub fn contains(&self, version: &str, resource: &str, verb: &str) -> bool {
        self.versions
            .get(&version.to_lowercase())
            .and_then(|r| r.get(&resource.to_lowercase()))
            .is_some_and(|v| v.contains_key(&verb.to_uppercase()))
    }

    /// Registered API versions
    pub fn versions(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    /// Total number of routes
    pub fn len(&self) -> usize {
        self.versions
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable<&'static str> {
        let mut table = RouteTable::new();
        table.insert("v1", "users", Route::new("LIST", "list_users"));
        table.insert("v1", "users", Route::new("GET", "get_user"));
        table.insert("v1", "users", Route::new("POST", "create_user"));
        table.insert("v1", "users", Route::new("DELETE", "delete_user"));
        table.insert("v1", "members", Route::new("LIST", "list_members"));
        table.insert("v1", "members", Route::new("get", "get_member"));
        table.insert("v2", "users", Route::new("LIST", "list_users_v2"));
        table
    }

    #[test]
    fn test_resolve_registered_triples() {
        let table = table();

        assert_eq!(*table.resolve("GET", "/v1/users").unwrap().route.action(), "list_users");
        assert_eq!(*table.resolve("GET", "/v1/users/42").unwrap().route.action(), "get_user");
        assert_eq!(*table.resolve("POST", "/v1/users").unwrap().route.action(), "create_user");
        assert_eq!(*table.resolve("DELETE", "/v1/users/9").unwrap().route.action(), "delete_user");
        assert_eq!(*table.resolve("GET", "/v2/users").unwrap().route.action(), "list_users_v2");
    }

    #[test]
    fn test_resolve_misses() {
        let table = table();

        // unknown version, resource, verb
        assert!(table.resolve("GET", "/v3/users").is_none());
        assert!(table.resolve("GET", "/v1/groups").is_none());
        assert!(table.resolve("PUT", "/v1/users/1").is_none());
        assert!(table.resolve("GET", "/v2/users/1").is_none());
        // POST with id is a different verb key than POST without
        assert!(table.resolve("POST", "/v1/users/1").is_some());
    }

    #[test]
    fn test_list_pseudo_verb() {
        assert_eq!(pseudo_verb("GET", false), LIST);
        assert_eq!(pseudo_verb("GET", true), "GET");
        assert_eq!(pseudo_verb("POST", false), "POST");
        assert_eq!(pseudo_verb("DELETE", true), "DELETE");
    }

    #[test]
    fn test_params_resource_and_id() {
        let table = table();
        let m = table.resolve("GET", "/v1/users/42").unwrap();
        assert_eq!(
            m.params,
            Params {
                version: "v1".to_string(),
                resource: "users".to_string(),
                id: Some("42".to_string()),
                ..Params::default()
            }
        );
    }

    #[test]
    fn test_params_nested() {
        let table = table();

        let m = table.resolve("GET", "/v1/orgs/7/members").unwrap();
        assert_eq!(*m.route.action(), "list_members");
        assert_eq!(
            m.params,
            Params {
                version: "v1".to_string(),
                parent_resource: Some("orgs".to_string()),
                parent_id: Some("7".to_string()),
                resource: "members".to_string(),
                id: None,
            }
        );

        let m = table.resolve("GET", "/v1/orgs/7/members/3").unwrap();
        assert_eq!(*m.route.action(), "get_member");
        assert_eq!(m.params.id.as_deref(), Some("3"));
    }

    #[test]
    fn test_case_insensitive_and_format_suffix() {
        let table = table();

        let m = table.resolve("GET", "/V1/Users/AbC.json").unwrap();
        assert_eq!(*m.route.action(), "get_user");
        assert_eq!(m.params.version, "v1");
        assert_eq!(m.params.id.as_deref(), Some("abc"));

        // only the last dot is a format suffix
        let m = table.resolve("GET", "/v1/users/a.b.xml").unwrap();
        assert_eq!(m.params.id.as_deref(), Some("a.b"));
    }

    #[test]
    fn test_segment_count_bounds() {
        let table = table();

        assert!(table.resolve("GET", "/v1").is_none());
        assert!(table.resolve("GET", "/v1/a/b/c/d/e").is_none());
        assert!(split_path("/v1/a/b/c/d").is_some());
        assert!(split_path("/v1/a/b/c/d/e").is_none());
        assert!(split_path("/v1").is_none());
        assert!(split_path("/ab").is_none());
    }

    #[test]
    fn test_dot_too_early() {
        assert!(split_path(".v1/users").is_none());
        assert!(split_path("/v1.users").is_none());
    }

    #[test]
    fn test_trailing_slash_is_list() {
        let table = table();
        let m = table.resolve("GET", "/v1/users/").unwrap();
        assert_eq!(*m.route.action(), "list_users");
        assert_eq!(m.params.id, None);
    }

    #[test]
    fn test_insert_replaces_triple() {
        let mut table = table();
        let before = table.len();

        let old = table.insert("V1", "USERS", Route::new("get", "get_user_v2"));
        assert_eq!(old.map(|r| *r.action()), Some("get_user"));
        assert_eq!(table.len(), before);
        assert_eq!(*table.resolve("GET", "/v1/users/1").unwrap().route.action(), "get_user_v2");
    }

    #[test]
    fn test_contains_and_versions() {
        let table = table();
        assert!(table.contains("V1", "Users", "list"));
        assert!(!table.contains("v1", "users", "PUT"));

        let mut versions = table.versions();
        versions.sort_unstable();
        assert_eq!(versions, vec!["v1", "v2"]);
        assert_eq!(table.len(), 7);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_route_debug_and_verb() {
        let route = Route::new("patch", ());
        assert_eq!(route.verb(), "PATCH");
        assert!(route.body_factory().is_none());
        assert!(format!("{:?}", route).contains("PATCH"));
    }
}

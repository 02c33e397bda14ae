//! In-memory storage for the demo API

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Body accepted by user create/update
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Member {
    pub user_id: u64,
    pub role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberInput {
    pub user_id: u64,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: RwLock<BTreeMap<u64, User>>,
    members: RwLock<HashMap<String, Vec<Member>>>,
    next_id: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(&self, input: UserInput) -> User {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let user = User {
            id,
            name: input.name,
            email: input.email,
        };
        self.users.write().insert(id, user.clone());
        user
    }

    pub fn user(&self, id: u64) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    /// Users ordered by id, at most `limit` of them
    pub fn users(&self, limit: Option<usize>) -> Vec<User> {
        let users = self.users.read();
        users.values().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Overwrite non-empty fields of an existing user
    pub fn update_user(&self, id: u64, input: UserInput) -> Option<User> {
        let mut users = self.users.write();
        let user = users.get_mut(&id)?;
        if !input.name.is_empty() {
            user.name = input.name;
        }
        if !input.email.is_empty() {
            user.email = input.email;
        }
        Some(user.clone())
    }

    /// Removes the user along with their memberships
    pub fn delete_user(&self, id: u64) -> bool {
        if self.users.write().remove(&id).is_none() {
            return false;
        }
        for members in self.members.write().values_mut() {
            members.retain(|m| m.user_id != id);
        }
        true
    }

    pub fn members(&self, org: &str) -> Vec<Member> {
        self.members.read().get(org).cloned().unwrap_or_default()
    }

    /// Add a member to `org`; `None` if the user does not exist or is already a member
    pub fn add_member(&self, org: &str, user_id: u64, role: String) -> Option<Member> {
        if !self.users.read().contains_key(&user_id) {
            return None;
        }
        let mut members = self.members.write();
        let list = members.entry(org.to_string()).or_default();
        if list.iter().any(|m| m.user_id == user_id) {
            return None;
        }
        let member = Member { user_id, role };
        list.push(member.clone());
        Some(member)
    }
}

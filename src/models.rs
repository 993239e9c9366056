//! Wire shapes for the entities the API owns.
//!
//! Nothing here is authoritative: these are transient mirrors of server state,
//! decoded leniently because the API populates references differently per
//! endpoint (e.g. event RSVPs are bare ids for users, objects for admins).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A reference the server may or may not have populated
#[derive(Deserialize)]
#[serde(untagged)]
enum Reference<T> {
    Populated(T),
    Id(String),
}

/// Summaries that can stand in for an unpopulated reference
trait FromId {
    fn from_id(id: String) -> Self;
}

/// Decode an optional reference given either as an object or a bare id
fn reference<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromId,
{
    Ok(Option::<Reference<T>>::deserialize(d)?.map(|r| match r {
        Reference::Populated(t) => t,
        Reference::Id(id) => T::from_id(id),
    }))
}

/// `null` arrays decode as empty
fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

/// Which kind of account a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Study year, sent as a number by some endpoints and a string by others
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Year {
    Number(u32),
    Text(String),
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The logged-in account, either kind
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    User(User),
    Admin(Admin),
}

impl Profile {
    pub fn id(&self) -> &str {
        match self {
            Self::User(u) => &u.id,
            Self::Admin(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::User(u) => &u.name,
            Self::Admin(a) => &a.name,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User(_) => Role::User,
            Self::Admin(_) => Role::Admin,
        }
    }
}

/// Author summary embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Author {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, deserialize_with = "reference")]
    pub author: Option<Author>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub likes: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FromId for Author {
    fn from_id(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            department: None,
            year: None,
        }
    }
}

impl Post {
    pub fn author_name(&self) -> &str {
        match &self.author {
            Some(a) if !a.name.is_empty() => &a.name,
            _ => "Unknown User",
        }
    }

    pub fn author_department(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.department.as_deref())
    }

    pub fn is_liked_by(&self, id: &str) -> bool {
        self.likes.iter().any(|l| l == id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub post: String,
    #[serde(default, deserialize_with = "reference")]
    pub author: Option<Author>,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        match &self.author {
            Some(a) if !a.name.is_empty() => &a.name,
            _ => "Unknown User",
        }
    }
}

/// Admin summary embedded in events
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Creator {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

impl FromId for Creator {
    fn from_id(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            department: None,
            designation: None,
        }
    }
}

/// An RSVP entry: a bare identity or a populated user
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Member {
    Id(String),
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: String,
        #[serde(default)]
        name: String,
    },
}

impl Member {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Populated { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "reference")]
    pub created_by: Option<Creator>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rsvps: Vec<Member>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn has_rsvp(&self, id: &str) -> bool {
        self.rsvps.iter().any(|m| m.id() == id)
    }
}

/// Counts from the admin summary endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Totals {
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub posts: u64,
    #[serde(default)]
    pub events: u64,
}

// Envelopes the API wraps its collections in

#[derive(Debug, Deserialize)]
pub(crate) struct PostList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub posts: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Summary {
    #[serde(default)]
    pub totals: Totals,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub admin: Option<Admin>,
}

/// Credential plus profile returned by a successful login/registration
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub profile: Profile,
}

// Request payloads

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub year: String,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub designation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

//! Fetch layer for the Campus Connect REST API.

use crate::error::{ClientError, Result};
use crate::models::{
    AuthResponse, AuthSession, Comment, Credentials, Event, EventList, MessageBody,
    NewEvent, NewPost, Post, PostList, Profile, RegisterAdmin, RegisterUser, Role, Summary,
    Totals, User, UserList,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// The bearer credential attached to authenticated calls
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub role: Role,
    pub token: String,
}

/// Every remote operation the client performs.
///
/// Implementations must not retry or cache: each call is one request.
pub trait CampusApi {
    fn credential(&self) -> Option<&Credential>;

    fn register_user(&self, form: &RegisterUser) -> Result<AuthSession>;
    fn register_admin(&self, form: &RegisterAdmin) -> Result<AuthSession>;
    fn login(&self, role: Role, credentials: &Credentials) -> Result<AuthSession>;

    fn list_posts(&self) -> Result<Vec<Post>>;
    fn create_post(&self, post: &NewPost) -> Result<Post>;
    fn like_post(&self, post_id: &str) -> Result<()>;
    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>>;
    fn add_comment(&self, post_id: &str, text: &str) -> Result<()>;

    fn list_events(&self) -> Result<Vec<Event>>;
    fn create_event(&self, event: &NewEvent) -> Result<Event>;
    /// Toggle the caller's RSVP; returns the server's confirmation text
    fn rsvp_event(&self, event_id: &str) -> Result<Option<String>>;

    fn summary(&self) -> Result<Totals>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn delete_user(&self, user_id: &str) -> Result<()>;
}

/// Blocking HTTP implementation of [`CampusApi`]
pub struct Client {
    base_url: String,
    credential: Option<Credential>,
    agent: ureq::Agent,
    debug: bool,
}

impl Client {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: None,
            agent: builder.build(),
            debug: false,
        }
    }

    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = self.url(path);
        if self.debug {
            eprintln!("[DEBUG] {} {}", method, url);
        }
        let mut req = self.agent.request(method, &url);
        if let Some(cred) = &self.credential {
            req = req.set("Authorization", &format!("Bearer {}", cred.token));
        }
        req
    }

    fn finish(&self, result: std::result::Result<ureq::Response, ureq::Error>) -> Result<ureq::Response> {
        match result {
            Ok(resp) => {
                if self.debug {
                    eprintln!("[DEBUG]   -> {}", resp.status());
                }
                Ok(resp)
            }
            Err(e) => {
                if self.debug {
                    eprintln!("[DEBUG]   -> {}", e);
                }
                Err(ClientError::from(e))
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.finish(self.request("GET", path).call())?;
        decode(resp)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        let resp = self.finish(self.request("POST", path).send_json(value))?;
        decode(resp)
    }

    /// POST whose response body we don't care about
    fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.finish(self.request("POST", path).send_json(value))?;
        Ok(())
    }

    fn auth(&self, role: Role, path: &str, body: &impl Serialize) -> Result<AuthSession> {
        let resp: AuthResponse = self.post_json(path, body)?;
        into_session(role, resp)
    }
}

fn decode<T: DeserializeOwned>(resp: ureq::Response) -> Result<T> {
    resp.into_json::<T>()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Turn an auth response into a session for the expected role
fn into_session(role: Role, resp: AuthResponse) -> Result<AuthSession> {
    let token = resp
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ClientError::Decode("response carried no token".to_string()))?;
    let profile = match role {
        Role::User => resp.user.map(Profile::User),
        Role::Admin => resp.admin.map(Profile::Admin),
    }
    .ok_or_else(|| ClientError::Decode(format!("response carried no {} profile", role)))?;
    Ok(AuthSession { token, profile })
}

/// Path segment escaping for ids we interpolate into URLs
fn segment(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect(),
        })
        .collect()
}

impl CampusApi for Client {
    fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    fn register_user(&self, form: &RegisterUser) -> Result<AuthSession> {
        self.auth(Role::User, "/auth/user/register", form)
    }

    fn register_admin(&self, form: &RegisterAdmin) -> Result<AuthSession> {
        self.auth(Role::Admin, "/auth/admin/register", form)
    }

    fn login(&self, role: Role, credentials: &Credentials) -> Result<AuthSession> {
        let path = format!("/auth/{}/login", role.as_str());
        self.auth(role, &path, credentials)
    }

    fn list_posts(&self) -> Result<Vec<Post>> {
        let list: PostList = self.get_json("/posts")?;
        Ok(list.posts)
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.post_json("/posts/newpost", post)
    }

    fn like_post(&self, post_id: &str) -> Result<()> {
        self.post_unit(
            &format!("/posts/{}/like", segment(post_id)),
            &serde_json::json!({}),
        )
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.get_json(&format!("/posts/{}/comments", segment(post_id)))
    }

    fn add_comment(&self, post_id: &str, text: &str) -> Result<()> {
        self.post_unit(
            &format!("/posts/{}/comments", segment(post_id)),
            &serde_json::json!({ "text": text }),
        )
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        let list: EventList = self.get_json("/events")?;
        Ok(list.events)
    }

    fn create_event(&self, event: &NewEvent) -> Result<Event> {
        self.post_json("/events/newevent", event)
    }

    fn rsvp_event(&self, event_id: &str) -> Result<Option<String>> {
        let path = format!("/events/{}/rsvp", segment(event_id));
        let resp = self.finish(self.request("POST", &path).send_json(serde_json::json!({})))?;
        // The toggle already happened; a body we can't read only loses the message
        let body = resp.into_string().unwrap_or_default();
        Ok(serde_json::from_str::<MessageBody>(&body)
            .ok()
            .and_then(|b| b.message))
    }

    fn summary(&self) -> Result<Totals> {
        let summary: Summary = self.get_json("/admin/summary")?;
        Ok(summary.totals)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let list: UserList = self.get_json("/admin/users")?;
        Ok(list.users)
    }

    fn delete_user(&self, user_id: &str) -> Result<()> {
        let path = format!("/admin/users/{}", segment(user_id));
        self.finish(self.request("DELETE", &path).call())?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stand-in for the API server. Likes and RSVPs toggle like the
    //! real endpoints do.

    use super::*;
    use crate::models::{Admin, Comment, Member};
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};

    pub struct FakeApi {
        pub credential: Option<Credential>,
        pub posts: RefCell<Vec<Post>>,
        pub comments: RefCell<HashMap<String, Vec<Comment>>>,
        pub events: RefCell<Vec<Event>>,
        pub users: RefCell<Vec<User>>,
        pub calls: RefCell<Vec<&'static str>>,
        pub failing: RefCell<HashSet<&'static str>>,
        next_id: Cell<u32>,
    }

    impl FakeApi {
        pub fn new(credential: Option<Credential>) -> Self {
            Self {
                credential,
                posts: RefCell::new(Vec::new()),
                comments: RefCell::new(HashMap::new()),
                events: RefCell::new(Vec::new()),
                users: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                failing: RefCell::new(HashSet::new()),
                next_id: Cell::new(1),
            }
        }

        pub fn as_user(id: &str) -> Self {
            Self::new(Some(Credential {
                role: Role::User,
                token: format!("token-{}", id),
            }))
        }

        pub fn as_admin(id: &str) -> Self {
            Self::new(Some(Credential {
                role: Role::Admin,
                token: format!("token-{}", id),
            }))
        }

        /// The id the fake server attributes actions to
        fn caller(&self) -> String {
            self.credential
                .as_ref()
                .and_then(|c| c.token.strip_prefix("token-"))
                .unwrap_or("anonymous")
                .to_string()
        }

        pub fn fail(&self, op: &'static str) {
            self.failing.borrow_mut().insert(op);
        }

        pub fn recover(&self, op: &'static str) {
            self.failing.borrow_mut().remove(op);
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }

        fn enter(&self, op: &'static str) -> Result<()> {
            self.calls.borrow_mut().push(op);
            if self.failing.borrow().contains(op) {
                return Err(ClientError::Api {
                    status: 500,
                    message: None,
                });
            }
            Ok(())
        }

        fn fresh_id(&self, prefix: &str) -> String {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            format!("{}{}", prefix, id)
        }
    }

    fn toggle(set: &mut Vec<String>, id: String) {
        if let Some(pos) = set.iter().position(|x| *x == id) {
            set.remove(pos);
        } else {
            set.push(id);
        }
    }

    impl CampusApi for FakeApi {
        fn credential(&self) -> Option<&Credential> {
            self.credential.as_ref()
        }

        fn register_user(&self, form: &RegisterUser) -> Result<AuthSession> {
            self.enter("register_user")?;
            let user = User {
                id: self.fresh_id("u"),
                name: form.name.clone(),
                email: form.email.clone(),
                department: Some(form.department.clone()),
                year: None,
                bio: None,
                interests: form.interests.clone(),
                created_at: None,
            };
            self.users.borrow_mut().push(user.clone());
            Ok(AuthSession {
                token: format!("token-{}", user.id),
                profile: Profile::User(user),
            })
        }

        fn register_admin(&self, form: &RegisterAdmin) -> Result<AuthSession> {
            self.enter("register_admin")?;
            let admin = Admin {
                id: self.fresh_id("a"),
                name: form.name.clone(),
                email: form.email.clone(),
                department: None,
                designation: Some(form.designation.clone()),
                created_at: None,
            };
            Ok(AuthSession {
                token: format!("token-{}", admin.id),
                profile: Profile::Admin(admin),
            })
        }

        fn login(&self, role: Role, credentials: &Credentials) -> Result<AuthSession> {
            self.enter("login")?;
            let users = self.users.borrow();
            let user = users
                .iter()
                .find(|u| u.email == credentials.email && role == Role::User)
                .ok_or(ClientError::Api {
                    status: 401,
                    message: Some("Invalid credentials".to_string()),
                })?;
            Ok(AuthSession {
                token: format!("token-{}", user.id),
                profile: Profile::User(user.clone()),
            })
        }

        fn list_posts(&self) -> Result<Vec<Post>> {
            self.enter("list_posts")?;
            Ok(self.posts.borrow().clone())
        }

        fn create_post(&self, post: &NewPost) -> Result<Post> {
            self.enter("create_post")?;
            let created = Post {
                id: self.fresh_id("p"),
                author: None,
                content: post.content.clone(),
                image_url: post.image_url.clone(),
                tags: post.tags.clone(),
                likes: Vec::new(),
                created_at: None,
                updated_at: None,
            };
            self.posts.borrow_mut().insert(0, created.clone());
            Ok(created)
        }

        fn like_post(&self, post_id: &str) -> Result<()> {
            self.enter("like_post")?;
            let caller = self.caller();
            let mut posts = self.posts.borrow_mut();
            let post = posts.iter_mut().find(|p| p.id == post_id).ok_or(ClientError::Api {
                status: 404,
                message: Some("Post not found".to_string()),
            })?;
            toggle(&mut post.likes, caller);
            Ok(())
        }

        fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
            self.enter("list_comments")?;
            Ok(self
                .comments
                .borrow()
                .get(post_id)
                .cloned()
                .unwrap_or_default())
        }

        fn add_comment(&self, post_id: &str, text: &str) -> Result<()> {
            self.enter("add_comment")?;
            let comment = Comment {
                id: self.fresh_id("c"),
                post: post_id.to_string(),
                author: None,
                text: text.to_string(),
                created_at: None,
            };
            self.comments
                .borrow_mut()
                .entry(post_id.to_string())
                .or_default()
                .push(comment);
            Ok(())
        }

        fn list_events(&self) -> Result<Vec<Event>> {
            self.enter("list_events")?;
            Ok(self.events.borrow().clone())
        }

        fn create_event(&self, event: &NewEvent) -> Result<Event> {
            self.enter("create_event")?;
            let created = Event {
                id: self.fresh_id("e"),
                title: event.title.clone(),
                description: event.description.clone(),
                date: event.date.clone(),
                location: event.location.clone(),
                department: event.department.clone(),
                image_url: event.image_url.clone(),
                created_by: None,
                rsvps: Vec::new(),
                created_at: None,
                updated_at: None,
            };
            self.events.borrow_mut().push(created.clone());
            Ok(created)
        }

        fn rsvp_event(&self, event_id: &str) -> Result<Option<String>> {
            self.enter("rsvp_event")?;
            let caller = self.caller();
            let mut events = self.events.borrow_mut();
            let event = events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or(ClientError::Api {
                    status: 404,
                    message: Some("Event not found".to_string()),
                })?;
            let mut ids: Vec<String> = event.rsvps.iter().map(|m| m.id().to_string()).collect();
            toggle(&mut ids, caller.clone());
            let attending = ids.contains(&caller);
            event.rsvps = ids.into_iter().map(Member::Id).collect();
            Ok(Some(
                if attending {
                    "RSVP added"
                } else {
                    "RSVP removed"
                }
                .to_string(),
            ))
        }

        fn summary(&self) -> Result<Totals> {
            self.enter("summary")?;
            Ok(Totals {
                users: self.users.borrow().len() as u64,
                posts: self.posts.borrow().len() as u64,
                events: self.events.borrow().len() as u64,
            })
        }

        fn list_users(&self) -> Result<Vec<User>> {
            self.enter("list_users")?;
            Ok(self.users.borrow().clone())
        }

        fn delete_user(&self, user_id: &str) -> Result<()> {
            self.enter("delete_user")?;
            self.users.borrow_mut().retain(|u| u.id != user_id);
            Ok(())
        }
    }
}

//! Working sets held by each screen of the client.
//!
//! A view owns the collection it last fetched and replaces it wholesale on
//! every fetch. Mutations never patch local state: they are followed by a
//! full re-fetch of whatever they touched. Any failure leaves the previous
//! working set as it was. Once the server has accepted a mutation the call
//! succeeds; a failed re-fetch after it is reported alongside the result.

use crate::api::CampusApi;
use crate::error::{ActionError, ClientError, Fallback};
use crate::filter::{self, ActivityStats};
use crate::forms::{self, EventDraft, PostDraft};
use crate::models::{Comment, Event, Post, Role, Totals, User};
use crate::upload::{self, ImageHost};
use std::collections::HashMap;

type Result<T> = std::result::Result<T, ActionError>;

fn require_login(api: &dyn CampusApi, message: &'static str) -> Result<()> {
    if api.credential().is_none() {
        return Err(ClientError::NotLoggedIn(message.to_string())).or_say(message);
    }
    Ok(())
}

fn require_admin(api: &dyn CampusApi, message: &'static str) -> Result<()> {
    match api.credential() {
        Some(c) if c.role == Role::Admin => Ok(()),
        _ => Err(ClientError::NotLoggedIn(message.to_string())).or_say(message),
    }
}

/// A mutation the server accepted
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    /// The follow-up re-fetch failed; the working set is the one from before
    pub stale: Option<ActionError>,
}

impl<T> Applied<T> {
    fn new(value: T, refreshed: Result<()>) -> Self {
        Self {
            value,
            stale: refreshed.err(),
        }
    }
}

/// Result of a create call
#[derive(Debug)]
pub struct Created<T> {
    pub item: T,
    /// Set when a selected image could not be hosted
    pub image_warning: Option<String>,
    /// The follow-up re-fetch failed
    pub stale: Option<ActionError>,
}

/// Posts feed plus the comment threads that have been opened
#[derive(Debug, Default)]
pub struct FeedView {
    posts: Vec<Post>,
    comments: HashMap<String, Vec<Comment>>,
    loaded: bool,
}

impl FeedView {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn comments(&self, post_id: &str) -> Option<&[Comment]> {
        self.comments.get(post_id).map(Vec::as_slice)
    }

    pub fn refresh(&mut self, api: &dyn CampusApi) -> Result<()> {
        let posts = api.list_posts().or_say("Failed to load posts")?;
        self.posts = posts;
        self.loaded = true;
        Ok(())
    }

    /// Fetch once per view lifetime; later reads use the working set
    pub fn ensure_loaded(&mut self, api: &dyn CampusApi) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.refresh(api)
    }

    pub fn like(&mut self, api: &dyn CampusApi, post_id: &str) -> Result<Applied<()>> {
        require_login(api, "Please login to like posts")?;
        api.like_post(post_id).or_say("Failed to like post")?;
        Ok(Applied::new((), self.refresh(api)))
    }

    pub fn refresh_comments(&mut self, api: &dyn CampusApi, post_id: &str) -> Result<&[Comment]> {
        require_login(api, "Please login to view comments")?;
        let comments = api
            .list_comments(post_id)
            .or_say("Failed to load comments")?;
        let slot = self.comments.entry(post_id.to_string()).or_default();
        *slot = comments;
        Ok(slot.as_slice())
    }

    pub fn add_comment(
        &mut self,
        api: &dyn CampusApi,
        post_id: &str,
        text: &str,
    ) -> Result<Applied<()>> {
        require_login(api, "Please login to comment")?;
        let text = forms::comment(text).or_say("Failed to add comment")?;
        api.add_comment(post_id, &text)
            .or_say("Failed to add comment")?;
        let refreshed = self.refresh_comments(api, post_id).map(|_| ());
        Ok(Applied::new((), refreshed))
    }

    pub fn create_post(
        &mut self,
        api: &dyn CampusApi,
        host: &dyn ImageHost,
        draft: &PostDraft,
    ) -> Result<Created<Post>> {
        draft.validate().or_say("Failed to create post")?;
        require_login(api, "Please login to create a post")?;

        let attachment = upload::attach_best_effort(host, draft.image.as_ref(), "Posting");
        let post = api
            .create_post(&draft.payload(attachment.url))
            .or_say("Failed to create post")?;
        Ok(Created {
            item: post,
            image_warning: attachment.warning,
            stale: self.refresh(api).err(),
        })
    }
}

/// Campus events list
#[derive(Debug, Default)]
pub struct EventsView {
    events: Vec<Event>,
    loaded: bool,
}

impl EventsView {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn refresh(&mut self, api: &dyn CampusApi) -> Result<()> {
        require_login(api, "Please login to view events")?;
        let events = api.list_events().or_say("Failed to load events")?;
        self.events = events;
        self.loaded = true;
        Ok(())
    }

    pub fn ensure_loaded(&mut self, api: &dyn CampusApi) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.refresh(api)
    }

    /// Toggle the caller's RSVP and re-fetch; returns the server's message
    pub fn rsvp(&mut self, api: &dyn CampusApi, event_id: &str) -> Result<Applied<Option<String>>> {
        require_login(api, "Please login to RSVP")?;
        let message = api.rsvp_event(event_id).or_say("Failed to update RSVP")?;
        Ok(Applied::new(message, self.refresh(api)))
    }

    pub fn create_event(
        &mut self,
        api: &dyn CampusApi,
        host: &dyn ImageHost,
        draft: &EventDraft,
    ) -> Result<Created<Event>> {
        draft.validate().or_say("Failed to create event")?;
        require_admin(api, "Please login as admin to create events")?;

        let attachment = upload::attach_best_effort(host, draft.image.as_ref(), "Creating event");
        let event = api
            .create_event(&draft.payload(attachment.url))
            .or_say("Failed to create event")?;
        Ok(Created {
            item: event,
            image_warning: attachment.warning,
            stale: self.refresh(api).err(),
        })
    }
}

/// Admin dashboard: summary counts and the user directory. Events are shared
/// with the events screen.
#[derive(Debug, Default)]
pub struct AdminView {
    totals: Totals,
    users: Vec<User>,
}

impl AdminView {
    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn refresh_totals(&mut self, api: &dyn CampusApi) -> Result<()> {
        require_admin(api, "Please login to access admin dashboard")?;
        self.totals = api.summary().or_say("Failed to load statistics")?;
        Ok(())
    }

    pub fn refresh_users(&mut self, api: &dyn CampusApi) -> Result<()> {
        require_admin(api, "Please login to access admin dashboard")?;
        let users = api.list_users().or_say("Failed to load users")?;
        self.users = users;
        Ok(())
    }

    /// Load everything independently; one failing fetch doesn't stop the rest.
    /// Returns the failures.
    pub fn refresh_all(&mut self, api: &dyn CampusApi, events: &mut EventsView) -> Vec<ActionError> {
        let mut failures = Vec::new();
        if let Err(e) = self.refresh_totals(api) {
            failures.push(e);
        }
        if let Err(e) = events.refresh(api) {
            failures.push(e);
        }
        if let Err(e) = self.refresh_users(api) {
            failures.push(e);
        }
        failures
    }

    pub fn delete_user(&mut self, api: &dyn CampusApi, user_id: &str) -> Result<Applied<()>> {
        require_admin(api, "Please login to access admin dashboard")?;
        api.delete_user(user_id).or_say("Failed to delete user")?;
        let users = self.refresh_users(api);
        let totals = self.refresh_totals(api);
        Ok(Applied::new((), users.and(totals)))
    }

    pub fn create_event(
        &mut self,
        api: &dyn CampusApi,
        host: &dyn ImageHost,
        events: &mut EventsView,
        draft: &EventDraft,
    ) -> Result<Created<Event>> {
        let mut created = events.create_event(api, host, draft)?;
        let totals = self.refresh_totals(api);
        if created.stale.is_none() {
            created.stale = totals.err();
        }
        Ok(created)
    }
}

/// Activity counts for any logged-in viewer, loading the feed and events
/// first if needed
pub fn activity(
    api: &dyn CampusApi,
    viewer: &str,
    feed: &mut FeedView,
    events: &mut EventsView,
) -> Result<ActivityStats> {
    feed.ensure_loaded(api)?;
    events.ensure_loaded(api)?;
    Ok(filter::activity_stats(viewer, feed.posts(), events.events()))
}

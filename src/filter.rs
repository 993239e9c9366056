//! Derived views over fetched collections: search, facet filters, facet
//! options and activity counts. Everything here is pure.

use crate::models::{Event, Post};
use std::collections::BTreeSet;

/// Sentinel facet value meaning "no filter"
pub const ALL: &str = "all";

/// An exact-match predicate over one field, or no predicate at all
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Facet {
    #[default]
    All,
    Value(String),
}

impl Facet {
    /// Parse user input; empty or exactly "all" (lowercase) means no filter
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ALL {
            Self::All
        } else {
            Self::Value(s.to_string())
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Does a single-valued field pass?
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Value(wanted) => value == Some(wanted.as_str()),
        }
    }

    /// Does a multi-valued field pass? (any element equal)
    pub fn matches_any<'a>(&self, mut values: impl Iterator<Item = &'a str>) -> bool {
        match self {
            Self::All => true,
            Self::Value(wanted) => values.any(|v| v == wanted),
        }
    }
}

/// Case-insensitive substring match against any of `fields`
fn text_matches(query: &str, fields: &[&str]) -> bool {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub query: String,
    pub tag: Facet,
    pub department: Facet,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        let author = post.author.as_ref().map(|a| a.name.as_str()).unwrap_or("");
        text_matches(&self.query, &[&post.content, author])
            && self.tag.matches_any(post.tags.iter().map(String::as_str))
            && self.department.matches(post.author_department())
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && !self.tag.is_active() && !self.department.is_active()
    }

    pub fn apply<'a>(&self, posts: &'a [Post]) -> Vec<&'a Post> {
        posts.iter().filter(|p| self.matches(p)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub query: String,
    pub department: Facet,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        text_matches(
            &self.query,
            &[&event.title, &event.description, &event.location],
        ) && self.department.matches(event.department.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && !self.department.is_active()
    }

    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Distinct, sorted, non-empty values
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn tag_options(posts: &[Post]) -> Vec<String> {
    distinct(posts.iter().flat_map(|p| p.tags.iter().map(String::as_str)))
}

pub fn post_department_options(posts: &[Post]) -> Vec<String> {
    distinct(posts.iter().filter_map(|p| p.author_department()))
}

pub fn event_department_options(events: &[Event]) -> Vec<String> {
    distinct(events.iter().filter_map(|e| e.department.as_deref()))
}

/// Per-identity activity shown on the profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub posts: usize,
    pub likes_given: usize,
    pub events_attending: usize,
}

pub fn activity_stats(user_id: &str, posts: &[Post], events: &[Event]) -> ActivityStats {
    ActivityStats {
        posts: posts
            .iter()
            .filter(|p| p.author.as_ref().is_some_and(|a| a.id == user_id))
            .count(),
        likes_given: posts.iter().filter(|p| p.is_liked_by(user_id)).count(),
        events_attending: events.iter().filter(|e| e.has_rsvp(user_id)).count(),
    }
}

//! Plain-text rendering of working sets for the terminal.

use crate::filter::ActivityStats;
use crate::models::{Comment, Event, Post, Profile, Totals, User};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::fmt::Write;

pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Event dates arrive as ISO strings, sometimes with a time part
fn event_date(raw: &str) -> String {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|d| d.format("%a %b %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// One post. `viewer` marks the post as liked; `comments` is the thread
/// length when it has been loaded.
pub fn post(post: &Post, viewer: Option<&str>, comments: Option<usize>) -> String {
    let mut out = String::new();
    let _ = write!(out, "[{}] {}", post.id, post.author_name());
    if let Some(dept) = post.author_department().filter(|d| !d.is_empty()) {
        let _ = write!(out, " ({})", dept);
    }
    let when = timestamp(post.created_at);
    if !when.is_empty() {
        let _ = write!(out, " · {}", when);
    }
    out.push('\n');

    for line in post.content.lines() {
        let _ = writeln!(out, "  {}", line);
    }
    if let Some(url) = &post.image_url {
        let _ = writeln!(out, "  image: {}", url);
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t)).collect();
        let _ = writeln!(out, "  {}", tags.join(" "));
    }

    let liked = viewer.is_some_and(|id| post.is_liked_by(id));
    let _ = write!(
        out,
        "  {} {}",
        if liked { "♥" } else { "♡" },
        pluralize(post.likes.len(), "like")
    );
    if let Some(n) = comments {
        let _ = write!(out, " · {}", pluralize(n, "comment"));
    }
    out
}

/// Filtered feed with its result count and empty state
pub fn feed(posts: &[&Post], total: usize, viewer: Option<&str>) -> String {
    if total == 0 {
        return "No posts yet".to_string();
    }
    if posts.is_empty() {
        return "No posts match your filters. Try adjusting your search.".to_string();
    }
    let mut out = pluralize(posts.len(), "post");
    for p in posts {
        out.push_str("\n\n");
        out.push_str(&post(p, viewer, None));
    }
    out
}

pub fn comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return "No comments yet".to_string();
    }
    comments
        .iter()
        .map(|c| {
            let when = timestamp(c.created_at);
            if when.is_empty() {
                format!("{}: {}", c.author_name(), c.text)
            } else {
                format!("{} ({}): {}", c.author_name(), when, c.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn event(event: &Event, viewer: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", event.id, event.title);
    let _ = write!(out, "  {}", event_date(&event.date));
    if !event.location.is_empty() {
        let _ = write!(out, " @ {}", event.location);
    }
    if let Some(dept) = event.department.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(out, " ({})", dept);
    }
    out.push('\n');
    if !event.description.is_empty() {
        let _ = writeln!(out, "  {}", event.description);
    }
    if let Some(url) = &event.image_url {
        let _ = writeln!(out, "  image: {}", url);
    }
    if let Some(host) = event.created_by.as_ref().filter(|c| !c.name.is_empty()) {
        let _ = writeln!(out, "  hosted by {}", host.name);
    }
    let _ = write!(out, "  {} attending", event.rsvps.len());
    if viewer.is_some_and(|id| event.has_rsvp(id)) {
        out.push_str(" · you're going");
    }
    out
}

pub fn events(events: &[&Event], total: usize, viewer: Option<&str>) -> String {
    if total == 0 {
        return "No events yet".to_string();
    }
    if events.is_empty() {
        return "No events match your filters. Try adjusting your search.".to_string();
    }
    let mut out = pluralize(events.len(), "event");
    for e in events {
        out.push_str("\n\n");
        out.push_str(&event(e, viewer));
    }
    out
}

pub fn facets(label: &str, values: &[String]) -> String {
    if values.is_empty() {
        format!("{}: (none)", label)
    } else {
        format!("{}: {}", label, values.join(", "))
    }
}

pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }
    let mut out = pluralize(users.len(), "user");
    for u in users {
        let _ = write!(out, "\n[{}] {} <{}>", u.id, u.name, u.email);
        if let Some(dept) = u.department.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, " · {}", dept);
        }
        if let Some(year) = &u.year {
            let _ = write!(out, " · year {}", year);
        }
    }
    out
}

pub fn profile(profile: &Profile, stats: Option<ActivityStats>) -> String {
    let mut out = String::new();
    match profile {
        Profile::User(u) => {
            let _ = writeln!(out, "{} <{}> (student)", u.name, u.email);
            if let Some(dept) = &u.department {
                let _ = writeln!(out, "Department: {}", dept);
            }
            if let Some(year) = &u.year {
                let _ = writeln!(out, "Year: {}", year);
            }
            if let Some(bio) = u.bio.as_deref().filter(|b| !b.is_empty()) {
                let _ = writeln!(out, "Bio: {}", bio);
            }
            if !u.interests.is_empty() {
                let _ = writeln!(out, "Interests: {}", u.interests.join(", "));
            }
        }
        Profile::Admin(a) => {
            let _ = writeln!(out, "{} <{}> (admin)", a.name, a.email);
            if let Some(dept) = &a.department {
                let _ = writeln!(out, "Department: {}", dept);
            }
            if let Some(designation) = &a.designation {
                let _ = writeln!(out, "Designation: {}", designation);
            }
        }
    }
    if let Some(s) = stats {
        let _ = writeln!(
            out,
            "{} · {} given · attending {}",
            pluralize(s.posts, "post"),
            pluralize(s.likes_given, "like"),
            pluralize(s.events_attending, "event")
        );
    }
    out.trim_end().to_string()
}

pub fn totals(totals: &Totals) -> String {
    format!(
        "Users: {}\nPosts: {}\nEvents: {}",
        totals.users, totals.posts, totals.events
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::fixtures::{event as make_event, post as make_post};
    use crate::models::{Admin, Member};

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "post"), "0 posts");
        assert_eq!(pluralize(1, "post"), "1 post");
        assert_eq!(pluralize(3, "event"), "3 events");
    }

    #[test]
    fn test_post_without_author() {
        let p = make_post("p1", "orphaned", None, &["misc"]);
        let text = post(&p, None, Some(1));
        assert!(text.starts_with("[p1] Unknown User"));
        assert!(text.contains("#misc"));
        assert!(text.contains("0 likes · 1 comment"));
    }

    #[test]
    fn test_post_marks_viewer_like() {
        let mut p = make_post("p1", "hi", Some(("u1", "Ann", Some("CS"))), &[]);
        p.likes = vec!["u2".to_string()];
        assert!(post(&p, Some("u2"), None).contains("♥ 1 like"));
        assert!(post(&p, Some("u1"), None).contains("♡ 1 like"));
        assert!(post(&p, None, None).contains("Ann (CS)"));
    }

    #[test]
    fn test_feed_empty_states() {
        assert_eq!(feed(&[], 0, None), "No posts yet");
        assert_eq!(
            feed(&[], 4, None),
            "No posts match your filters. Try adjusting your search."
        );

        let p = make_post("p1", "hi", None, &[]);
        assert!(feed(&[&p], 4, None).starts_with("1 post\n"));
    }

    #[test]
    fn test_events_empty_states() {
        assert_eq!(events(&[], 0, None), "No events yet");
        assert_eq!(
            events(&[], 2, None),
            "No events match your filters. Try adjusting your search."
        );
    }

    #[test]
    fn test_event_details() {
        let mut e = make_event("e1", "Fest", "Quad", Some("Arts"), &["u1"]);
        e.rsvps.push(Member::Populated {
            id: "u2".to_string(),
            name: "Bo".to_string(),
        });
        let text = event(&e, Some("u2"));
        assert!(text.contains("Wed May 1, 2024 @ Quad (Arts)"));
        assert!(text.contains("2 attending · you're going"));
        assert!(!event(&e, Some("u9")).contains("you're going"));
    }

    #[test]
    fn test_event_date_passthrough() {
        assert_eq!(event_date("2024-05-01T00:00:00.000Z"), "Wed May 1, 2024");
        assert_eq!(event_date("next week"), "next week");
    }

    #[test]
    fn test_profile_with_stats() {
        let profile = Profile::Admin(Admin {
            id: "a1".to_string(),
            name: "Dean".to_string(),
            email: "dean@x.edu".to_string(),
            department: None,
            designation: Some("Registrar".to_string()),
            created_at: None,
        });
        let text = super::profile(
            &profile,
            Some(ActivityStats {
                posts: 1,
                likes_given: 2,
                events_attending: 0,
            }),
        );
        assert!(text.starts_with("Dean <dean@x.edu> (admin)"));
        assert!(text.contains("Designation: Registrar"));
        assert!(text.ends_with("1 post · 2 likes given · attending 0 events"));
    }

    #[test]
    fn test_comments_and_totals() {
        assert_eq!(comments(&[]), "No comments yet");
        let c = Comment {
            id: "c1".to_string(),
            post: "p1".to_string(),
            author: None,
            text: "nice".to_string(),
            created_at: None,
        };
        assert_eq!(comments(&[c]), "Unknown User: nice");
        assert_eq!(
            totals(&Totals {
                users: 3,
                posts: 2,
                events: 1
            }),
            "Users: 3\nPosts: 2\nEvents: 1"
        );
    }
}

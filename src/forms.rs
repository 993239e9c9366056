//! Client-side validation for everything we submit. A form that fails here
//! never produces a request.

use crate::error::{ClientError, Result};
use crate::models::{Credentials, NewEvent, NewPost, RegisterAdmin, RegisterUser};
use crate::upload::ImageFile;
use chrono::NaiveDate;
use std::path::Path;

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn login(email: &str, password: &str) -> Result<Credentials> {
    if blank(email) || password.is_empty() {
        return Err(ClientError::validation("Please fill in all fields"));
    }
    Ok(Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct UserRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub year: String,
    pub interests: Vec<String>,
}

impl UserRegistration {
    pub fn validate(self) -> Result<RegisterUser> {
        if [&self.name, &self.email, &self.department, &self.year]
            .iter()
            .any(|f| blank(f))
            || self.password.is_empty()
        {
            return Err(ClientError::validation("Please fill in all required fields"));
        }
        Ok(RegisterUser {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            department: self.department.trim().to_string(),
            year: self.year.trim().to_string(),
            interests: normalize_interests(&self.interests),
        })
    }
}

/// Trimmed, de-duplicated, first occurrence wins
pub fn normalize_interests(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for interest in raw.iter().map(|i| i.trim()).filter(|i| !i.is_empty()) {
        if !out.iter().any(|existing| existing == interest) {
            out.push(interest.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct AdminRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub designation: String,
}

impl AdminRegistration {
    pub fn validate(self) -> Result<RegisterAdmin> {
        if blank(&self.name) || blank(&self.email) || self.password.is_empty() {
            return Err(ClientError::validation("Please fill in all required fields"));
        }
        Ok(RegisterAdmin {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            department: self.department.trim().to_string(),
            designation: self.designation.trim().to_string(),
        })
    }
}

/// Comma-separated tag input; order is kept, empties dropped
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub tags: String,
    pub image: Option<ImageFile>,
}

impl PostDraft {
    /// Pick an image to attach; rejected files leave the draft unchanged
    pub fn select_image(&mut self, path: &Path, max_bytes: u64) -> Result<()> {
        self.image = Some(ImageFile::open(path, max_bytes)?);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if blank(&self.content) {
            return Err(ClientError::validation("Post content is required"));
        }
        Ok(())
    }

    /// Payload for an already validated draft
    pub fn payload(&self, image_url: Option<String>) -> NewPost {
        NewPost {
            content: self.content.trim().to_string(),
            image_url,
            tags: parse_tags(&self.tags),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub department: String,
    pub image: Option<ImageFile>,
}

impl EventDraft {
    pub fn select_image(&mut self, path: &Path, max_bytes: u64) -> Result<()> {
        self.image = Some(ImageFile::open(path, max_bytes)?);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if blank(&self.title) || blank(&self.date) {
            return Err(ClientError::validation("Please fill in title and date"));
        }
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            ClientError::validation(format!(
                "Invalid date '{}', expected YYYY-MM-DD",
                self.date.trim()
            ))
        })?;
        Ok(())
    }

    pub fn payload(&self, image_url: Option<String>) -> NewEvent {
        let department = self.department.trim();
        NewEvent {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            date: self.date.trim().to_string(),
            location: self.location.trim().to_string(),
            department: (!department.is_empty()).then(|| department.to_string()),
            image_url: image_url.filter(|u| !u.is_empty()),
        }
    }
}

pub fn comment(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClientError::validation("Comment cannot be empty"));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        assert!(login("a@x.edu", "secret").is_ok());
        let err = login("  ", "secret").unwrap_err();
        assert_eq!(err.user_message(""), "Please fill in all fields");
        assert!(login("a@x.edu", "").is_err());
    }

    #[test]
    fn test_user_registration_required_fields() {
        let form = UserRegistration {
            name: "Ann".to_string(),
            email: "ann@x.edu".to_string(),
            password: "pw".to_string(),
            department: "CS".to_string(),
            year: String::new(),
            interests: vec![],
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.user_message(""), "Please fill in all required fields");
    }

    #[test]
    fn test_user_registration_normalizes() {
        let form = UserRegistration {
            name: " Ann ".to_string(),
            email: "ann@x.edu".to_string(),
            password: "pw".to_string(),
            department: "CS".to_string(),
            year: "2".to_string(),
            interests: vec![
                "Music".to_string(),
                " Gaming ".to_string(),
                "Music".to_string(),
                "".to_string(),
            ],
        };
        let payload = form.validate().unwrap();
        assert_eq!(payload.name, "Ann");
        assert_eq!(payload.interests, vec!["Music", "Gaming"]);
    }

    #[test]
    fn test_admin_registration_optional_fields() {
        let form = AdminRegistration {
            name: "Dean".to_string(),
            email: "dean@x.edu".to_string(),
            password: "pw".to_string(),
            ..Default::default()
        };
        let payload = form.validate().unwrap();
        assert_eq!(payload.designation, "");

        let form = AdminRegistration {
            name: "Dean".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rust, cli ,,  campus"), vec!["rust", "cli", "campus"]);
        assert!(parse_tags(" , ,").is_empty());
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_post_draft() {
        let draft = PostDraft {
            content: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            draft.validate().unwrap_err().user_message(""),
            "Post content is required"
        );

        let draft = PostDraft {
            content: "  Hello campus ".to_string(),
            tags: "intro, hello".to_string(),
            image: None,
        };
        draft.validate().unwrap();
        let payload = draft.payload(None);
        assert_eq!(payload.content, "Hello campus");
        assert_eq!(payload.tags, vec!["intro", "hello"]);
        assert!(payload.image_url.is_none());
    }

    #[test]
    fn test_event_draft_validation() {
        let draft = EventDraft {
            title: "Fest".to_string(),
            ..Default::default()
        };
        assert_eq!(
            draft.validate().unwrap_err().user_message(""),
            "Please fill in title and date"
        );

        let draft = EventDraft {
            title: "Fest".to_string(),
            date: "05/01/2024".to_string(),
            ..Default::default()
        };
        assert!(draft.validate().is_err());

        let draft = EventDraft {
            title: " Fest ".to_string(),
            date: "2024-05-01".to_string(),
            location: " Quad ".to_string(),
            department: "  ".to_string(),
            ..Default::default()
        };
        draft.validate().unwrap();
        let payload = draft.payload(Some(String::new()));
        assert_eq!(payload.title, "Fest");
        assert_eq!(payload.location, "Quad");
        assert!(payload.department.is_none());
        assert!(payload.image_url.is_none());
    }

    #[test]
    fn test_comment() {
        assert_eq!(comment("  nice  ").unwrap(), "nice");
        assert_eq!(
            comment(" ").unwrap_err().user_message(""),
            "Comment cannot be empty"
        );
    }
}

//! UI-agnostic conversation types
//!
//! This module contains the data structures shared by the answer service, the
//! controller and the renderers. Nothing here depends on the terminal.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<Citation>>,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn model(content: impl Into<String>, grounding_chunks: Option<Vec<Citation>>) -> Self {
        Self::new(Role::Model, content.into(), grounding_chunks)
    }

    fn new(role: Role, content: String, grounding_chunks: Option<Vec<Citation>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            grounding_chunks,
            timestamp: Local::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Citations attached to the message, empty when there are none
    pub fn citations(&self) -> &[Citation] {
        self.grounding_chunks.as_deref().unwrap_or(&[])
    }
}

/// Who produced a message. Serialises to the provider's role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A grounding reference returned alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Citation {
    Map(MapCitation),
    Web(WebCitation),
}

impl Citation {
    pub fn uri(&self) -> &str {
        match self {
            Citation::Map(map) => &map.uri,
            Citation::Web(web) => &web.uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapCitation {
    pub uri: String,
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_snippets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebCitation {
    pub uri: String,
    pub title: Option<String>,
}

/// Device coordinates used to bias "nearby" answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl UserLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for UserLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("hello");
        let b = Message::user("hello");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_citations_empty_when_absent() {
        let msg = Message::model("text", None);
        assert!(msg.citations().is_empty());
        assert!(!msg.is_user());
    }

    #[test]
    fn test_citation_serializes_with_kind_tag() {
        let citation = Citation::Web(WebCitation {
            uri: "https://example.com".to_string(),
            title: None,
        });
        let value = serde_json::to_value(&citation).unwrap();
        assert_eq!(value["kind"], "web");
        assert_eq!(value["uri"], "https://example.com");
    }

    #[test]
    fn test_role_names_match_provider() {
        assert_eq!(serde_json::to_value(Role::Model).unwrap(), "model");
        assert_eq!(Role::User.as_str(), "user");
    }
}

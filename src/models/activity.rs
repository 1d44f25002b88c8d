//! Audit trail of admin actions on users and books.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Which entity family a log entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityGroup {
    Book,
    User,
}

impl ActivityGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityGroup::Book => "Book",
            ActivityGroup::User => "User",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Book" => Some(ActivityGroup::Book),
            "User" => Some(ActivityGroup::User),
            _ => None,
        }
    }
}

impl Serialize for ActivityGroup {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateBook,
    UpdateBook,
    DeleteBook,
    SoftDeleteBook,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::CreateUser => "Create user",
            ActivityType::UpdateUser => "Update user",
            ActivityType::DeleteUser => "Delete user",
            ActivityType::CreateBook => "Create book",
            ActivityType::UpdateBook => "Update book",
            ActivityType::DeleteBook => "Delete book",
            ActivityType::SoftDeleteBook => "Toggle soft delete book",
        }
    }
}

impl Serialize for ActivityType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One field-level change inside a log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDescription {
    pub key: String,
    pub value: String,
    pub label: String,
}

impl ActivityDescription {
    pub fn from(key: &str, value: impl ToString, label: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// A stored activity log entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub activity_group: String,
    pub activity_type: String,
    pub description: Vec<ActivityDescription>,
    pub username: String,
    pub execution_time: String,
}

/// A log entry waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub activity_group: ActivityGroup,
    pub activity_type: ActivityType,
    pub description: Vec<ActivityDescription>,
    pub username: String,
    pub execution_time: String,
}

impl NewActivityLog {
    pub fn new(
        group: ActivityGroup,
        activity_type: ActivityType,
        description: Vec<ActivityDescription>,
        username: &str,
    ) -> Self {
        Self {
            activity_group: group,
            activity_type,
            description,
            username: username.to_string(),
            execution_time: Utc::now().to_rfc3339(),
        }
    }
}

/// Query filters for the activity log listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

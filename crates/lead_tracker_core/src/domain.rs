//! crates/lead_tracker_core/src/domain.rs
//!
//! Defines the core data structures for the lead tracker.
//! Field names are serialized in camelCase, which is the persisted layout
//! shared with the web client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Lead Status & Source
//=========================================================================================

/// Workflow tag of a lead. Any value may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    FollowUp,
    Converted,
    Closed,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::FollowUp,
        LeadStatus::Converted,
        LeadStatus::Closed,
    ];

    /// The wire name, e.g. `follow_up`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::FollowUp => "follow_up",
            LeadStatus::Converted => "converted",
            LeadStatus::Closed => "closed",
        }
    }

    /// A lead still needs attention unless it was converted or closed.
    pub fn is_open(&self) -> bool {
        !matches!(self, LeadStatus::Converted | LeadStatus::Closed)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::FollowUp => "Follow Up",
            LeadStatus::Converted => "Converted",
            LeadStatus::Closed => "Closed",
        };
        f.write_str(label)
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    TeacherReferral,
    ParentReferral,
    SchoolEvent,
    Website,
    SocialMedia,
    Community,
    Other,
}

impl LeadSource {
    pub const ALL: [LeadSource; 7] = [
        LeadSource::TeacherReferral,
        LeadSource::ParentReferral,
        LeadSource::SchoolEvent,
        LeadSource::Website,
        LeadSource::SocialMedia,
        LeadSource::Community,
        LeadSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::TeacherReferral => "teacher_referral",
            LeadSource::ParentReferral => "parent_referral",
            LeadSource::SchoolEvent => "school_event",
            LeadSource::Website => "website",
            LeadSource::SocialMedia => "social_media",
            LeadSource::Community => "community",
            LeadSource::Other => "other",
        }
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LeadSource::TeacherReferral => "Teacher Referral",
            LeadSource::ParentReferral => "Parent Referral",
            LeadSource::SchoolEvent => "School Event",
            LeadSource::Website => "Website",
            LeadSource::SocialMedia => "Social Media",
            LeadSource::Community => "Community",
            LeadSource::Other => "Other",
        };
        f.write_str(label)
    }
}

impl FromStr for LeadSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Returned when parsing a status or source name that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

//=========================================================================================
// Lead
//=========================================================================================

/// A prospective-student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub student_name: String,
    pub parent_name: String,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Class or grade label.
    #[serde(rename = "class")]
    pub class_name: String,
    pub street: String,
    pub source: LeadSource,
    pub follow_up_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl Lead {
    /// Builds a fresh lead from form data. Status always starts as `New`.
    pub fn from_form(id: String, form: LeadForm, created_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            student_name: form.student_name,
            parent_name: form.parent_name,
            contact_number: form.contact_number,
            contact_email: form.contact_email.filter(|e| !e.trim().is_empty()),
            class_name: form.class_name,
            street: form.street,
            source: form.source,
            follow_up_date: form.follow_up_date,
            notes: form.notes,
            status: LeadStatus::New,
            created_at: now,
            updated_at: now,
            created_by: created_by.to_string(),
        }
    }

    /// Merges the present fields of `patch` into this lead.
    /// Does not touch `updated_at`; the repository owns timestamps.
    pub fn apply(&mut self, patch: LeadPatch) {
        if let Some(v) = patch.student_name {
            self.student_name = v;
        }
        if let Some(v) = patch.parent_name {
            self.parent_name = v;
        }
        if let Some(v) = patch.contact_number {
            self.contact_number = v;
        }
        if let Some(v) = patch.contact_email {
            // An empty string clears the optional email.
            self.contact_email = Some(v).filter(|e| !e.trim().is_empty());
        }
        if let Some(v) = patch.class_name {
            self.class_name = v;
        }
        if let Some(v) = patch.street {
            self.street = v;
        }
        if let Some(v) = patch.source {
            self.source = v;
        }
        if let Some(v) = patch.follow_up_date {
            self.follow_up_date = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
    }
}

/// The data a user fills in to create a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadForm {
    pub student_name: String,
    pub parent_name: String,
    pub contact_number: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: String,
    pub street: String,
    pub source: LeadSource,
    pub follow_up_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

/// A partial update. Identity, creation time and owner are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPatch {
    pub student_name: Option<String>,
    pub parent_name: Option<String>,
    pub contact_number: Option<String>,
    pub contact_email: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub street: Option<String>,
    pub source: Option<LeadSource>,
    pub follow_up_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: Option<LeadStatus>,
}

impl LeadPatch {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Query criteria for `LeadRepository::filter`. Absent criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub search_query: Option<String>,
}

impl LeadFilter {
    /// True when `lead` satisfies every criterion that is set.
    pub fn matches(&self, lead: &Lead) -> bool {
        if self.status.is_some_and(|s| s != lead.status) {
            return false;
        }
        if self.source.is_some_and(|s| s != lead.source) {
            return false;
        }
        if self.from.is_some_and(|from| lead.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| lead.created_at > to) {
            return false;
        }
        match self.search_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let query = query.to_lowercase();
                lead.student_name.to_lowercase().contains(&query)
                    || lead.parent_name.to_lowercase().contains(&query)
            }
            _ => true,
        }
    }
}

//=========================================================================================
// User & Session
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Admin,
    #[serde(other)]
    Other,
}

/// The authenticated identity, persisted under `user_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// A freshly issued login: the user and the bearer token that identifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Lifecycle of the client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted credentials have not been read yet.
    Hydrating,
    Anonymous,
    Authenticated { user: User, token: String },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Hydrating)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }
}

//! Common ID Types
//!
//! Type-safe ID wrappers for the learning domain. Every entity key is a UUID
//! tagged with a marker type so a `CourseId` can never be passed where a
//! `TenantId` is expected.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// Generic typed ID wrapper
///
/// Usage:
/// ```
/// use kernel::id::{Id, markers};
/// type CourseId = Id<markers::Course>;
/// let id = CourseId::new();
/// assert_eq!(id.prefix().len(), 8);
/// ```
pub struct Id<T> {
    value: Uuid,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Create a new random ID (UUID v4)
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            value: uuid,
            _marker: PhantomData,
        }
    }

    /// Parse from the hyphenated text form
    pub fn parse_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    /// Convert to UUID
    pub fn into_uuid(self) -> Uuid {
        self.value
    }

    /// First eight characters of the hyphenated form
    ///
    /// The hyphenated form always starts with eight hex digits, so this never
    /// cuts through a separator.
    pub fn prefix(&self) -> String {
        let mut text = self.value.hyphenated().to_string();
        text.truncate(8);
        text
    }
}

// Manual impls: derives would require the marker types themselves to
// implement each trait.

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

/// Marker types for different entity IDs
pub mod markers {
    /// Tenant (customer organization partition)
    pub struct Tenant;
    /// Platform user (learner, instructor or admin)
    pub struct User;
    pub struct Course;
    pub struct Enrollment;
    /// Per-user course progress record
    pub struct Progress;
    pub struct ProgressSnapshot;
    pub struct Certificate;
    pub struct CertificateTemplate;
}

/// Type aliases for common IDs
pub type TenantId = Id<markers::Tenant>;
pub type UserId = Id<markers::User>;
pub type CourseId = Id<markers::Course>;
pub type EnrollmentId = Id<markers::Enrollment>;
pub type ProgressId = Id<markers::Progress>;
pub type SnapshotId = Id<markers::ProgressSnapshot>;
pub type CertificateId = Id<markers::Certificate>;
pub type TemplateId = Id<markers::CertificateTemplate>;

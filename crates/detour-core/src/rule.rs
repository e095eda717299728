use crate::error::NormalizeError;
use crate::normalize::{normalize_external, normalize_internal};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use typed_builder::TypedBuilder;

/// Store-assigned identifier of a redirect rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(u64);

impl RuleId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RuleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A redirect rule as supplied by a caller, before normalization.
///
/// # Examples
///
/// ```
/// use detour_core::RuleDraft;
///
/// let draft = RuleDraft::builder()
///     .source("/old-page/")
///     .destination("https://example.com/new-page")
///     .status(301)
///     .build();
/// let rule = draft.normalize().unwrap();
/// assert_eq!(rule.source, "old-page");
/// assert_eq!(rule.destination, "new-page");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
pub struct RuleDraft {
    /// The path (or full URL) that should redirect.
    #[builder(setter(into))]
    pub source: String,
    /// Where requests for `source` are sent.
    #[builder(setter(into))]
    pub destination: String,
    /// Whether `destination` is an opaque external URL rather than a path.
    #[builder(default)]
    #[serde(default)]
    pub external: bool,
    /// Redirect status code, e.g. 301.
    pub status: u16,
}

impl RuleDraft {
    /// Normalizes the source as an internal URL and the destination according
    /// to its `external` flag.
    pub fn normalize(&self) -> Result<NormalizedRule, NormalizeError> {
        let source = normalize_internal(&self.source)?;
        let destination = if self.external {
            normalize_external(&self.destination)?
        } else {
            normalize_internal(&self.destination)?
        };

        Ok(NormalizedRule {
            source,
            destination,
            external: self.external,
            status: self.status,
        })
    }
}

/// A rule whose paths went through the normalizer. Only these reach a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRule {
    pub source: String,
    pub destination: String,
    pub external: bool,
    pub status: u16,
}

impl NormalizedRule {
    /// Returns `true` if the rule would redirect a path to itself.
    pub fn is_self_redirect(&self) -> bool {
        self.source == self.destination
    }

    /// Returns `true` if `other` maps this rule's destination back to its source.
    pub fn is_reverse_of(&self, other: &RedirectRule) -> bool {
        other.source == self.destination && other.destination == self.source
    }
}

/// A persisted redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    pub id: RuleId,
    pub source: String,
    pub destination: String,
    pub external: bool,
    pub status: u16,
    /// Write-order marker, bumped on every save of this rule.
    pub revision: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

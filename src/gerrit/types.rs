use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::GerritError;

/// Author substituted when a change carries no owner display name.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Regex folding each maximal run of non-word characters into one `_`.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("Invalid author fold regex"));

/// One change as returned by the change-search endpoint.
///
/// Only the fields the grabber consumes are modelled; everything else in the
/// response is ignored. `revisions` is keyed by commit hash; a `BTreeMap`
/// keeps enumeration order deterministic (lexicographic by hash).
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRecord {
    /// Server-assigned numeric change id.
    #[serde(rename = "_number")]
    pub number: u64,
    /// Optional topic grouping several related changes.
    #[serde(default)]
    pub topic: Option<String>,
    /// Uploader account details (present with DETAILED_ACCOUNTS).
    #[serde(default)]
    pub owner: Option<Owner>,
    /// Commit hash of the current patch set (present with CURRENT_REVISION).
    #[serde(default)]
    pub current_revision: Option<String>,
    /// Patch sets by commit hash.
    #[serde(default)]
    pub revisions: BTreeMap<String, RevisionInfo>,
}

/// Owner sub-record of a change.
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    /// Display name; absence means the author is unknown.
    #[serde(default)]
    pub name: Option<String>,
}

/// Detail record for one patch set.
#[derive(Debug, Clone, Deserialize)]
pub struct RevisionInfo {
    /// Fetchable ref, e.g. `refs/changes/34/1234/1`.
    #[serde(default, rename = "ref")]
    pub fetch_ref: Option<String>,
}

/// A change validated for grabbing: one revision selected, author fallback
/// applied, all other required fields known to be present.
#[derive(Debug, Clone)]
pub struct Change {
    pub number: u64,
    /// Normalised owner name, or `unknown`.
    pub author: String,
    pub topic: Option<String>,
    /// Commit hash of the selected patch set.
    pub revision: String,
    /// Ref the selected patch set is fetched by.
    pub fetch_ref: String,
}

impl Change {
    /// Validate a raw record into a grabbable change.
    ///
    /// The revision picked is the server-identified current revision when it
    /// appears in the revisions map, else the lexicographically smallest
    /// hash. Only the owner name may be absent (substituted with `unknown`
    /// here, exactly once); an empty revisions map or a revision without a
    /// ref is a malformed record.
    pub fn from_record(record: &ChangeRecord) -> Result<Change, GerritError> {
        let (revision, info) =
            select_revision(record).ok_or_else(|| GerritError::MalformedChange {
                number: record.number,
                reason: "change has no revisions".to_string(),
            })?;

        let fetch_ref = info
            .fetch_ref
            .clone()
            .ok_or_else(|| GerritError::MalformedChange {
                number: record.number,
                reason: format!("revision {revision} has no ref"),
            })?;

        let author = record
            .owner
            .as_ref()
            .and_then(|owner| owner.name.as_deref())
            .map_or_else(|| UNKNOWN_AUTHOR.to_string(), normalize_author);

        Ok(Change {
            number: record.number,
            author,
            topic: record.topic.clone(),
            revision: revision.clone(),
            fetch_ref,
        })
    }

    /// Local branch the change is fetched into:
    /// `review/<author>/<topic>`, falling back to the change number when the
    /// change has no topic.
    pub fn branch_name(&self) -> String {
        match &self.topic {
            Some(topic) => format!("review/{}/{}", self.author, topic),
            None => format!("review/{}/{}", self.author, self.number),
        }
    }
}

/// Pick the patch set to grab. Deterministic: the server-identified current
/// revision wins, else the smallest hash in the map.
fn select_revision(record: &ChangeRecord) -> Option<(&String, &RevisionInfo)> {
    if let Some(current) = &record.current_revision {
        if let Some(entry) = record.revisions.get_key_value(current) {
            return Some(entry);
        }
    }
    record.revisions.iter().next()
}

/// Lowercase a display name and collapse each run of non-word characters to
/// a single underscore, e.g. `Jane O'Brien` -> `jane_o_brien`.
pub fn normalize_author(name: &str) -> String {
    NON_WORD.replace_all(name, "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ChangeRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_author_collapses_non_word_runs() {
        assert_eq!(normalize_author("Jane Doe"), "jane_doe");
        assert_eq!(normalize_author("Jane O'Brien"), "jane_o_brien");
        assert_eq!(normalize_author("a - b"), "a_b");
    }

    #[test]
    fn test_normalize_author_plain_name_is_only_lowercased() {
        assert_eq!(normalize_author("Alice"), "alice");
        assert_eq!(normalize_author("under_score"), "under_score");
    }

    #[test]
    fn test_decode_full_change_record() {
        let rec = record(
            r#"{
                "_number": 1234,
                "topic": "fix-bug",
                "owner": {"name": "Jane Doe", "_account_id": 7},
                "current_revision": "abc123",
                "revisions": {"abc123": {"ref": "refs/changes/34/1234/1"}},
                "subject": "ignored extra field"
            }"#,
        );
        assert_eq!(rec.number, 1234);
        assert_eq!(rec.topic.as_deref(), Some("fix-bug"));
        assert_eq!(rec.current_revision.as_deref(), Some("abc123"));
        assert_eq!(rec.revisions.len(), 1);
    }

    #[test]
    fn test_change_from_full_record() {
        let rec = record(
            r#"{
                "_number": 1234,
                "topic": "fix-bug",
                "owner": {"name": "Jane Doe"},
                "revisions": {"abc123": {"ref": "refs/changes/34/1234/1"}}
            }"#,
        );
        let change = Change::from_record(&rec).unwrap();
        assert_eq!(change.number, 1234);
        assert_eq!(change.author, "jane_doe");
        assert_eq!(change.revision, "abc123");
        assert_eq!(change.fetch_ref, "refs/changes/34/1234/1");
        assert_eq!(change.branch_name(), "review/jane_doe/fix-bug");
    }

    #[test]
    fn test_missing_owner_name_falls_back_to_unknown() {
        let rec = record(
            r#"{
                "_number": 5,
                "owner": {},
                "revisions": {"aa": {"ref": "refs/changes/05/5/1"}}
            }"#,
        );
        assert_eq!(Change::from_record(&rec).unwrap().author, "unknown");

        let rec = record(
            r#"{"_number": 5, "revisions": {"aa": {"ref": "refs/changes/05/5/1"}}}"#,
        );
        assert_eq!(Change::from_record(&rec).unwrap().author, "unknown");
    }

    #[test]
    fn test_missing_topic_uses_change_number_verbatim() {
        let rec = record(
            r#"{"_number": 98765, "revisions": {"aa": {"ref": "refs/changes/65/98765/2"}}}"#,
        );
        let change = Change::from_record(&rec).unwrap();
        assert_eq!(change.branch_name(), "review/unknown/98765");
    }

    #[test]
    fn test_current_revision_wins_over_smaller_hash() {
        let rec = record(
            r#"{
                "_number": 7,
                "current_revision": "zzz",
                "revisions": {
                    "aaa": {"ref": "refs/changes/07/7/1"},
                    "zzz": {"ref": "refs/changes/07/7/2"}
                }
            }"#,
        );
        let change = Change::from_record(&rec).unwrap();
        assert_eq!(change.revision, "zzz");
        assert_eq!(change.fetch_ref, "refs/changes/07/7/2");
    }

    #[test]
    fn test_without_current_revision_smallest_hash_wins() {
        let rec = record(
            r#"{
                "_number": 7,
                "revisions": {
                    "bbb": {"ref": "refs/changes/07/7/2"},
                    "aaa": {"ref": "refs/changes/07/7/1"}
                }
            }"#,
        );
        let change = Change::from_record(&rec).unwrap();
        assert_eq!(change.revision, "aaa");
    }

    #[test]
    fn test_stale_current_revision_falls_back_to_smallest_hash() {
        let rec = record(
            r#"{
                "_number": 7,
                "current_revision": "gone",
                "revisions": {"bbb": {"ref": "refs/changes/07/7/2"}}
            }"#,
        );
        let change = Change::from_record(&rec).unwrap();
        assert_eq!(change.revision, "bbb");
    }

    #[test]
    fn test_empty_revisions_is_malformed() {
        let rec = record(r#"{"_number": 42}"#);
        let err = Change::from_record(&rec).unwrap_err();
        assert!(matches!(
            err,
            GerritError::MalformedChange { number: 42, .. }
        ));
    }

    #[test]
    fn test_revision_without_ref_is_malformed() {
        let rec = record(r#"{"_number": 43, "revisions": {"abc": {}}}"#);
        let err = Change::from_record(&rec).unwrap_err();
        assert!(matches!(
            err,
            GerritError::MalformedChange { number: 43, .. }
        ));
    }
}

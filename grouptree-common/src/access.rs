//! View level access rules
//!
//! A view level grants access to a list of usergroups, stored as text such as
//! `[1,6,7]`. When groups are deleted their ids are scrubbed from every list.

use crate::db::models::ViewLevel;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Usergroup ids granted by a view level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<i64>);

impl RuleSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn ids(&self) -> &[i64] {
        &self.0
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop every occurrence of `ids`; true when anything was removed
    pub fn remove_all(&mut self, ids: &[i64]) -> bool {
        let before = self.0.len();
        self.0.retain(|id| !ids.contains(id));
        self.0.len() != before
    }
}

impl FromStr for RuleSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| Error::InvalidInput(format!("Invalid rule list '{}': {}", s, e)))
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", id)?;
        }
        f.write_str("]")
    }
}

impl ViewLevel {
    /// Parse the stored rule text
    pub fn rule_set(&self) -> Result<RuleSet> {
        self.rules.parse()
    }
}

/// Remove `ids` from serialized rule text
///
/// Well-formed lists are rewritten structurally. Anything else falls back to
/// token substitution on `[id,` `,id,` `,id]` and `[id]`.
pub fn scrub_rule_text(text: &str, ids: &[i64]) -> String {
    match text.parse::<RuleSet>() {
        Ok(mut rules) => {
            if rules.remove_all(ids) {
                rules.to_string()
            } else {
                text.to_string()
            }
        }
        Err(_) => scrub_tokens(text, ids),
    }
}

/// Repeats until stable: one `replace` pass skips the second of two adjacent
/// occurrences such as `,5,5,`
fn scrub_tokens(text: &str, ids: &[i64]) -> String {
    let mut scrubbed = text.to_string();
    for id in ids {
        loop {
            let next = scrubbed
                .replace(&format!("[{id},"), "[")
                .replace(&format!(",{id},"), ",")
                .replace(&format!(",{id}]"), "]")
                .replace(&format!("[{id}]"), "[]");
            if next == scrubbed {
                break;
            }
            scrubbed = next;
        }
    }
    scrubbed
}

/// Rewrite every view level that references one of `ids`
///
/// Returns the number of view levels changed.
pub(crate) async fn scrub_view_levels_in(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<usize> {
    let levels: Vec<(i64, String)> = sqlx::query_as("SELECT id, rules FROM viewlevels")
        .fetch_all(&mut *conn)
        .await?;

    let mut changed = 0;
    for (id, rules) in levels {
        if rules.parse::<RuleSet>().is_err() {
            warn!("View level {} has malformed rules '{}', scrubbing as text", id, rules);
        }

        let scrubbed = scrub_rule_text(&rules, ids);
        if scrubbed == rules {
            continue;
        }

        sqlx::query("UPDATE viewlevels SET rules = ? WHERE id = ?")
            .bind(&scrubbed)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        debug!("View level {} rules {} -> {}", id, rules, scrubbed);
        changed += 1;
    }

    Ok(changed)
}

/// Create a view level granting `rules`
pub async fn create_view_level(
    pool: &SqlitePool,
    title: &str,
    rules: &RuleSet,
) -> Result<ViewLevel> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("View level title must not be empty".to_string()));
    }

    let ordering: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(ordering), -1) + 1 FROM viewlevels")
        .fetch_one(pool)
        .await?;

    let result = sqlx::query("INSERT INTO viewlevels (title, ordering, rules) VALUES (?, ?, ?)")
        .bind(title)
        .bind(ordering)
        .bind(rules.to_string())
        .execute(pool)
        .await?;

    Ok(ViewLevel {
        id: result.last_insert_rowid(),
        title: title.to_string(),
        ordering,
        rules: rules.to_string(),
    })
}

pub async fn load_view_level(pool: &SqlitePool, id: i64) -> Result<Option<ViewLevel>> {
    let row = sqlx::query_as::<_, (i64, String, i64, String)>(
        "SELECT id, title, ordering, rules FROM viewlevels WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, title, ordering, rules)| ViewLevel {
        id,
        title,
        ordering,
        rules,
    }))
}

pub async fn list_view_levels(pool: &SqlitePool) -> Result<Vec<ViewLevel>> {
    let rows = sqlx::query_as::<_, (i64, String, i64, String)>(
        "SELECT id, title, ordering, rules FROM viewlevels ORDER BY ordering, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title, ordering, rules)| ViewLevel {
            id,
            title,
            ordering,
            rules,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let rules: RuleSet = "[1, 6,7]".parse().unwrap();
        assert_eq!(rules.ids(), &[1, 6, 7]);
        assert_eq!(rules.to_string(), "[1,6,7]");
        assert_eq!(RuleSet::default().to_string(), "[]");
    }

    #[test]
    fn test_scrub_structured() {
        assert_eq!(scrub_rule_text("[1,6,7]", &[6]), "[1,7]");
        assert_eq!(scrub_rule_text("[6,7]", &[6, 7]), "[]");
        assert_eq!(scrub_rule_text("[12,3]", &[1, 2]), "[12,3]");
    }

    #[test]
    fn test_scrub_leaves_untouched_text_verbatim() {
        // Unchanged lists keep their original formatting
        assert_eq!(scrub_rule_text("[1, 2]", &[5]), "[1, 2]");
    }

    #[test]
    fn test_scrub_token_fallback() {
        assert_eq!(scrub_rule_text("[4,5,6", &[5]), "[4,6");
        assert_eq!(scrub_rule_text("x[5]", &[5]), "x[]");
        assert_eq!(scrub_rule_text("[5,9,x]", &[5]), "[9,x]");
        assert_eq!(scrub_rule_text("[x,5]", &[5]), "[x]");
    }

    #[test]
    fn test_scrub_token_fallback_adjacent_duplicates() {
        assert_eq!(scrub_rule_text("[1,5,5,x]", &[5]), "[1,x]");
        assert_eq!(scrub_rule_text("[5,5,5,x]", &[5]), "[x]");
        assert_eq!(scrub_rule_text("[x,5,5]", &[5]), "[x]");
        assert_eq!(scrub_rule_text("[x,5,5,55]", &[5]), "[x,55]");
    }

    #[test]
    fn test_remove_all_reports_change() {
        let mut rules = RuleSet::new([1, 2, 2, 3]);
        assert!(rules.remove_all(&[2]));
        assert_eq!(rules.ids(), &[1, 3]);
        assert!(!rules.remove_all(&[9]));
        assert!(rules.contains(1));
    }

    #[test]
    fn test_malformed_rules_rejected() {
        assert!("not a list".parse::<RuleSet>().is_err());
        assert!("[1,\"a\"]".parse::<RuleSet>().is_err());
    }
}

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::{MaintenanceError, MaintenanceResult};
use crate::artifacts::ArtifactStore;
use crate::cases::{CaseStore, Scenario};
use crate::classify::{Verdict, classify_with_tokens};

/// Verdict counts of one scenario group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    pub total: usize,
    /// Absent for unscored groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail: Option<usize>,
}

impl GroupCounts {
    fn record(&mut self, verdict: Verdict) {
        self.total += 1;
        let pass = self.pass.get_or_insert(0);
        let fail = self.fail.get_or_insert(0);
        match verdict {
            Verdict::Pass => *pass += 1,
            Verdict::Fail => *fail += 1,
            Verdict::Unscored => {}
        }
    }
}

/// Counts keyed by scenario group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    pub groups: BTreeMap<String, GroupCounts>,
    /// Cases with no observed file, scored as empty output
    pub missing: usize,
}

impl VerifySummary {
    pub fn group(&self, name: &str) -> GroupCounts {
        self.groups.get(name).copied().unwrap_or_default()
    }
}

impl fmt::Display for VerifySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (group, counts) in &self.groups {
            match (counts.pass, counts.fail) {
                (None, None) => writeln!(f, "{:<12} total {:>4}", group, counts.total)?,
                (pass, fail) => writeln!(
                    f,
                    "{:<12} total {:>4}  pass {:>4}  fail {:>4}",
                    group,
                    counts.total,
                    pass.unwrap_or(0),
                    fail.unwrap_or(0)
                )?,
            }
        }
        if self.missing > 0 {
            writeln!(f, "missing observed: {}", self.missing)?;
        }
        Ok(())
    }
}

/// Re-score every case from its observed file with the shared classifier
pub fn verify_counts(
    store: &CaseStore,
    artifacts: &ArtifactStore,
    realtime_case: &str,
) -> MaintenanceResult<VerifySummary> {
    let mut summary = VerifySummary::default();

    for case in &store.cases {
        let observed = artifacts
            .read_observed(&case.id)
            .map_err(|source| MaintenanceError::Read {
                path: artifacts.observed_path(&case.id),
                source,
            })?
            .unwrap_or_else(|| {
                summary.missing += 1;
                String::new()
            });

        let scenario = Scenario::select(case, realtime_case);
        let verdict = classify_with_tokens(
            &case.expected,
            observed.trim(),
            &case.category,
            case.expected_tokens.as_deref(),
        );
        let counts = summary.groups.entry(scenario.group().to_string()).or_default();
        if scenario.is_ui() {
            counts.total += 1;
        } else {
            counts.record(verdict);
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::TestCase;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_counts_per_group() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug"));
        artifacts.write_observed("Pos_Fun_0001", "going home I am").unwrap();
        artifacts.write_observed("Pos_Fun_0002", "nothing useful").unwrap();
        artifacts.write_observed("Neg_Fun_0001", "").unwrap();

        let store = CaseStore {
            path: dir.path().join("testcases.json"),
            cases: vec![
                TestCase::new("Pos_Fun_0001", "positive functional", "mama gedhara yanavaa", "I am going home"),
                TestCase::new("Pos_Fun_0002", "positive functional", "oyaata kohomadha", "How are you"),
                TestCase::new("Neg_Fun_0001", "negative functional", "", ""),
                TestCase::new("Pos_UI_0001", "positive ui", "mama", ""),
                TestCase::new("Neg_UI_0001", "negative ui", "", ""),
            ],
        };

        let summary = verify_counts(&store, &artifacts, "Pos_UI_0001").unwrap();

        assert_eq!(
            summary.group("positive"),
            GroupCounts { total: 2, pass: Some(1), fail: Some(1) }
        );
        assert_eq!(
            summary.group("negative"),
            GroupCounts { total: 1, pass: Some(1), fail: Some(0) }
        );
        assert_eq!(summary.group("ui").total, 1);
        assert_eq!(summary.group("ui_realtime").total, 1);
        assert_eq!(summary.group("ui").pass, None);

        let printed = summary.to_string();
        assert!(printed.contains("positive     total    2  pass    1  fail    1"));
        assert!(printed.contains("ui           total    1\n"));
        assert_eq!(summary.missing, 2);
        assert!(printed.contains("missing observed: 2"));
    }

    #[test]
    fn test_absent_observed_files_are_counted_and_scored_empty() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug"));
        let store = CaseStore {
            path: dir.path().join("testcases.json"),
            cases: vec![
                TestCase::new("Neg_Fun_0001", "negative functional", "", ""),
                TestCase::new("Pos_Fun_0001", "positive functional", "mama", "මම"),
            ],
        };

        let summary = verify_counts(&store, &artifacts, "Pos_UI_0001").unwrap();

        assert_eq!(summary.missing, 2);
        assert_eq!(
            summary.group("negative"),
            GroupCounts { total: 1, pass: Some(1), fail: Some(0) }
        );
        assert_eq!(
            summary.group("positive"),
            GroupCounts { total: 1, pass: Some(0), fail: Some(1) }
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["missing"], 2);
        assert_eq!(json["groups"]["negative"]["fail"], 0);
        assert!(json["groups"].get("ui").is_none());
    }
}

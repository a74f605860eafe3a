//! Summaries derived from fetched entries.
//!
//! Everything here is a pure function over a slice of [`Entry`]; nothing
//! touches storage. Callers fetch with [`crate::store::Worklog`] first.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::db::Entry;

/// Label of the bucket for entries without a project.
pub const UNASSIGNED_PROJECT: &str = "(unassigned)";

/// Number of pending next steps shown in a project snapshot.
pub const OPEN_ACTIONS_PREVIEW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project: String,
    pub entries: usize,
    pub last_date: NaiveDate,
    /// Whole days from `last_date` to the evaluation date.
    pub days_since: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub last_date: NaiveDate,
    pub last_summary: String,
    pub open_actions: Vec<String>,
}

/// Entry counts per calendar month of `date`, oldest month first.
pub fn monthly_counts(entries: &[Entry]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        *months.entry(entry.date.format("%Y-%m").to_string()).or_default() += 1;
    }
    months
        .into_iter()
        .map(|(month, entries)| MonthlyCount { month, entries })
        .collect()
}

/// Per-project activity as of `today`.
///
/// Ordered by `days_since` ascending (most recently touched first), then by
/// project label.
pub fn project_summary(entries: &[Entry], today: NaiveDate) -> Vec<ProjectSummary> {
    let mut groups: BTreeMap<&str, (usize, NaiveDate)> = BTreeMap::new();
    for entry in entries {
        let label = match entry.project.trim() {
            "" => UNASSIGNED_PROJECT,
            project => project,
        };
        let group = groups.entry(label).or_insert((0, entry.date));
        group.0 += 1;
        group.1 = group.1.max(entry.date);
    }

    let mut summaries: Vec<ProjectSummary> = groups
        .into_iter()
        .map(|(project, (count, last_date))| ProjectSummary {
            project: project.to_string(),
            entries: count,
            last_date,
            days_since: (today - last_date).num_days(),
        })
        .collect();
    summaries.sort_by(|a, b| {
        a.days_since
            .cmp(&b.days_since)
            .then_with(|| a.project.cmp(&b.project))
    });
    summaries
}

/// [`project_summary`] evaluated against the local calendar date.
pub fn project_summary_today(entries: &[Entry]) -> Vec<ProjectSummary> {
    project_summary(entries, Local::now().date_naive())
}

/// Latest state of one project's entries.
///
/// The most recent entry is the one with the latest `date`, the highest id
/// among ties. Open actions are the first non-empty `next_steps` in newest-first
/// order, capped at [`OPEN_ACTIONS_PREVIEW`]. Returns `None` for no entries.
pub fn project_snapshot(entries: &[Entry]) -> Option<ProjectSnapshot> {
    let mut newest_first: Vec<&Entry> = entries.iter().collect();
    newest_first.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

    let latest = newest_first.first()?;
    let open_actions = newest_first
        .iter()
        .map(|e| e.next_steps.trim())
        .filter(|s| !s.is_empty())
        .take(OPEN_ACTIONS_PREVIEW)
        .map(str::to_string)
        .collect();

    Some(ProjectSnapshot {
        last_date: latest.date,
        last_summary: latest.summary.clone(),
        open_actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{day, entry};

    #[test]
    fn test_monthly_counts() {
        let entries = vec![
            entry(3, "2024-02-01", "", ""),
            entry(1, "2024-01-05", "", ""),
            entry(2, "2024-01-20", "", ""),
        ];
        let counts = monthly_counts(&entries);
        assert_eq!(
            counts,
            vec![
                MonthlyCount { month: "2024-01".to_string(), entries: 2 },
                MonthlyCount { month: "2024-02".to_string(), entries: 1 },
            ]
        );
        assert!(monthly_counts(&[]).is_empty());
    }

    #[test]
    fn test_monthly_counts_spans_years_in_order() {
        let entries = vec![
            entry(1, "2024-01-31", "", ""),
            entry(2, "2023-12-01", "", ""),
            entry(3, "2023-12-31", "", ""),
        ];
        let months: Vec<_> = monthly_counts(&entries).into_iter().map(|m| m.month).collect();
        assert_eq!(months, vec!["2023-12", "2024-01"]);
    }

    #[test]
    fn test_project_summary_groups_and_orders() {
        let entries = vec![
            entry(1, "2024-03-01", "Pilot", ""),
            entry(2, "2024-03-10", "Pilot", ""),
            entry(3, "2024-01-15", "Retrofit", ""),
            entry(4, "2024-03-10", "", ""),
            entry(5, "2024-02-01", "  ", ""),
            entry(6, "2024-03-10", "Audit", ""),
        ];
        let summary = project_summary(&entries, day("2024-03-15"));

        let rows: Vec<(&str, usize, i64)> = summary
            .iter()
            .map(|s| (s.project.as_str(), s.entries, s.days_since))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("(unassigned)", 2, 5),
                ("Audit", 1, 5),
                ("Pilot", 2, 5),
                ("Retrofit", 1, 60),
            ]
        );
        assert_eq!(summary[2].last_date, day("2024-03-10"));
    }

    #[test]
    fn test_project_summary_same_day_is_zero() {
        let entries = vec![entry(1, "2024-03-15", "Pilot", "")];
        let summary = project_summary(&entries, day("2024-03-15"));
        assert_eq!(summary[0].days_since, 0);
    }

    #[test]
    fn test_project_snapshot() {
        let entries = vec![
            entry(1, "2024-01-01", "Pilot", "first step"),
            entry(2, "2024-03-01", "Pilot", ""),
            entry(3, "2024-03-01", "Pilot", "book site visit"),
            entry(4, "2024-02-01", "Pilot", "  "),
            entry(5, "2024-02-15", "Pilot", "send quote"),
            entry(6, "2024-01-20", "Pilot", "call back"),
            entry(7, "2024-01-10", "Pilot", "share deck"),
            entry(8, "2024-01-05", "Pilot", "ask for sample"),
        ];
        let snapshot = project_snapshot(&entries).expect("snapshot");

        assert_eq!(snapshot.last_date, day("2024-03-01"));
        assert_eq!(snapshot.last_summary, "entry 3", "highest id wins a date tie");
        assert_eq!(
            snapshot.open_actions,
            vec!["book site visit", "send quote", "call back", "share deck", "ask for sample"]
        );
    }

    #[test]
    fn test_project_snapshot_empty() {
        assert_eq!(project_snapshot(&[]), None);
    }
}

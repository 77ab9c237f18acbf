//! Export planner: turns a list of changes into queue tasks.
//!
//! Which objects changed is computed upstream; this only decides what task each
//! change becomes, and which prefixes get a success marker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::{ExportTask, LocationError, ObjectPointer};
use crate::marker::SuccessMatcher;

pub const DEFAULT_MARKER_NAME: &str = "_SUCCESS";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("entry {index}: invalid {field} location: {source}")]
    InvalidLocation {
        index: usize,
        field: &'static str,
        #[source]
        source: LocationError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// One changed object, with fully qualified locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub source: String,
    pub destination: String,
    #[serde(default = "default_change")]
    pub change: ChangeKind,
}

fn default_change() -> ChangeKind {
    ChangeKind::Added
}

impl ExportEntry {
    pub fn added(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            change: ChangeKind::Added,
        }
    }

    pub fn removed(destination: impl Into<String>) -> Self {
        Self {
            source: String::new(),
            destination: destination.into(),
            change: ChangeKind::Removed,
        }
    }
}

/// Tasks for one export.
///
/// `markers` must only be enqueued once every task in `data` completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPlan {
    pub data: Vec<ExportTask>,
    pub markers: Vec<ExportTask>,
}

impl ExportPlan {
    pub fn len(&self) -> usize {
        self.data.len() + self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.markers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExportPlanner {
    matcher: SuccessMatcher,
    marker_name: String,
}

impl ExportPlanner {
    pub fn new(matcher: SuccessMatcher, marker_name: impl Into<String>) -> Self {
        Self {
            matcher,
            marker_name: marker_name.into(),
        }
    }

    pub fn plan(&self, entries: &[ExportEntry]) -> Result<ExportPlan, PlanError> {
        let mut ordered: Vec<(&ExportEntry, ObjectPointer)> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let destination = ObjectPointer::parse(&entry.destination).map_err(|source| {
                PlanError::InvalidLocation {
                    index,
                    field: "destination",
                    source,
                }
            })?;
            if entry.change != ChangeKind::Removed {
                ObjectPointer::parse(&entry.source).map_err(|source| {
                    PlanError::InvalidLocation {
                        index,
                        field: "source",
                        source,
                    }
                })?;
            }
            ordered.push((entry, destination));
        }
        ordered.sort_by(|a, b| a.1.cmp(&b.1));

        let mut plan = ExportPlan::default();
        // (namespace, prefix) -> last copied key
        let mut last_keys: BTreeMap<(String, String), String> = BTreeMap::new();

        for (entry, destination) in &ordered {
            match entry.change {
                ChangeKind::Added | ChangeKind::Changed => {
                    plan.data
                        .push(ExportTask::copy(entry.source.clone(), destination.location()));
                    if self.matcher.is_enabled() {
                        let group = (
                            destination.storage_namespace().to_string(),
                            destination.prefix().to_string(),
                        );
                        let key = destination.identifier();
                        let last = last_keys.entry(group).or_default();
                        if key > last.as_str() {
                            *last = key.to_string();
                        }
                    }
                }
                ChangeKind::Removed => {
                    plan.data.push(ExportTask::delete(destination.location()));
                }
            }
        }

        for ((namespace, _), last_key) in last_keys {
            if self.matcher.is_match(&last_key) {
                let marker = ObjectPointer::new(namespace, last_key).sibling(&self.marker_name);
                plan.markers.push(ExportTask::touch(marker.location()));
            }
        }

        Ok(plan)
    }
}

impl Default for ExportPlanner {
    fn default() -> Self {
        Self::new(SuccessMatcher::Disabled, DEFAULT_MARKER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(patterns: &[&str]) -> ExportPlanner {
        ExportPlanner::new(SuccessMatcher::build(patterns).unwrap(), DEFAULT_MARKER_NAME)
    }

    #[test]
    fn copies_and_deletes_in_destination_order() {
        let entries = vec![
            ExportEntry::added("mem://repo/b", "s3://out/b"),
            ExportEntry::removed("s3://out/a"),
            ExportEntry {
                source: "mem://repo/c".into(),
                destination: "s3://out/c".into(),
                change: ChangeKind::Changed,
            },
        ];
        let plan = ExportPlanner::default().plan(&entries).unwrap();
        assert_eq!(
            plan.data,
            vec![
                ExportTask::delete("s3://out/a"),
                ExportTask::copy("mem://repo/b", "s3://out/b"),
                ExportTask::copy("mem://repo/c", "s3://out/c"),
            ]
        );
        assert!(plan.markers.is_empty());
    }

    #[test]
    fn marker_only_for_prefixes_whose_last_key_matches() {
        let entries = vec![
            ExportEntry::added("mem://repo/t1/part-0", "s3://out/t1/part-0"),
            ExportEntry::added("mem://repo/t1/part-1.success", "s3://out/t1/part-1.success"),
            ExportEntry::added("mem://repo/t2/x.success", "s3://out/t2/x.success"),
            ExportEntry::added("mem://repo/t2/z", "s3://out/t2/z"),
            ExportEntry::added("mem://repo/top.success", "s3://out/top.success"),
        ];
        let plan = planner(&[r".*\.success$"]).plan(&entries).unwrap();
        assert_eq!(plan.data.len(), 5);
        assert_eq!(
            plan.markers,
            vec![
                ExportTask::touch("s3://out/_SUCCESS"),
                ExportTask::touch("s3://out/t1/_SUCCESS"),
            ]
        );
    }

    #[test]
    fn removed_entries_do_not_count_as_last_key() {
        let entries = vec![
            ExportEntry::added("mem://repo/t/a", "s3://out/t/a"),
            ExportEntry::removed("s3://out/t/z.success"),
        ];
        let plan = planner(&[r".*\.success$"]).plan(&entries).unwrap();
        assert!(plan.markers.is_empty());
    }

    #[test]
    fn disabled_matcher_emits_no_markers() {
        let entries = vec![ExportEntry::added("mem://repo/a.success", "s3://out/a.success")];
        let plan = planner(&[]).plan(&entries).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.markers.is_empty());
    }

    #[test]
    fn custom_marker_name() {
        let planner = ExportPlanner::new(
            SuccessMatcher::build(&[".*"]).unwrap(),
            "_lakefs_export_done",
        );
        let plan = planner
            .plan(&[ExportEntry::added("mem://repo/d/f", "s3://out/d/f")])
            .unwrap();
        assert_eq!(plan.markers, vec![ExportTask::touch("s3://out/d/_lakefs_export_done")]);
    }

    #[test]
    fn malformed_locations_are_rejected() {
        let err = ExportPlanner::default()
            .plan(&[ExportEntry::added("repo/a", "s3://out/a")])
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidLocation { index: 0, field: "source", .. }));

        let entries: Vec<ExportEntry> =
            serde_json::from_str(r#"[{"source":"mem://r/a","destination":"s3://out/a"}]"#).unwrap();
        assert_eq!(entries[0].change, ChangeKind::Added);
    }
}

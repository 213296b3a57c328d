//! Task projection types
//!
//! Merged entities projected into the task tree shape consumed by dashboards
//! and agents.

use serde::{Deserialize, Serialize};

use crate::error::DocketError;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

impl TaskStatus {
    /// Map a canonical docket status; unknown or missing statuses are pending.
    pub fn from_canonical(status: Option<&str>) -> Self {
        match status {
            Some("complete") => TaskStatus::Completed,
            Some("in_progress") => TaskStatus::InProgress,
            Some("failed") => TaskStatus::Failed,
            Some("cancelled") => TaskStatus::Cancelled,
            Some("blocked") => TaskStatus::Paused,
            _ => TaskStatus::Pending,
        }
    }
}

/// Where a task's data came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Outline documents only
    Roadmap,
    /// File or folder layout documents only
    Filesystem,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskNode {
    pub id: String,
    pub title: String,
    pub source: TaskSource,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub agent: Option<String>,
    pub children: Vec<TaskNode>,
    pub spec_path: Option<String>,
}

impl TaskNode {
    pub fn to_json(&self) -> Result<String, DocketError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocketError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TaskNode::count).sum::<usize>()
    }
}

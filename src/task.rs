use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// `completed_at` after moving into this status.
    pub fn completed_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TaskStatus::Completed => Some(now),
            TaskStatus::Pending | TaskStatus::InProgress => None,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!(
                "unknown status '{}' (expected pending, in-progress or completed)",
                other
            )),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Sod,
    Eod,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Sod => "sod",
            TaskType::Eod => "eod",
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sod" => Ok(TaskType::Sod),
            "eod" => Ok(TaskType::Eod),
            other => Err(format!("unknown task type '{}' (expected sod or eod)", other)),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for TaskType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

/// Input for one item of a batch create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTask {
    pub fn new(task: impl Into<String>, description: Option<String>) -> Self {
        NewTask {
            task: task.into(),
            description,
        }
    }

    /// Parses `label` or `label: description` as typed on the command line.
    /// Only a colon followed by a space separates the two, so times and URLs
    /// stay in the label.
    pub fn parse(input: &str) -> Self {
        match input.split_once(": ") {
            Some((label, description)) if !description.trim().is_empty() => {
                NewTask::new(label.trim(), Some(description.trim().to_string()))
            }
            Some((label, _)) => NewTask::new(label.trim(), None),
            None => NewTask::new(input.trim(), None),
        }
    }
}

/// Anything that can be rendered as a report bullet.
pub trait Describe {
    fn label(&self) -> &str;
    fn description(&self) -> Option<&str>;
}

impl<T: Describe + ?Sized> Describe for &T {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }
}

impl Describe for Task {
    fn label(&self) -> &str {
        &self.task
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Describe for NewTask {
    fn label(&self) -> &str {
        &self.task
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Parses a `YYYY-MM-DD` calendar day.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_at_follows_status() {
        let now = Utc::now();
        assert_eq!(TaskStatus::Completed.completed_at(now), Some(now));
        assert_eq!(TaskStatus::Pending.completed_at(now), None);
        assert_eq!(TaskStatus::InProgress.completed_at(now), None);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!("in-progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(TaskStatus::InProgress.to_string(), "in-progress");
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!("eod".parse::<TaskType>(), Ok(TaskType::Eod));
        assert!("lunch".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_task_serializes_with_wire_names() {
        let task = Task {
            id: 7,
            task: "Write report".to_string(),
            description: None,
            status: TaskStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
            task_type: TaskType::Eod,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "in-progress");
        assert_eq!(value["type"], "eod");
        assert!(value["completed_at"].is_null());
    }

    #[test]
    fn test_new_task_parse() {
        assert_eq!(NewTask::parse("Review PR"), NewTask::new("Review PR", None));
        assert_eq!(
            NewTask::parse("Review PR: backend #42"),
            NewTask::new("Review PR", Some("backend #42".to_string()))
        );
        assert_eq!(NewTask::parse("Review PR:  "), NewTask::new("Review PR", None));
    }

    #[test]
    fn test_new_task_parse_keeps_colons_inside_label() {
        assert_eq!(NewTask::parse("Sync at 10:30"), NewTask::new("Sync at 10:30", None));
        assert_eq!(
            NewTask::parse("Read https://example.com/rfc"),
            NewTask::new("Read https://example.com/rfc", None)
        );
        assert_eq!(
            NewTask::parse("Standup at 09:15: daily sync"),
            NewTask::new("Standup at 09:15", Some("daily sync".to_string()))
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-01"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }
}

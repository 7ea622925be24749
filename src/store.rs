use crate::error::{Error, Result};
use crate::task::{parse_date, NewTask, Task, TaskStatus, TaskType};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    task         TEXT NOT NULL,
    description  TEXT,
    status       TEXT NOT NULL DEFAULT 'pending',
    type         TEXT NOT NULL DEFAULT 'sod',
    created_at   TEXT NOT NULL,
    completed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
";

const SELECT_TASK: &str =
    "SELECT id, task, description, status, type, created_at, completed_at FROM tasks";

/// SQLite-backed store for `Task` records.
pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!(path = %path.display(), "opened task database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(TaskStore { conn })
    }

    /// Creates every item in one transaction, sharing `task_type` and the
    /// creation timestamp. A `date` pins `created_at` to midnight UTC of that day.
    pub fn create_batch(
        &mut self,
        items: &[NewTask],
        task_type: TaskType,
        date: Option<&str>,
    ) -> Result<Vec<Task>> {
        if let Some(index) = items.iter().position(|item| item.task.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "task #{} has an empty label",
                index + 1
            )));
        }

        let created_at = match date {
            Some(raw) => parse_date(raw)
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
                .ok_or_else(|| {
                    Error::Validation(format!("invalid date '{}', expected YYYY-MM-DD", raw))
                })?,
            None => Utc::now(),
        };

        let tx = self.conn.transaction()?;
        let mut created = Vec::with_capacity(items.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks(task, description, status, type, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for item in items {
                let id = stmt.insert(params![
                    item.task,
                    item.description,
                    TaskStatus::Pending,
                    task_type,
                    created_at
                ])?;
                created.push(Task {
                    id,
                    task: item.task.clone(),
                    description: item.description.clone(),
                    status: TaskStatus::Pending,
                    created_at,
                    completed_at: None,
                    task_type,
                });
            }
        }
        tx.commit()?;

        info!(
            count = created.len(),
            task_type = %task_type,
            created_at = %created_at,
            "created task batch"
        );
        Ok(created)
    }

    /// Tasks created on `date` (`YYYY-MM-DD`), newest first. A malformed date
    /// yields no tasks rather than an error.
    pub fn find_by_date(&self, date: &str) -> Result<Vec<Task>> {
        let Some(day) = parse_date(date) else {
            debug!(date, "unparseable date, returning no tasks");
            return Ok(Vec::new());
        };

        self.query_tasks(
            &format!(
                "{} WHERE date(created_at) = ?1 ORDER BY created_at DESC, id DESC",
                SELECT_TASK
            ),
            params![day],
        )
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TASK),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn update_status(&self, id: i64, status: TaskStatus) -> Result<Option<Task>> {
        let completed_at = status.completed_at(Utc::now());
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![id, status, completed_at],
        )?;

        if changed == 0 {
            debug!(id, "status update for unknown task");
            return Ok(None);
        }

        info!(id, status = %status, "updated task status");
        self.find_by_id(id)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!(id, "deleted task");
        }
        Ok(removed > 0)
    }

    /// Pending tasks created on the UTC calendar day before today.
    pub fn find_pending_for_previous_day(&self) -> Result<Vec<Task>> {
        self.find_pending_for_day_before(Utc::now().date_naive())
    }

    pub fn find_pending_for_day_before(&self, today: NaiveDate) -> Result<Vec<Task>> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };

        self.query_tasks(
            &format!(
                "{} WHERE date(created_at) = ?1 AND status = ?2 \
                 ORDER BY created_at DESC, id DESC",
                SELECT_TASK
            ),
            params![yesterday, TaskStatus::Pending],
        )
    }

    fn query_tasks<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let tasks = stmt
            .query_map(params, task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = tasks.len(), "queried tasks");
        Ok(tasks)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        task: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        task_type: row.get(4)?,
        created_at: row.get::<_, DateTime<Utc>>(5)?,
        completed_at: row.get::<_, Option<DateTime<Utc>>>(6)?,
    })
}

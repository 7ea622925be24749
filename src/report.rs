use crate::config::ReportConfig;
use crate::format::format_tasks;
use crate::task::{Describe, Task, TaskStatus, DATE_FORMAT};
use chrono::{NaiveDate, Utc};

/// A composed email, ready for the mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

/// Builds the SOD and EOD letters.
pub struct Composer<'a> {
    config: &'a ReportConfig,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Composer { config }
    }

    pub fn compose_sod<T: Describe>(&self, tasks: &[T]) -> Report {
        self.compose_sod_on(tasks, Utc::now().date_naive())
    }

    pub fn compose_sod_on<T: Describe>(&self, tasks: &[T], today: NaiveDate) -> Report {
        let body = format!(
            "{greeting}\n\
             \n\
             Good morning.\n\
             \n\
             I hope you're doing well.\n\
             \n\
             Planned Tasks for the Day:\n\
             {tasks}\n\
             \n\
             Thank you for your support and guidance.\n\
             \n\
             {closing}\n",
            greeting = self.config.greeting,
            tasks = format_tasks(tasks),
            closing = self.closing(),
        );

        Report {
            subject: self.subject("SOD", &today.format(DATE_FORMAT).to_string()),
            body,
        }
    }

    /// Splits `tasks` into completed and pending blocks. `date` defaults to today.
    pub fn compose_eod(&self, tasks: &[Task], date: Option<&str>) -> Report {
        self.compose_eod_on(tasks, date, Utc::now().date_naive())
    }

    pub fn compose_eod_on(&self, tasks: &[Task], date: Option<&str>, today: NaiveDate) -> Report {
        let (completed, pending): (Vec<&Task>, Vec<&Task>) = tasks
            .iter()
            .partition(|task| task.status == TaskStatus::Completed);

        let date = match date {
            Some(date) if !date.trim().is_empty() => date.trim().to_string(),
            _ => today.format(DATE_FORMAT).to_string(),
        };

        let body = format!(
            "{greeting}\n\
             \n\
             Good evening.\n\
             \n\
             Here is my End of Day (EOD) update for {date}\n\
             \n\
             Tasks Completed:\n\
             {completed}\n\
             \n\
             Pending:\n\
             {pending}\n\
             \n\
             Thank you once again for your continued support.\n\
             \n\
             {closing}\n",
            greeting = self.config.greeting,
            date = date,
            completed = format_tasks(&completed),
            pending = format_tasks(&pending),
            closing = self.closing(),
        );

        Report {
            subject: self.subject("EOD", &date),
            body,
        }
    }

    fn subject(&self, label: &str, date: &str) -> String {
        format!("{} Update – {} – {}", label, self.config.sender_name, date)
    }

    fn closing(&self) -> String {
        let mut closing = String::from("Best regards,");
        for line in &self.config.signature {
            closing.push('\n');
            closing.push_str(line);
        }
        closing
    }
}

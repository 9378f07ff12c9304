use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::error::validation_error;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// The fixed set of task categories.
/// Corresponds to the `task_category` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "task_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Education,
    Hobby,
    Other,
}

/// Calendar window applied to a task's `start_date`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// `start_date` is today.
    Day,
    /// `start_date` falls in the Monday-to-Sunday week containing today.
    Week,
    /// `start_date` is in today's year and month.
    Month,
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Period {
    /// Resolves the period into the concrete date range it covers, relative to `today`.
    pub fn window(self, today: NaiveDate) -> DateWindow {
        match self {
            Period::Day => DateWindow {
                start: today,
                end: today,
            },
            Period::Week => {
                let start =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                DateWindow {
                    start,
                    end: start + Duration::days(6),
                }
            }
            Period::Month => {
                let start = today - Duration::days(i64::from(today.day0()));
                // Any day 32 days past the 1st lands in the following month.
                let next = start + Duration::days(32);
                let next_start = next - Duration::days(i64::from(next.day0()));
                DateWindow {
                    start,
                    end: next_start - Duration::days(1),
                }
            }
        }
    }
}

/// The server's notion of "today" used for period windows and stats.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub category: Option<TaskCategory>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// `None` until the task is modified for the first time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub category: Option<TaskCategory>,
}

/// Partial update payload. A field that is absent (or `null`) leaves the stored
/// value untouched; there is no way to clear a field through an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
}

/// The writable fields of a task after validation.
///
/// Only obtainable through `TaskInput::into_draft` or `TaskUpdate::apply`, so a
/// repository receiving one can write it without re-checking.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) start_date: Option<NaiveDate>,
    pub(crate) end_date: Option<NaiveDate>,
    pub(crate) start_time: Option<NaiveTime>,
    pub(crate) end_time: Option<NaiveTime>,
    pub(crate) category: Option<TaskCategory>,
    pub(crate) completed: bool,
}

impl TaskDraft {
    fn normalized(mut self) -> Result<Self, ValidationErrors> {
        self.title = self.title.trim().to_string();
        validate_task(&self)?;
        Ok(self)
    }
}

impl TaskInput {
    /// Trims and validates the payload; new tasks always start incomplete.
    pub fn into_draft(self) -> Result<TaskDraft, ValidationErrors> {
        TaskDraft {
            title: self.title,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
            category: self.category,
            completed: false,
        }
        .normalized()
    }
}

impl TaskUpdate {
    /// Overlays the supplied fields onto `current` and validates the result as a whole.
    pub fn apply(&self, current: &Task) -> Result<TaskDraft, ValidationErrors> {
        TaskDraft {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            description: self.description.clone().or_else(|| current.description.clone()),
            start_date: self.start_date.or(current.start_date),
            end_date: self.end_date.or(current.end_date),
            start_time: self.start_time.or(current.start_time),
            end_time: self.end_time.or(current.end_time),
            category: self.category.or(current.category),
            completed: self.completed.unwrap_or(current.completed),
        }
        .normalized()
    }
}

/// Checks every field rule of a task, collecting all failures.
pub fn validate_task(draft: &TaskDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title_len = draft.title.trim().chars().count();
    if title_len == 0 {
        errors.add("title", validation_error("empty", "Title must not be empty"));
    } else if title_len > TITLE_MAX_CHARS {
        errors.add(
            "title",
            validation_error("length", "Title must be at most 200 characters"),
        );
    }

    if let Some(description) = &draft.description {
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.add(
                "description",
                validation_error("length", "Description must be at most 1000 characters"),
            );
        }
    }

    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if end < start {
            errors.add(
                "end_date",
                validation_error("date_order", "End date cannot be before start date"),
            );
        } else if start == end {
            if let (Some(start_time), Some(end_time)) = (draft.start_time, draft.end_time) {
                if end_time <= start_time {
                    errors.add(
                        "end_time",
                        validation_error("time_order", "End time must be after start time"),
                    );
                }
            }
        }
    }

    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Conjunctive filters for listing tasks. `None` means "don't filter on this".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub period: Option<Period>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if let Some(period) = self.period {
            let window = period.window(today);
            match task.start_date {
                Some(date) if window.contains(date) => {}
                _ => return false,
            }
        }
        if self.category.is_some() && task.category != self.category {
            return false;
        }
        if let Some(completed) = self.completed {
            if task.completed != completed {
                return false;
            }
        }
        true
    }
}

/// Listing order: incomplete first, then `start_date` ascending with undated
/// tasks last, then newest first. The id breaks any remaining tie.
pub fn listing_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (a.start_date, b.start_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Search order: newest first, id as tie-break.
pub fn search_order(a: &Task, b: &Task) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Case-insensitive substring match on title or description.
pub fn matches_search(task: &Task, text: &str) -> bool {
    let needle = text.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task
            .description
            .as_deref()
            .map_or(false, |d| d.to_lowercase().contains(&needle))
}

/// Aggregate counters over a (period-filtered) set of tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    /// Past `end_date` and not completed.
    pub overdue: i64,
    /// Starting or ending today.
    pub today: i64,
}

impl TaskStats {
    pub fn from_counts(total: i64, completed: i64, overdue: i64, today: i64) -> Self {
        Self {
            total,
            completed,
            pending: total - completed,
            overdue,
            today,
        }
    }

    pub fn tally<'a, I>(tasks: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let (mut total, mut completed, mut overdue, mut due_today) = (0, 0, 0, 0);
        for task in tasks {
            total += 1;
            if task.completed {
                completed += 1;
            } else if task.end_date.map_or(false, |end| end < today) {
                overdue += 1;
            }
            if task.start_date == Some(today) || task.end_date == Some(today) {
                due_today += 1;
            }
        }
        Self::from_counts(total, completed, overdue, due_today)
    }
}

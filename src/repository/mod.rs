//! Persistence boundary.
//!
//! Handlers and the session middleware only ever see `Arc<dyn UserRepository>` and
//! `Arc<dyn TaskRepository>`. Every task operation takes the caller's user id and is
//! scoped to it: a task owned by someone else behaves exactly like a missing one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::error::{validation_error, AppError};
use crate::models::{NewUser, Period, Task, TaskDraft, TaskFilter, TaskStats, TaskUpdate, User};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Offset pagination, applied after filtering and sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Rejects a negative `skip` or a `limit` outside `1..=MAX_LIMIT`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.skip < 0 {
            errors.add("skip", validation_error("range", "skip must not be negative"));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            errors.add(
                "limit",
                validation_error("range", "limit must be between 1 and 1000"),
            );
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// One-based page number the offset falls on.
    pub fn page(&self) -> i64 {
        (self.skip / self.limit).saturating_add(1)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        total / self.limit + i64::from(total % self.limit != 0)
    }
}

/// User identity records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Inserts a user. Fails with `AppError::DuplicateEmail` if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;
}

/// Per-owner task records and queries.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, owner_id: i32, draft: TaskDraft) -> Result<Task, AppError>;

    async fn get(&self, task_id: Uuid, owner_id: i32) -> Result<Option<Task>, AppError>;

    /// Filtered, sorted page of tasks plus the size of the whole filtered set.
    async fn list(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: Pagination,
        today: NaiveDate,
    ) -> Result<(Vec<Task>, i64), AppError>;

    /// Case-insensitive substring search over title and description, newest first.
    async fn search(
        &self,
        owner_id: i32,
        text: &str,
        page: Pagination,
    ) -> Result<(Vec<Task>, i64), AppError>;

    /// Applies `update` atomically. Returns `None` if the task is absent or not owned,
    /// and a validation error if the patched task would be invalid.
    async fn update(
        &self,
        task_id: Uuid,
        owner_id: i32,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError>;

    async fn delete(&self, task_id: Uuid, owner_id: i32) -> Result<bool, AppError>;

    async fn toggle_completion(&self, task_id: Uuid, owner_id: i32)
        -> Result<Option<Task>, AppError>;

    async fn stats(
        &self,
        owner_id: i32,
        period: Option<Period>,
        today: NaiveDate,
    ) -> Result<TaskStats, AppError>;
}

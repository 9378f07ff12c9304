use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Pagination, TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::task::{listing_order, matches_search, search_order};
use crate::models::{NewUser, Period, Task, TaskDraft, TaskFilter, TaskStats, TaskUpdate, User};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    tasks: HashMap<Uuid, Task>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Store {
    /// Wall-clock time, nudged forward so no two writes share a timestamp.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn owned_mut(&mut self, task_id: Uuid, owner_id: i32) -> Option<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .filter(|task| task.user_id == owner_id)
    }

    fn owned_by(&self, owner_id: i32) -> impl Iterator<Item = &Task> {
        self.tasks.values().filter(move |task| task.user_id == owner_id)
    }
}

/// Process-local repository with the same semantics as `PgRepository`.
///
/// Each operation holds the lock for its whole read-modify-write, which gives
/// the same atomicity a single transaction gives the Postgres implementation.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate(tasks: Vec<Task>, page: Pagination) -> Vec<Task> {
    tasks
        .into_iter()
        .skip(page.skip.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|existing| existing.email == user.email) {
            return Err(AppError::DuplicateEmail);
        }

        let created_at = store.next_timestamp();
        let user = User {
            id: store.users.len() as i32 + 1,
            name: user.name,
            email: user.email,
            hashed_password: user.hashed_password,
            is_active: true,
            created_at,
            updated_at: None,
        };
        store.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn create(&self, owner_id: i32, draft: TaskDraft) -> Result<Task, AppError> {
        let mut store = self.store.write().await;
        if !store.users.iter().any(|user| user.id == owner_id) {
            return Err(AppError::InternalServerError(format!(
                "Task owner {} does not exist",
                owner_id
            )));
        }

        let task = Task {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            start_date: draft.start_date,
            end_date: draft.end_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            category: draft.category,
            completed: draft.completed,
            created_at: store.next_timestamp(),
            updated_at: None,
            user_id: owner_id,
        };
        store.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, task_id: Uuid, owner_id: i32) -> Result<Option<Task>, AppError> {
        let store = self.store.read().await;
        Ok(store
            .tasks
            .get(&task_id)
            .filter(|task| task.user_id == owner_id)
            .cloned())
    }

    async fn list(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: Pagination,
        today: NaiveDate,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let store = self.store.read().await;
        let mut tasks: Vec<Task> = store
            .owned_by(owner_id)
            .filter(|task| filter.matches(task, today))
            .cloned()
            .collect();
        tasks.sort_by(listing_order);

        let total = tasks.len() as i64;
        Ok((paginate(tasks, page), total))
    }

    async fn search(
        &self,
        owner_id: i32,
        text: &str,
        page: Pagination,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let store = self.store.read().await;
        let mut tasks: Vec<Task> = store
            .owned_by(owner_id)
            .filter(|task| matches_search(task, text))
            .cloned()
            .collect();
        tasks.sort_by(search_order);

        let total = tasks.len() as i64;
        Ok((paginate(tasks, page), total))
    }

    async fn update(
        &self,
        task_id: Uuid,
        owner_id: i32,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let mut store = self.store.write().await;
        let draft = match store.owned_mut(task_id, owner_id) {
            Some(task) => update.apply(task)?,
            None => return Ok(None),
        };

        let now = store.next_timestamp();
        let Some(task) = store.owned_mut(task_id, owner_id) else {
            return Ok(None);
        };
        task.title = draft.title;
        task.description = draft.description;
        task.start_date = draft.start_date;
        task.end_date = draft.end_date;
        task.start_time = draft.start_time;
        task.end_time = draft.end_time;
        task.category = draft.category;
        task.completed = draft.completed;
        task.updated_at = Some(now);
        Ok(Some(task.clone()))
    }

    async fn delete(&self, task_id: Uuid, owner_id: i32) -> Result<bool, AppError> {
        let mut store = self.store.write().await;
        if store.owned_mut(task_id, owner_id).is_none() {
            return Ok(false);
        }
        Ok(store.tasks.remove(&task_id).is_some())
    }

    async fn toggle_completion(
        &self,
        task_id: Uuid,
        owner_id: i32,
    ) -> Result<Option<Task>, AppError> {
        let mut store = self.store.write().await;
        let now = store.next_timestamp();
        Ok(store.owned_mut(task_id, owner_id).map(|task| {
            task.completed = !task.completed;
            task.updated_at = Some(now);
            task.clone()
        }))
    }

    async fn stats(
        &self,
        owner_id: i32,
        period: Option<Period>,
        today: NaiveDate,
    ) -> Result<TaskStats, AppError> {
        let store = self.store.read().await;
        let filter = TaskFilter {
            period,
            ..Default::default()
        };
        Ok(TaskStats::tally(
            store
                .owned_by(owner_id)
                .filter(|task| filter.matches(task, today)),
            today,
        ))
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Pagination, TaskRepository, UserRepository};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{NewUser, Period, Task, TaskDraft, TaskFilter, TaskStats, TaskUpdate, User};

const USER_COLUMNS: &str = "id, name, email, hashed_password, is_active, created_at, updated_at";
const TASK_COLUMNS: &str = "id, title, description, start_date, end_date, start_time, end_time, \
                            category, completed, created_at, updated_at, user_id";
const LISTING_ORDER: &str =
    " ORDER BY completed ASC, start_date ASC NULLS LAST, created_at DESC, id ASC";
const SEARCH_ORDER: &str = " ORDER BY created_at DESC, id ASC";

/// sqlx-backed repository over the `users` and `tasks` tables.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations are up to date");
        Ok(())
    }
}

/// Escapes LIKE wildcards so `text` matches literally.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_owner_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    owner_id: i32,
    filter: &TaskFilter,
    today: NaiveDate,
) {
    builder.push(" WHERE user_id = ").push_bind(owner_id);
    if let Some(period) = filter.period {
        let window = period.window(today);
        builder
            .push(" AND start_date BETWEEN ")
            .push_bind(window.start)
            .push(" AND ")
            .push_bind(window.end);
    }
    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }
    if let Some(completed) = filter.completed {
        builder.push(" AND completed = ").push_bind(completed);
    }
}

fn push_search_filter(builder: &mut QueryBuilder<'_, Postgres>, owner_id: i32, pattern: &str) {
    builder
        .push(" WHERE user_id = ")
        .push_bind(owner_id)
        .push(" AND (title ILIKE ")
        .push_bind(pattern.to_string())
        .push(" ESCAPE '\\' OR description ILIKE ")
        .push_bind(pattern.to_string())
        .push(" ESCAPE '\\')");
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    builder
        .push(" OFFSET ")
        .push_bind(page.skip)
        .push(" LIMIT ")
        .push_bind(page.limit);
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        // A concurrent registration surfaces as a unique violation, mapped to DuplicateEmail.
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, hashed_password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.name)
        .bind(user.email)
        .bind(user.hashed_password)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl TaskRepository for PgRepository {
    async fn create(&self, owner_id: i32, draft: TaskDraft) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, start_date, end_date, start_time, end_time, \
             category, completed, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.category)
        .bind(draft.completed)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn get(&self, task_id: Uuid, owner_id: i32) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn list(
        &self,
        owner_id: i32,
        filter: &TaskFilter,
        page: Pagination,
        today: NaiveDate,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let mut tx = self.pool.begin().await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_owner_filters(&mut count, owner_id, filter, today);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_owner_filters(&mut select, owner_id, filter, today);
        select.push(LISTING_ORDER);
        push_page(&mut select, page);
        let tasks = select.build_query_as::<Task>().fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok((tasks, total))
    }

    async fn search(
        &self,
        owner_id: i32,
        text: &str,
        page: Pagination,
    ) -> Result<(Vec<Task>, i64), AppError> {
        let pattern = like_pattern(text);
        let mut tx = self.pool.begin().await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_search_filter(&mut count, owner_id, &pattern);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_search_filter(&mut select, owner_id, &pattern);
        select.push(SEARCH_ORDER);
        push_page(&mut select, page);
        let tasks = select.build_query_as::<Task>().fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok((tasks, total))
    }

    async fn update(
        &self,
        task_id: Uuid,
        owner_id: i32,
        update: &TaskUpdate,
    ) -> Result<Option<Task>, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };
        // Dropping `tx` on a validation error rolls the transaction back.
        let draft = update.apply(&current)?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = $1, description = $2, start_date = $3, end_date = $4,
                 start_time = $5, end_time = $6, category = $7, completed = $8, updated_at = NOW()
             WHERE id = $9 AND user_id = $10
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.category)
        .bind(draft.completed)
        .bind(task_id)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    async fn delete(&self, task_id: Uuid, owner_id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_completion(
        &self,
        task_id: Uuid,
        owner_id: i32,
    ) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET completed = NOT completed, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn stats(
        &self,
        owner_id: i32,
        period: Option<Period>,
        today: NaiveDate,
    ) -> Result<TaskStats, AppError> {
        let filter = TaskFilter {
            period,
            ..Default::default()
        };

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE completed), COUNT(*) FILTER (WHERE end_date < ",
        );
        query
            .push_bind(today)
            .push(" AND NOT completed), COUNT(*) FILTER (WHERE start_date = ")
            .push_bind(today)
            .push(" OR end_date = ")
            .push_bind(today)
            .push(") FROM tasks");
        push_owner_filters(&mut query, owner_id, &filter, today);

        let (total, completed, overdue, due_today): (i64, i64, i64, i64) =
            query.build_query_as().fetch_one(&self.pool).await?;
        Ok(TaskStats::from_counts(total, completed, overdue, due_today))
    }
}

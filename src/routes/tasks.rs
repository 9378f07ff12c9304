use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{today, Period, Task, TaskCategory, TaskFilter, TaskInput, TaskStats, TaskUpdate},
    repository::{Pagination, DEFAULT_LIMIT},
    state::AppState,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Query string accepted by the listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub period: Option<Period>,
    pub category: Option<TaskCategory>,
    pub completed: Option<bool>,
    pub search: Option<String>,
}

impl ListQuery {
    fn pagination(&self) -> Result<Pagination, AppError> {
        let page = Pagination::new(self.skip.unwrap_or(0), self.limit.unwrap_or(DEFAULT_LIMIT));
        page.validate()?;
        Ok(page)
    }

    fn filter(&self) -> TaskFilter {
        TaskFilter {
            period: self.period,
            category: self.category,
            completed: self.completed,
        }
    }

    /// The search text, if one was given and is not blank.
    fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<Period>,
}

/// One page of tasks plus the size of the whole matching set.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl TaskListResponse {
    fn new(tasks: Vec<Task>, total: i64, page: Pagination) -> Self {
        Self {
            tasks,
            total,
            page: page.page(),
            per_page: page.limit,
            total_pages: page.total_pages(total),
        }
    }
}

/// Parses a lowercase path segment such as `work` or `week` into its enum.
fn parse_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(segment.to_string()))
        .map_err(|_| AppError::BadRequest(format!("Unknown {}: {}", what, segment)))
}

async fn list_page(
    state: &AppState,
    user: &AuthenticatedUser,
    query: &ListQuery,
    filter: TaskFilter,
) -> Result<TaskListResponse, AppError> {
    let page = query.pagination()?;
    let (tasks, total) = match query.search_text() {
        Some(text) => state.tasks.search(user.id(), text, page).await?,
        None => state.tasks.list(user.id(), &filter, page, today()).await?,
    };
    Ok(TaskListResponse::new(tasks, total, page))
}

/// Lists the caller's tasks.
///
/// ## Query Parameters:
/// - `skip`, `limit`: offset pagination (`limit` between 1 and 1000, default 100).
/// - `period` (`day`, `week`, `month`), `category`, `completed`: conjunctive filters.
/// - `search`: case-insensitive match on title or description. When non-blank it
///   replaces the other filters and orders results newest first.
///
/// ## Responses:
/// - `200 OK`: a `TaskListResponse`.
/// - `400 Bad Request`: bad pagination or an unknown filter value.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, AppError> {
    let response = list_page(&state, &user, &query, query.filter()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Creates a task owned by the caller. New tasks always start incomplete.
///
/// ## Responses:
/// - `201 Created`: the stored `Task`.
/// - `400 Bad Request`: validation failed (empty title, end before start, ...).
/// - `401 Unauthorized`: missing or invalid token.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let draft = task_data.into_inner().into_draft()?;
    let task = state.tasks.create(user.id(), draft).await?;
    info!("User {} created task {}", user.id(), task.id);
    Ok(HttpResponse::Created().json(task))
}

/// Aggregate counters over the caller's tasks, optionally limited to a period.
#[get("/stats")]
pub async fn get_stats(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<StatsQuery>,
) -> Result<impl Responder, AppError> {
    let stats: TaskStats = state.tasks.stats(user.id(), query.period, today()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Lists tasks in one category; accepts the same pagination parameters as `GET /tasks`.
#[get("/category/{category}")]
pub async fn get_tasks_by_category(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    category: web::Path<String>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter {
        category: Some(parse_segment(&category, "category")?),
        ..Default::default()
    };
    let query = ListQuery {
        search: None,
        ..query.into_inner()
    };
    let response = list_page(&state, &user, &query, filter).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Lists tasks starting within `day`, `week` or `month`.
#[get("/period/{period}")]
pub async fn get_tasks_by_period(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    period: web::Path<String>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter {
        period: Some(parse_segment(&period, "period")?),
        ..Default::default()
    };
    let query = ListQuery {
        search: None,
        ..query.into_inner()
    };
    let response = list_page(&state, &user, &query, filter).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Fetches one of the caller's tasks.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, a malformed id, or a task owned by someone else.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .get(task_id.into_inner(), user.id())
        .await?
        .ok_or_else(AppError::task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Omitted fields keep their stored value; the merged
/// task is validated as a whole before it is written.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: the merged task is invalid.
/// - `404 Not Found`: no such task, or owned by someone else.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .update(task_id.into_inner(), user.id(), &task_data)
        .await?
        .ok_or_else(AppError::task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Flips the task's completed flag.
#[patch("/{id}/toggle")]
pub async fn toggle_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .toggle_completion(task_id.into_inner(), user.id())
        .await?
        .ok_or_else(AppError::task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: the task is gone.
/// - `404 Not Found`: no such task, or owned by someone else.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();
    if !state.tasks.delete(task_id, user.id()).await? {
        return Err(AppError::task_not_found());
    }
    info!("User {} deleted task {}", user.id(), task_id);
    Ok(HttpResponse::NoContent().finish())
}

pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::web;

use crate::error::{form_error_handler, json_error_handler, path_error_handler, query_error_handler};

/// Registers the `/auth` and `/tasks` scopes. Mounted under `/api` behind `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::token_grant)
                .service(auth::me),
        )
        .service(
            // Fixed segments must be registered before `/{id}`.
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_stats)
                .service(tasks::get_tasks_by_category)
                .service(tasks::get_tasks_by_period)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::toggle_task)
                .service(tasks::delete_task),
        );
}

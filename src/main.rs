use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use std::io;

use planner::auth::AuthMiddleware;
use planner::repository::PgRepository;
use planner::routes::{self, health};
use planner::{AppState, Config};

fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let repository = PgRepository::connect(&config)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    repository
        .run_migrations()
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    let bind_address = (config.server_host.clone(), config.server_port);
    info!("Starting server at {}", config.server_url());

    let state = web::Data::new(AppState::postgres(config, repository));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&state.config.allowed_origins))
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind(bind_address)?
    .run()
    .await
}

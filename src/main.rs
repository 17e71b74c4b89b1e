use actix_web::{middleware, web, App, HttpServer};
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use studybud::api;
use studybud::config::AppConfig;
use studybud::tutor::TutorService;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studybud=info,actix_web=info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!(data_dir = %config.data_dir.display(), "loading student records");

    let bind = config.bind_address();
    // no model provider wired in yet, so tutoring runs on offline content
    let state = web::Data::new(api::build_state(config, TutorService::offline())?);

    info!("starting StudyBud API on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

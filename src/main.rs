use std::io;
use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use skylab::config::Config;
use skylab::mailer::{LogMailer, SharedMailer};
use skylab::{db, handlers, seed};

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{context}: {e}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let pool = db::init_pool(&config)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;
    db::seed_admin(&pool, &config)
        .await
        .map_err(|e| startup_error("Failed to seed administrator", e))?;
    if config.seed_demo {
        seed::seed_demo(&pool)
            .await
            .map_err(|e| startup_error("Failed to seed demo data", e))?;
    }

    let secret_key = match &config.session_key {
        Some(val) => Key::from(val.as_bytes()),
        None => Key::generate(),
    };
    let mailer: SharedMailer = Arc::new(LogMailer);
    let bind_addr = config.bind_addr.clone();
    let cookie_secure = config.cookie_secure;

    log::info!("Starting server at http://{bind_addr}");

    let app_pool = pool.clone();
    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(app_pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .service(web::scope("/api").configure(handlers::configure))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    pool.close().await;
    log::info!("Server stopped");
    Ok(())
}

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{cohort, role, user};

pub async fn init_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Ensure a cohort and an administrator account exist so a fresh database
/// can be logged into. Skipped when any administrator is already present.
pub async fn seed_admin(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let admin_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM administrators")
        .fetch_one(pool)
        .await?;
    if admin_count > 0 {
        log::info!("Database already has {admin_count} administrator(s), skipping admin seed");
        return Ok(());
    }

    let cohort = match cohort::find_current(pool).await? {
        Some(c) => c,
        None => cohort::create(pool, &cohort::NewCohort::for_today()).await?,
    };

    let user_id = match user::find_by_email(pool, &config.admin_email).await? {
        Some(u) => u.id,
        None => {
            let hash = password::hash_password(&config.admin_password).map_err(AppError::Hash)?;
            let new = user::NewUser {
                email: config.admin_email.clone(),
                password: hash,
                name: "Administrator".to_string(),
            };
            user::create(pool, &new).await?
        }
    };
    role::administrator::create(pool, user_id, cohort.academic_year).await?;
    log::info!(
        "Seeded administrator '{}' for cohort {}",
        config.admin_email,
        cohort.academic_year
    );
    Ok(())
}

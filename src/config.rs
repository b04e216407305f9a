use std::{env, fmt::Display, str::FromStr};

/// Runtime configuration, read once at boot from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Cookie signing/encryption key material; `None` means generate one per boot.
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_demo: bool,
    /// Base URL used when building links in outgoing mail.
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let session_key = match env::var("SESSION_KEY") {
            Ok(val) if val.len() >= 64 => {
                log::info!("Using SESSION_KEY from environment");
                Some(val)
            }
            Ok(val) => {
                log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
                None
            }
            Err(_) => {
                log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
                None
            }
        };

        Ok(Config {
            database_url,
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:8080")?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "8")?,
            session_key,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
            admin_email: try_load("ADMIN_EMAIL", "admin@skylab.local")?,
            admin_password: try_load("ADMIN_PASSWORD", "admin123")?,
            seed_demo: try_load("SEED_DEMO", "false")?,
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| format!("Invalid {key} value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_load_falls_back_to_default() {
        let port: u32 = try_load("SKYLAB_TEST_UNSET_VARIABLE", "42").unwrap();
        assert_eq!(port, 42);
    }

    #[test]
    fn try_load_reports_parse_errors() {
        let result: Result<bool, String> = try_load("SKYLAB_TEST_UNSET_VARIABLE_2", "maybe");
        assert!(result.unwrap_err().contains("SKYLAB_TEST_UNSET_VARIABLE_2"));
    }
}

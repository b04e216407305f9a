use actix_session::Session;

use crate::errors::AppError;

const USER_ID_KEY: &str = "user_id";

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(USER_ID_KEY).unwrap_or(None)
}

/// Current user id, or 401 when the session carries none.
pub fn require_user_id(session: &Session) -> Result<i64, AppError> {
    get_user_id(session).ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))
}

/// Start an authenticated session. The previous session id is rotated away.
pub fn sign_in(session: &Session, user_id: i64) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID_KEY, user_id)
        .map_err(|e| AppError::Session(format!("Failed to store user id: {e}")))
}

pub fn sign_out(session: &Session) {
    session.purge();
}

use crate::config::RecommendationConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 100;
pub const GENDER_CODES: &[&str] = &["P", "L"];

pub fn validate_user_profile(profile: &UserProfile) -> AppResult<()> {
    if profile.umur < MIN_AGE || profile.umur > MAX_AGE {
        return Err(AppError::Validation(format!(
            "umur must be between {} and {}, got {}",
            MIN_AGE, MAX_AGE, profile.umur
        )));
    }

    if !GENDER_CODES.iter().any(|code| *code == profile.jenis_kelamin) {
        return Err(AppError::Validation(format!(
            "jenis_kelamin must be one of {:?}, got '{}'",
            GENDER_CODES, profile.jenis_kelamin
        )));
    }

    Ok(())
}

/// Resolves the requested number of recommendations, applying the default.
pub fn validate_count(n: Option<i64>, config: &RecommendationConfig) -> AppResult<usize> {
    let Some(n) = n else {
        return Ok(config.default_count);
    };

    if n < 1 || n > config.max_count as i64 {
        return Err(AppError::Validation(format!(
            "n must be between 1 and {}, got {}",
            config.max_count, n
        )));
    }

    Ok(n as usize)
}

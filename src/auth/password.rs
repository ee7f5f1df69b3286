//! Salted Argon2 password hashing. Both directions run on the blocking pool.

use argon2::{Config as ArgonConfig, Variant};
use rand::Rng;

use crate::utils::error::AppError;

const SALT_LEN: usize = 16;

/// Fixed work factor: Argon2id, 19 MiB, two passes, one lane.
fn argon_config() -> ArgonConfig<'static> {
    ArgonConfig {
        variant: Variant::Argon2id,
        mem_cost: 19 * 1024,
        time_cost: 2,
        lanes: 1,
        ..ArgonConfig::default()
    }
}

pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("hashing task failed: {e}")))?
}

/// Returns `false` for a mismatch and for a hash that cannot be parsed.
pub async fn verify_password(hash: String, password: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || {
        argon2::verify_encoded(&hash, password.as_bytes()).unwrap_or(false)
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("verification task failed: {e}")))
}

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
    let config = argon_config();

    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|e| AppError::InternalServerError(format!("password hashing failed: {e}")))
}

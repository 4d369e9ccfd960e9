use lazy_static::lazy_static;
use tracing::error;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

lazy_static! {
    // Verified against when a username is unknown so both login failures cost the same.
    static ref DUMMY_HASH: String =
        bcrypt::hash("timing-equalizer", BCRYPT_COST).unwrap_or_default();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    bcrypt::hash(plain, BCRYPT_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        anyhow::anyhow!("bcrypt hash: {e}")
    })
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(plain, hash).map_err(|e| {
        error!(error = %e, "bcrypt verify error");
        anyhow::anyhow!("bcrypt verify: {e}")
    })
}

/// Runs `hash_password` on the blocking pool.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

/// Runs `verify_password` on the blocking pool. `None` burns a dummy verification
/// and always yields `false`.
pub async fn verify_password_blocking(plain: String, hash: Option<String>) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&plain, &hash),
        None => {
            let _ = bcrypt::verify(&plain, &DUMMY_HASH);
            Ok(false)
        }
    })
    .await?
}

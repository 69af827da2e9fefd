use crate::constants::{SHORT_CODE_LENGTH, SHORT_CODE_MAX_ATTEMPTS};
use crate::error::{Error, QueryError};
use crate::schema::Id;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sqlx::{Pool, Postgres, Transaction};

pub fn generate_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Bounded generation budget for one assignment. `next_code` hands out at
/// most `SHORT_CODE_MAX_ATTEMPTS` fresh candidates; a caller that reserves
/// none of them gets the fatal exhaustion error instead of spinning.
struct CodeAttempts {
    remaining: u32,
}

impl CodeAttempts {
    fn new() -> Self {
        Self {
            remaining: SHORT_CODE_MAX_ATTEMPTS,
        }
    }

    fn next_code(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(generate_code())
    }

    fn collided(&self, code: &str) {
        log::warn!("short code collision on {code}, regenerating");
    }

    fn exhausted(&self) -> Error {
        log::error!("short code generation exhausted {SHORT_CODE_MAX_ATTEMPTS} attempts");
        QueryError::new(String::from(
            "short code generation exhausted its retry budget",
        ))
        .into()
    }
}

/// Reserves a code for a freshly inserted recipe. Runs inside the creation
/// transaction: `ON CONFLICT DO NOTHING` keeps a collision from aborting
/// it, and the attempt budget keeps a pathological run of collisions from
/// spinning forever.
pub(crate) async fn assign(
    recipe_id: Id,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<String, Error> {
    let mut attempts = CodeAttempts::new();

    while let Some(code) = attempts.next_code() {
        let result = sqlx::query(
            "INSERT INTO short_links (code, recipe_id) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING",
        )
        .bind(&code)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(QueryError::from)?;

        if result.rows_affected() > 0 {
            return Ok(code);
        }

        attempts.collided(&code);
    }

    Err(attempts.exhausted())
}

pub async fn resolve(code: &str, pool: &Pool<Postgres>) -> Result<Id, Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT recipe_id FROM short_links WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.map(|r| r.0).ok_or(Error::NotFound("short link"))
}

pub async fn short_link(recipe_id: Id, pool: &Pool<Postgres>) -> Result<String, Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT code FROM short_links WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.map(|r| r.0).ok_or(Error::NotFound("recipe"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed_length_alphanumeric() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), SHORT_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn codes_are_opaque_tokens() {
        // 62^8 possibilities; two draws colliding means the generator is
        // not sampling the full space.
        assert_ne!(generate_code(), generate_code());
    }

    /// Drives the attempt budget the way `assign` does, with the storage
    /// insert replaced by an injectable acceptance.
    fn reserve_with(mut accept: impl FnMut(&str) -> bool) -> Result<String, Error> {
        let mut attempts = CodeAttempts::new();

        while let Some(code) = attempts.next_code() {
            if accept(&code) {
                return Ok(code);
            }
            attempts.collided(&code);
        }

        Err(attempts.exhausted())
    }

    #[test]
    fn first_free_code_is_reserved() {
        let code = reserve_with(|_| true).unwrap();
        assert_eq!(code.len(), SHORT_CODE_LENGTH);
    }

    #[test]
    fn collisions_regenerate_until_a_code_sticks() {
        let mut offered = 0;
        let code = reserve_with(|_| {
            offered += 1;
            offered == 3
        })
        .unwrap();

        assert_eq!(offered, 3);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn exhaustion_is_a_fatal_storage_error() {
        let mut offered = 0u32;
        let err = reserve_with(|_| {
            offered += 1;
            false
        })
        .unwrap_err();

        assert_eq!(offered, SHORT_CODE_MAX_ATTEMPTS);
        assert!(matches!(err, Error::Query(_)));
    }
}

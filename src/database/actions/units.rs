use crate::error::{on_blocked_delete, Error, QueryError};
use crate::schema::{Id, Unit};

use sqlx::{Pool, Postgres};

pub async fn create_unit(name: &str, pool: &Pool<Postgres>) -> Result<Id, Error> {
    let id: Option<(Id,)> =
        sqlx::query_as("INSERT INTO units (name) VALUES ($1) ON CONFLICT DO NOTHING RETURNING id")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    match id {
        Some(id) => Ok(id.0),
        None => Err(Error::Conflict("unit already exists")),
    }
}

pub async fn get_unit(id: Id, pool: &Pool<Postgres>) -> Result<Option<Unit>, Error> {
    let row: Option<Unit> = sqlx::query_as("SELECT * FROM units WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_units(pool: &Pool<Postgres>) -> Result<Vec<Unit>, Error> {
    let list: Vec<Unit> = sqlx::query_as("SELECT * FROM units ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Deletion is blocked by the storage layer while any ingredient still
/// references the unit.
pub async fn delete_unit(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM units WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| on_blocked_delete(e, "unit is still referenced by ingredients"))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("unit"));
    }

    Ok(())
}

use crate::error::{on_missing_reference, Error, QueryError};
use crate::schema::{Id, IngredientRow};

use sqlx::{Pool, Postgres};

/// Catalog entries are unique per (name, unit); identically named
/// ingredients measured in different units remain distinct rows.
pub async fn create_ingredient(
    name: &str,
    unit_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let id: Option<(Id,)> = sqlx::query_as(
        "INSERT INTO ingredients (name, unit_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(unit_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| on_missing_reference(e, "unit"))?;

    match id {
        Some(id) => Ok(id.0),
        None => Err(Error::Conflict("ingredient already exists for this unit")),
    }
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<IngredientRow>, Error> {
    let row: Option<IngredientRow> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, u.name AS measurement_unit
        FROM ingredients i
        INNER JOIN units u ON u.id = i.unit_id
        WHERE i.id = $1
    ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<IngredientRow>, Error> {
    let list: Vec<IngredientRow> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, u.name AS measurement_unit
        FROM ingredients i
        INNER JOIN units u ON u.id = i.unit_id
        ORDER BY i.name
    ",
    )
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

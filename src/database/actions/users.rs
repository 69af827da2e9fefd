use crate::error::{Error, QueryError};
use crate::schema::{Id, Profile, User};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Registration proper (passwords, tokens) lives in the enclosing service;
/// the SDK only records the account row authors hang off.
pub async fn create_user(username: &str, email: &str, pool: &Pool<Postgres>) -> Result<Id, Error> {
    let id: Option<(Id,)> = sqlx::query_as(
        "
        INSERT INTO users (username, email)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id
    ",
    )
    .bind(username)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match id {
        Some(id) => Ok(id.0),
        None => Err(Error::Conflict("username or email is already in use")),
    }
}

pub async fn is_subscribed(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result: Option<(Id,)> = sqlx::query_as(
        "
        SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = $2
    ",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

/// A profile is a single object, so the subscription flag is one pair
/// probe; batched listings go through the annotation path instead.
pub async fn get_profile(
    author_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Profile, Error> {
    let row: Option<Profile> =
        sqlx::query_as("SELECT id, username, avatar FROM users WHERE id = $1")
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    let mut profile = row.ok_or(Error::NotFound("user"))?;

    if let Some(viewer) = viewer {
        profile.is_subscribed = is_subscribed(viewer, author_id, pool).await?;
    }

    Ok(profile)
}

pub async fn list_subscriptions(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Profile>, Error> {
    let rows: Vec<Profile> = sqlx::query_as(
        "
        SELECT u.id AS id, u.username AS username, u.avatar AS avatar
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows
        .into_iter()
        .map(|mut profile| {
            profile.is_subscribed = true;
            profile
        })
        .collect())
}

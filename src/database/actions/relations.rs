use std::collections::HashSet;

use crate::actions::users;
use crate::error::{on_missing_reference, Error, QueryError};
use crate::schema::{Id, Profile, RecipeSummary};

use sqlx::{Pool, Postgres};

/// The three membership relations share one toggle contract: a unique
/// (subject, object) row that `add` inserts and `remove` deletes. The
/// storage constraint, not the membership check, arbitrates races.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl RelationKind {
    fn table(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Subscription => "subscriptions",
        }
    }

    fn object_column(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipe_id",
            RelationKind::Subscription => "author_id",
        }
    }

    fn object_name(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipe",
            RelationKind::Subscription => "user",
        }
    }

    fn already_present(self) -> &'static str {
        match self {
            RelationKind::Favorite => "recipe is already in favorites",
            RelationKind::ShoppingCart => "recipe is already in the shopping cart",
            RelationKind::Subscription => "already subscribed to this user",
        }
    }

    fn not_present(self) -> &'static str {
        match self {
            RelationKind::Favorite => "recipe is not in favorites",
            RelationKind::ShoppingCart => "recipe is not in the shopping cart",
            RelationKind::Subscription => "not subscribed to this user",
        }
    }

    /// Subscriptions reject subject == object before any membership
    /// statement runs; the other kinds relate distinct entity types.
    pub(crate) fn guard(self, subject: Id, object: Id) -> Result<(), Error> {
        if self == RelationKind::Subscription && subject == object {
            return Err(Error::SelfReference);
        }
        Ok(())
    }
}

/// Storage arbitration for one toggle statement: zero affected rows means
/// the membership was already in the requested state, which is a Conflict
/// for the caller, not a storage failure.
fn arbitrate(kind: RelationKind, present: bool, rows_affected: u64) -> Result<(), Error> {
    if rows_affected == 0 {
        return Err(Error::Conflict(if present {
            kind.already_present()
        } else {
            kind.not_present()
        }));
    }
    Ok(())
}

pub async fn add(
    kind: RelationKind,
    subject: Id,
    object: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    kind.guard(subject, object)?;

    let table = kind.table();
    let column = kind.object_column();

    let result = sqlx::query(&format!(
        "INSERT INTO {table} (user_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await
    .map_err(|e| on_missing_reference(e, kind.object_name()))?;

    arbitrate(kind, true, result.rows_affected())
}

pub async fn remove(
    kind: RelationKind,
    subject: Id,
    object: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    kind.guard(subject, object)?;

    let table = kind.table();
    let column = kind.object_column();

    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE user_id = $1 AND {column} = $2"
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    arbitrate(kind, false, result.rows_affected())
}

/// Bulk membership probe: which of `objects` the subject has marked with
/// this relation. One query regardless of the batch size.
pub(crate) async fn fetch_marked(
    kind: RelationKind,
    subject: Id,
    objects: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let table = kind.table();
    let column = kind.object_column();

    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT {column} FROM {table} WHERE user_id = $1 AND {column} = ANY($2)"
    ))
    .bind(subject)
    .bind(objects)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn set_favorite(
    user_id: Id,
    recipe_id: Id,
    present: bool,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    set_recipe_relation(RelationKind::Favorite, user_id, recipe_id, present, pool).await
}

pub async fn set_shopping_cart(
    user_id: Id,
    recipe_id: Id,
    present: bool,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    set_recipe_relation(RelationKind::ShoppingCart, user_id, recipe_id, present, pool).await
}

async fn set_recipe_relation(
    kind: RelationKind,
    user_id: Id,
    recipe_id: Id,
    present: bool,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let summary: Option<RecipeSummary> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;
    let summary = summary.ok_or(Error::NotFound("recipe"))?;

    if present {
        add(kind, user_id, recipe_id, pool).await?;
    } else {
        remove(kind, user_id, recipe_id, pool).await?;
    }

    Ok(summary)
}

pub async fn set_subscription(
    user_id: Id,
    author_id: Id,
    present: bool,
    pool: &Pool<Postgres>,
) -> Result<Profile, Error> {
    RelationKind::Subscription.guard(user_id, author_id)?;

    let mut profile = users::get_profile(author_id, None, pool).await?;

    if present {
        add(RelationKind::Subscription, user_id, author_id, pool).await?;
    } else {
        remove(RelationKind::Subscription, user_id, author_id, pool).await?;
    }

    profile.is_subscribed = present;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subscription_rejected_before_any_query() {
        assert!(matches!(
            RelationKind::Subscription.guard(4, 4),
            Err(Error::SelfReference)
        ));
        assert!(RelationKind::Subscription.guard(4, 5).is_ok());
    }

    #[test]
    fn recipe_relations_allow_matching_ids() {
        // User id 7 marking recipe id 7: distinct entities, no guard.
        assert!(RelationKind::Favorite.guard(7, 7).is_ok());
        assert!(RelationKind::ShoppingCart.guard(7, 7).is_ok());
    }

    fn conflict_message(result: Result<(), Error>) -> &'static str {
        match result {
            Err(Error::Conflict(msg)) => msg,
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn replayed_add_is_a_conflict() {
        // First insert touches one row; the replay hits the uniqueness
        // constraint and touches none.
        assert!(arbitrate(RelationKind::Favorite, true, 1).is_ok());
        assert_eq!(
            conflict_message(arbitrate(RelationKind::Favorite, true, 0)),
            "recipe is already in favorites"
        );
    }

    #[test]
    fn removing_an_absent_row_is_a_conflict() {
        assert!(arbitrate(RelationKind::ShoppingCart, false, 1).is_ok());
        assert_eq!(
            conflict_message(arbitrate(RelationKind::ShoppingCart, false, 0)),
            "recipe is not in the shopping cart"
        );
    }

    #[test]
    fn subscription_conflicts_use_subscription_wording() {
        assert_eq!(
            conflict_message(arbitrate(RelationKind::Subscription, true, 0)),
            "already subscribed to this user"
        );
        assert_eq!(
            conflict_message(arbitrate(RelationKind::Subscription, false, 0)),
            "not subscribed to this user"
        );
    }

    #[test]
    fn kinds_map_to_distinct_uniqueness_scopes() {
        let scopes: Vec<_> = [
            RelationKind::Favorite,
            RelationKind::ShoppingCart,
            RelationKind::Subscription,
        ]
        .iter()
        .map(|kind| (kind.table(), kind.object_column()))
        .collect();

        assert_eq!(
            scopes,
            vec![
                ("favorites", "recipe_id"),
                ("shopping_cart", "recipe_id"),
                ("subscriptions", "author_id"),
            ]
        );
    }
}

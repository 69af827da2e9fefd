use std::collections::HashSet;

use crate::actions::relations::{self, RelationKind};
use crate::error::Error;
use crate::schema::{AnnotatedRecipe, Id, RecipeRow};

use sqlx::{Pool, Postgres};

/// Attaches `is_favorited` / `is_in_shopping_cart` to a batch of listing
/// rows. An anonymous viewer gets all-false without touching storage; an
/// identified viewer costs exactly one bulk membership query per flag,
/// never one per row.
pub async fn annotate_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<AnnotatedRecipe>, Error> {
    let Some(viewer) = viewer else {
        return Ok(rows.into_iter().map(AnnotatedRecipe::unmarked).collect());
    };

    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let favorited = relations::fetch_marked(RelationKind::Favorite, viewer, &ids, pool).await?;
    let in_cart = relations::fetch_marked(RelationKind::ShoppingCart, viewer, &ids, pool).await?;

    Ok(apply_flags(rows, &favorited, &in_cart))
}

pub(crate) fn apply_flags(
    rows: Vec<RecipeRow>,
    favorited: &HashSet<Id>,
    in_cart: &HashSet<Id>,
) -> Vec<AnnotatedRecipe> {
    rows.into_iter()
        .map(|recipe| AnnotatedRecipe {
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            recipe,
        })
        .collect()
}

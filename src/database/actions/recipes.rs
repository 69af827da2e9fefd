use crate::actions::{annotations, short_links};
use crate::constants::RECIPE_COUNT_PER_PAGE;
use crate::error::{on_missing_reference, Error, QueryError};
use crate::form::RecipeForm;
use crate::pagination::PageContext;
use crate::permissions::{ActionType, Actor};
use crate::schema::{
    AnnotatedRecipe, Id, Recipe, RecipeFilter, RecipeIngredientLine, RecipeRow, Tag,
};

use sqlx::{Pool, Postgres, Transaction};

/// Creates the recipe with its full tag and ingredient composition, plus
/// its short link, in one transaction: a failure partway leaves no rows.
pub async fn create_recipe(
    actor: &Actor,
    form: &RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    actor.authorize(ActionType::CreateRecipes)?;
    form.validate()?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(actor.user_id)
    .bind(&form.name)
    .bind(&form.text)
    .bind(&form.image)
    .bind(form.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;
    let recipe_id = id.0;

    write_composition(recipe_id, form, &mut tx).await?;
    short_links::assign(recipe_id, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound("recipe"))
}

/// Replacement semantics: the stored tag set and ingredient set become
/// exactly the form's sets. A line omitted from the form is removed, not
/// left untouched.
pub async fn update_recipe(
    id: Id,
    actor: &Actor,
    form: &RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe_mut(id, actor, pool).await?;
    form.validate()?;

    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&form.name)
    .bind(&form.text)
    .bind(&form.image)
    .bind(form.cooking_time)
    .bind(recipe.id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags_map WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    write_composition(recipe.id, form, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    get_recipe(id, pool).await?.ok_or(Error::NotFound("recipe"))
}

pub async fn delete_recipe(id: Id, actor: &Actor, pool: &Pool<Postgres>) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, actor, pool).await?;

    // Cascades to tag links, ingredient lines, favorite and cart rows,
    // and the short-link row.
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn write_composition(
    recipe_id: Id,
    form: &RecipeForm,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    for tag_id in &form.tags {
        sqlx::query("INSERT INTO recipe_tags_map (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| on_missing_reference(e, "tag"))?;
    }

    for line in &form.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(line.ingredient_id)
        .bind(line.amount)
        .execute(&mut **tx)
        .await
        .map_err(|e| on_missing_reference(e, "ingredient"))?;
    }

    Ok(())
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Fetches a recipe for mutation: the caller must be its author or hold
/// the ManageAllRecipes override.
pub async fn get_recipe_mut(id: Id, actor: &Actor, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    actor.authorize(ActionType::ManageOwnRecipes)?;

    let recipe = get_recipe(id, pool).await?.ok_or(Error::NotFound("recipe"))?;

    if !actor.can_manage(recipe.author_id) {
        return Err(Error::PermissionDenied(
            "only the author can modify this recipe",
        ));
    }

    Ok(recipe)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_id: Id,
) -> Result<Vec<RecipeIngredientLine>, Error> {
    let rows: Vec<RecipeIngredientLine> = sqlx::query_as(
        "
        SELECT ri.ingredient_id AS ingredient_id, i.name AS name, u.name AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        INNER JOIN units u ON u.id = i.unit_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: Id) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id AS id, t.name AS name, t.slug AS slug
        FROM recipe_tags_map m
        INNER JOIN tags t ON t.id = m.tag_id
        WHERE m.recipe_id = $1
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let rows: Vec<RecipeRow> = match (filter.author, filter.tag.as_deref()) {
        (Some(author), Some(tag)) => {
            sqlx::query_as(
                "
                SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
                FROM recipes r
                INNER JOIN recipe_tags_map m ON m.recipe_id = r.id
                INNER JOIN tags t ON t.id = m.tag_id
                WHERE r.author_id = $1 AND t.slug = $2
                ORDER BY r.name LIMIT $3 OFFSET $4
            ",
            )
            .bind(author)
            .bind(tag)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
        (Some(author), None) => {
            sqlx::query_as(
                "
                SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
                FROM recipes r
                WHERE r.author_id = $1
                ORDER BY r.name LIMIT $2 OFFSET $3
            ",
            )
            .bind(author)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
        (None, Some(tag)) => {
            sqlx::query_as(
                "
                SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
                FROM recipes r
                INNER JOIN recipe_tags_map m ON m.recipe_id = r.id
                INNER JOIN tags t ON t.id = m.tag_id
                WHERE t.slug = $1
                ORDER BY r.name LIMIT $2 OFFSET $3
            ",
            )
            .bind(tag)
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
        (None, None) => {
            sqlx::query_as(
                "
                SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
                FROM recipes r
                ORDER BY r.name LIMIT $1 OFFSET $2
            ",
            )
            .bind(RECIPE_COUNT_PER_PAGE)
            .bind(offset)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
    };

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(
        rows,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}

/// One listing page with viewer-relative flags attached; pagination and
/// filtering stay in the storage query, flag computation in the
/// annotation engine.
pub async fn list_with_annotations(
    filter: &RecipeFilter,
    offset: i64,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<AnnotatedRecipe>, Error> {
    let mut page = fetch_recipes(filter, offset, pool).await?;
    let rows = std::mem::take(&mut page.rows);
    let annotated = annotations::annotate_recipes(rows, viewer, pool).await?;

    Ok(page.map_rows(annotated))
}

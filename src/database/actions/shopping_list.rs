use std::collections::BTreeMap;

use crate::error::{Error, QueryError};
use crate::schema::{Id, ShoppingListLine};

use sqlx::{Pool, Postgres};

/// One unmerged ingredient line from a recipe in the viewer's cart.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Consolidates every ingredient line across the recipes in the user's
/// cart into one line per (ingredient name, unit name) pair. An empty
/// cart is an empty list, not an error.
pub async fn aggregate(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<ShoppingListLine>, Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, u.name AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN shopping_cart sc ON sc.recipe_id = ri.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        INNER JOIN units u ON u.id = i.unit_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(merge_lines(rows))
}

/// Grouping is by display pair, not ingredient id: identically named
/// ingredients in the same unit merge even when they are distinct catalog
/// rows. The BTreeMap key order gives name-ascending output.
pub fn merge_lines(rows: Vec<CartLine>) -> Vec<ShoppingListLine> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListLine {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

/// The rendered text lines handed to the download endpoint.
pub async fn shopping_list(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<String>, Error> {
    let lines = aggregate(user_id, pool).await?;
    Ok(lines.iter().map(|line| line.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: String::from(name),
            measurement_unit: String::from(unit),
            amount,
        }
    }

    #[test]
    fn same_pair_sums_into_one_line() {
        let merged = merge_lines(vec![line("flour", "g", 100), line("flour", "g", 50)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total, 150);
        assert_eq!(merged[0].to_string(), "flour (g) — 150");
    }

    #[test]
    fn same_name_different_unit_stays_apart() {
        let merged = merge_lines(vec![line("milk", "ml", 200), line("milk", "tbsp", 2)]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].measurement_unit, "ml");
        assert_eq!(merged[1].measurement_unit, "tbsp");
    }

    #[test]
    fn output_is_ordered_by_name() {
        let merged = merge_lines(vec![
            line("zucchini", "pcs", 1),
            line("apple", "pcs", 2),
            line("milk", "ml", 500),
        ]);

        let names: Vec<_> = merged.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "milk", "zucchini"]);
    }

    #[test]
    fn empty_cart_is_empty_output() {
        assert!(merge_lines(vec![]).is_empty());
    }

    #[test]
    fn totals_survive_large_sums() {
        let rows = vec![line("sugar", "g", i32::MAX), line("sugar", "g", i32::MAX)];
        assert_eq!(merge_lines(rows)[0].total, 2 * i64::from(i32::MAX));
    }
}

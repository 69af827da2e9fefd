use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::{error::Error, schema::Id};
use crate::constants::{MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub ingredient_id: Id,
    pub amount: i32,
}

/// Write-side input for recipe create and replace. The tag set and the
/// ingredient set are complete: on update they overwrite whatever the
/// recipe currently has.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeForm {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::validation("body", e.to_string()))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name must not be empty"));
        }
        if self.image.trim().is_empty() {
            return Err(Error::validation("image", "image must not be empty"));
        }
        if self.cooking_time < MIN_COOKING_TIME {
            return Err(Error::validation(
                "cooking_time",
                format!("cooking time must be at least {MIN_COOKING_TIME}"),
            ));
        }

        if self.tags.is_empty() {
            return Err(Error::validation("tags", "at least one tag is required"));
        }
        let mut seen: HashSet<Id> = HashSet::new();
        for tag_id in &self.tags {
            if !seen.insert(*tag_id) {
                return Err(Error::validation("tags", "tags must not repeat"));
            }
        }

        if self.ingredients.is_empty() {
            return Err(Error::validation(
                "ingredients",
                "at least one ingredient is required",
            ));
        }
        let mut seen: HashSet<Id> = HashSet::new();
        for line in &self.ingredients {
            if !seen.insert(line.ingredient_id) {
                return Err(Error::validation(
                    "ingredients",
                    "ingredients must not repeat",
                ));
            }
            if line.amount < MIN_INGREDIENT_AMOUNT {
                return Err(Error::validation(
                    "ingredients",
                    format!("amount must be at least {MIN_INGREDIENT_AMOUNT}"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_form() -> RecipeForm {
        RecipeForm {
            name: String::from("Borscht"),
            text: String::from("Simmer until done"),
            image: String::from("recipes/borscht.png"),
            cooking_time: 90,
            tags: vec![1, 2],
            ingredients: vec![
                IngredientAmount {
                    ingredient_id: 10,
                    amount: 500,
                },
                IngredientAmount {
                    ingredient_id: 11,
                    amount: 2,
                },
            ],
        }
    }

    fn failing_field(form: &RecipeForm) -> &'static str {
        match form.validate() {
            Err(Error::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let mut form = valid_form();
        form.name = String::from("   ");
        assert_eq!(failing_field(&form), "name");
    }

    #[test]
    fn missing_image_rejected() {
        let mut form = valid_form();
        form.image = String::new();
        assert_eq!(failing_field(&form), "image");
    }

    #[test]
    fn non_positive_cooking_time_rejected() {
        let mut form = valid_form();
        form.cooking_time = 0;
        assert_eq!(failing_field(&form), "cooking_time");
    }

    #[test]
    fn empty_tags_rejected() {
        let mut form = valid_form();
        form.tags.clear();
        assert_eq!(failing_field(&form), "tags");
    }

    #[test]
    fn duplicate_tags_rejected() {
        let mut form = valid_form();
        form.tags = vec![1, 1];
        assert_eq!(failing_field(&form), "tags");
    }

    #[test]
    fn empty_ingredients_rejected() {
        let mut form = valid_form();
        form.ingredients.clear();
        assert_eq!(failing_field(&form), "ingredients");
    }

    #[test]
    fn duplicate_ingredients_rejected() {
        let mut form = valid_form();
        form.ingredients[1].ingredient_id = form.ingredients[0].ingredient_id;
        assert_eq!(failing_field(&form), "ingredients");
    }

    #[test]
    fn non_positive_amount_rejected() {
        let mut form = valid_form();
        form.ingredients[0].amount = 0;
        assert_eq!(failing_field(&form), "ingredients");
    }

    #[test]
    fn form_parses_from_json() {
        let form = RecipeForm::from_value(json!({
            "name": "Okroshka",
            "text": "Mix and chill",
            "image": "recipes/okroshka.png",
            "cooking_time": 20,
            "tags": [3],
            "ingredients": [{"ingredient_id": 7, "amount": 300}]
        }))
        .unwrap();

        assert_eq!(form.name, "Okroshka");
        assert_eq!(form.ingredients[0].amount, 300);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_field_scoped() {
        let err = RecipeForm::from_value(json!({"name": "no other fields"})).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "body", .. }));
    }
}

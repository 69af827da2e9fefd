pub const RECIPE_COUNT_PER_PAGE: i64 = 10;

pub const SHORT_CODE_LENGTH: usize = 8;
pub const SHORT_CODE_MAX_ATTEMPTS: u32 = 10;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

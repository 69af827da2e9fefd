pub mod annotations;
pub mod ingredients;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod short_links;
pub mod tags;
pub mod units;
pub mod users;

mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod constants;
mod permissions;

pub use constants::*;
pub use database::*;
pub use permissions::*;

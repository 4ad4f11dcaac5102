//! Query planner: picks the index that can serve a where clause and turns
//! the clause into a store query.

mod cursor;
mod error;
mod planner;
mod request;
mod types;

pub use cursor::{decode_cursor, encode_cursor};
pub use error::QueryError;
pub use planner::resolve;
pub use request::build_query;
pub use types::{SortOrder, WhereClause};

use serde_json::Value;

use crate::index::{IndexDefinition, IndexDirectory};
use crate::keys::encode;
use crate::storage::{QueryRequest, SortCondition, SortKeyCondition};

use super::{decode_cursor, QueryError, SortOrder, WhereClause};

/// Turns a where clause into a store query against `index`.
///
/// A fully specified sort key is matched exactly. A partial one becomes a
/// begins-with condition whose prefix ends in the separator, so the last
/// supplied value cannot match a longer value sharing its characters.
pub fn build_query(
    clause: &WhereClause,
    index: &IndexDefinition,
    directory: &IndexDirectory,
) -> Result<QueryRequest, QueryError> {
    if clause.limit == Some(0) {
        return Err(QueryError::InvalidLimit);
    }

    let table = directory.table();
    let encoded = encode(index, &clause.args, &table.key_format)?;
    let complete = encoded.is_complete();

    let sort = encoded.sort.map(|part| {
        let condition = match part.value {
            value if complete => SortCondition::Equals(value),
            Value::String(prefix) => {
                SortCondition::BeginsWith(format!("{prefix}{}", table.key_format.separator))
            }
            value => SortCondition::Equals(value),
        };
        SortKeyCondition {
            attribute: part.attribute,
            condition,
        }
    });

    let exclusive_start_key = clause.cursor.as_deref().map(decode_cursor).transpose()?;

    let request = QueryRequest {
        table: table.name.clone(),
        index_name: index.index_name.clone(),
        partition: encoded.hash,
        sort,
        sort_attribute: index.sort_attribute().map(str::to_string),
        scan_forward: clause.sort == SortOrder::Ascending,
        limit: clause.limit,
        exclusive_start_key,
    };

    tracing::debug!(
        table = %request.table,
        index = ?request.index_name,
        partition = %request.partition.value,
        "Built query request"
    );
    Ok(request)
}

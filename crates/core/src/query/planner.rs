use crate::index::{IndexDefinition, IndexDirectory};

use super::{QueryError, WhereClause};

/// Selects the index that serves `clause`.
///
/// An explicit `index` tag always wins. Otherwise indexes are scanned in
/// directory order (primary first) and the first one that can consume every
/// supplied field as hash fields followed by a sort-field prefix is chosen.
/// With `sort_by`, the candidate's next unconsumed sort field must be that
/// field.
pub fn resolve<'a>(
    clause: &WhereClause,
    directory: &'a IndexDirectory,
) -> Result<&'a IndexDefinition, QueryError> {
    if let Some(tag) = &clause.index {
        return directory.get(tag).ok_or_else(|| QueryError::UnknownIndex {
            tag: tag.clone(),
            valid: directory.tags().map(str::to_string).collect(),
        });
    }

    let index = directory
        .iter()
        .find(|index| is_eligible(index, clause))
        .ok_or_else(|| QueryError::NoMatchingIndex {
            type_name: directory.type_name().to_string(),
            fields: clause.fields(),
        })?;

    tracing::debug!(
        type_name = directory.type_name(),
        index = %index.tag,
        "Resolved query index"
    );
    Ok(index)
}

fn is_eligible(index: &IndexDefinition, clause: &WhereClause) -> bool {
    let hash_fields = index.hash_fields();
    if hash_fields
        .iter()
        .any(|field| !clause.args.contains_key(*field))
    {
        return false;
    }

    let mut needed: Vec<&str> = clause
        .args
        .keys()
        .map(String::as_str)
        .filter(|field| !hash_fields.contains(field))
        .collect();

    // The remaining fields must form a prefix of the sort chain.
    let sort_fields = index.sort_fields();
    let mut consumed = 0;
    for field in sort_fields.iter().take(needed.len()) {
        match needed.iter().position(|needed| needed == field) {
            Some(position) => {
                needed.swap_remove(position);
                consumed += 1;
            }
            None => break,
        }
    }
    if !needed.is_empty() {
        return false;
    }

    match &clause.sort_by {
        Some(sort_by) => sort_fields.get(consumed) == Some(&sort_by.as_str()),
        None => true,
    }
}

//! Ordered tag sets
//!
//! Tags are kept with an integer `position`. Tags supplied at creation get
//! positions `0..n` in the order given; a tag added later takes a position
//! below the current minimum, so it reads back first.

use crate::error::{Result, StoreError};
use deadpool_postgres::Transaction;
use std::collections::{HashMap, HashSet};

pub(crate) fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(StoreError::invalid("Tag must be a non-empty string"));
    }
    Ok(())
}

/// Validate a creation tag list and drop repeats, keeping first occurrences.
pub(crate) fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.as_ref();
        validate_tag(tag)?;
        if seen.insert(tag) {
            normalized.push(tag.to_string());
        }
    }

    Ok(normalized)
}

/// Distinct filter tags. A matching entity must carry all of them.
pub(crate) fn filter_tag_set<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.as_ref())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

pub(crate) async fn insert_model_tags(tx: &Transaction<'_>, name: &str, tags: &[String]) -> Result<()> {
    let stmt = tx
        .prepare_cached("INSERT INTO registered_model_tag (name, tag, position) VALUES ($1, $2, $3)")
        .await?;

    for (position, tag) in tags.iter().enumerate() {
        tx.execute(&stmt, &[&name, tag, &(position as i32)]).await?;
    }
    Ok(())
}

/// Returns false when the tag was already present.
pub(crate) async fn prepend_model_tag(tx: &Transaction<'_>, name: &str, tag: &str) -> Result<bool> {
    let inserted = tx
        .execute(
            r#"
            INSERT INTO registered_model_tag (name, tag, position)
            SELECT $1::TEXT, $2::TEXT, COALESCE(MIN(position), 0) - 1
            FROM registered_model_tag WHERE name = $1
            ON CONFLICT (name, tag) DO NOTHING
            "#,
            &[&name, &tag],
        )
        .await?;
    Ok(inserted > 0)
}

pub(crate) async fn remove_model_tag(tx: &Transaction<'_>, name: &str, tag: &str) -> Result<bool> {
    let removed = tx
        .execute(
            "DELETE FROM registered_model_tag WHERE name = $1 AND tag = $2",
            &[&name, &tag],
        )
        .await?;
    Ok(removed > 0)
}

/// Tags of each named model, in read order.
pub(crate) async fn load_model_tags(
    tx: &Transaction<'_>,
    names: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let rows = tx
        .query(
            "SELECT name, tag FROM registered_model_tag WHERE name = ANY($1) ORDER BY name, position",
            &[&names],
        )
        .await?;

    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        tags.entry(row.get("name")).or_default().push(row.get("tag"));
    }
    Ok(tags)
}

pub(crate) async fn insert_version_tags(
    tx: &Transaction<'_>,
    name: &str,
    version: i32,
    tags: &[String],
) -> Result<()> {
    let stmt = tx
        .prepare_cached(
            "INSERT INTO model_version_tag (name, version, tag, position) VALUES ($1, $2, $3, $4)",
        )
        .await?;

    for (position, tag) in tags.iter().enumerate() {
        tx.execute(&stmt, &[&name, &version, tag, &(position as i32)]).await?;
    }
    Ok(())
}

pub(crate) async fn prepend_version_tag(
    tx: &Transaction<'_>,
    name: &str,
    version: i32,
    tag: &str,
) -> Result<bool> {
    let inserted = tx
        .execute(
            r#"
            INSERT INTO model_version_tag (name, version, tag, position)
            SELECT $1::TEXT, $2::INTEGER, $3::TEXT, COALESCE(MIN(position), 0) - 1
            FROM model_version_tag WHERE name = $1 AND version = $2
            ON CONFLICT (name, version, tag) DO NOTHING
            "#,
            &[&name, &version, &tag],
        )
        .await?;
    Ok(inserted > 0)
}

pub(crate) async fn remove_version_tag(
    tx: &Transaction<'_>,
    name: &str,
    version: i32,
    tag: &str,
) -> Result<bool> {
    let removed = tx
        .execute(
            "DELETE FROM model_version_tag WHERE name = $1 AND version = $2 AND tag = $3",
            &[&name, &version, &tag],
        )
        .await?;
    Ok(removed > 0)
}

/// Tags of the given versions of one model, keyed by version number.
pub(crate) async fn load_version_tags(
    tx: &Transaction<'_>,
    name: &str,
    versions: &[i32],
) -> Result<HashMap<i32, Vec<String>>> {
    let rows = tx
        .query(
            r#"
            SELECT version, tag FROM model_version_tag
            WHERE name = $1 AND version = ANY($2)
            ORDER BY version, position
            "#,
            &[&name, &versions],
        )
        .await?;

    let mut tags: HashMap<i32, Vec<String>> = HashMap::new();
    for row in rows {
        tags.entry(row.get("version")).or_default().push(row.get("tag"));
    }
    Ok(tags)
}

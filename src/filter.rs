//! Key Filters
//!
//! Reduces a configuration section to a subset of its keys. Keys are
//! dot-separated paths into nested objects, e.g. `upstreams` or
//! `domain.name`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;
use crate::model::Object;

/// How the filter keys are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Keep only the listed keys
    Include,
    /// Keep everything but the listed keys
    Exclude,
}

/// Filter a document by type and key list, returning a new document
pub fn by_type(
    filter_type: FilterType,
    keys: &[String],
    document: &Object,
) -> std::result::Result<Object, FilterError> {
    if keys.is_empty() {
        return Err(FilterError::NoKeys);
    }

    match filter_type {
        FilterType::Include => include(keys, document),
        FilterType::Exclude => exclude(keys, document),
    }
}

fn include(keys: &[String], document: &Object) -> std::result::Result<Object, FilterError> {
    let mut result = Object::new();
    for key in keys {
        let path: Vec<&str> = key.split('.').collect();
        let value = lookup(document, &path, key)?;
        insert_path(&mut result, &path, value.clone(), key)?;
    }
    Ok(result)
}

fn exclude(keys: &[String], document: &Object) -> std::result::Result<Object, FilterError> {
    let mut result = document.clone();
    for key in keys {
        let path: Vec<&str> = key.split('.').collect();
        remove_path(&mut result, &path, key)?;
    }
    Ok(result)
}

fn lookup<'a>(
    document: &'a Object,
    path: &[&str],
    full_key: &str,
) -> std::result::Result<&'a Value, FilterError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| FilterError::KeyNotFound(full_key.to_string()))?;

    let mut current = document;
    for (depth, part) in parents.iter().enumerate() {
        current = match current.get(*part) {
            Some(Value::Object(child)) => child,
            Some(_) => return Err(FilterError::NotAnObject(path[..=depth].join("."))),
            None => return Err(FilterError::KeyNotFound(full_key.to_string())),
        };
    }

    current
        .get(*last)
        .ok_or_else(|| FilterError::KeyNotFound(full_key.to_string()))
}

fn insert_path(
    target: &mut Object,
    path: &[&str],
    value: Value,
    full_key: &str,
) -> std::result::Result<(), FilterError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| FilterError::KeyNotFound(full_key.to_string()))?;

    let mut current = target;
    for part in parents {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Object::new()));
        current = match entry {
            Value::Object(child) => child,
            // An overlapping key such as "a" and "a.b" already copied "a" whole
            _ => return Ok(()),
        };
    }

    current.insert(last.to_string(), value);
    Ok(())
}

fn remove_path(
    target: &mut Object,
    path: &[&str],
    full_key: &str,
) -> std::result::Result<(), FilterError> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };

    let mut current = target;
    for (depth, part) in parents.iter().enumerate() {
        current = match current.get_mut(*part) {
            Some(Value::Object(child)) => child,
            Some(_) => return Err(FilterError::NotAnObject(path[..=depth].join("."))),
            None => return Ok(()),
        };
    }

    if current.remove(*last).is_none() {
        tracing::trace!("Exclude filter key {} not present", full_key);
    }
    Ok(())
}

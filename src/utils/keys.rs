//! Object key naming for backup artifacts.
//!
//! Keys are `{folder}/{YYYY-MM-DD}/{database}_{HH-MM}.sql.gz`. Every date and
//! time field is zero-padded, so descending lexical order is also
//! newest-first.
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static KEY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("static date pattern is valid")
});

pub fn backup_key(folder: &str, database: &str, at: NaiveDateTime) -> String {
    format!(
        "{}/{}/{}_{}.sql.gz",
        folder,
        at.format("%Y-%m-%d"),
        database,
        at.format("%H-%M")
    )
}

pub fn latest_key(mut keys: Vec<String>) -> Option<String> {
    keys.sort_by(|a, b| b.cmp(a));
    keys.into_iter().next()
}

/// Final path component of a user-supplied name.
pub fn base_name(name: &str) -> Option<&str> {
    if name.ends_with('/') {
        return None;
    }
    Path::new(name).file_name().and_then(|n| n.to_str())
}

/// Whether `key` names a backup of `database`: its base name is
/// `{database}_` followed by a date or time. The digit check keeps `my`
/// from claiming `my_shop_...`.
pub fn is_backup_of(key: &str, database: &str) -> bool {
    base_name(key)
        .and_then(|name| name.strip_prefix(database))
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// First `YYYY-MM-DD` embedded anywhere in the key.
pub fn key_date(key: &str) -> Option<NaiveDate> {
    KEY_DATE
        .captures_iter(key)
        .filter_map(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
        .next()
}

pub fn within_lookback(key: &str, cutoff: NaiveDate) -> bool {
    key_date(key).is_some_and(|date| date >= cutoff)
}

pub fn relative_to_folder<'a>(key: &'a str, folder: &str) -> &'a str {
    key.strip_prefix(folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

pub fn folder_prefix(folder: &str) -> String {
    format!("{}/", folder)
}

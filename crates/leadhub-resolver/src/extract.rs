// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Defensive webhook payload extraction.
//!
//! External platforms deliver events as a bare object or as an array whose
//! first element is the event, and nest identifiers at several possible
//! paths. Instead of ad hoc conditional chains, each identifier has an
//! ordered list of extraction paths tried in sequence against the JSON tree;
//! the first non-null match wins.

use serde_json::Value;

/// Extraction paths for the external user id.
pub const USER_ID_PATHS: &[&[&str]] = &[
    &["user_id"],
    &["user", "id"],
    &["data", "user_id"],
    &["data", "user", "id"],
    &["member", "user", "id"],
    &["author", "id"],
];

/// Extraction paths for the tenant (company) id.
pub const TENANT_ID_PATHS: &[&[&str]] = &[
    &["tenant_id"],
    &["company_id"],
    &["data", "tenant_id"],
    &["data", "company_id"],
    &["company", "id"],
];

/// Extraction paths for the commerce membership id.
pub const MEMBERSHIP_ID_PATHS: &[&[&str]] = &[
    &["membership_id"],
    &["membership", "id"],
    &["data", "membership_id"],
    &["data", "id"],
];

/// Extraction paths for the external message id.
pub const MESSAGE_ID_PATHS: &[&[&str]] = &[
    &["message_id"],
    &["id"],
    &["data", "message_id"],
    &["message", "id"],
];

/// Extraction paths for the message content.
pub const CONTENT_PATHS: &[&[&str]] = &[
    &["content"],
    &["data", "content"],
    &["message", "content"],
    &["text"],
];

/// Extraction paths for a display name.
pub const DISPLAY_NAME_PATHS: &[&[&str]] = &[
    &["username"],
    &["user", "name"],
    &["user", "username"],
    &["author", "username"],
    &["data", "user", "name"],
];

/// Unwrap the event object from a webhook payload.
///
/// Accepts the event directly, or an array whose first element is the event.
/// Anything else (scalar, empty array) yields `None`.
pub fn unwrap_event(payload: &Value) -> Option<&Value> {
    match payload {
        Value::Object(_) => Some(payload),
        Value::Array(items) => items.first().filter(|v| v.is_object()),
        _ => None,
    }
}

/// Try each extraction path in order; return the first non-null match as a
/// string. JSON numbers are rendered as their decimal form, since platforms
/// disagree on whether ids are strings.
pub fn extract_string(event: &Value, paths: &[&[&str]]) -> Option<String> {
    for path in paths {
        if let Some(value) = walk(event, path) {
            match value {
                Value::String(s) if !s.is_empty() => return Some(s.clone()),
                Value::Number(n) => return Some(n.to_string()),
                _ => {}
            }
        }
    }
    None
}

fn walk<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

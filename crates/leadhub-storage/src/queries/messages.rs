// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD and ownership-repair operations.

use leadhub_core::types::{Channel, Direction};
use leadhub_core::LeadhubError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::Message;

const MESSAGE_COLS: &str =
    "id, lead_id, tenant_id, owner_id, direction, channel, content, external_id, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let direction_raw: String = row.get(4)?;
    let direction = direction_raw.parse::<Direction>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let channel_raw: String = row.get(5)?;
    let channel = channel_raw.parse::<Channel>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Message {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        tenant_id: row.get(2)?,
        owner_id: row.get(3)?,
        direction,
        channel,
        content: row.get(6)?,
        external_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert a new message. A duplicate `(channel, external_id)` fails with a
/// unique violation (idempotent replay protection).
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), LeadhubError> {
    let m = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                 (id, lead_id, tenant_id, owner_id, direction, channel, content, external_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    m.id,
                    m.lead_id,
                    m.tenant_id,
                    m.owner_id,
                    m.direction.to_string(),
                    m.channel.to_string(),
                    m.content,
                    m.external_id,
                    m.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a message by primary key.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, LeadhubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let msg = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                    params![id],
                    row_to_message,
                )
                .optional()?;
            Ok(msg)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the message carrying an external id, scoped per channel.
pub async fn find_by_external_id(
    db: &Database,
    channel: Channel,
    external_id: &str,
) -> Result<Option<Message>, LeadhubError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let msg = conn
                .query_row(
                    &format!(
                        "SELECT {MESSAGE_COLS} FROM messages
                         WHERE channel = ?1 AND external_id = ?2"
                    ),
                    params![channel.to_string(), external_id],
                    row_to_message,
                )
                .optional()?;
            Ok(msg)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages for a lead in persisted (chronological) order.
pub async fn get_messages_for_lead(
    db: &Database,
    lead_id: &str,
) -> Result<Vec<Message>, LeadhubError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE lead_id = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![lead_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp the external id assigned by the platform after an outbound send.
pub async fn set_external_id(
    db: &Database,
    message_id: &str,
    external_id: &str,
) -> Result<(), LeadhubError> {
    let message_id = message_id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET external_id = ?2 WHERE id = ?1",
                params![message_id, external_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Rewrite `owner_id` on every message in a tenant that drifted from its
/// lead's current owner. The lead's owner is authoritative. Returns the
/// number of messages fixed.
pub async fn fix_owner_drift(db: &Database, tenant_id: &str) -> Result<i64, LeadhubError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let fixed = conn.execute(
                "UPDATE messages SET owner_id =
                   (SELECT owner_id FROM leads WHERE leads.id = messages.lead_id)
                 WHERE tenant_id = ?1
                   AND owner_id !=
                   (SELECT owner_id FROM leads WHERE leads.id = messages.lead_id)",
                params![tenant_id],
            )? as i64;
            Ok(fixed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

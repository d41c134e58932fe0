//! Persisted cart state.
//!
//! A snapshot is the `{ userId, items }` pair a session writes to disk so a
//! restart can pick up the cart where it was left.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use essence_core::{CartItem, CartLines, UserId};

use crate::error::Result;

/// A session's cart as persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Owner of the items, if a user was bound.
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "unique_lines")]
    pub items: CartLines,
}

fn unique_lines<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<CartLines, D::Error> {
    let items = Vec::<CartItem>::deserialize(deserializer)?;
    CartLines::try_from_items(items).map_err(serde::de::Error::custom)
}

impl CartSnapshot {
    /// Read a snapshot from `path`.
    ///
    /// A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be read and
    /// `ClientError::Json` if it does not hold a valid snapshot.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Write the snapshot to `path`, replacing any previous one.
    ///
    /// The file is written next to `path` first and renamed into place, so
    /// a reader never sees a half-written snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

//! Redis-backed document store.
//!
//! Documents are RedisJSON values stored under `{key_prefix}:{id}`. A scope
//! reads straight from Redis and buffers its writes; commit sends them as a
//! single `MULTI`/`EXEC` pipeline.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;

use super::{DocumentStore, MarkerRecord, Scope, StagedChanges};
use crate::errors::Result;
use crate::migration::MARKER_COLLECTION;

/// Default key prefix for documents written by docmig.
pub const DEFAULT_KEY_PREFIX: &str = "docmig";

const SCAN_COUNT: usize = 500;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, key_prefix))
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Full Redis key for a document id.
    pub fn key(&self, id: &str) -> String {
        document_key(&self.key_prefix, id)
    }

    /// All marker records currently stored, sorted by version.
    pub async fn list_markers(&self) -> Result<Vec<MarkerRecord>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:{}:*", self.key_prefix, MARKER_COLLECTION);
        let mut cursor: u64 = 0;
        let mut markers = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                if let Some(document) = read_document(&mut conn, &key).await? {
                    match serde_json::from_value::<MarkerRecord>(document) {
                        Ok(marker) => markers.push(marker),
                        Err(err) => log::warn!("ignoring malformed marker record at {key}: {err}"),
                    }
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        markers.sort_by_key(|marker| marker.version);
        Ok(markers)
    }
}

fn document_key(prefix: &str, id: &str) -> String {
    format!("{prefix}:{id}")
}

async fn read_document(conn: &mut ConnectionManager, key: &str) -> Result<Option<Value>> {
    let raw: Option<String> = redis::cmd("JSON.GET").arg(key).arg("$").query_async(conn).await?;

    match raw {
        Some(json_str) => {
            // JSON.GET with a `$` path wraps the document in an array
            let values: Vec<Value> = serde_json::from_str(&json_str)?;
            Ok(values.into_iter().next())
        }
        None => Ok(None),
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    fn identity_separator(&self) -> char {
        ':'
    }

    async fn open_scope(&self) -> Result<Box<dyn Scope>> {
        Ok(Box::new(RedisScope {
            conn: self.conn.clone(),
            key_prefix: self.key_prefix.clone(),
            staged: StagedChanges::default(),
        }))
    }
}

struct RedisScope {
    conn: ConnectionManager,
    key_prefix: String,
    staged: StagedChanges,
}

#[async_trait]
impl Scope for RedisScope {
    async fn load(&mut self, id: &str) -> Result<Option<Value>> {
        if let Some(staged) = self.staged.get(id) {
            return Ok(staged.cloned());
        }
        let key = document_key(&self.key_prefix, id);
        read_document(&mut self.conn, &key).await
    }

    fn store(&mut self, id: &str, document: Value) {
        self.staged.put(id, document);
    }

    fn delete(&mut self, id: &str) {
        self.staged.remove(id);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let RedisScope {
            mut conn,
            key_prefix,
            staged,
        } = *self;

        if staged.is_empty() {
            return Ok(());
        }

        log::trace!("committing {} staged change(s) to redis", staged.len());

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (id, change) in staged.into_changes() {
            let key = document_key(&key_prefix, &id);
            match change {
                Some(document) => {
                    let payload = serde_json::to_string(&document)?;
                    pipe.cmd("JSON.SET").arg(&key).arg("$").arg(payload).ignore();
                }
                None => {
                    pipe.cmd("DEL").arg(&key).ignore();
                }
            }
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

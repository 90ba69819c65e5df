//! Redis-backed room repository.
//!
//! # Key Patterns
//!
//! - `draft:room:{code}` - the `RoomRecord` as JSON
//! - `draft:rooms` - sorted set of room codes scored by `createdAt`
//!
//! Writes go through one `MULTI` pipeline so the record and its index entry
//! never disagree. The index uses `ZADD NX` so an overwrite keeps the room's
//! original position in the recency ordering.

use super::RoomRepository;
use crate::errors::DraftError;
use crate::observability::metrics;
use async_trait::async_trait;
use common::types::RoomCode;
use draft_core::RoomRecord;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Instant;
use tracing::{error, instrument, warn};

const ROOM_KEY_PREFIX: &str = "draft:room:";
const ROOM_INDEX_KEY: &str = "draft:rooms";

fn room_key(code: &RoomCode) -> String {
    format!("{ROOM_KEY_PREFIX}{code}")
}

/// `SET` the record and add it to the index, in one transaction.
fn write_pipeline(record: &RoomRecord, json: String) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .set(room_key(&record.code), json)
        .ignore()
        .cmd("ZADD")
        .arg(ROOM_INDEX_KEY)
        .arg("NX")
        .arg(record.created_at)
        .arg(record.code.as_str())
        .ignore();
    pipe
}

fn delete_pipeline(code: &RoomCode) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .del(room_key(code))
        .ignore()
        .zrem(ROOM_INDEX_KEY, code.as_str())
        .ignore();
    pipe
}

/// Cheaply cloneable; the multiplexed connection is shared across tasks.
#[derive(Clone)]
pub struct RedisRoomRepository {
    connection: MultiplexedConnection,
}

impl RedisRoomRepository {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Storage` if the client cannot be opened or the
    /// connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, DraftError> {
        let client = Client::open(redis_url).map_err(|e| {
            // Do NOT log redis_url, it may contain credentials
            error!(target: "draft.repository", error = %e, "Failed to open Redis client");
            DraftError::Storage(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "draft.repository", error = %e, "Failed to connect to Redis");
                DraftError::Storage(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self { connection })
    }

    fn decode(code: &str, json: &str) -> Result<RoomRecord, DraftError> {
        serde_json::from_str(json).map_err(|e| {
            warn!(target: "draft.repository", room_code = %code, error = %e, "Corrupt room record");
            DraftError::Storage(format!("corrupt room record: {e}"))
        })
    }
}

#[async_trait]
impl RoomRepository for RedisRoomRepository {
    #[instrument(skip_all, fields(room_code = %code))]
    async fn read_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, DraftError> {
        let start = Instant::now();
        let mut conn = self.connection.clone();
        let result: Result<Option<String>, _> = conn.get(room_key(code)).await;
        metrics::record_repository_latency("read", start.elapsed());

        match result? {
            Some(json) => Self::decode(code.as_str(), &json).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(room_code = %record.code))]
    async fn write_room(&self, record: &RoomRecord) -> Result<(), DraftError> {
        let json = serde_json::to_string(record)
            .map_err(|e| DraftError::Internal(format!("room record serialization failed: {e}")))?;

        let start = Instant::now();
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> =
            write_pipeline(record, json).query_async(&mut conn).await;
        metrics::record_repository_latency("write", start.elapsed());

        result.map_err(DraftError::from)
    }

    #[instrument(skip_all, fields(room_code = %code))]
    async fn delete_room(&self, code: &RoomCode) -> Result<(), DraftError> {
        let start = Instant::now();
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> =
            delete_pipeline(code).query_async(&mut conn).await;
        metrics::record_repository_latency("delete", start.elapsed());

        result.map_err(DraftError::from)
    }

    #[instrument(skip_all)]
    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, DraftError> {
        let start = Instant::now();
        let mut conn = self.connection.clone();

        let codes: Vec<String> = conn.zrevrange(ROOM_INDEX_KEY, 0, -1).await?;
        if codes.is_empty() {
            metrics::record_repository_latency("list", start.elapsed());
            return Ok(Vec::new());
        }

        let keys: Vec<String> = codes
            .iter()
            .map(|code| format!("{ROOM_KEY_PREFIX}{code}"))
            .collect();
        let values: Vec<Option<String>> = conn.mget(&keys).await?;
        metrics::record_repository_latency("list", start.elapsed());

        // Index entries without a record, or records that no longer decode,
        // are skipped rather than failing the whole listing.
        Ok(codes
            .iter()
            .zip(values)
            .filter_map(|(code, value)| {
                value.and_then(|json| Self::decode(code, &json).ok())
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_room_key_layout() {
        let code = RoomCode::parse("Finals_2").unwrap();
        assert_eq!(room_key(&code), "draft:room:Finals_2");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            RedisRoomRepository::decode("abc", "{not json"),
            Err(DraftError::Storage(_))
        ));
    }

    #[test]
    fn test_decode_record() {
        let record = RoomRecord::new(RoomCode::parse("abc").unwrap(), 1_700_000_000_000);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(RedisRoomRepository::decode("abc", &json).unwrap(), record);
    }

    fn packed(pipe: &redis::Pipeline) -> String {
        String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned()
    }

    #[test]
    fn test_write_is_one_transaction_keeping_index_position() {
        let record = RoomRecord::new(RoomCode::parse("abc").unwrap(), 42);
        let wire = packed(&write_pipeline(&record, "{}".to_string()));

        let multi = wire.find("MULTI").unwrap();
        let set = wire.find("SET").unwrap();
        let zadd = wire.find("ZADD").unwrap();
        let exec = wire.find("EXEC").unwrap();
        assert!(multi < set && set < zadd && zadd < exec);
        assert!(wire.contains("draft:room:abc"));
        assert!(wire.contains("NX"));
    }

    #[test]
    fn test_delete_drops_record_and_index_entry() {
        let wire = packed(&delete_pipeline(&RoomCode::parse("abc").unwrap()));

        assert!(wire.contains("MULTI") && wire.contains("EXEC"));
        assert!(wire.contains("DEL") && wire.contains("ZREM"));
        assert!(wire.contains("draft:room:abc"));
    }
}

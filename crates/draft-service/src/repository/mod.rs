//! Persistence backend for room records.
//!
//! The Session Store writes every accepted mutation through a
//! [`RoomRepository`] before acknowledging it. Production uses Redis; tests
//! use the in-memory [`mock::MockRoomRepository`].

mod redis;

pub use self::redis::RedisRoomRepository;

use crate::errors::DraftError;
use async_trait::async_trait;
use common::types::RoomCode;
use draft_core::RoomRecord;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn read_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, DraftError>;

    /// Insert or overwrite. `createdAt` of an existing record is kept in the
    /// recency index.
    async fn write_room(&self, record: &RoomRecord) -> Result<(), DraftError>;

    async fn delete_room(&self, code: &RoomCode) -> Result<(), DraftError>;

    /// All rooms, newest `createdAt` first.
    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, DraftError>;
}

/// In-memory repository with failure injection, for tests.
pub mod mock {
    use super::{async_trait, DraftError, RoomCode, RoomRecord, RoomRepository};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MockRoomRepository {
        rooms: Mutex<HashMap<RoomCode, RoomRecord>>,
        failing: AtomicBool,
        write_count: AtomicUsize,
    }

    impl MockRoomRepository {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Repository whose every call fails until [`Self::set_failing`]
        /// turns it off.
        #[must_use]
        pub fn failing() -> Self {
            let repo = Self::default();
            repo.set_failing(true);
            repo
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Successful writes so far.
        #[must_use]
        pub fn write_count(&self) -> usize {
            self.write_count.load(Ordering::SeqCst)
        }

        /// Current stored copy, bypassing failure injection.
        #[must_use]
        pub fn stored(&self, code: &RoomCode) -> Option<RoomRecord> {
            self.rooms
                .lock()
                .ok()
                .and_then(|rooms| rooms.get(code).cloned())
        }

        /// Seed a record, bypassing failure injection.
        pub fn insert(&self, record: RoomRecord) {
            if let Ok(mut rooms) = self.rooms.lock() {
                rooms.insert(record.code.clone(), record);
            }
        }

        fn check(&self) -> Result<(), DraftError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(DraftError::Storage("injected failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn lock(
            &self,
        ) -> Result<std::sync::MutexGuard<'_, HashMap<RoomCode, RoomRecord>>, DraftError> {
            self.rooms
                .lock()
                .map_err(|e| DraftError::Internal(format!("mock repository poisoned: {e}")))
        }
    }

    #[async_trait]
    impl RoomRepository for MockRoomRepository {
        async fn read_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, DraftError> {
            self.check()?;
            Ok(self.lock()?.get(code).cloned())
        }

        async fn write_room(&self, record: &RoomRecord) -> Result<(), DraftError> {
            self.check()?;
            let mut rooms = self.lock()?;
            let created_at = rooms
                .get(&record.code)
                .map_or(record.created_at, |existing| existing.created_at);
            let mut stored = record.clone();
            stored.created_at = created_at;
            rooms.insert(record.code.clone(), stored);
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_room(&self, code: &RoomCode) -> Result<(), DraftError> {
            self.check()?;
            self.lock()?.remove(code);
            Ok(())
        }

        async fn list_rooms(&self) -> Result<Vec<RoomRecord>, DraftError> {
            self.check()?;
            let mut rooms: Vec<RoomRecord> = self.lock()?.values().cloned().collect();
            rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rooms)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockRoomRepository;
    use super::*;

    fn record(code: &str, created_at: i64) -> RoomRecord {
        RoomRecord::new(RoomCode::parse(code).unwrap(), created_at)
    }

    #[tokio::test]
    async fn test_mock_round_trip_and_listing_order() {
        let repo = MockRoomRepository::new();
        repo.write_room(&record("old", 1)).await.unwrap();
        repo.write_room(&record("new", 5)).await.unwrap();
        repo.write_room(&record("mid", 3)).await.unwrap();

        let codes: Vec<String> = repo
            .list_rooms()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code.to_string())
            .collect();
        assert_eq!(codes, vec!["new", "mid", "old"]);
        assert_eq!(repo.write_count(), 3);

        let code = RoomCode::parse("mid").unwrap();
        assert!(repo.read_room(&code).await.unwrap().is_some());
        repo.delete_room(&code).await.unwrap();
        assert!(repo.read_room(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_overwrite_keeps_created_at() {
        let repo = MockRoomRepository::new();
        repo.write_room(&record("abc", 10)).await.unwrap();

        let mut later = record("abc", 99);
        later.state.phase_index = 4;
        repo.write_room(&later).await.unwrap();

        let stored = repo.stored(&later.code).unwrap();
        assert_eq!(stored.created_at, 10);
        assert_eq!(stored.state.phase_index, 4);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let repo = MockRoomRepository::failing();
        let result = repo.write_room(&record("abc", 1)).await;
        assert!(matches!(result, Err(DraftError::Storage(_))));
        assert_eq!(repo.write_count(), 0);

        repo.set_failing(false);
        repo.write_room(&record("abc", 1)).await.unwrap();
        assert_eq!(repo.write_count(), 1);
    }
}

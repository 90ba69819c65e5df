//! # Draft Test Utilities
//!
//! Shared test utilities for the draft service and its clients.
//!
//! This crate provides:
//! - Server test harness (`TestDraftServer` for E2E tests)
//! - Websocket test client (`TestWsClient`)
//! - Fixtures (room codes, rosters, command builders)
//! - The in-memory repository, re-exported from `draft-service`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use draft_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestDraftServer::spawn().await?;
//!     let code = room_code("ROOM1");
//!     server.create_room(&code).await?;
//!
//!     let mut left = TestWsClient::connect(&server.ws_url(&code, Seat::Left)).await?;
//!     let joined = left.next_event().await?;
//!     assert_eq!(joined.event_type(), "joined");
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;
pub mod ws_client;

pub use draft_service::repository::mock::MockRoomRepository;
pub use fixtures::*;
pub use server_harness::*;
pub use ws_client::*;

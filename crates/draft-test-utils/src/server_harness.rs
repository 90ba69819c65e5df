//! Test server harness for E2E testing
//!
//! Provides `TestDraftServer`, a real draft-service router bound to a random
//! local port and backed by the in-memory repository.

use common::types::RoomCode;
use draft_core::{DraftEngine, Seat};
use draft_service::actors::{ActorMetrics, ControllerSettings, RoomControllerActorHandle};
use draft_service::repository::mock::MockRoomRepository;
use draft_service::repository::RoomRepository;
use draft_service::routes::{self, AppState};
use draft_service::store::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Retry interval used by test servers; short so flush-after-failure tests
/// do not wait long.
pub const TEST_PERSIST_RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Test harness for spawning the draft service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create_room_e2e() -> Result<(), anyhow::Error> {
///     let server = TestDraftServer::spawn().await?;
///     let response = reqwest::Client::new()
///         .post(format!("{}/v1/rooms/ROOM1", server.url()))
///         .send()
///         .await?;
///     assert_eq!(response.status(), 201);
///     Ok(())
/// }
/// ```
pub struct TestDraftServer {
    addr: SocketAddr,
    repository: Arc<MockRoomRepository>,
    store: SessionStore,
    metrics: Arc<ActorMetrics>,
    _handle: JoinHandle<()>,
}

impl TestDraftServer {
    /// Spawn a server with an empty in-memory repository.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_repository(Arc::new(MockRoomRepository::new())).await
    }

    /// Spawn a server over a caller-owned repository, e.g. one that will be
    /// switched to failing mid-test.
    pub async fn spawn_with_repository(
        repository: Arc<MockRoomRepository>,
    ) -> Result<Self, anyhow::Error> {
        let metrics = ActorMetrics::new();
        let controller = RoomControllerActorHandle::new(
            "draft-test".to_string(),
            Arc::clone(&repository) as Arc<dyn RoomRepository>,
            Arc::new(DraftEngine::default()),
            ControllerSettings {
                max_rooms: 100,
                persist_retry_interval: TEST_PERSIST_RETRY_INTERVAL,
                idle_release: Duration::from_secs(300),
            },
            Arc::clone(&metrics),
        );
        let store = SessionStore::new(controller);

        let app = routes::build_routes(Arc::new(AppState {
            store: store.clone(),
            metrics: Arc::clone(&metrics),
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            repository,
            store,
            metrics,
            _handle: handle,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Websocket URL for joining `code` in `seat`.
    pub fn ws_url(&self, code: &RoomCode, seat: Seat) -> String {
        format!("ws://{}/v1/rooms/{}/ws?seat={}", self.addr, code, seat)
    }

    pub fn repository(&self) -> &Arc<MockRoomRepository> {
        &self.repository
    }

    /// The store behind the router, for setting up state without HTTP.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<ActorMetrics> {
        &self.metrics
    }

    /// `POST /v1/rooms/{code}` and check for 201.
    pub async fn create_room(&self, code: &RoomCode) -> Result<(), anyhow::Error> {
        let response = reqwest::Client::new()
            .post(format!("{}/v1/rooms/{}", self.url(), code))
            .send()
            .await?;
        anyhow::ensure!(
            response.status() == reqwest::StatusCode::CREATED,
            "create room returned {}",
            response.status()
        );
        Ok(())
    }
}

impl Drop for TestDraftServer {
    fn drop(&mut self) {
        self._handle.abort();
        self.store.controller().cancel();
    }
}

//! Room REST API integration tests over a real listener.

use draft_core::{RoomState, Seat};
use draft_test_utils::{room_code, Closed, TestDraftServer, TestWsClient};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_create_then_fetch_room() -> Result<(), anyhow::Error> {
    let server = TestDraftServer::spawn().await?;
    let client = reqwest::Client::new();
    let code = room_code("REST1");

    let created = client
        .post(format!("{}/v1/rooms/{}", server.url(), code))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let state: RoomState = created.json().await?;
    assert_eq!(state, RoomState::new());

    let fetched = client
        .get(format!("{}/v1/rooms/{}", server.url(), code))
        .send()
        .await?;
    assert_eq!(fetched.status(), StatusCode::OK);
    let body: Value = fetched.json().await?;
    assert_eq!(body["phaseIndex"], 0);
    assert_eq!(body["swapSides"], false);

    Ok(())
}

#[tokio::test]
async fn test_capacity_follows_connections() -> Result<(), anyhow::Error> {
    let server = TestDraftServer::spawn().await?;
    let client = reqwest::Client::new();
    let code = room_code("SEATS");
    server.create_room(&code).await?;

    let capacity_url = format!("{}/v1/rooms/{}/capacity", server.url(), code);
    let body: Value = client.get(&capacity_url).send().await?.json().await?;
    assert_eq!(body["exists"], true);
    assert_eq!(body["hasLeft"], false);

    let mut left = TestWsClient::connect(&server.ws_url(&code, Seat::Left)).await?;
    left.next_of_type("restart-ready-status").await?;

    let body: Value = client.get(&capacity_url).send().await?.json().await?;
    assert_eq!(body["hasLeft"], true);
    assert_eq!(body["hasRight"], false);

    let missing: Value = client
        .get(format!("{}/v1/rooms/NOPE/capacity", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(missing["exists"], false);

    Ok(())
}

#[tokio::test]
async fn test_delete_closes_subscribers() -> Result<(), anyhow::Error> {
    let server = TestDraftServer::spawn().await?;
    let client = reqwest::Client::new();
    let code = room_code("GONE1");
    server.create_room(&code).await?;

    let mut left = TestWsClient::connect(&server.ws_url(&code, Seat::Left)).await?;
    left.next_of_type("restart-ready-status").await?;

    let deleted = client
        .delete(format!("{}/v1/rooms/{}", server.url(), code))
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    assert!(matches!(
        left.expect_close().await?,
        Closed::Frame { .. } | Closed::WithoutFrame
    ));
    assert!(server.repository().stored(&code).is_none());

    let fetched = client
        .get(format!("{}/v1/rooms/{}", server.url(), code))
        .send()
        .await?;
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    let body: Value = fetched.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn test_list_rooms_reports_created_rooms() -> Result<(), anyhow::Error> {
    let server = TestDraftServer::spawn().await?;
    server.create_room(&room_code("LIST1")).await?;
    server.create_room(&room_code("LIST2")).await?;

    let body: Value = reqwest::get(format!("{}/v1/rooms", server.url()))
        .await?
        .json()
        .await?;
    let rooms = body
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("expected an array, got {body}"))?;
    assert_eq!(rooms.len(), 2);

    Ok(())
}

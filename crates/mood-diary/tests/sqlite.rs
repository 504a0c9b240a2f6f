//! Persistence of a diary across reopen.

use std::sync::Arc;

use mood_diary::perms::GrantOrigin;
use mood_diary::store::{DiaryStore, SqliteStore};
use mood_diary::DiaryPhase;
use mood_diary_testkit::{init_tracing, multi_party, DiaryFixture};

#[tokio::test]
async fn diary_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diary.db");

    let fixture = DiaryFixture::sqlite(&path).await.unwrap();
    let parties = multi_party(&fixture, 3);
    let (alice, bob, carol) = (&parties[0], &parties[1], &parties[2]);

    alice.submit(&fixture.diary, 5).await.unwrap();
    bob.submit(&fixture.diary, 2).await.unwrap();
    fixture.diary.request_access(&carol.identity()).await.unwrap();

    let trend = fixture.diary.get_encrypted_trend().await;
    let total = fixture.diary.get_encrypted_total().await;

    let reopened_store: Arc<dyn DiaryStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let reopened = fixture.reopen_with(reopened_store).await.unwrap();

    assert_eq!(reopened.get_entry_count().await, 2);
    assert_eq!(reopened.phase().await, DiaryPhase::Populated);
    assert_eq!(reopened.get_encrypted_trend().await, trend);
    assert_eq!(reopened.get_encrypted_total().await, total);

    for party in &parties {
        assert!(reopened.can_decrypt(&party.identity()).await);
    }
    assert_eq!(
        reopened.grant_of(&carol.identity()).await.unwrap().origin,
        GrantOrigin::Request
    );

    assert_eq!(carol.decrypt_personal(&reopened).await.unwrap(), 3);
}

#[tokio::test]
async fn submissions_continue_after_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diary.db");

    let fixture = DiaryFixture::sqlite(&path).await.unwrap();
    let parties = multi_party(&fixture, 2);
    parties[0].submit(&fixture.diary, 4).await.unwrap();

    let reopened_store: Arc<dyn DiaryStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let reopened = fixture.reopen_with(reopened_store).await.unwrap();
    let receipt = parties[1].submit(&reopened, 2).await.unwrap();

    assert_eq!(receipt.entry_count, 2);
    assert_eq!(parties[0].decrypt_personal(&reopened).await.unwrap(), 3);
}

#[tokio::test]
async fn second_handle_sees_earlier_writes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diary.db");

    let fixture = DiaryFixture::sqlite(&path).await.unwrap();
    let parties = multi_party(&fixture, 2);

    let second_store: Arc<dyn DiaryStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let second = fixture.reopen_with(second_store).await.unwrap();

    parties[0].submit(&fixture.diary, 4).await.unwrap();
    assert_eq!(second.get_entry_count().await, 1);

    let receipt = parties[1].submit(&second, 2).await.unwrap();
    assert_eq!(receipt.entry_count, 2);
    assert_eq!(fixture.diary.get_entry_count().await, 2);
    assert_eq!(fixture.diary.get_encrypted_trend().await, receipt.trend_handle);
}

#[tokio::test]
async fn access_through_second_handle_sees_current_trend() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diary.db");

    let fixture = DiaryFixture::sqlite(&path).await.unwrap();
    let parties = multi_party(&fixture, 2);
    let carol = fixture.participant(3);

    let second_store: Arc<dyn DiaryStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let second = fixture.reopen_with(second_store).await.unwrap();

    parties[0].submit(&fixture.diary, 5).await.unwrap();
    parties[1].submit(&fixture.diary, 1).await.unwrap();

    assert!(second.request_access(&carol.identity()).await.unwrap());
    assert_eq!(second.get_entry_count().await, 2);
    assert!(!second.get_personal_handle(&carol.identity()).await.is_empty());
    assert_eq!(carol.decrypt_personal(&second).await.unwrap(), 3);
}

//! Integration tests for the SQLite comic store

mod helpers;

use comix_common::events::ComicState;
use comix_common::Error;
use comix_ingest::archive::ArchiveType;
use comix_ingest::models::{BlockedHash, Comic, ComicInfo, FileDetails, MetadataDocument, PageState};
use comix_ingest::store::ComicStore;
use helpers::{comic_info_xml, create_test_store};
use std::collections::HashSet;

fn comic_with_pages(path: &str, hashes: &[Option<&str>]) -> Comic {
    let mut comic = Comic::new(path, ArchiveType::Zip);
    for (i, hash) in hashes.iter().enumerate() {
        let page = comic.push_page(format!("{:03}.jpg", i));
        page.hash = hash.map(str::to_string);
        page.width = 640;
        page.height = 960;
    }
    comic
}

#[tokio::test]
async fn test_comic_round_trip() {
    let (_dir, store) = create_test_store().await.unwrap();
    let raw = comic_info_xml("Delta", "4");
    let mut comic = comic_with_pages("/library/delta.cbz", &[Some("aa"), None]);
    comic.state = ComicState::Unprocessed;
    comic.metadata_read = true;
    comic.metadata = Some(MetadataDocument {
        entry_name: "ComicInfo.xml".to_string(),
        info: ComicInfo::parse(&raw).unwrap(),
        raw: raw.clone(),
    });
    comic.file_details = Some(FileDetails {
        hash: "ff".repeat(32),
        size: 1234,
        created_at: chrono::Utc::now(),
    });

    store.save_comic(&comic).await.unwrap();
    let stored = store.get_comic(comic.id).await.unwrap().unwrap();

    assert_eq!(stored.filename, comic.filename);
    assert_eq!(stored.archive_type, ArchiveType::Zip);
    assert_eq!(stored.state, ComicState::Unprocessed);
    assert!(stored.metadata_read);
    let metadata = stored.metadata.unwrap();
    assert_eq!(metadata.entry_name, "ComicInfo.xml");
    assert_eq!(metadata.raw, raw);
    assert_eq!(metadata.info.series.as_deref(), Some("Delta"));
    let details = stored.file_details.unwrap();
    assert_eq!(details.size, 1234);
    assert_eq!(details.hash, "ff".repeat(32));

    assert_eq!(stored.pages.len(), 2);
    assert_eq!(stored.pages[0].id, comic.pages[0].id);
    assert_eq!(stored.pages[0].hash.as_deref(), Some("aa"));
    assert_eq!(stored.pages[1].hash, None);
    assert_eq!((stored.pages[1].width, stored.pages[1].height), (640, 960));

    let by_path = store
        .find_comic_by_path(&comic.filename)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_path.id, comic.id);
    assert_eq!(
        store.find_comics_by_state(ComicState::Unprocessed).await.unwrap().len(),
        1
    );
    assert!(store.find_comics_by_state(ComicState::Stable).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resave_replaces_page_set() {
    let (_dir, store) = create_test_store().await.unwrap();
    let mut comic = comic_with_pages("/library/a.cbz", &[None, None, None]);
    store.save_comic(&comic).await.unwrap();

    let dropped = comic.pages[0].id;
    comic.pages[0].mark_for_deletion().unwrap();
    comic.remove_marked_pages().unwrap();
    store.save_comic(&comic).await.unwrap();

    let stored = store.get_comic(comic.id).await.unwrap().unwrap();
    assert_eq!(stored.pages.len(), 2);
    assert_eq!(stored.pages[0].page_number, 0);
    assert_eq!(stored.pages[0].filename, "001.jpg");
    assert!(store.get_page(dropped).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_path_is_rejected() {
    let (_dir, store) = create_test_store().await.unwrap();
    store
        .save_comic(&Comic::new("/library/a.cbz", ArchiveType::Zip))
        .await
        .unwrap();

    let result = store
        .save_comic(&Comic::new("/library/a.cbz", ArchiveType::Zip))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_keyset_pagination_visits_each_page_once() {
    let (_dir, store) = create_test_store().await.unwrap();
    let a = comic_with_pages("/library/a.cbz", &[None, None, None, Some("x")]);
    let b = comic_with_pages("/library/b.cbz", &[None, None, None]);
    store.save_comic(&a).await.unwrap();
    store.save_comic(&b).await.unwrap();

    assert_eq!(store.count_pages_without_hash().await.unwrap(), 6);

    let mut seen = HashSet::new();
    let mut after = None;
    loop {
        let window = store.find_pages_without_hash(after, 4).await.unwrap();
        if window.is_empty() {
            break;
        }
        assert!(window.len() <= 4);
        assert!(window.windows(2).all(|w| w[0].id < w[1].id));
        for page in &window {
            assert!(page.hash.is_none());
            assert!(seen.insert(page.id));
        }
        after = window.last().map(|p| p.id);
    }
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn test_save_pages_is_atomic() {
    let (_dir, store) = create_test_store().await.unwrap();
    let comic = comic_with_pages("/library/a.cbz", &[None, None]);
    store.save_comic(&comic).await.unwrap();

    let mut first = comic.pages[0].clone();
    first.hash = Some("abc".to_string());
    let mut stranger = comic_with_pages("/library/b.cbz", &[None]).pages[0].clone();
    stranger.hash = Some("def".to_string());

    let result = store.save_pages(&[first.clone(), stranger]).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(store.get_page(first.id).await.unwrap().unwrap().hash, None);

    store.save_pages(&[first.clone()]).await.unwrap();
    assert_eq!(
        store.get_page(first.id).await.unwrap().unwrap().hash.as_deref(),
        Some("abc")
    );
}

#[tokio::test]
async fn test_blocked_hashes_and_derived_flag() {
    let (_dir, store) = create_test_store().await.unwrap();
    let comic = comic_with_pages("/library/a.cbz", &[Some("bad"), Some("good")]);
    store.save_comic(&comic).await.unwrap();

    store.save_blocked_hash(&BlockedHash::new("bad", "advert")).await.unwrap();
    store
        .save_blocked_hash(&BlockedHash::new("bad", "scanner credit").with_snapshot(vec![7, 7]))
        .await
        .unwrap();

    let listed = store.list_blocked_hashes().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].label, "scanner credit");
    assert_eq!(listed[0].snapshot, Some(vec![7, 7]));
    assert_eq!(
        store.find_blocked_hashes().await.unwrap(),
        HashSet::from(["bad".to_string()])
    );

    let stored = store.get_comic(comic.id).await.unwrap().unwrap();
    assert!(stored.pages[0].blocked);
    assert!(!stored.pages[1].blocked);

    let unmarked = store.find_unmarked_blocked_pages(None, 10).await.unwrap();
    assert_eq!(unmarked.len(), 1);
    assert_eq!(unmarked[0].id, comic.pages[0].id);
    assert_eq!(store.count_unmarked_blocked_pages().await.unwrap(), 1);

    assert!(store.delete_blocked_hash("bad").await.unwrap());
    assert!(!store.delete_blocked_hash("bad").await.unwrap());
    assert!(store.get_blocked_hash("bad").await.unwrap().is_none());
    let stored = store.get_comic(comic.id).await.unwrap().unwrap();
    assert!(!stored.pages[0].blocked);
}

#[tokio::test]
async fn test_pages_by_hash_and_state() {
    let (_dir, store) = create_test_store().await.unwrap();
    let mut comic = comic_with_pages("/library/a.cbz", &[Some("h1"), Some("h1"), Some("h2")]);
    comic.pages[1].mark_for_deletion().unwrap();
    store.save_comic(&comic).await.unwrap();

    let stable = store
        .find_pages_by_hash("h1", PageState::Stable, None, 10)
        .await
        .unwrap();
    assert_eq!(stable.len(), 1);
    assert_eq!(stable[0].id, comic.pages[0].id);
    assert_eq!(
        store.count_pages_by_hash("h1", PageState::MarkedForDeletion).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_reports() {
    let (_dir, store) = create_test_store().await.unwrap();
    let mut a = comic_with_pages("/library/a.cbz", &[Some("dup"), Some("solo"), Some("dup")]);
    let mut b = comic_with_pages("/library/b.cbz", &[Some("dup")]);
    a.pages[1].mark_for_deletion().unwrap();
    b.pages[0].mark_for_deletion().unwrap();
    store.save_comic(&a).await.unwrap();
    store.save_comic(&b).await.unwrap();

    let duplicates = store.find_duplicate_pages().await.unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].hash, "dup");
    assert_eq!(duplicates[0].page_count, 3);
    assert_eq!(duplicates[0].comic_ids.len(), 2);

    let deleted = store.find_deleted_pages().await.unwrap();
    assert_eq!(deleted.len(), 2);
    assert_eq!(deleted[0].hash, "dup");
    assert!(deleted[0].comic_ids.contains(&b.id));
    assert_eq!(deleted[1].hash, "solo");
    assert!(deleted[1].comic_ids.contains(&a.id));
}

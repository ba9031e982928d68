//! Integration tests for the archive adaptors
//!
//! Every supported container goes through the same write/open/read cycle.

mod helpers;

use comix_ingest::archive::{ArchiveAdaptor, ArchiveAdaptors, ArchiveType, PageContent};
use comix_ingest::models::{ComicInfo, MetadataDocument, Page};
use comix_ingest::ArchiveError;
use helpers::{comic_info_xml, gif_image, jpeg_image, png_image};
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

fn adaptor(archive_type: ArchiveType) -> std::sync::Arc<dyn ArchiveAdaptor> {
    ArchiveAdaptors::with_default_formats()
        .get(archive_type)
        .unwrap()
        .clone()
}

fn metadata() -> MetadataDocument {
    let raw = comic_info_xml("Gamma", "3");
    MetadataDocument {
        entry_name: "comicinfo.xml".to_string(),
        info: ComicInfo::parse(&raw).unwrap(),
        raw,
    }
}

fn pages(names: &[&str]) -> Vec<Page> {
    let comic_id = Uuid::new_v4();
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Page::new(comic_id, i as u32, *name))
        .collect()
}

fn write_and_publish(
    archive_type: ArchiveType,
    path: &Path,
    metadata: Option<&MetadataDocument>,
    contents: &[PageContent<'_>],
    renumber: bool,
) {
    let bytes = adaptor(archive_type)
        .write_archive(path, metadata, contents, renumber)
        .unwrap();
    std::fs::write(path, bytes).unwrap();
}

fn read_all(archive_type: ArchiveType, path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ArchiveAdaptors::with_default_formats()
        .open(archive_type, path)
        .unwrap();
    let names = archive.entry_names().unwrap();
    names
        .into_iter()
        .map(|name| {
            let content = archive.read_entry(&name).unwrap();
            (name, content)
        })
        .collect()
}

#[test]
fn test_round_trip_every_format() {
    let dir = TempDir::new().unwrap();
    let page_list = pages(&["a.jpg", "b.png", "c.gif"]);
    let images = [jpeg_image(4, 6, 1), png_image(5, 5, 2), gif_image(3, 3, 3)];
    let contents: Vec<PageContent<'_>> = page_list
        .iter()
        .zip(&images)
        .map(|(page, content)| PageContent {
            page,
            content: content.clone(),
        })
        .collect();
    let document = metadata();

    for archive_type in ArchiveType::ALL {
        let path = dir.path().join(format!("comic.{}", archive_type.comic_extension()));
        write_and_publish(archive_type, &path, Some(&document), &contents, false);

        let entries = read_all(archive_type, &path);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["comicinfo.xml", "a.jpg", "b.png", "c.gif"], "{}", archive_type);
        assert_eq!(entries[0].1, document.raw);
        for (entry, image) in entries[1..].iter().zip(&images) {
            assert_eq!(&entry.1, image, "{}", archive_type);
        }

        assert_eq!(
            ArchiveAdaptors::with_default_formats().detect(&path).unwrap(),
            archive_type
        );
    }
}

#[test]
fn test_marked_pages_are_left_out() {
    let dir = TempDir::new().unwrap();
    let mut page_list = pages(&["000.jpg", "001.jpg", "002.jpg", "003.jpg"]);
    page_list[1].mark_for_deletion().unwrap();
    page_list[3].mark_for_deletion().unwrap();
    let contents: Vec<PageContent<'_>> = page_list
        .iter()
        .enumerate()
        .map(|(i, page)| PageContent {
            page,
            content: jpeg_image(2, 2, i as u8),
        })
        .collect();

    for archive_type in ArchiveType::ALL {
        let path = dir.path().join(format!("marked.{}", archive_type.comic_extension()));
        write_and_publish(archive_type, &path, None, &contents, false);

        let entries = read_all(archive_type, &path);
        assert_eq!(entries.len(), 2, "{}", archive_type);
        assert_eq!(entries[0].0, "000.jpg");
        assert_eq!(entries[1].0, "002.jpg");
        assert_eq!(entries[1].1, jpeg_image(2, 2, 2));
    }
}

#[test]
fn test_pages_are_written_in_page_number_order() {
    let dir = TempDir::new().unwrap();
    let comic_id = Uuid::new_v4();
    let late = Page::new(comic_id, 1, "zz.jpg");
    let early = Page::new(comic_id, 0, "aa.jpg");
    let contents = vec![
        PageContent {
            page: &late,
            content: jpeg_image(1, 1, 1),
        },
        PageContent {
            page: &early,
            content: jpeg_image(1, 1, 0),
        },
    ];

    let path = dir.path().join("order.cbz");
    write_and_publish(ArchiveType::Zip, &path, None, &contents, false);

    let names: Vec<String> = read_all(ArchiveType::Zip, &path)
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert_eq!(names, vec!["aa.jpg", "zz.jpg"]);
}

#[test]
fn test_renumbering_names() {
    let dir = TempDir::new().unwrap();
    let mut page_list = pages(&["cover.JPG", "inside.png", "advert.jpg", "noext"]);
    page_list[2].mark_for_deletion().unwrap();
    let images = [
        jpeg_image(1, 1, 0),
        png_image(1, 1, 1),
        jpeg_image(1, 1, 2),
        gif_image(1, 1, 3),
    ];
    let contents: Vec<PageContent<'_>> = page_list
        .iter()
        .zip(&images)
        .map(|(page, content)| PageContent {
            page,
            content: content.clone(),
        })
        .collect();
    let document = metadata();

    let path = dir.path().join("renumbered.cbt");
    write_and_publish(ArchiveType::Tar, &path, Some(&document), &contents, true);

    let names: Vec<String> = read_all(ArchiveType::Tar, &path)
        .into_iter()
        .map(|(n, _)| n)
        .collect();
    assert_eq!(names, vec!["ComicInfo.xml", "000.jpg", "001.png", "002.gif"]);
}

#[test]
fn test_open_failures() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.cbz");
    std::fs::write(&garbage, b"this is not a container at all").unwrap();
    let adaptors = ArchiveAdaptors::with_default_formats();

    for archive_type in ArchiveType::ALL {
        let missing = dir.path().join("missing");
        assert!(matches!(
            adaptors.open(archive_type, &missing),
            Err(ArchiveError::Open { .. })
        ));
        assert!(matches!(
            adaptors.open(archive_type, dir.path()),
            Err(ArchiveError::Open { .. })
        ));
    }

    for archive_type in [ArchiveType::Zip, ArchiveType::SevenZip] {
        assert!(matches!(
            adaptors.open(archive_type, &garbage),
            Err(ArchiveError::Open { .. })
        ));
    }
}

#[test]
fn test_missing_entry_keeps_handle_usable() {
    let dir = TempDir::new().unwrap();
    let page_list = pages(&["000.jpg"]);
    let contents = vec![PageContent {
        page: &page_list[0],
        content: jpeg_image(1, 1, 9),
    }];

    for archive_type in ArchiveType::ALL {
        let path = dir.path().join(format!("one.{}", archive_type.comic_extension()));
        write_and_publish(archive_type, &path, None, &contents, false);

        let mut archive = ArchiveAdaptors::with_default_formats()
            .open(archive_type, &path)
            .unwrap();
        let err = archive.read_entry("999.jpg").unwrap_err();
        match err {
            ArchiveError::EntryRead { entry, path: p, .. } => {
                assert_eq!(entry, "999.jpg");
                assert_eq!(p, path);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(archive.read_entry("000.jpg").unwrap(), jpeg_image(1, 1, 9));
        archive.close();
        archive.close();
    }
}

#[test]
fn test_publish_replaces_target() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("published.cbz");
    std::fs::write(&path, b"old").unwrap();

    comix_ingest::archive::publish_archive(&path, b"new contents").unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"new contents");
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

//! Local library over a temporary music directory

use futures::StreamExt;
use gtmlocal::LocalLibrary;
use gtmsource::{AudioResolver, LocalLibraryGateway, LocalLibraryProvider, VideoPreview};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn library_with(files: &[(&str, &str)]) -> (TempDir, LocalLibrary) {
    let dir = TempDir::new().unwrap();
    for (name, bytes) in files {
        fs::write(dir.path().join(name), bytes).unwrap();
    }
    let library = LocalLibrary::new(dir.path());
    (dir, library)
}

#[tokio::test]
async fn test_list_filters_audio_files_by_stem() {
    let (_dir, library) = library_with(&[
        ("Halo_main-theme.mp3", "abc"),
        ("halo reach.OGG", "abcd"),
        ("portal.flac", "a"),
        ("halo notes.txt", "x"),
        ("halo.webm.part", "x"),
    ]);

    let items = library.list_items("HALO", 10).await.unwrap();

    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["local_Halo_main-theme", "local_halo reach"]);
    assert_eq!(items[0].title, "Halo main theme");
    assert_eq!(items[0].filename, "Halo_main-theme.mp3");
    assert_eq!(items[0].extension, "mp3");
    assert_eq!(items[0].size, 3);
    assert!(items[0].url.is_empty() && items[0].thumbnail.is_empty());
}

#[tokio::test]
async fn test_list_respects_limit_and_empty_term() {
    let (_dir, library) = library_with(&[("a.mp3", ""), ("b.mp3", ""), ("c.mp3", "")]);

    assert_eq!(library.list_items("", 10).await.unwrap().len(), 3);
    assert_eq!(library.list_items("", 2).await.unwrap().len(), 2);
    assert!(library.list_items("", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_directory_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let library = LocalLibrary::new(dir.path().join("absent"));

    assert!(library.list_items("", 10).await.unwrap().is_empty());
    assert_eq!(library.resource_url("local_x").await.unwrap(), None);
    assert_eq!(library.clear_downloads().await.unwrap(), 0);
}

#[tokio::test]
async fn test_resource_url_is_data_url() {
    let (_dir, library) = library_with(&[("halo.m4a", "abc"), ("itunes_42.m4a", "abcd")]);

    assert_eq!(
        library.resource_url("local_halo").await.unwrap().as_deref(),
        Some("data:audio/mp4;base64,YWJj")
    );
    // downloaded catalog previews are stored under their full id
    assert_eq!(
        library.local_resource_url("itunes_42").await.unwrap().as_deref(),
        Some("data:audio/mp4;base64,YWJjZA==")
    );
    assert_eq!(library.resource_url("local_portal").await.unwrap(), None);
}

#[tokio::test]
async fn test_partial_download_is_not_a_match() {
    let (_dir, library) = library_with(&[("abc123.webm.part", "x")]);
    assert_eq!(library.find_match("abc123").await.unwrap(), None);
}

#[tokio::test]
async fn test_path_traversal_is_rejected() {
    let (_dir, library) = library_with(&[]);
    assert!(library.resource_url("local_../secret").await.is_err());
    assert!(library.local_resource_url("../secret").await.is_err());
}

#[tokio::test]
async fn test_delete_and_clear() {
    let (dir, library) = library_with(&[("halo.mp3", "1"), ("portal.ogg", "2"), ("notes.txt", "3")]);

    assert!(library.delete_item("local_halo").await.unwrap());
    assert!(!library.delete_item("local_halo").await.unwrap());
    assert!(!dir.path().join("halo.mp3").exists());

    assert_eq!(library.clear_downloads().await.unwrap(), 2);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_local_provider_over_filesystem() {
    let (_dir, library) = library_with(&[("halo.ogg", "abc")]);
    let provider = LocalLibraryProvider::new(Arc::new(library));

    let previews: Vec<_> = provider.search("halo").collect().await;
    assert_eq!(previews, vec![VideoPreview::new("local_halo", "halo", "")]);

    let url = provider.resolve_url(&previews[0]).await;
    assert_eq!(url.as_deref(), Some("data:audio/ogg;base64,YWJj"));
}

//! Integration tests for gtmitunes

use gtmitunes::{Error, ItunesClient};
use gtmlocal::LocalLibrary;
use gtmsource::{AudioResolver, AudioResolverExt, CatalogGateway, CatalogProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_track(id: u64, name: &str, preview_url: &str) -> serde_json::Value {
    json!({
        "wrapperType": "track",
        "kind": "song",
        "trackId": id,
        "trackName": name,
        "artistName": "Martin O'Donnell",
        "collectionName": "Halo Original Soundtrack",
        "previewUrl": preview_url,
        "artworkUrl100": "https://is1.example/image/100x100bb.jpg",
        "trackTimeMillis": 215000
    })
}

fn client(server: &MockServer, music_dir: &TempDir) -> ItunesClient {
    ItunesClient::builder()
        .api_base(server.uri())
        .music_dir(music_dir.path())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_search_maps_tracks() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("term", "Halo Theme Music"))
        .and(query_param("media", "music"))
        .and(query_param("entity", "song"))
        .and(query_param("limit", "10"))
        .and(query_param("attribute", "songTerm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 2,
            "results": [
                mock_track(101, "Halo", "https://audio.example/101.m4a"),
                mock_track(102, "Truth and Reconciliation Suite", "https://audio.example/102.m4a"),
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let items = client(&mock_server, &dir).search("Halo Theme Music", 10).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "itunes_101");
    assert_eq!(items[0].title, "Halo - Martin O'Donnell");
    assert_eq!(items[0].url, "https://audio.example/101.m4a");
    assert_eq!(items[0].thumbnail, "https://is1.example/image/600x600bb.jpg");
    assert_eq!(items[0].duration, 215);
    assert_eq!(items[1].id, "itunes_102");
}

#[tokio::test]
async fn test_search_error_status() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, &dir).search("Halo", 10).await;
    assert!(matches!(result, Err(Error::Status(status)) if status.as_u16() == 503));

    // through the gateway the error becomes a generic gateway failure
    let gateway: Arc<dyn CatalogGateway> = Arc::new(client(&mock_server, &dir));
    assert!(gateway.catalog_search("Halo", 10).await.is_err());
}

#[tokio::test]
async fn test_preview_download_uses_lookup_and_m4a() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audio_url = format!("{}/audio/preview.aac", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("id", "101"))
        .and(query_param("entity", "song"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [mock_track(101, "Halo", &audio_url)]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/audio/preview.aac"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"preview-bytes".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let written = client(&mock_server, &dir)
        .download("https://stale.example/ignored.m4a", "itunes_101")
        .await
        .unwrap();

    assert_eq!(written, dir.path().join("itunes_101.m4a"));
    assert_eq!(std::fs::read(&written).unwrap(), b"preview-bytes");
}

#[tokio::test]
async fn test_plain_download_extension_from_content_type() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(b"mp3".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let written = client(&mock_server, &dir)
        .download(&format!("{}/stream", mock_server.uri()), "abc")
        .await
        .unwrap();

    assert_eq!(written, dir.path().join("abc.mp3"));
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCount": 0, "results": []})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow.m4a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0u8; 1024])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    // lookup has nothing and no fallback URL was given
    let result = client(&mock_server, &dir).download("", "itunes_7").await;
    assert!(matches!(result, Err(Error::NoPreview(ref id)) if id == "itunes_7"));

    // the fallback URL times out mid-request
    let impatient = ItunesClient::builder()
        .api_base(mock_server.uri())
        .music_dir(dir.path())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let result = impatient
        .download(&format!("{}/slow.m4a", mock_server.uri()), "itunes_7")
        .await;
    assert!(result.is_err());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_catalog_provider_end_to_end() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let audio_url = format!("{}/audio/101.m4a", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("term", "Halo Theme Music"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [mock_track(101, "Halo", &audio_url)]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [mock_track(101, "Halo", &audio_url)]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/audio/101.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"abc".to_vec()))
        .mount(&mock_server)
        .await;

    let library = Arc::new(LocalLibrary::new(dir.path()));
    let provider: Arc<dyn AudioResolver> = Arc::new(CatalogProvider::new(
        Arc::new(client(&mock_server, &dir)),
        library.clone(),
    ));

    let selected = provider.get_audio("Halo").await.unwrap();
    assert_eq!(selected.video_id, "itunes_101");
    assert_eq!(selected.audio_url, audio_url);

    // the background download lands in the library
    let expected = "data:audio/mp4;base64,YWJj";
    let mut stored = None;
    for _ in 0..100 {
        stored = library.resource_url("itunes_101").await.unwrap();
        if stored.as_deref() == Some(expected) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(stored.as_deref(), Some(expected));
}

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flickr::{
    ApiError, ErrorKind, FlickrClient, FlickrCredentials, HttpResponse, SearchPage, Transport,
};
use model::Photo;
use reqwest::{StatusCode, Url};
use utility::geo::{BoundingBox, Coordinate};

/// Answers requests from a script and remembers what was asked.
#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    fn reply(self, status: StatusCode, body: &str) -> Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    fn fail(self, error: ApiError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(url.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }
}

fn client(transport: Arc<ScriptedTransport>) -> FlickrClient {
    FlickrClient::with_transport(&FlickrCredentials::new("test-key"), transport)
}

fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

const ONE_PHOTO: &str =
    r#"{"photos":{"photo":[{"id":"1","title":"a","url_m":"http://x/1.jpg"}]}}"#;

#[tokio::test]
async fn search_decodes_single_photo() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, ONE_PHOTO));
    let photos = client(transport.clone())
        .search("-0.1,-0.1,0.1,0.1", None, 21)
        .await
        .unwrap();

    assert_eq!(photos, vec![Photo::new("1", "a", "http://x/1.jpg")]);
    assert_eq!(photos[0].cache_key(), "1");
}

#[tokio::test]
async fn search_sends_expected_query() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, ONE_PHOTO));
    let bbox = BoundingBox::around(&Coordinate::new(54.32, 10.13).unwrap()).to_string();

    client(transport.clone())
        .search(&bbox, Some(3), 12)
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let url = &requests[0];
    assert_eq!(url.host_str(), Some("api.flickr.com"));
    assert_eq!(url.path(), "/services/rest/");
    assert_eq!(query(url, "method").as_deref(), Some("flickr.photos.search"));
    assert_eq!(query(url, "api_key").as_deref(), Some("test-key"));
    assert_eq!(query(url, "bbox"), Some(bbox));
    assert_eq!(query(url, "extras").as_deref(), Some("url_m"));
    assert_eq!(query(url, "format").as_deref(), Some("json"));
    assert_eq!(query(url, "nojsoncallback").as_deref(), Some("1"));
    assert_eq!(query(url, "page").as_deref(), Some("3"));
    assert_eq!(query(url, "per_page").as_deref(), Some("12"));
}

#[tokio::test]
async fn search_without_page_omits_parameter() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, ONE_PHOTO));
    client(transport.clone())
        .search("0,0,0.1,0.1", None, 5)
        .await
        .unwrap();
    assert_eq!(query(&transport.requests()[0], "page"), None);
}

#[tokio::test]
async fn missing_photos_key_is_parse_error() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, r#"{"stat":"ok"}"#));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Parse);
    assert!(matches!(error, ApiError::JsonError(_)));
}

#[tokio::test]
async fn one_malformed_entry_fails_the_page() {
    let body = r#"{"photos":{"photo":[
        {"id":"1","title":"a","url_m":"http://x/1.jpg"},
        {"id":"2","title":"b"}
    ]}}"#;
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, body));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, "jsonFlickrApi({"));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn stat_fail_surfaces_flickr_message() {
    let body = r#"{"stat":"fail","code":100,"message":"Invalid API Key (Key has invalid format)"}"#;
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, body));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Server);
    match error {
        ApiError::Flickr { code, message } => {
            assert_eq!(code, Some(100));
            assert_eq!(message, "Invalid API Key (Key has invalid format)");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let body = r#"{"stat":"fail","status_message":"Service currently unavailable"}"#;
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::SERVICE_UNAVAILABLE, body));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();

    match &error {
        ApiError::InvalidResponse {
            status_code,
            url,
            message,
        } => {
            assert_eq!(*status_code, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(message.as_deref(), Some("Service currently unavailable"));
            assert!(!url.contains("test-key"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(error.to_string().contains("Service currently unavailable"));
}

#[tokio::test]
async fn error_status_without_json_has_no_message() {
    let transport =
        Arc::new(ScriptedTransport::default().reply(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"));
    let error = client(transport).search("0,0,1,1", None, 21).await.unwrap_err();
    assert!(matches!(
        error,
        ApiError::InvalidResponse { message: None, .. }
    ));
}

#[tokio::test]
async fn transport_failure_is_returned_without_retry() {
    let transport = Arc::new(ScriptedTransport::default().fail(ApiError::RequestError(Arc::new(
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
    ))));
    let error = client(transport.clone())
        .search("0,0,1,1", None, 21)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Transport);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn search_page_keeps_paging_info() {
    let body = r#"{"photos":{"page":2,"pages":"9","perpage":21,"total":"180","photo":[
        {"id":"5","title":"","url_m":"http://x/5.jpg"},
        {"id":"6","title":"dock","url_m":"http://x/6.jpg"}
    ]},"stat":"ok"}"#;
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, body));
    let page = client(transport.clone())
        .search_page("0,0,1,1", SearchPage::Fixed(2), 21)
        .await
        .unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.pages, 9);
    assert_eq!(page.per_page, 21);
    assert_eq!(page.total, 180);
    assert_eq!(
        page.photos.iter().map(|p| p.cache_key()).collect::<Vec<_>>(),
        vec!["5", "6"]
    );
    assert_eq!(query(&transport.requests()[0], "page").as_deref(), Some("2"));
}

#[tokio::test]
async fn random_page_stays_within_known_pages() {
    let mut transport = ScriptedTransport::default();
    for _ in 0..10 {
        transport = transport.reply(StatusCode::OK, ONE_PHOTO);
    }
    let transport = Arc::new(transport);
    let client = client(transport.clone());

    for _ in 0..10 {
        client
            .search_page("0,0,1,1", SearchPage::Random { known_pages: Some(4) }, 21)
            .await
            .unwrap();
    }

    for url in transport.requests() {
        let page: u32 = query(&url, "page").unwrap().parse().unwrap();
        assert!((1..=4).contains(&page));
    }
}

#[tokio::test]
async fn pages_are_not_deduplicated() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .reply(StatusCode::OK, ONE_PHOTO)
            .reply(StatusCode::OK, ONE_PHOTO),
    );
    let client = client(transport);

    let first = client.search("0,0,1,1", Some(1), 21).await.unwrap();
    let second = client.search("0,0,1,1", Some(2), 21).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn fetch_image_returns_raw_bytes() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::OK, "\u{1}JPEG"));
    let bytes = client(transport.clone())
        .fetch_image("https://live.staticflickr.com/65535/1_abc_m.jpg")
        .await
        .unwrap();

    assert_eq!(bytes, b"\x01JPEG".to_vec());
    assert_eq!(
        transport.requests()[0].as_str(),
        "https://live.staticflickr.com/65535/1_abc_m.jpg"
    );
}

#[tokio::test]
async fn fetch_image_rejects_bad_url_and_status() {
    let transport = Arc::new(ScriptedTransport::default().reply(StatusCode::NOT_FOUND, ""));
    let client = client(transport.clone());

    let error = client.fetch_image("not a url").await.unwrap_err();
    assert!(matches!(error, ApiError::InvalidUrl(_)));
    assert_eq!(error.kind(), ErrorKind::Parse);
    assert!(transport.requests().is_empty());

    let error = client.fetch_image("http://x/1.jpg").await.unwrap_err();
    assert!(matches!(
        error,
        ApiError::InvalidResponse { status_code, .. } if status_code == StatusCode::NOT_FOUND
    ));
}

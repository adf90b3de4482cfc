mod common;

use common::{client_with, ok, respond, MockEngine};
use fetchnet::cookies::{CookieFuture, CookieJar, CookieStore, CookieStoreError};
use fetchnet::ClientConfig;
use std::sync::{Arc, Mutex};
use url::Url;

/// Store that records every call and always answers with a fixed header.
#[derive(Default)]
struct RecordingStore {
    header: Option<String>,
    stored: Mutex<Vec<(String, String)>>,
    lookups: Mutex<Vec<String>>,
}

impl CookieStore for RecordingStore {
    fn cookie_header_for<'a>(&'a self, url: &'a Url) -> CookieFuture<'a, Option<String>> {
        Box::pin(async move {
            self.lookups.lock().unwrap().push(url.to_string());
            Ok(self.header.clone())
        })
    }

    fn store_cookie<'a>(&'a self, set_cookie: &'a str, url: &'a Url) -> CookieFuture<'a, ()> {
        Box::pin(async move {
            self.stored
                .lock()
                .unwrap()
                .push((set_cookie.to_string(), url.to_string()));
            Ok(())
        })
    }
}

/// Store whose every operation fails.
struct BrokenStore;

impl CookieStore for BrokenStore {
    fn cookie_header_for<'a>(&'a self, _url: &'a Url) -> CookieFuture<'a, Option<String>> {
        Box::pin(async { Err(CookieStoreError::Backend("offline".into())) })
    }

    fn store_cookie<'a>(&'a self, _set_cookie: &'a str, _url: &'a Url) -> CookieFuture<'a, ()> {
        Box::pin(async { Err(CookieStoreError::Backend("offline".into())) })
    }
}

#[tokio::test]
async fn test_every_set_cookie_forwarded_raw_once() {
    let engine = MockEngine::new(|req| {
        Ok(respond(
            req.url(),
            200,
            &[
                ("Set-Cookie", "a=1; Path=/; HttpOnly"),
                ("Content-Type", "text/plain"),
                ("set-cookie", "b=2; Expires=Wed, 21 Oct 2099 07:28:00 GMT"),
            ],
            "",
        ))
    });
    let store = Arc::new(RecordingStore::default());
    let config = ClientConfig {
        cookie_store: Some(store.clone()),
        ..Default::default()
    };
    let (client, _) = client_with(engine, config);

    client.get("https://c.test/login").send().await.unwrap();

    let stored = store.stored.lock().unwrap().clone();
    assert_eq!(
        stored,
        vec![
            ("a=1; Path=/; HttpOnly".to_string(), "https://c.test/login".to_string()),
            (
                "b=2; Expires=Wed, 21 Oct 2099 07:28:00 GMT".to_string(),
                "https://c.test/login".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_cookie_header_injected_per_hop() {
    let engine = MockEngine::new(|req| Ok(ok(req.url(), "")));
    let store = Arc::new(RecordingStore {
        header: Some("sid=xyz".into()),
        ..Default::default()
    });
    let config = ClientConfig {
        cookie_store: Some(store.clone()),
        ..Default::default()
    };
    let (client, _) = client_with(engine.clone(), config);

    client.get("https://c.test/").send().await.unwrap();
    assert_eq!(engine.seen()[0].headers().get("cookie"), Some("sid=xyz"));
    assert_eq!(store.lookups.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_explicit_cookie_header_wins() {
    let engine = MockEngine::new(|req| Ok(ok(req.url(), "")));
    let store = Arc::new(RecordingStore {
        header: Some("from=store".into()),
        ..Default::default()
    });
    let config = ClientConfig {
        cookie_store: Some(store.clone()),
        ..Default::default()
    };
    let (client, _) = client_with(engine.clone(), config);

    client
        .get("https://c.test/")
        .header("Cookie", "manual=1")
        .send()
        .await
        .unwrap();

    let seen = engine.seen();
    assert_eq!(seen[0].headers().get_all("cookie").collect::<Vec<_>>(), vec!["manual=1"]);
    assert!(store.lookups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_jar_carries_cookie_across_redirect() {
    let engine = MockEngine::new(|req| {
        let url = req.url();
        Ok(match url.path() {
            "/login" => respond(
                url,
                302,
                &[("Location", "/home"), ("Set-Cookie", "session=abc; Path=/")],
                "",
            ),
            _ => ok(url, "welcome"),
        })
    });
    let jar = Arc::new(CookieJar::new());
    let config = ClientConfig {
        cookie_store: Some(jar.clone()),
        ..Default::default()
    };
    let (client, _) = client_with(engine.clone(), config);

    let resp = client.post("https://site.test/login").send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "welcome");

    let seen = engine.seen();
    assert!(!seen[0].headers().contains("cookie"));
    assert_eq!(seen[1].headers().get("cookie"), Some("session=abc"));
    assert_eq!(jar.len(), 1);
}

#[tokio::test]
async fn test_store_failures_do_not_fail_request() {
    let engine = MockEngine::new(|req| Ok(respond(req.url(), 200, &[("Set-Cookie", "a=1")], "ok")));
    let config = ClientConfig {
        cookie_store: Some(Arc::new(BrokenStore)),
        ..Default::default()
    };
    let (client, _) = client_with(engine, config);

    let resp = client.get("https://broken.test/").send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_per_request_store_overrides_client_store() {
    let engine = MockEngine::new(|req| Ok(respond(req.url(), 200, &[("Set-Cookie", "k=v")], "")));
    let client_store = Arc::new(RecordingStore::default());
    let request_store = Arc::new(RecordingStore::default());
    let config = ClientConfig {
        cookie_store: Some(client_store.clone()),
        ..Default::default()
    };
    let (client, factory) = client_with(engine, config);

    client
        .get("https://o.test/")
        .cookie_store(request_store.clone())
        .send()
        .await
        .unwrap();

    assert!(client_store.stored.lock().unwrap().is_empty());
    assert_eq!(request_store.stored.lock().unwrap().len(), 1);
    assert_eq!(factory.created(), 1);
}

#[test]
fn test_jar_rejects_supercookie() {
    let jar = CookieJar::new();
    let url = Url::parse("https://shop.example.co.uk/").unwrap();
    assert!(jar.set_cookie("track=1; Domain=co.uk", &url).is_err());
    assert!(jar.set_cookie("ok=1; Domain=example.co.uk", &url).is_ok());
    let sibling = Url::parse("https://blog.example.co.uk/").unwrap();
    assert_eq!(jar.header_value(&sibling).as_deref(), Some("ok=1"));
}

//! Fetch a URL with browser headers, a cookie jar and a deadline.
//!
//! ```text
//! cargo run --example fetch -- https://httpbin.org/cookies/set?flavor=oat
//! ```

use fetchnet::cookies::CookieJar;
use fetchnet::{AbortSignal, Client, ResponseData, ResponseType};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/get".to_string());

    let jar = Arc::new(CookieJar::new());
    let client = Client::builder()
        .browser("chrome")
        .cookie_store(jar.clone())
        .max_redirects(5)
        .build();

    println!("Fetching {}...", url);
    let response = client
        .get(&url)
        .signal(AbortSignal::timeout(Duration::from_secs(15)))
        .send_as(ResponseType::Auto)
        .await?;

    println!("Status: {}", response.status);
    println!("Final URL: {}", response.url);
    for hop in &response.redirect_urls {
        println!("  via {}", hop);
    }
    for (name, value) in &response.headers {
        println!("  {}: {}", name, value);
    }

    match response.data {
        ResponseData::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        ResponseData::Text(text) => println!("{}", text),
        ResponseData::Bytes(bytes) => println!("<{} bytes>", bytes.len()),
    }

    println!("\nCookies stored: {}", jar.len());
    for cookie in jar.cookies() {
        println!("  {}={} ({})", cookie.name, cookie.value, cookie.domain);
    }

    Ok(())
}

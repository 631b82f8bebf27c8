//! Example: Cached posts client
//!
//! Wraps `CachingClient` in a small domain client for the
//! jsonplaceholder posts API. The second lookup of a post is served
//! from the process-wide cache.
//!
//! Run with `RUST_LOG=memora_http=debug` to watch cache hits and misses.

use memora_http::{
    CachingClient, ClientConfig, DataFormat, HttpMethod, Parameter, RequestBuilder, RestClient,
};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Deserialize)]
struct PostModel {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserModel {
    id: u32,
    name: String,
    username: String,
    email: String,
}

/// Domain client over the posts resource
struct PostsClient {
    inner: CachingClient,
}

impl PostsClient {
    fn new(base_url: &str) -> anyhow::Result<Self> {
        let config = ClientConfig::new()
            .base_url(base_url)
            .timeout(Duration::from_secs(10));
        let client = RestClient::new(config)?;
        Ok(Self {
            inner: CachingClient::with_global_cache(client),
        })
    }

    async fn get_by_id(&self, id: u32) -> anyhow::Result<PostModel> {
        let mut builder = RequestBuilder::with_format("posts/{id}", HttpMethod::Get, DataFormat::Json)?;
        builder.add_parameter(Parameter::url_segment("id", id.to_string()));
        let post = self
            .inner
            .fetch_with_cache(&builder.create(), &format!("Post{}", id))
            .await;
        Ok(post)
    }

    async fn get_all(&self) -> anyhow::Result<Vec<PostModel>> {
        let request = RequestBuilder::new("posts")?.create();
        Ok(self.inner.fetch_with_cache(&request, "Posts").await)
    }

    async fn get_author(&self, post: &PostModel) -> anyhow::Result<UserModel> {
        let mut builder = RequestBuilder::new("users/{id}")?;
        builder.add_parameter(Parameter::url_segment("id", post.user_id.to_string()));
        let key = format!("User{}", post.user_id);
        Ok(self.inner.fetch_with_cache(&builder.create(), &key).await)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memora_http=info")),
        )
        .init();

    let client = PostsClient::new("https://jsonplaceholder.typicode.com")?;

    let posts = client.get_all().await?;
    println!("Fetched {} posts", posts.len());

    for attempt in 1..=2 {
        let start = Instant::now();
        let post = client.get_by_id(1).await?;
        println!(
            "Attempt {}: post {} '{}' in {:?}",
            attempt,
            post.id,
            post.title,
            start.elapsed()
        );
    }

    let post = client.get_by_id(1).await?;
    let author = client.get_author(&post).await?;
    println!(
        "Author: {} ({}) <{}> id={}",
        author.name, author.username, author.email, author.id
    );

    // Unknown ids degrade to the default value
    let missing = client.get_by_id(100_000).await?;
    println!("Missing post resolves to id {}", missing.id);

    Ok(())
}

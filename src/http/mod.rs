use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub type Query<'a> = [(&'a str, String)];

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    bearer_token: Option<String>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("movie-catalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &Query<'_>) -> Result<T> {
        debug!("Making GET request");
        let response = self.send(self.request(Method::GET, url).query(query)).await?;
        let json = response.json::<T>().await?;
        Ok(json)
    }

    #[instrument(skip(self, query, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        query: &Query<'_>,
        body: &B,
    ) -> Result<T> {
        debug!("Making POST request");
        let response = self
            .send(self.request(Method::POST, url).query(query).json(body))
            .await?;
        let json = response.json::<T>().await?;
        Ok(json)
    }

    #[instrument(skip(self, query, body), fields(url = %url))]
    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        query: &Query<'_>,
        body: &B,
    ) -> Result<T> {
        debug!("Making PATCH request");
        let response = self
            .send(self.request(Method::PATCH, url).query(query).json(body))
            .await?;
        let json = response.json::<T>().await?;
        Ok(json)
    }

    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn delete(&self, url: &str, query: &Query<'_>) -> Result<()> {
        debug!("Making DELETE request");
        self.send(self.request(Method::DELETE, url).query(query)).await?;
        Ok(())
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP request failed with status: {}", status);
            return Err(anyhow::anyhow!("HTTP request failed: {} {}", status, body.trim()));
        }

        Ok(response)
    }
}

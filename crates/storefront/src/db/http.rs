//! REST client for a remote document store.
//!
//! Wire protocol (JSON bodies):
//!
//! | Method   | Path                  | Body          | Response             |
//! |----------|-----------------------|---------------|----------------------|
//! | `GET`    | `/{collection}`       |               | `[{"id", "data"}]`   |
//! | `POST`   | `/{collection}`       | data          | `{"id"}`             |
//! | `PUT`    | `/{collection}/{id}`  | data          |                      |
//! | `PATCH`  | `/{collection}/{id}`  | partial data  | 404 when absent      |
//! | `DELETE` | `/{collection}/{id}`  |               | 404 tolerated        |
//!
//! The remote side has no push channel, so subscriptions poll the collection
//! and publish a snapshot whenever it changes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use url::Url;

use super::documents::{Document, DocumentStore};
use super::PersistenceError;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Document store backed by a REST service.
#[derive(Clone)]
pub struct HttpDocumentStore {
    inner: Arc<HttpInner>,
}

struct HttpInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    poll_interval: Duration,
}

impl std::fmt::Debug for HttpDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentStore")
            .field("base_url", &self.inner.base_url)
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.inner.poll_interval)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl HttpDocumentStore {
    /// Create a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &Url,
        token: Option<SecretString>,
        poll_interval: Duration,
    ) -> Result<Self, PersistenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpInner {
                client,
                base_url: base_url.clone(),
                token,
                poll_interval,
            }),
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded as a
    /// single path segment.
    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        // http(s) base URLs always have a path
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn collection_url(&self, collection: &str) -> Url {
        self.url_with(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Url {
        self.url_with(&[collection, id])
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match &self.inner.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn fetch(&self, collection: &str) -> Result<Vec<Document>, PersistenceError> {
        let response = self
            .request(reqwest::Method::GET, self.collection_url(collection))
            .send()
            .await?;
        let response = check_status(response, collection).await?;
        Ok(response.json().await?)
    }
}

/// Map a non-success response to a `PersistenceError`.
async fn check_status(
    response: reqwest::Response,
    target: &str,
) -> Result<reqwest::Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(PersistenceError::NotFound(target.to_owned()));
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    Err(PersistenceError::Remote {
        status: status.as_u16(),
        message,
    })
}

impl DocumentStore for HttpDocumentStore {
    #[instrument(skip(self))]
    async fn snapshot(&self, collection: &str) -> Result<Vec<Document>, PersistenceError> {
        self.fetch(collection).await
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>> {
        let (tx, rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = self.clone();
        let collection = collection.to_owned();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.inner.poll_interval);
            let mut last: Option<Vec<Document>> = None;

            loop {
                ticker.tick().await;
                if tx.receiver_count() == 0 {
                    debug!(%collection, "no subscribers left, stopping poll");
                    break;
                }

                match store.fetch(&collection).await {
                    Ok(docs) if last.as_ref() != Some(&docs) => {
                        last = Some(docs.clone());
                        if tx.send(docs).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(%collection, error = %e, "document poll failed"),
                }
            }
        });

        rx
    }

    #[instrument(skip(self, data))]
    async fn create(
        &self,
        collection: &str,
        data: Map<String, Value>,
    ) -> Result<String, PersistenceError> {
        let response = self
            .request(reqwest::Method::POST, self.collection_url(collection))
            .json(&data)
            .send()
            .await?;
        let created: Created = check_status(response, collection).await?.json().await?;
        Ok(created.id)
    }

    #[instrument(skip(self, data))]
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        let url = self.document_url(collection, id);
        let response = self
            .request(reqwest::Method::PUT, url.clone())
            .json(&data)
            .send()
            .await?;
        check_status(response, url.as_str()).await?;
        Ok(())
    }

    #[instrument(skip(self, partial))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        let url = self.document_url(collection, id);
        let response = self
            .request(reqwest::Method::PATCH, url.clone())
            .json(&partial)
            .send()
            .await?;
        check_status(response, url.as_str()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), PersistenceError> {
        let url = self.document_url(collection, id);
        let response = self
            .request(reqwest::Method::DELETE, url.clone())
            .send()
            .await?;
        match check_status(response, url.as_str()).await {
            Ok(_) | Err(PersistenceError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(token: Option<&str>) -> HttpDocumentStore {
        HttpDocumentStore::new(
            &Url::parse("https://docs.example.com/v1/").unwrap(),
            token.map(|t| SecretString::from(t.to_owned())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let store = store(None);
        assert_eq!(
            store.collection_url("products").as_str(),
            "https://docs.example.com/v1/products"
        );
        assert_eq!(
            store.document_url("products", "prod-1").as_str(),
            "https://docs.example.com/v1/products/prod-1"
        );
    }

    #[test]
    fn test_document_id_is_one_escaped_segment() {
        let store = store(None);
        let url = store.document_url("products", "../admin?x=1");
        assert_eq!(
            url.as_str(),
            "https://docs.example.com/v1/products/..%2Fadmin%3Fx=1"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_base_without_trailing_slash() {
        let store = HttpDocumentStore::new(
            &Url::parse("https://docs.example.com/v1").unwrap(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            store.document_url("products", "prod 1").as_str(),
            "https://docs.example.com/v1/products/prod%201"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", store(Some("s3cret")));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_document_wire_shape() {
        let docs: Vec<Document> =
            serde_json::from_str(r#"[{"id": "prod-1", "data": {"name": "Tee"}}]"#).unwrap();
        assert_eq!(docs[0].id, "prod-1");
        assert_eq!(docs[0].data.get("name"), Some(&Value::from("Tee")));
    }
}

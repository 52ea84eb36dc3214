use super::codec::{decode_fields, encode_fields, field_path};
use super::{Collection, DocumentStore, Fields};
use crate::config::FirestoreConfig;
use crate::errors::GatewayError;
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

const PAGE_SIZE: usize = 300;

/// Document store backed by the Firestore REST API (or its emulator).
pub struct FirestoreStore {
    http: HttpClient,
    config: FirestoreConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(http: HttpClient, config: FirestoreConfig) -> Self {
        let http = match &config.access_token {
            Some(token) => http.with_bearer_token(token.clone()),
            None => http,
        };
        Self { http, config }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            self.config.base_url().trim_end_matches('/'),
            self.config.project_id,
            self.config.database(),
            collection.name()
        )
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        self.config
            .api_key
            .iter()
            .map(|key| ("key", key.clone()))
            .collect()
    }

    /// Only the fields being sent are masked, and the document must exist.
    fn update_query(&self, fields: &Fields) -> Vec<(&'static str, String)> {
        let mut query = self.auth_query();
        query.push(("currentDocument.exists", "true".to_string()));
        query.extend(
            fields
                .keys()
                .map(|name| ("updateMask.fieldPaths", field_path(name))),
        );
        query
    }
}

/// The id is the last segment of the document's resource name.
fn document_id(name: &str) -> Result<String, GatewayError> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(GatewayError::MissingName)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn list(&self, collection: Collection) -> Result<Vec<(String, Fields)>, GatewayError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = self.auth_query();
            query.push(("pageSize", PAGE_SIZE.to_string()));
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: ListResponse = self.http.get_json(&url, &query).await?;
            debug!("Received page of {} {} documents", page.documents.len(), collection);

            for document in page.documents {
                let id = document_id(&document.name)?;
                documents.push((id, decode_fields(&document.fields)?));
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!("Retrieved {} {} documents", documents.len(), collection);
        Ok(documents)
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, GatewayError> {
        let body = RawDocument {
            name: String::new(),
            fields: encode_fields(&fields),
        };

        let created: RawDocument = self
            .http
            .post_json(&self.collection_url(collection), &self.auth_query(), &body)
            .await?;

        document_id(&created.name)
    }

    #[instrument(skip(self, fields))]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), GatewayError> {
        let query = self.update_query(&fields);
        let body = RawDocument {
            name: String::new(),
            fields: encode_fields(&fields),
        };

        let _: RawDocument = self
            .http
            .patch_json(&self.document_url(collection, id), &query, &body)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        self.http
            .delete(&self.document_url(collection, id), &self.auth_query())
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn config(base_url: String, api_key: Option<&str>) -> FirestoreConfig {
        FirestoreConfig {
            project_id: "movie-cataloger".into(),
            api_key: api_key.map(str::to_string),
            access_token: None,
            base_url: Some(base_url),
            database: None,
        }
    }

    fn store(api_key: Option<&str>) -> FirestoreStore {
        let config = config("http://localhost:8080/v1/".into(), api_key);
        FirestoreStore::new(HttpClient::new(Duration::from_secs(1)).unwrap(), config)
    }

    /// A request as seen by [`serve`].
    #[derive(Debug)]
    struct Seen {
        method: String,
        path: String,
        query: Vec<(String, String)>,
        body: String,
    }

    impl Seen {
        fn param(&self, key: &str) -> Vec<&str> {
            self.query
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> Seen {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_len = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request head");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_len]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .map_or(0, |(_, value)| value.trim().parse::<usize>().unwrap());

        while buf.len() < head_len + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the request body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.split_whitespace();
        let method = request_line.next().unwrap().to_string();
        let target = url::Url::parse(&format!("http://stub{}", request_line.next().unwrap())).unwrap();

        Seen {
            method,
            path: target.path().to_string(),
            query: target.query_pairs().into_owned().collect(),
            body: String::from_utf8_lossy(&buf[head_len..head_len + content_length]).to_string(),
        }
    }

    /// Answers one request per canned JSON body, in order, and hands back
    /// what it received.
    async fn serve(replies: Vec<Value>) -> (String, JoinHandle<Vec<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);

                let body = reply.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });

        (base_url, handle)
    }

    fn served_store(base_url: String) -> FirestoreStore {
        FirestoreStore::new(
            HttpClient::new(Duration::from_secs(5)).unwrap(),
            config(base_url, Some("k")),
        )
    }

    const ITEMS_PATH: &str = "/v1/projects/movie-cataloger/databases/(default)/documents/items";

    #[test]
    fn builds_document_urls() {
        let store = store(None);
        assert_eq!(
            store.collection_url(Collection::Items),
            "http://localhost:8080/v1/projects/movie-cataloger/databases/(default)/documents/items"
        );
        assert_eq!(
            store.document_url(Collection::Tags, "a b"),
            "http://localhost:8080/v1/projects/movie-cataloger/databases/(default)/documents/tags/a%20b"
        );
    }

    #[test]
    fn api_key_goes_into_query() {
        assert!(store(None).auth_query().is_empty());
        assert_eq!(store(Some("k")).auth_query(), vec![("key", "k".to_string())]);
    }

    #[test]
    fn update_masks_exactly_the_sent_fields() {
        let fields = json!({"title": "Heat", "rating": null, "my tag": 1});
        let query = store(Some("k")).update_query(fields.as_object().unwrap());

        assert_eq!(query[0], ("key", "k".to_string()));
        assert!(query.contains(&("currentDocument.exists", "true".to_string())));

        let mut masks: Vec<&str> = query
            .iter()
            .filter(|(k, _)| *k == "updateMask.fieldPaths")
            .map(|(_, v)| v.as_str())
            .collect();
        masks.sort_unstable();
        assert_eq!(masks, vec!["`my tag`", "rating", "title"]);
    }

    #[test]
    fn ids_come_from_resource_names() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/items/XyZ").unwrap(),
            "XyZ"
        );
        assert!(matches!(document_id(""), Err(GatewayError::MissingName)));
    }

    #[test]
    fn list_response_tolerates_empty_collection() {
        let page: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let (base_url, server) = serve(vec![
            json!({
                "documents": [{
                    "name": "projects/movie-cataloger/databases/(default)/documents/items/a1",
                    "fields": {"title": {"stringValue": "Heat"}, "rating": {"integerValue": "80"}}
                }],
                "nextPageToken": "page-2"
            }),
            json!({
                "documents": [{
                    "name": "projects/movie-cataloger/databases/(default)/documents/items/b2",
                    "fields": {"title": {"stringValue": "Ran"}}
                }]
            }),
        ])
        .await;

        let documents = served_store(base_url).list(Collection::Items).await.unwrap();
        let seen = server.await.unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].0, "a1");
        assert_eq!(documents[0].1["title"], json!("Heat"));
        assert_eq!(documents[0].1["rating"], json!(80));
        assert_eq!(documents[1].0, "b2");

        assert!(seen.iter().all(|r| r.method == "GET" && r.path == ITEMS_PATH));
        assert_eq!(seen[0].param("pageSize"), vec!["300"]);
        assert!(seen[0].param("pageToken").is_empty());
        assert_eq!(seen[1].param("pageToken"), vec!["page-2"]);
        assert_eq!(seen[1].param("key"), vec!["k"]);
    }

    #[tokio::test]
    async fn create_posts_fields_and_reads_assigned_id() {
        let (base_url, server) = serve(vec![json!({
            "name": "projects/movie-cataloger/databases/(default)/documents/items/new-id",
            "fields": {"title": {"stringValue": "Heat"}}
        })])
        .await;

        let fields = json!({"title": "Heat"}).as_object().unwrap().clone();
        let id = served_store(base_url)
            .create(Collection::Items, fields)
            .await
            .unwrap();
        let seen = server.await.unwrap();

        assert_eq!(id, "new-id");
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, ITEMS_PATH);
        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body, json!({"fields": {"title": {"stringValue": "Heat"}}}));
    }

    #[tokio::test]
    async fn update_patches_with_field_mask() {
        let (base_url, server) = serve(vec![json!({
            "name": "projects/movie-cataloger/databases/(default)/documents/items/a1",
            "fields": {}
        })])
        .await;

        let fields = json!({"notes": "again", "rating": null}).as_object().unwrap().clone();
        served_store(base_url)
            .update(Collection::Items, "a1", fields)
            .await
            .unwrap();
        let seen = server.await.unwrap();

        assert_eq!(seen[0].method, "PATCH");
        assert_eq!(seen[0].path, format!("{}/a1", ITEMS_PATH));
        assert_eq!(seen[0].param("currentDocument.exists"), vec!["true"]);
        let mut masks = seen[0].param("updateMask.fieldPaths");
        masks.sort_unstable();
        assert_eq!(masks, vec!["notes", "rating"]);

        let body: Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["fields"]["rating"], json!({"nullValue": null}));
    }

    #[tokio::test]
    async fn remove_sends_delete() {
        let (base_url, server) = serve(vec![json!({})]).await;

        served_store(base_url)
            .remove(Collection::Tags, "t1")
            .await
            .unwrap();
        let seen = server.await.unwrap();

        assert_eq!(seen[0].method, "DELETE");
        assert_eq!(
            seen[0].path,
            "/v1/projects/movie-cataloger/databases/(default)/documents/tags/t1"
        );
        assert_eq!(seen[0].param("key"), vec!["k"]);
    }
}

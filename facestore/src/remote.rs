//! Object-bucket backed store.

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{content_type, is_supported_image, validate_record, EncodingStore};
use crate::StoreError;

/// Page size used when enumerating a bucket.
const LIST_PAGE_SIZE: usize = 1000;

/// Stores known-face images in a remote object bucket.
///
/// Speaks the storage REST layout
/// `{base_url}/storage/v1/object/{bucket}/{name}`, authenticating every
/// request with the access key as both bearer token and `apikey` header.
/// Uploads use upsert semantics: an existing object with the same name
/// is overwritten.
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    access_key: String,
    bucket: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy<'a>,
}

#[derive(Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct ObjectEntry {
    name: String,
}

impl RemoteStore {
    /// Creates a store for `bucket` under `base_url`.
    ///
    /// Fails with [`StoreError::Config`] if the URL cannot carry a path or
    /// the bucket name is unusable.
    pub fn new(base_url: &str, access_key: &str, bucket: &str) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Config(format!("base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!("base url {base_url} has no path")));
        }
        if bucket.is_empty() || bucket.contains('/') {
            return Err(StoreError::Config(format!("invalid bucket name {bucket:?}")));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            access_key: access_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Returns the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(["storage", "v1", "object"]);
            path.extend(segments);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.access_key))
            .header("apikey", self.access_key.as_str())
    }

    async fn list_page(&self, offset: usize) -> Result<Vec<ObjectEntry>, StoreError> {
        let body = ListRequest {
            prefix: "",
            limit: LIST_PAGE_SIZE,
            offset,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let resp = self
            .authorize(self.client.post(self.url(&["list", self.bucket.as_str()])))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let resp = check_status(resp, "list").await?;
        resp.json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("list: decode response: {e}")))
    }
}

/// Maps a non-success response to [`StoreError::Unavailable`].
async fn check_status(
    resp: reqwest::Response,
    op: &str,
) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Unavailable(format!("{op}: HTTP {status}: {body}")))
}

#[async_trait::async_trait]
impl EncodingStore for RemoteStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.list_page(offset).await?;
            let n = page.len();
            names.extend(
                page.into_iter()
                    .map(|e| e.name)
                    .filter(|name| is_supported_image(name)),
            );
            if n < LIST_PAGE_SIZE {
                break;
            }
            offset += n;
        }
        names.sort();
        debug!(bucket = %self.bucket, count = names.len(), "listed remote face images");
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_record(name)?;
        let resp = self
            .authorize(self.client.get(self.url(&[self.bucket.as_str(), name])))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let resp = check_status(resp, "download").await?;
        let data = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(format!("download {name}: {e}")))?;
        Ok(data.to_vec())
    }

    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        validate_record(name)?;
        let resp = self
            .authorize(self.client.post(self.url(&[self.bucket.as_str(), name])))
            .header("Content-Type", content_type(name, data))
            .header("x-upsert", "true")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        check_status(resp, "upload").await?;
        debug!(bucket = %self.bucket, record = name, bytes = data.len(), "uploaded face image");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

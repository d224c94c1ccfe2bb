use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://connect-eu.trimble.com/tc/api/2.0";

const JSON_MIME: &str = "application/json";

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry endpoint paths: {0}")]
    UnsupportedBaseUrl(Url),
    #[error("failed to encode json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{method} {url} -> {status}")]
    Api {
        method: Method,
        url: Url,
        status: StatusCode,
        body: String,
    },
    #[error("no download url returned for file {0}")]
    MissingDownloadUrl(String),
}

impl ConnectError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ConnectError::Api { status, .. } => Some(*status),
            ConnectError::Request(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }
}

/// Request layer for the project folder and file endpoints.
///
/// The client holds no credentials; every call takes the bearer token the
/// caller obtained for it.
#[derive(Clone)]
pub struct ConnectClient {
    http: Client,
    base_url: Url,
}

impl ConnectClient {
    pub fn new() -> Result<Self, ConnectError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ConnectError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConnectError::UnsupportedBaseUrl(base_url));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_folders(
        &self,
        project_id: &str,
        token: &str,
    ) -> Result<Vec<Folder>, ConnectError> {
        let url = self.endpoint(&["projects", project_id, "folders"])?;
        let response = self
            .http
            .get(url)
            .header("Authorization", auth_header_value(token))
            .send()
            .await?;
        let listing: Listing<Folder> = Self::handle_response(Method::GET, response).await?;
        Ok(listing.into_items())
    }

    pub async fn create_folder(
        &self,
        project_id: &str,
        token: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, ConnectError> {
        let url = self.endpoint(&["projects", project_id, "folders"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", auth_header_value(token))
            .json(&CreateFolderRequest { name, parent_id })
            .send()
            .await?;
        Self::handle_response(Method::POST, response).await
    }

    /// Returns the project folder named exactly `folder_name`, creating it at
    /// the project root when it does not exist yet.
    ///
    /// Lookup and creation are two requests; two callers racing on a missing
    /// folder can both create it.
    pub async fn ensure_folder(
        &self,
        project_id: &str,
        token: &str,
        folder_name: &str,
    ) -> Result<Folder, ConnectError> {
        let folders = self.list_folders(project_id, token).await?;
        if let Some(folder) = folders.into_iter().find(|f| f.name == folder_name) {
            return Ok(folder);
        }
        self.create_folder(project_id, token, folder_name, None)
            .await
    }

    pub async fn list_files(
        &self,
        project_id: &str,
        token: &str,
        folder_id: &str,
    ) -> Result<Vec<FileEntry>, ConnectError> {
        let mut url = self.endpoint(&["projects", project_id, "files"])?;
        url.query_pairs_mut().append_pair("folderId", folder_id);
        let response = self
            .http
            .get(url)
            .header("Authorization", auth_header_value(token))
            .send()
            .await?;
        let listing: Listing<FileEntry> = Self::handle_response(Method::GET, response).await?;
        Ok(listing.into_items())
    }

    pub async fn get_download_url(
        &self,
        project_id: &str,
        token: &str,
        file_id: &str,
    ) -> Result<Option<Url>, ConnectError> {
        let url = self.endpoint(&["projects", project_id, "files", file_id, "download-url"])?;
        let response = self
            .http
            .post(url)
            .header("Authorization", auth_header_value(token))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let link: DownloadLink = Self::handle_response(Method::POST, response).await?;
        Ok(link.parsed())
    }

    /// Resolves the short-lived download url of a file and parses its content
    /// as JSON. The download url is pre-signed, so no bearer header is sent.
    pub async fn download_json_by_id(
        &self,
        project_id: &str,
        token: &str,
        file_id: &str,
    ) -> Result<serde_json::Value, ConnectError> {
        let href = self
            .get_download_url(project_id, token, file_id)
            .await?
            .ok_or_else(|| ConnectError::MissingDownloadUrl(file_id.to_string()))?;
        let response = self.http.get(href).send().await?;
        Self::handle_response(Method::GET, response).await
    }

    pub async fn upload_json<T: Serialize + ?Sized>(
        &self,
        project_id: &str,
        folder_id: &str,
        token: &str,
        filename: &str,
        value: &T,
    ) -> Result<UploadedFile, ConnectError> {
        let body = serde_json::to_vec_pretty(value)?;
        let part = Part::bytes(body)
            .file_name(filename.to_string())
            .mime_str(JSON_MIME)?;
        let form = Form::new().part("file", part);

        let mut url = self.endpoint(&["projects", project_id, "files"])?;
        url.query_pairs_mut().append_pair("folderId", folder_id);
        let response = self
            .http
            .post(url)
            .header("Authorization", auth_header_value(token))
            .multipart(form)
            .send()
            .await?;
        Self::handle_response(Method::POST, response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConnectError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConnectError::UnsupportedBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(
        method: Method,
        response: reqwest::Response,
    ) -> Result<T, ConnectError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            Err(ConnectError::Api {
                method,
                url,
                status,
                body,
            })
        }
    }
}

fn auth_header_value(token: &str) -> String {
    format!("Bearer {token}")
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Metadata reported for an uploaded file. Every field is optional because
/// the upload endpoint does not always echo the file identity.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `items` may be absent or `null` on empty folders.
#[derive(Debug, Deserialize)]
struct Listing<T> {
    items: Option<Vec<T>>,
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        self.items.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    url: Option<String>,
}

impl DownloadLink {
    /// Blank or unparseable links count as missing.
    fn parsed(self) -> Option<Url> {
        self.url
            .filter(|url| !url.trim().is_empty())
            .and_then(|url| Url::parse(url.trim()).ok())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest<'a> {
    name: &'a str,
    parent_id: Option<&'a str>,
}

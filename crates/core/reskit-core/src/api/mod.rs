//! Typed access to the ResKit HTTP endpoints

mod client;

pub use client::{interpret_response, ApiClient, RequestBody, TOKEN_HEADER};

use crate::session::Session;
use crate::types::*;
use crate::{ReskitError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::info;

/// Every endpoint the client talks to
///
/// Views hold an `Arc<dyn ResearchApi>` so tests can substitute a mock.
#[async_trait]
pub trait ResearchApi: Send + Sync {
    /// `GET /auth/profile`
    async fn profile(&self) -> Result<User>;

    /// `POST /auth/login`; starts the session on success
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse>;

    /// `POST /auth/register`; starts the session on success
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse>;

    /// Drop the stored token
    async fn logout(&self) -> Result<()>;

    /// `GET /api/projects`
    async fn projects(&self) -> Result<Vec<Project>>;

    /// `GET /api/projects/:id`
    async fn project(&self, id: &ProjectId) -> Result<Project>;

    /// `POST /api/projects`
    async fn create_project(&self, name: &str) -> Result<Project>;

    /// `GET /api/search?q=&category=`
    async fn search(&self, query: &str, category: SearchCategory) -> Result<SearchResponse>;

    /// `POST /api/upload` (multipart)
    async fn upload(&self, project: &ProjectId, file: FileUpload) -> Result<UploadReceipt>;

    /// `POST /api/send-message`
    async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt>;

    /// `GET /api/read-messages/:projectId[?after=]`
    async fn read_messages(
        &self,
        project: &ProjectId,
        after: Option<NaiveDateTime>,
    ) -> Result<Vec<Message>>;
}

/// [`ResearchApi`] over HTTP
#[derive(Clone)]
pub struct HttpResearchApi {
    client: ApiClient,
}

impl HttpResearchApi {
    /// Wrap an API client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn session(&self) -> &Session {
        self.client.session()
    }

    async fn authenticate(&self, endpoint: &str, body: serde_json::Value) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .client
            .call_json(endpoint, Method::POST, RequestBody::Json(body), false)
            .await?;
        match response.token.as_deref() {
            Some(token) if !token.is_empty() => {
                self.session().begin(token)?;
                info!(endpoint, "Authenticated");
                Ok(response)
            }
            _ => Err(ReskitError::auth(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "no token issued".to_string()),
            )),
        }
    }
}

#[async_trait]
impl ResearchApi for HttpResearchApi {
    async fn profile(&self) -> Result<User> {
        self.client
            .call_json("/auth/profile", Method::GET, RequestBody::Empty, true)
            .await
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        self.authenticate("/auth/login", serde_json::to_value(&request)?)
            .await
    }

    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        self.authenticate("/auth/register", serde_json::to_value(&request)?)
            .await
    }

    async fn logout(&self) -> Result<()> {
        self.session().end()
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let value = self
            .client
            .call("/api/projects", Method::GET, RequestBody::Empty, true)
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn project(&self, id: &ProjectId) -> Result<Project> {
        self.client
            .call_json(
                &format!("/api/projects/{}", id.as_path_segment()),
                Method::GET,
                RequestBody::Empty,
                true,
            )
            .await
    }

    async fn create_project(&self, name: &str) -> Result<Project> {
        let body = serde_json::to_value(CreateProjectRequest {
            name: name.to_string(),
        })?;
        let created: CreatedProject = self
            .client
            .call_json("/api/projects", Method::POST, RequestBody::Json(body), true)
            .await?;
        Ok(created.into_project())
    }

    async fn search(&self, query: &str, category: SearchCategory) -> Result<SearchResponse> {
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("category", category.as_str())
            .finish();
        let value = self
            .client
            .call(&format!("/api/search?{}", qs), Method::GET, RequestBody::Empty, true)
            .await?;
        if value.is_null() {
            return Ok(SearchResponse::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn upload(&self, project: &ProjectId, file: FileUpload) -> Result<UploadReceipt> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("project_id", project.to_string());
        self.client
            .call_json("/api/upload", Method::POST, RequestBody::Multipart(form), true)
            .await
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt> {
        let body = serde_json::to_value(&request)?;
        self.client
            .call_json("/api/send-message", Method::POST, RequestBody::Json(body), true)
            .await
    }

    async fn read_messages(
        &self,
        project: &ProjectId,
        after: Option<NaiveDateTime>,
    ) -> Result<Vec<Message>> {
        let mut endpoint = format!("/api/read-messages/{}", project.as_path_segment());
        if let Some(ts) = after {
            let qs = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("after", &format_after(&ts))
                .finish();
            endpoint.push('?');
            endpoint.push_str(&qs);
        }
        let value = self
            .client
            .call(&endpoint, Method::GET, RequestBody::Empty, true)
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }
}

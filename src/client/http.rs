//! HTTP Node Client
//!
//! REST client for a node's `/api` endpoints.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Method, RequestBuilder, Response};
use tokio::sync::RwLock;

use super::ConfigNode;
use crate::config::{ClientConfig, NodeConfig};
use crate::error::{Error, Result};
use crate::model::{
    AuthResponse, ConfigDocument, ErrorResponse, PatchConfigRequest, PostTeleporterRequest,
};

/// Gravity rebuilds download every adlist, so they get far more time than
/// ordinary requests
const GRAVITY_TIMEOUT: Duration = Duration::from_secs(600);

const SID_HEADER: &str = "X-FTL-SID";
const CSRF_HEADER: &str = "X-FTL-CSRF";

/// Active session on a node
#[derive(Debug, Clone)]
struct Session {
    sid: String,
    csrf: Option<String>,
}

/// Node client speaking the node's REST API
pub struct HttpNode {
    /// Base URL without trailing slash
    base_url: String,
    /// Web interface password
    password: String,
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Session opened by `authenticate`
    session: RwLock<Option<Session>>,
}

impl HttpNode {
    /// Create a client for one node
    pub fn new(node: &NodeConfig, config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.skip_tls_verification)
            .build()
            .map_err(|e| Error::Http {
                node: node.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: node.url.trim_end_matches('/').to_string(),
            password: node.password.clone(),
            client,
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Request builder carrying the session headers
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let session = self.session.read().await;
        let session = session.as_ref().ok_or_else(|| Error::Auth {
            node: self.base_url.clone(),
            reason: "no active session".into(),
        })?;

        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(SID_HEADER, &session.sid);
        if let Some(csrf) = &session.csrf {
            builder = builder.header(CSRF_HEADER, csrf);
        }
        Ok(builder)
    }

    /// Send a request and turn transport failures and error statuses into errors
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => match (parsed.error.key, parsed.error.message) {
                (Some(key), Some(message)) => format!("{} ({})", message, key),
                (None, Some(message)) => message,
                (Some(key), None) => key,
                (None, None) => body,
            },
            Err(_) => body,
        };

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth {
                node: self.base_url.clone(),
                reason: message,
            });
        }

        Err(Error::Api {
            node: self.base_url.clone(),
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        Error::Http {
            node: self.base_url.clone(),
            reason: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ConfigNode for HttpNode {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn authenticate(&self) -> Result<()> {
        tracing::debug!(node = %self.base_url, "Authenticating");

        let builder = self
            .client
            .post(self.url("auth"))
            .json(&serde_json::json!({ "password": self.password }));
        let response = self.send(builder).await?;
        let auth: AuthResponse = response.json().await.map_err(|e| self.transport_error(e))?;

        let session = auth.session;
        match (session.valid, session.sid) {
            (true, Some(sid)) => {
                *self.session.write().await = Some(Session {
                    sid,
                    csrf: session.csrf,
                });
                Ok(())
            }
            _ => Err(Error::Auth {
                node: self.base_url.clone(),
                reason: session
                    .message
                    .unwrap_or_else(|| "session not valid".to_string()),
            }),
        }
    }

    async fn delete_session(&self) -> Result<()> {
        if self.session.read().await.is_none() {
            return Ok(());
        }

        tracing::debug!(node = %self.base_url, "Deleting session");
        let builder = self.request(Method::DELETE, "auth").await?;
        self.send(builder).await?;
        *self.session.write().await = None;
        Ok(())
    }

    async fn get_config(&self) -> Result<ConfigDocument> {
        let builder = self.request(Method::GET, "config").await?;
        let response = self.send(builder).await?;
        response.json().await.map_err(|e| self.transport_error(e))
    }

    async fn patch_config(&self, request: &PatchConfigRequest) -> Result<()> {
        let builder = self.request(Method::PATCH, "config").await?.json(request);
        self.send(builder).await?;
        Ok(())
    }

    async fn get_teleporter(&self) -> Result<Bytes> {
        let builder = self.request(Method::GET, "teleporter").await?;
        let response = self.send(builder).await?;
        response.bytes().await.map_err(|e| self.transport_error(e))
    }

    async fn post_teleporter(
        &self,
        snapshot: &Bytes,
        request: Option<&PostTeleporterRequest>,
    ) -> Result<()> {
        let file = reqwest::multipart::Part::bytes(snapshot.to_vec())
            .file_name("config.zip")
            .mime_str("application/zip")
            .map_err(|e| self.transport_error(e))?;
        let mut form = reqwest::multipart::Form::new().part("file", file);
        if let Some(request) = request {
            form = form.text("import", serde_json::to_string(request)?);
        }

        let builder = self.request(Method::POST, "teleporter").await?.multipart(form);
        self.send(builder).await?;
        Ok(())
    }

    async fn run_gravity(&self) -> Result<()> {
        let builder = self
            .request(Method::POST, "action/gravity")
            .await?
            .timeout(GRAVITY_TIMEOUT);
        let response = self.send(builder).await?;
        // The rebuild log is streamed; it is done once the body ends
        response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(())
    }
}

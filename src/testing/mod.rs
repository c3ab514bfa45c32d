//! Test utilities: in-memory backends, a capturing mail transport and an
//! in-process application harness.

pub mod memory;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::{build_router, build_router_with};
use crate::config::AppConfig;
use crate::database::models::{CreateUserDto, RoleType, User};
use crate::middleware::ApiResult;
use crate::routing::{Access, Endpoint, ResourceGroup};
use crate::services::email_service::MailError;
use crate::services::{seed_service, LocalStorage, MailTransport, RenderedEmail};
use crate::state::AppState;

pub use memory::MemoryBackend;

pub const ADMIN_EMAIL: &str = "admin@bastion.test";
pub const ADMIN_PASSWORD: &str = "Admin@1234";
/// Satisfies the strong password rules.
pub const DEFAULT_PASSWORD: &str = "Teste@123";

/// Mail transport that keeps every message for inspection
#[derive(Clone, Default)]
pub struct MemoryOutbox {
    sent: Arc<Mutex<Vec<RenderedEmail>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RenderedEmail> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<RenderedEmail> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MailTransport for MemoryOutbox {
    async fn send(&self, message: &RenderedEmail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("outbox offline".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("outbox poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Message carried by the panic raised from `GET /faults/panic`.
pub const PANIC_MESSAGE: &str = "fault injection: connection string postgres://secret";

/// `/faults` group with a public route whose handler panics
pub fn fault_routes() -> ResourceGroup {
    ResourceGroup::new("faults").endpoint(Endpoint::get("/panic", Access::Public, panicking_handler))
}

async fn panicking_handler() -> ApiResult<Value> {
    panic!("{}", PANIC_MESSAGE)
}

/// Collected response of one in-process request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Value::Null` when the body is not JSON.
    pub body: Value,
    pub text: String,
}

/// Seeded application on in-memory repositories
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub backend: MemoryBackend,
    pub outbox: MemoryOutbox,
    pub admin: User,
    pub admin_token: String,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let uploads = std::env::temp_dir().join(format!("bastion-test-{}", Uuid::new_v4().simple()));
        Self::with_uploads_dir(uploads).await
    }

    pub async fn with_uploads_dir(uploads_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut config = AppConfig::test();
        config.storage.uploads_dir = uploads_dir.into();
        Self::with_config(config).await
    }

    /// Seeds roles, templates and the administrator from `config.admin`,
    /// filling in test credentials when none are set.
    pub async fn with_config(mut config: AppConfig) -> anyhow::Result<Self> {
        if config.admin.email.is_none() {
            config.admin.email = Some(ADMIN_EMAIL.to_string());
            config.admin.password = Some(ADMIN_PASSWORD.to_string());
        }

        let backend = MemoryBackend::new();
        let outbox = MemoryOutbox::new();
        let state = AppState::new(
            config.clone(),
            backend.repositories(),
            Arc::new(LocalStorage::new(config.storage.uploads_dir.clone())),
            Arc::new(outbox.clone()),
        );

        seed_service::run(&state).await?;

        let admin_email = config.admin.email.as_deref().unwrap_or(ADMIN_EMAIL);
        let admin = state
            .repos
            .users
            .find_by_email(admin_email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("administrator was not seeded"))?;
        let admin_token = state.tokens.generate(&admin)?;

        Ok(Self {
            router: build_router(state.clone()),
            state,
            backend,
            outbox,
            admin,
            admin_token,
        })
    }

    /// Rebuilds the router with `groups` mounted next to the regular ones.
    pub fn mount(&mut self, groups: Vec<ResourceGroup>) {
        self.router = build_router_with(self.state.clone(), groups);
    }

    /// Creates a user with `role` and returns it with a valid token.
    pub async fn user_with_role(&self, role: RoleType, email: &str) -> anyhow::Result<(User, String)> {
        let user = self
            .state
            .users
            .create(CreateUserDto {
                name: format!("{} user", role.display_name()),
                email: email.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
                role,
            })
            .await?;
        let token = self.state.tokens.generate(&user)?;
        Ok((user, token))
    }

    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(TestResponse {
            status,
            headers,
            body,
            text,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };
        self.send(builder.body(body)?).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> anyhow::Result<TestResponse> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<TestResponse> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<TestResponse> {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> anyhow::Result<TestResponse> {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// `/api/{version}` joined with `path`
    pub fn api(&self, path: &str) -> String {
        format!("{}{}", self.state.config.server.api_prefix(), path)
    }

    /// Multipart body with a `file` part and an optional `isPrivate` part.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        filename: &str,
        content: &[u8],
        is_private: Option<bool>,
    ) -> anyhow::Result<TestResponse> {
        let boundary = format!("bastion-{}", Uuid::new_v4().simple());
        let mut body = Vec::new();
        if let Some(flag) = is_private {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"isPrivate\"\r\n\r\n{v}\r\n",
                    b = boundary,
                    v = flag
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = boundary,
                f = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))?;
        self.send(request).await
    }
}

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::Arc;

use super::validate_dto;
use crate::config::MailConfig;
use crate::database::models::{EmailTemplate, NewEmailTemplate};
use crate::database::repository::EmailTemplateRepository;
use crate::database::RepositoryError;
use crate::error::ApiError;
use crate::pagination::{PageRequest, Paginated};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern"));

/// Textual `{{ key }}` substitution. Unknown keys are left as written.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Outbound delivery seam
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &RenderedEmail) -> Result<(), MailError>;
}

/// Emits rendered messages to the log instead of an SMTP relay.
pub struct LogTransport {
    relay: String,
}

impl LogTransport {
    pub fn new(mail: &MailConfig) -> Self {
        let relay = match &mail.smtp_host {
            Some(host) => format!("{}:{}", host, mail.smtp_port),
            None => "unconfigured".to_string(),
        };
        Self { relay }
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: &RenderedEmail) -> Result<(), MailError> {
        tracing::info!(
            relay = %self.relay,
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Email dispatched"
        );
        tracing::debug!(body = %message.html, "Email body");
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailTemplateService {
    templates: Arc<dyn EmailTemplateRepository>,
}

impl EmailTemplateService {
    pub fn new(templates: Arc<dyn EmailTemplateRepository>) -> Self {
        Self { templates }
    }

    pub async fn create(&self, dto: NewEmailTemplate) -> Result<EmailTemplate, ApiError> {
        validate_dto(&dto)?;
        self.templates.create(dto).await.map_err(|e| match e {
            RepositoryError::UniqueViolation { .. } => {
                ApiError::conflict("An email template with this name already exists.")
            }
            other => other.into(),
        })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<EmailTemplate, ApiError> {
        self.templates
            .find_by_name(name)
            .await?
            .ok_or_else(|| ApiError::not_found("Email template not found"))
    }

    pub async fn list(&self, page: &PageRequest) -> Result<Paginated<EmailTemplate>, ApiError> {
        let (templates, total) = self.templates.list(page).await.map_err(|e| {
            tracing::error!("Failed to list email templates: {}", e);
            ApiError::bad_request("Failed to retrieve email templates list.")
        })?;
        Ok(Paginated::new(templates, total, page))
    }

    /// Creates the seed templates whose names do not exist yet.
    pub async fn init(&self, seeds: Vec<NewEmailTemplate>) -> Result<usize, ApiError> {
        let mut created = 0;
        for seed in seeds {
            if self.templates.find_by_name(&seed.name).await?.is_some() {
                tracing::debug!("Email template already exists: {}", seed.name);
                continue;
            }
            let name = seed.name.clone();
            self.create(seed).await?;
            tracing::info!("Email template created: {}", name);
            created += 1;
        }
        Ok(created)
    }
}

/// Renders stored templates and hands them to the transport
#[derive(Clone)]
pub struct EmailService {
    templates: EmailTemplateService,
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl EmailService {
    pub fn new(templates: EmailTemplateService, transport: Arc<dyn MailTransport>, from: impl Into<String>) -> Self {
        Self {
            templates,
            transport,
            from: from.into(),
        }
    }

    pub async fn compose(
        &self,
        to: &str,
        template_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<RenderedEmail, ApiError> {
        let template = self.templates.find_by_name(template_name).await?;
        if !template.is_active {
            return Err(ApiError::bad_request(format!(
                "Email template '{}' is inactive",
                template_name
            )));
        }

        let missing: Vec<&str> = template
            .variables
            .iter()
            .filter(|v| !vars.contains_key(v.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Template {} rendered without: {}", template_name, missing.join(", "));
        }

        Ok(RenderedEmail {
            from: self.from.clone(),
            to: to.to_string(),
            subject: render(&template.subject, vars),
            html: render(&template.body_html, vars),
            text: template.body_text.as_deref().map(|t| render(t, vars)),
        })
    }

    pub async fn send_template(
        &self,
        to: &str,
        template_name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let message = self.compose(to, template_name, vars).await?;
        self.transport.send(&message).await.map_err(|e| {
            tracing::error!("Failed to send '{}' email: {}", template_name, e);
            ApiError::internal_server_error("Failed to send email")
        })
    }
}

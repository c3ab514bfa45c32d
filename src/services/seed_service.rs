use crate::database::models::NewEmailTemplate;
use crate::error::ApiError;
use crate::state::AppState;

const EMAIL_TEMPLATE_SEEDS: &str = include_str!("../../seeds/email_templates.json");

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub templates_created: usize,
    pub admin_created: bool,
}

/// Templates shipped with the binary
pub fn bundled_templates() -> Result<Vec<NewEmailTemplate>, serde_json::Error> {
    serde_json::from_str(EMAIL_TEMPLATE_SEEDS)
}

/// Idempotent bootstrap: roles, then email templates, then the administrator.
pub async fn run(state: &AppState) -> Result<SeedReport, ApiError> {
    let roles = state.roles.ensure_roles().await?;

    let seeds = bundled_templates().map_err(|e| {
        tracing::error!("Bundled email templates are malformed: {}", e);
        ApiError::internal_server_error("Failed to load email template seeds")
    })?;
    let templates_created = state.templates.init(seeds).await?;

    let admin = state.users.ensure_admin(&state.config.admin).await?;

    let report = SeedReport {
        roles_created: roles.len(),
        templates_created,
        admin_created: admin.is_some(),
    };
    tracing::info!(
        roles = report.roles_created,
        templates = report.templates_created,
        admin = report.admin_created,
        "Seed complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_templates_parse() {
        let templates = bundled_templates().unwrap();
        let forgot = templates
            .iter()
            .find(|t| t.name == crate::services::auth_service::FORGOT_PASSWORD_TEMPLATE)
            .unwrap();
        assert!(forgot.is_active);
        assert_eq!(forgot.version, 1);
        for var in ["name", "code", "resetLink"] {
            assert!(forgot.variables.iter().any(|v| v == var));
            assert!(forgot.body_html.contains(&format!("{{{{ {} }}}}", var)));
        }
    }
}

//! Certificate Template Service

use std::sync::Arc;

use kernel::id::{TemplateId, TenantId};

use crate::domain::entity::certificate_template::CertificateTemplate;
use crate::domain::repository::CertificateTemplateRepository;
use crate::error::{CertificateError, CertificateResult, ResultExt};

/// Create template input
pub struct CreateTemplateInput {
    pub name: String,
    pub description: Option<String>,
    /// JSON object text
    pub configuration: String,
    /// Make the new template the tenant default
    pub make_default: bool,
}

/// Certificate template service
pub struct TemplateService<R>
where
    R: CertificateTemplateRepository,
{
    repo: Arc<R>,
}

impl<R> Clone for TemplateService<R>
where
    R: CertificateTemplateRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R> TemplateService<R>
where
    R: CertificateTemplateRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    async fn load(
        &self,
        op: &'static str,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        self.repo
            .find_template(tenant_id, template_id)
            .await
            .in_op(op, "load template")?
            .ok_or_else(|| CertificateError::TemplateNotFound.in_op(op, "load template"))
    }

    async fn save(
        &self,
        op: &'static str,
        template: &CertificateTemplate,
    ) -> CertificateResult<()> {
        self.repo
            .update_template(template)
            .await
            .in_op(op, "save template")
    }

    pub async fn create_template(
        &self,
        tenant_id: TenantId,
        input: CreateTemplateInput,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "create_template";

        let template = CertificateTemplate::new(
            tenant_id,
            &input.name,
            input.description,
            &input.configuration,
        )
        .map_err(|e| e.in_op(OP, "validate template"))?;

        self.repo
            .create_template(&template)
            .await
            .in_op(OP, "insert template")?;

        tracing::info!(
            template_id = %template.id,
            tenant_id = %tenant_id,
            name = %template.name,
            "Certificate template created"
        );

        if input.make_default {
            return self
                .repo
                .make_default_template(tenant_id, template.id)
                .await
                .in_op(OP, "make default");
        }
        Ok(template)
    }

    pub async fn get_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        self.load("get_template", tenant_id, template_id).await
    }

    pub async fn list_templates(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<Vec<CertificateTemplate>> {
        self.repo
            .list_templates(tenant_id)
            .await
            .in_op("list_templates", "list templates")
    }

    pub async fn get_default_template(
        &self,
        tenant_id: TenantId,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "get_default_template";
        self.repo
            .find_default_template(tenant_id)
            .await
            .in_op(OP, "load default template")?
            .ok_or_else(|| CertificateError::TemplateNotFound.in_op(OP, "load default template"))
    }

    /// Make a template the only default of its tenant
    pub async fn set_default_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        let template = self
            .repo
            .make_default_template(tenant_id, template_id)
            .await
            .in_op("set_default_template", "make default")?;

        tracing::info!(template_id = %template.id, tenant_id = %tenant_id, "Default template changed");
        Ok(template)
    }

    pub async fn unset_default_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "unset_default_template";

        let mut template = self.load(OP, tenant_id, template_id).await?;
        if template.is_default {
            template.unset_as_default();
            self.save(OP, &template).await?;
        }
        Ok(template)
    }

    pub async fn update_template_configuration(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
        configuration: &str,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "update_template_configuration";

        let mut template = self.load(OP, tenant_id, template_id).await?;
        template
            .update_configuration(configuration)
            .map_err(|e| e.in_op(OP, "parse configuration"))?;
        self.save(OP, &template).await?;
        Ok(template)
    }

    pub async fn activate_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "activate_template";

        let mut template = self.load(OP, tenant_id, template_id).await?;
        if !template.is_active {
            template.activate();
            self.save(OP, &template).await?;
        }
        Ok(template)
    }

    /// Deactivate; a default template also loses its default flag
    pub async fn deactivate_template(
        &self,
        tenant_id: TenantId,
        template_id: TemplateId,
    ) -> CertificateResult<CertificateTemplate> {
        const OP: &str = "deactivate_template";

        let mut template = self.load(OP, tenant_id, template_id).await?;
        if template.is_active {
            template.deactivate();
            self.save(OP, &template).await?;
            tracing::info!(template_id = %template.id, "Certificate template deactivated");
        }
        Ok(template)
    }
}

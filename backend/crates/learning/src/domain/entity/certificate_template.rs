//! Certificate Template Entity
//!
//! Tenant-scoped rendering configuration for certificates. At most one
//! template per tenant is the default; that invariant spans rows and is
//! kept by the repository's `make_default_template`, not by this entity.

use chrono::{DateTime, Utc};
use kernel::id::{TemplateId, TenantId};
use serde_json::{Map, Value};

use crate::error::{CertificateError, CertificateResult};

pub const MAX_TEMPLATE_NAME_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateTemplate {
    pub id: TemplateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// Parsed configuration; always a JSON object
    pub configuration: Map<String, Value>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateTemplate {
    /// Create an active, non-default template
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        description: Option<String>,
        configuration: &str,
    ) -> CertificateResult<Self> {
        let name = validate_name(name)?;
        let configuration = parse_configuration(configuration)?;
        let now = Utc::now();

        Ok(Self {
            id: TemplateId::new(),
            tenant_id,
            name,
            description: description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            configuration,
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Inactive templates cannot become the default
    pub fn set_as_default(&mut self) -> CertificateResult<()> {
        if !self.is_active {
            return Err(CertificateError::TemplateInactive);
        }
        self.is_default = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn unset_as_default(&mut self) {
        self.is_default = false;
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    /// Deactivation also drops the default flag
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.is_default = false;
        self.updated_at = Utc::now();
    }

    pub fn update_configuration(&mut self, configuration: &str) -> CertificateResult<()> {
        self.configuration = parse_configuration(configuration)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_name(name: &str) -> CertificateResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CertificateError::InvalidTemplate(
            "name must not be empty".into(),
        ));
    }
    if name.chars().count() > MAX_TEMPLATE_NAME_LEN {
        return Err(CertificateError::InvalidTemplate(format!(
            "name must be at most {MAX_TEMPLATE_NAME_LEN} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Parse configuration text; only a JSON object is accepted
pub fn parse_configuration(text: &str) -> CertificateResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CertificateError::InvalidTemplate(
            "configuration must be a JSON object".into(),
        )),
        Err(e) => Err(CertificateError::InvalidTemplate(format!(
            "configuration is not valid JSON: {e}"
        ))),
    }
}

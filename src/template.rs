//! Company template: crop area and recipient registry, read from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::CropArea;
use crate::error::ConfigError;
use crate::matching::Registry;

fn default_company_id() -> String {
    "main".to_string()
}

/// Per-company settings, loaded once at startup and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyTemplate {
    #[serde(default = "default_company_id")]
    pub company_id: String,
    pub company_name: String,
    pub name_crop_area: CropArea,
    #[serde(default)]
    pub employee_emails: Registry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl CompanyTemplate {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let template = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            company = %template.company_id,
            employees = template.employee_emails.len(),
            "Company template loaded"
        );
        Ok(template)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let template: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if !template.name_crop_area.is_valid() {
            return Err(ConfigError::InvalidValue {
                key: "name_crop_area".into(),
                message: "width and height must be positive".into(),
            });
        }
        Ok(template)
    }
}

//! Tenant-scoped collection names: `<app-prefix>_<tenant-id>_<base-name>`.

use serde::Serialize;
use vms_ids::TenantId;

pub const DEFAULT_APP_PREFIX: &str = "vms";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionNaming {
    app_prefix: String,
    /// Namespace separator inside template names. `None` keeps the whole name.
    template_separator: Option<String>,
}

impl Default for CollectionNaming {
    fn default() -> Self {
        Self::new(DEFAULT_APP_PREFIX)
    }
}

impl CollectionNaming {
    pub fn new(app_prefix: impl Into<String>) -> Self {
        Self {
            app_prefix: app_prefix.into(),
            template_separator: None,
        }
    }

    pub fn with_template_separator(mut self, separator: Option<String>) -> Self {
        self.template_separator = separator.filter(|s| !s.is_empty());
        self
    }

    pub fn app_prefix(&self) -> &str {
        &self.app_prefix
    }

    pub fn template_separator(&self) -> Option<&str> {
        self.template_separator.as_deref()
    }

    /// Final segment of `template_name` after the separator.
    ///
    /// A name that ends with the separator keeps its full form.
    pub fn base_name<'a>(&self, template_name: &'a str) -> &'a str {
        match self.template_separator.as_deref() {
            Some(separator) => match template_name.rsplit_once(separator) {
                Some((_, base)) if !base.is_empty() => base,
                _ => template_name,
            },
            None => template_name,
        }
    }

    /// Prefix shared by every collection of `tenant_id`, trailing underscore included.
    pub fn tenant_prefix(&self, tenant_id: &TenantId) -> String {
        if self.app_prefix.is_empty() {
            format!("{}_", tenant_id)
        } else {
            format!("{}_{}_", self.app_prefix, tenant_id)
        }
    }

    pub fn scoped_name(&self, tenant_id: &TenantId, template_name: &str) -> String {
        format!(
            "{}{}",
            self.tenant_prefix(tenant_id),
            self.base_name(template_name)
        )
    }
}

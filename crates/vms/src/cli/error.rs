//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Admin email or password not set
    pub fn missing_credentials() -> Self {
        Self::new("Store admin credentials are not configured")
            .with_context("Provisioning needs an admin account on the store")
            .with_suggestions([
                "TRY: export VMS_ADMIN_EMAIL=admin@example.com VMS_ADMIN_PASSWORD=...",
                "TRY: Pass --admin-email and --admin-password",
                "TRY: Use --dry-run to provision against an in-memory store",
            ])
    }

    pub fn invalid_store_url(url: &str) -> Self {
        Self::new(format!("Invalid store URL: '{}'", url))
            .with_context("The store URL must include the scheme")
            .with_suggestion("TRY: --store-url http://localhost:8090")
    }

    pub fn template_not_found(path: &Path) -> Self {
        Self::new(format!("Template not found: {}", path.display()))
            .with_context("Provisioning copies the collections defined in this file")
            .with_suggestions([
                format!("TRY: Check the path exists: ls -la {}", path.display()),
                "TRY: Point at another template: --template path/to/pb_schema.json".to_string(),
                "TRY: Export the schema from the store admin UI (Settings > Export collections)"
                    .to_string(),
            ])
    }

    pub fn invalid_template(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid template: {}", details))
            .with_context(format!("Failed to load template: {}", path.display()))
            .with_suggestions([
                "TRY: The template must be a JSON array of collections".to_string(),
                format!("TRY: Validate the JSON: python -m json.tool {}", path.display()),
            ])
    }

    pub fn authentication_failed(url: &str, details: &str) -> Self {
        Self::new("Store rejected the admin credentials")
            .with_context(format!("{} ({})", details, url))
            .with_suggestions([
                "TRY: Check VMS_ADMIN_EMAIL and VMS_ADMIN_PASSWORD",
                "TRY: vms config   # Show the resolved store settings",
            ])
    }

    pub fn store_unreachable(url: &str, details: &str) -> Self {
        Self::new(format!("Cannot reach store at {}", url))
            .with_context(details.to_string())
            .with_suggestions([
                format!("TRY: curl {}/api/health", url.trim_end_matches('/')),
                "TRY: Use --insecure for a self-signed certificate".to_string(),
                "TRY: Raise --store-timeout for a slow store".to_string(),
            ])
    }

    pub fn allocation_exhausted(attempts: u32) -> Self {
        Self::new(format!("No free tenant ID after {} attempts", attempts))
            .with_context("Every generated candidate was already taken")
            .with_suggestion("TRY: Retry, or raise --max-attempts")
    }

    pub fn invalid_tenant_id(id: &str) -> Self {
        Self::new(format!("Invalid tenant ID: '{}'", id))
            .with_context("Tenant IDs contain lowercase letters and digits only")
    }

    pub fn tenant_not_found(id: &str) -> Self {
        Self::new(format!("Tenant not found: {}", id))
            .with_context("No tenant record carries this ID")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

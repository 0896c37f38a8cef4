//! File-backed Handlebars templates for email bodies.
//!
//! Every template identifier maps to two files in the template directory:
//! `{name}.html.hbs` for the HTML body and `{name}.plain.hbs` for the
//! plaintext body. Templates are read on every render, so edits on disk are
//! picked up without a restart.

use handlebars::Handlebars;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MailError, MailResult};

/// Which body a template file produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    Html,
    Plain,
}

impl TemplateVariant {
    fn suffix(self) -> &'static str {
        match self {
            Self::Html => "html.hbs",
            Self::Plain => "plain.hbs",
        }
    }
}

/// Renders `{name}.{variant}.hbs` files from a template directory.
///
/// HTML output escapes interpolated values; plaintext output does not.
pub struct TemplateRenderer {
    dir: PathBuf,
    html: Handlebars<'static>,
    plain: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut plain = Handlebars::new();
        plain.register_escape_fn(handlebars::no_escape);

        Self {
            dir: dir.into(),
            html: Handlebars::new(),
            plain,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of one template variant on disk.
    pub fn template_path(&self, name: &str, variant: TemplateVariant) -> PathBuf {
        self.dir.join(format!("{}.{}", name, variant.suffix()))
    }

    /// Render one variant of a template with the given data.
    pub async fn render(&self, name: &str, variant: TemplateVariant, data: &Value) -> MailResult<String> {
        validate_name(name)?;

        let path = self.template_path(name, variant);
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => MailError::TemplateNotFound {
                template: name.to_string(),
                path: path.clone(),
            },
            _ => MailError::Render {
                template: name.to_string(),
                details: e.to_string(),
            },
        })?;

        let engine = match variant {
            TemplateVariant::Html => &self.html,
            TemplateVariant::Plain => &self.plain,
        };

        let rendered = engine
            .render_template(&source, data)
            .map_err(|e| MailError::Render {
                template: name.to_string(),
                details: e.to_string(),
            })?;

        debug!(template = %name, variant = ?variant, bytes = rendered.len(), "Rendered template");
        Ok(rendered)
    }
}

fn validate_name(name: &str) -> MailResult<()> {
    let is_plain_name = !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\');

    if is_plain_name {
        Ok(())
    } else {
        Err(MailError::InvalidTemplate(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundled() -> TemplateRenderer {
        TemplateRenderer::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
    }

    #[tokio::test]
    async fn test_render_plain_does_not_escape() {
        let rendered = bundled()
            .render("mail", TemplateVariant::Plain, &json!({ "message": "a < b & c" }))
            .await
            .unwrap();

        assert!(rendered.contains("a < b & c"));
    }

    #[tokio::test]
    async fn test_render_html_escapes() {
        let rendered = bundled()
            .render("mail", TemplateVariant::Html, &json!({ "message": "<script>" }))
            .await
            .unwrap();

        assert!(rendered.contains("&lt;script&gt;"));
        assert!(!rendered.contains("<script>"));
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let err = bundled()
            .render("does-not-exist", TemplateVariant::Html, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::TemplateNotFound { ref template, .. } if template == "does-not-exist"));
    }

    #[tokio::test]
    async fn test_path_like_names_are_rejected() {
        let err = bundled()
            .render("../secrets", TemplateVariant::Plain, &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::InvalidTemplate(_)));
    }

    #[test]
    fn test_template_path_layout() {
        let renderer = TemplateRenderer::new("/srv/templates");
        assert_eq!(renderer.dir(), Path::new("/srv/templates"));
        assert_eq!(
            renderer.template_path("invoice", TemplateVariant::Plain),
            PathBuf::from("/srv/templates/invoice.plain.hbs")
        );
    }
}

//! Quote document rendering: HTML via Tera templates, optionally converted
//! to PDF through wkhtmltopdf when the binary is on PATH.

use std::collections::HashMap;
use std::process::Stdio;

use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

pub mod document;

pub use document::{DocumentLine, QuoteDocument};

/// Errors surfaced while rendering or converting a quote document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output of a render call. Callers that need a guaranteed format should
/// inspect the variant; HTML is returned whenever PDF conversion is not
/// possible.
pub enum RenderedQuote {
    Pdf(Vec<u8>),
    Html(String),
}

/// Renders quote documents from the embedded template.
pub struct DocumentRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl DocumentRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template("quote.html.tera", include_str!("../templates/quote.html.tera"))
            .map_err(|e| RenderError::Template(e.to_string()))?;

        let wkhtmltopdf_path =
            which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());
        match wkhtmltopdf_path {
            Some(ref path) => info!(path = %path, "wkhtmltopdf found"),
            None => warn!("wkhtmltopdf not found in PATH, rendering HTML only"),
        }

        Ok(Self { tera, wkhtmltopdf_path })
    }

    /// Renders the document to HTML.
    pub fn render_html(&self, document: &QuoteDocument) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("quote", document);
        self.tera
            .render("quote.html.tera", &context)
            .map_err(|e| RenderError::Template(e.to_string()))
    }

    /// Renders the document, converting to PDF when wkhtmltopdf is
    /// available. Conversion failures fall back to HTML rather than failing
    /// the export.
    pub async fn render(&self, document: &QuoteDocument) -> Result<RenderedQuote, RenderError> {
        let html = self.render_html(document)?;

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(bytes) => return Ok(RenderedQuote::Pdf(bytes)),
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                }
            }
        }
        Ok(RenderedQuote::Html(html))
    }
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, RenderError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("quote_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("quote_{}.pdf", uuid::Uuid::new_v4()));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(RenderError::Conversion(stderr.to_string()));
    }

    let pdf_bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    info!(size = pdf_bytes.len(), "PDF generated");

    Ok(pdf_bytes)
}

/// Registers the filters used by the quote template.
///
/// `money` formats an amount to two decimal places. Decimal values arrive in
/// the template context as strings, so the filter accepts both numbers and
/// numeric strings.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let num = match value {
        tera::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        tera::Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
        tera::Value::Null => 0.0,
        _ => 0.0,
    };
    Ok(tera::Value::String(format!("{num:.2}")))
}

//! Attachment generation: personalised PDF manuals.

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::models::{Plan, Subscriber};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

// US Letter, portrait
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_LEFT_MM: f32 = 10.0;
const MARGIN_BOTTOM_MM: f32 = 13.0;
const LINE_HEIGHT_MM: f32 = 6.0;

/// Distance of the personalised heading from the top edge.
const HEADING_FROM_TOP_MM: f32 = 150.0;
const HEADING_FONT_SIZE: f32 = 12.0;
const BODY_FONT_SIZE: f32 = 11.0;

/// Produces the manual attached to a subscription confirmation.
///
/// Implementations may block for several seconds; callers run them on the
/// blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait ManualGenerator: Send + Sync {
    fn generate(&self, subscriber: &Subscriber, plan: &Plan) -> FulfillmentResult<Vec<u8>>;
}

/// Renders a one-page PDF from a plain text source document, with the
/// subscriber's name and the plan title as a heading.
#[derive(Debug, Clone)]
pub struct PdfManualGenerator {
    source_path: PathBuf,
    render_delay: Duration,
}

impl PdfManualGenerator {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            render_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &FulfillmentConfig) -> Self {
        Self::new(&config.manual_source_path).with_render_delay(config.render_delay)
    }

    /// Sleep this long before every render.
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }
}

impl ManualGenerator for PdfManualGenerator {
    fn generate(&self, subscriber: &Subscriber, plan: &Plan) -> FulfillmentResult<Vec<u8>> {
        if !self.render_delay.is_zero() {
            std::thread::sleep(self.render_delay);
        }

        let source = std::fs::read_to_string(&self.source_path).map_err(|source| {
            FulfillmentError::SourceUnreadable {
                path: self.source_path.clone(),
                source,
            }
        })?;

        let title = format!("{} User Guide", plan.name);
        let bytes = render_manual(&source, &subscriber.full_name(), &title)?;
        debug!(user_id = subscriber.id, plan = %plan.name, size = bytes.len(), "Manual rendered");
        Ok(bytes)
    }
}

fn render_manual(body: &str, name: &str, title: &str) -> FulfillmentResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| FulfillmentError::Generation(e.to_string()))?;
    let layer = doc.get_page(page).get_layer(layer);

    let heading_y = PAGE_HEIGHT_MM - HEADING_FROM_TOP_MM;
    write_centered(&layer, &font, name, heading_y);
    write_centered(&layer, &font, title, heading_y - 9.0);

    let mut y = heading_y - 25.0;
    for line in body.lines() {
        if y < MARGIN_BOTTOM_MM {
            break;
        }
        layer.use_text(line, BODY_FONT_SIZE, Mm(MARGIN_LEFT_MM), Mm(y), &font);
        y -= LINE_HEIGHT_MM;
    }

    doc.save_to_bytes()
        .map_err(|e| FulfillmentError::Generation(e.to_string()))
}

fn write_centered(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, y: f32) {
    layer.use_text(text, HEADING_FONT_SIZE, Mm(centered_x(text, HEADING_FONT_SIZE)), Mm(y), font);
}

/// Approximate left edge that centres `text` on the page. Helvetica glyphs
/// average about half an em; one point is 0.3528 mm.
fn centered_x(text: &str, font_size: f32) -> f32 {
    let width = text.chars().count() as f32 * font_size * 0.5 * 0.3528;
    ((PAGE_WIDTH_MM - width) / 2.0).max(MARGIN_LEFT_MM)
}

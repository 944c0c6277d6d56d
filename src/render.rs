//! Certificate rendering.
//!
//! The core only passes recipient names through; the artifact itself is a
//! delegated capability behind `CertificateRenderer`. The bundled
//! implementation produces a minimal one-page PDF.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("pdf generation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces one certificate artifact (PDF bytes) for a recipient.
pub trait CertificateRenderer: Send + Sync {
    fn render(&self, name: &str) -> Result<Vec<u8>, RenderError>;
}

/// Single-page landscape-A4 certificate: a heading and the recipient name,
/// horizontally centered.
#[derive(Debug, Clone)]
pub struct PdfCertificateRenderer {
    pub heading: String,
    pub name_size: u32,
}

impl Default for PdfCertificateRenderer {
    fn default() -> Self {
        Self {
            heading: "Certificate of Completion".into(),
            name_size: 36,
        }
    }
}

const PAGE_WIDTH: f32 = 842.0;
const PAGE_HEIGHT: f32 = 595.0;
const HEADING_SIZE: f32 = 24.0;

// Rough advance width for Helvetica; close enough to center a short line.
fn centered_x(text: &str, font_size: f32) -> f32 {
    let width = text.chars().count() as f32 * font_size * 0.5;
    ((PAGE_WIDTH - width) / 2.0).max(0.0)
}

impl CertificateRenderer for PdfCertificateRenderer {
    fn render(&self, name: &str) -> Result<Vec<u8>, RenderError> {
        let name_size = self.name_size as f32;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), HEADING_SIZE.into()]),
                Operation::new(
                    "Td",
                    vec![centered_x(&self.heading, HEADING_SIZE).into(), 420.0_f32.into()],
                ),
                Operation::new("Tj", vec![Object::string_literal(self.heading.as_str())]),
                Operation::new("ET", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), name_size.into()]),
                Operation::new(
                    "Td",
                    vec![centered_x(name, name_size).into(), 280.0_f32.into()],
                ),
                Operation::new("Tj", vec![Object::string_literal(name)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buf = Vec::new();
        doc.save_to(&mut buf)?;
        Ok(buf)
    }
}

/// File name for a recipient's certificate, safe for common filesystems.
pub fn certificate_filename(name: &str) -> String {
    format!("certificate_{}.pdf", name.trim().replace(' ', "_"))
}

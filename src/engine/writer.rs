//! [`DocumentWriter`] adapter over `lopdf`.
//!
//! Builds a minimal PDF by hand: one page object per placed image, the
//! image embedded as a DCTDecode (JPEG) XObject so the compressed bytes go
//! into the file untouched. Placement arrives in millimetres from the
//! top-left corner and is converted here to PDF user space (points,
//! bottom-left origin).

use crate::engine::{DocumentBuilder, DocumentWriter};
use crate::error::ForgeError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;
use tracing::debug;

const MM_TO_PT: f32 = 72.0 / 25.4;

/// Document writer backed by `lopdf`.
pub struct LopdfWriter;

impl LopdfWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LopdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter for LopdfWriter {
    fn new_document(&self, page_width_mm: f32, page_height_mm: f32) -> Box<dyn DocumentBuilder> {
        Box::new(LopdfBuilder {
            page_width_mm,
            page_height_mm,
            placed: Vec::new(),
        })
    }
}

struct Placed {
    jpeg: Vec<u8>,
    px_width: u32,
    px_height: u32,
    x_mm: f32,
    y_mm: f32,
    width_mm: f32,
    height_mm: f32,
}

struct LopdfBuilder {
    page_width_mm: f32,
    page_height_mm: f32,
    /// One page per placed image, in call order.
    placed: Vec<Placed>,
}

impl DocumentBuilder for LopdfBuilder {
    fn add_image(
        &mut self,
        jpeg: &[u8],
        x_mm: f32,
        y_mm: f32,
        width_mm: f32,
        height_mm: f32,
    ) -> Result<(), ForgeError> {
        // The XObject dictionary needs the pixel dimensions; read just the
        // header rather than decoding the whole image.
        let (px_width, px_height) = image::ImageReader::new(Cursor::new(jpeg))
            .with_guessed_format()
            .map_err(|e| ForgeError::DocumentWrite {
                detail: format!("unreadable image data: {e}"),
            })?
            .into_dimensions()
            .map_err(|e| ForgeError::DocumentWrite {
                detail: format!("could not size image: {e}"),
            })?;

        self.placed.push(Placed {
            jpeg: jpeg.to_vec(),
            px_width,
            px_height,
            x_mm,
            y_mm,
            width_mm,
            height_mm,
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ForgeError> {
        if self.placed.is_empty() {
            return Err(ForgeError::DocumentWrite {
                detail: "document has no pages".into(),
            });
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_w_pt = self.page_width_mm * MM_TO_PT;
        let page_h_pt = self.page_height_mm * MM_TO_PT;

        let mut kids: Vec<Object> = Vec::with_capacity(self.placed.len());

        for placed in &self.placed {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => placed.px_width as i64,
                    "Height" => placed.px_height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                placed.jpeg.clone(),
            ));

            // PDF user space has its origin bottom-left; placement comes in
            // top-left millimetre coordinates.
            let w_pt = placed.width_mm * MM_TO_PT;
            let h_pt = placed.height_mm * MM_TO_PT;
            let x_pt = placed.x_mm * MM_TO_PT;
            let y_pt = (self.page_height_mm - placed.y_mm - placed.height_mm) * MM_TO_PT;

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            w_pt.into(),
                            0.into(),
                            0.into(),
                            h_pt.into(),
                            x_pt.into(),
                            y_pt.into(),
                        ],
                    ),
                    Operation::new("Do", vec!["Im0".into()]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content.encode().map_err(|e| ForgeError::DocumentWrite {
                detail: format!("content stream: {e}"),
            })?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), page_w_pt.into(), page_h_pt.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).map_err(|e| ForgeError::DocumentWrite {
            detail: format!("serialise failed: {e}"),
        })?;

        debug!(pages = page_count, bytes = buf.len(), "document assembled");
        Ok(buf)
    }
}

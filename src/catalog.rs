//! The conversion catalog: a fixed registry mapping each recognised
//! (source type → target type) pair to an operation descriptor.
//!
//! ## Fallback chains are data, not control flow
//!
//! Each descriptor carries an *ordered* executor chain — primary first,
//! fallbacks after. The dispatcher walks the chain mechanically, so adding a
//! new fallback means editing one table row, never touching dispatch logic.
//! The only chain longer than one today is HEIC decode, which fails over to
//! a still-frame extraction on the heavyweight transcode engine.
//!
//! The catalog is read-only after construction; there is no runtime
//! registration.

use crate::file::InputFile;
use serde::{Deserialize, Serialize};

/// Reference to one of the built-in executors.
///
/// The dispatcher maps each variant onto a call into the matching
/// collaborator (see [`crate::engine`]) via the [`crate::ops`] modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorRef {
    /// MP4 → animated GIF on the transcode engine.
    TranscodeGif,
    /// HEIC → still image via the lightweight decoder.
    DecodeImage,
    /// HEIC → still image via the transcode engine (first frame only).
    TranscodeStill,
    /// PDF → one image per page via the document rasteriser.
    RasterizePages,
    /// PNG ↔ JPEG re-encode; flattens transparency onto white for JPEG.
    Recompress,
    /// Image → single-page document via the document writer.
    EmbedPage,
}

impl ExecutorRef {
    /// Whether this executor requires the lazily-initialised transcode engine.
    pub fn needs_engine(self) -> bool {
        matches!(self, ExecutorRef::TranscodeGif | ExecutorRef::TranscodeStill)
    }

    /// Stable name used in status text and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ExecutorRef::TranscodeGif => "transcode-to-gif",
            ExecutorRef::DecodeImage => "lightweight-decode",
            ExecutorRef::TranscodeStill => "transcode-to-png",
            ExecutorRef::RasterizePages => "rasterize-page",
            ExecutorRef::Recompress => "canvas-recompress",
            ExecutorRef::EmbedPage => "embed-as-page",
        }
    }
}

/// Source-side predicate: declared MIME equality, or filename-suffix match
/// when the declared type is empty or unrecognised.
#[derive(Debug, Clone, Copy)]
pub struct SourcePredicate {
    /// Accepted declared media types, exact match.
    pub media_types: &'static [&'static str],
    /// Accepted filename extensions (lower-case, no dot) used as fallback.
    pub extensions: &'static [&'static str],
}

impl SourcePredicate {
    /// Test a file against this predicate.
    ///
    /// Declared type wins when it matches; the extension only rescues files
    /// whose declared type is empty or matches no registered MIME entry
    /// (the observed HEIC mis-reporting case).
    pub fn matches(&self, file: &InputFile) -> bool {
        if self.media_types.contains(&file.media_type()) {
            return true;
        }
        match file.extension() {
            Some(ext) => self.extensions.contains(&ext.as_str()),
            None => false,
        }
    }
}

/// One registered conversion operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptor {
    /// Human label, unique within the catalog; the caller's handle.
    pub label: &'static str,
    /// Which files this operation applies to.
    pub source: SourcePredicate,
    /// Declared media type of every artifact this operation produces.
    pub target_type: &'static str,
    /// Filename extension for produced artifacts.
    pub target_ext: &'static str,
    /// Executor chain: index 0 is the primary, the rest are fallbacks tried
    /// in order. Every entry accepts the same input contract.
    pub executors: &'static [ExecutorRef],
}

impl OperationDescriptor {
    /// Whether any executor in the chain is multi-artifact (per page).
    pub fn is_multi_artifact(&self) -> bool {
        self.executors.contains(&ExecutorRef::RasterizePages)
    }
}

/// The fixed table of recognised conversions.
#[derive(Debug, Clone)]
pub struct ConversionCatalog {
    entries: &'static [OperationDescriptor],
}

const STANDARD: &[OperationDescriptor] = &[
    OperationDescriptor {
        label: "Video to GIF",
        source: SourcePredicate {
            media_types: &["video/mp4"],
            extensions: &["mp4"],
        },
        target_type: "image/gif",
        target_ext: "gif",
        executors: &[ExecutorRef::TranscodeGif],
    },
    OperationDescriptor {
        label: "HEIC to PNG",
        source: SourcePredicate {
            media_types: &["image/heic"],
            extensions: &["heic"],
        },
        target_type: "image/png",
        target_ext: "png",
        executors: &[ExecutorRef::DecodeImage, ExecutorRef::TranscodeStill],
    },
    OperationDescriptor {
        label: "PDF to PNGs",
        source: SourcePredicate {
            media_types: &["application/pdf"],
            extensions: &["pdf"],
        },
        target_type: "image/png",
        target_ext: "png",
        executors: &[ExecutorRef::RasterizePages],
    },
    OperationDescriptor {
        label: "PDF to JPGs",
        source: SourcePredicate {
            media_types: &["application/pdf"],
            extensions: &["pdf"],
        },
        target_type: "image/jpeg",
        target_ext: "jpg",
        executors: &[ExecutorRef::RasterizePages],
    },
    OperationDescriptor {
        label: "PNG to JPG",
        source: SourcePredicate {
            media_types: &["image/png"],
            extensions: &["png"],
        },
        target_type: "image/jpeg",
        target_ext: "jpg",
        executors: &[ExecutorRef::Recompress],
    },
    OperationDescriptor {
        label: "JPG to PNG",
        source: SourcePredicate {
            media_types: &["image/jpeg", "image/jpg"],
            extensions: &["jpg", "jpeg"],
        },
        target_type: "image/png",
        target_ext: "png",
        executors: &[ExecutorRef::Recompress],
    },
    OperationDescriptor {
        label: "Image to PDF",
        source: SourcePredicate {
            media_types: &["image/png", "image/jpeg", "image/jpg"],
            extensions: &["png", "jpg", "jpeg"],
        },
        target_type: "application/pdf",
        target_ext: "pdf",
        executors: &[ExecutorRef::EmbedPage],
    },
];

impl ConversionCatalog {
    /// The standard seven-entry catalog.
    pub fn standard() -> Self {
        Self { entries: STANDARD }
    }

    /// Look up a descriptor by its label.
    pub fn get(&self, label: &str) -> Option<&'static OperationDescriptor> {
        self.entries.iter().find(|d| d.label == label)
    }

    /// All descriptors in registration order.
    pub fn entries(&self) -> &'static [OperationDescriptor] {
        self.entries
    }
}

impl Default for ConversionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_label() {
        let catalog = ConversionCatalog::standard();
        let d = catalog.get("HEIC to PNG").expect("registered");
        assert_eq!(d.target_type, "image/png");
        assert_eq!(
            d.executors,
            &[ExecutorRef::DecodeImage, ExecutorRef::TranscodeStill]
        );
    }

    #[test]
    fn unknown_label_is_none() {
        assert!(ConversionCatalog::standard().get("DOCX to PDF").is_none());
    }

    #[test]
    fn every_target_has_an_extension() {
        for d in ConversionCatalog::standard().entries() {
            assert!(!d.target_ext.is_empty(), "{} lacks an extension", d.label);
            assert!(!d.executors.is_empty(), "{} has no executors", d.label);
        }
    }

    #[test]
    fn only_transcode_paths_need_the_engine() {
        assert!(ExecutorRef::TranscodeGif.needs_engine());
        assert!(ExecutorRef::TranscodeStill.needs_engine());
        assert!(!ExecutorRef::DecodeImage.needs_engine());
        assert!(!ExecutorRef::RasterizePages.needs_engine());
        assert!(!ExecutorRef::Recompress.needs_engine());
        assert!(!ExecutorRef::EmbedPage.needs_engine());
    }

    #[test]
    fn predicate_prefers_declared_type() {
        let d = ConversionCatalog::standard().get("Video to GIF").unwrap();
        let by_type = InputFile::new(vec![], "video/mp4", "clip.bin");
        let by_ext = InputFile::new(vec![], "", "clip.MP4");
        let neither = InputFile::new(vec![], "video/webm", "clip.webm");
        assert!(d.source.matches(&by_type));
        assert!(d.source.matches(&by_ext));
        assert!(!d.source.matches(&neither));
    }
}

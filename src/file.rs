//! The input side of a conversion: an opaque byte blob plus the two pieces
//! of metadata classification runs on — the declared media type (which may be
//! empty or plain wrong; browsers routinely mis-report HEIC) and the
//! filename, used only for extension sniffing and output naming.

/// A file submitted for conversion.
///
/// Immutable for the duration of a conversion attempt. The dispatcher
/// borrows it read-only; ownership stays with the caller.
#[derive(Debug, Clone)]
pub struct InputFile {
    bytes: Vec<u8>,
    media_type: String,
    filename: String,
}

impl InputFile {
    /// Wrap raw bytes with their declared media type and filename.
    ///
    /// An empty `media_type` is valid — classification falls back to the
    /// filename extension.
    pub fn new(
        bytes: Vec<u8>,
        media_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type as submitted. May be empty.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-cased filename extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.filename.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

//! Integration tests for the conversion dispatcher, driven entirely by
//! fake collaborators — no ffmpeg binary, no pdfium library, no real
//! documents needed.
//!
//! Run with:
//!   cargo test --test dispatch

use async_trait::async_trait;
use fileforge::{
    Collaborators, ConversionDispatcher, ConversionResult, DocumentBuilder, DocumentRasterizer,
    DocumentWriter, FilterSpec, ForgeConfig, ForgeError, ImageDecoder, InputFile, MemorySink,
    RenderedPage, ResultSink, StatusObserver, TranscodeEngine,
};
use futures::StreamExt;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fake collaborators ───────────────────────────────────────────────────

/// Records call order across collaborators, for fallback-sequence asserts.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn push(&self, what: &str) {
        self.calls.lock().unwrap().push(what.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

struct FakeEngine {
    log: Arc<CallLog>,
    init_ok: bool,
    transcode_delay: Duration,
    output: Vec<u8>,
}

impl FakeEngine {
    fn ok(log: Arc<CallLog>) -> Self {
        Self {
            log,
            init_ok: true,
            transcode_delay: Duration::ZERO,
            output: b"engine-output".to_vec(),
        }
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn initialize(&self) -> Result<(), ForgeError> {
        self.log.push("engine.initialize");
        if self.init_ok {
            Ok(())
        } else {
            Err(ForgeError::EngineInit {
                detail: "core unavailable".into(),
            })
        }
    }

    async fn transcode(&self, _input: &[u8], spec: &FilterSpec) -> Result<Vec<u8>, ForgeError> {
        self.log.push(&format!("engine.transcode:{}", spec.output_ext));
        tokio::time::sleep(self.transcode_delay).await;
        Ok(self.output.clone())
    }
}

struct FakeDecoder {
    log: Arc<CallLog>,
    fail: bool,
}

#[async_trait]
impl ImageDecoder for FakeDecoder {
    async fn decode(&self, _input: &[u8], target_type: &str) -> Result<Vec<u8>, ForgeError> {
        self.log.push(&format!("decoder.decode:{target_type}"));
        if self.fail {
            Err(ForgeError::ExecutorFailed {
                executor: "lightweight-decode".into(),
                detail: "ERR_LIBHEIF: unsupported brand".into(),
            })
        } else {
            Ok(b"decoded-png".to_vec())
        }
    }
}

/// Renders solid-colour pages; optionally fails at a given 1-based page.
struct FakeRasterizer {
    pages: usize,
    fail_at: Option<usize>,
}

#[async_trait]
impl DocumentRasterizer for FakeRasterizer {
    async fn page_count(&self, _document: &[u8]) -> Result<usize, ForgeError> {
        Ok(self.pages)
    }

    async fn render_page(
        &self,
        _document: &[u8],
        page_index: usize,
        _scale: f32,
    ) -> Result<RenderedPage, ForgeError> {
        if Some(page_index + 1) == self.fail_at {
            return Err(ForgeError::ExecutorFailed {
                executor: "rasterize-page".into(),
                detail: "corrupt object stream".into(),
            });
        }
        Ok(RenderedPage {
            width: 4,
            height: 4,
            rgba: vec![255; 4 * 4 * 4],
        })
    }
}

struct FakeWriter;

struct FakeBuilder {
    images: usize,
}

impl DocumentWriter for FakeWriter {
    fn new_document(&self, _w: f32, _h: f32) -> Box<dyn DocumentBuilder> {
        Box::new(FakeBuilder { images: 0 })
    }
}

impl DocumentBuilder for FakeBuilder {
    fn add_image(
        &mut self,
        _jpeg: &[u8],
        _x: f32,
        _y: f32,
        _w: f32,
        _h: f32,
    ) -> Result<(), ForgeError> {
        self.images += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ForgeError> {
        Ok(format!("%PDF-fake with {} images", self.images).into_bytes())
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────

fn fakes(log: Arc<CallLog>) -> Collaborators {
    Collaborators {
        engine: Arc::new(FakeEngine::ok(log.clone())),
        decoder: Some(Arc::new(FakeDecoder { log, fail: false })),
        rasterizer: Arc::new(FakeRasterizer {
            pages: 3,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    }
}

fn dispatcher(collaborators: Collaborators) -> ConversionDispatcher {
    ConversionDispatcher::new(collaborators, ForgeConfig::default())
}

fn png_file(width: u32, height: u32) -> InputFile {
    let img = RgbaImage::from_pixel(width, height, Rgba([30, 60, 200, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    InputFile::new(buf, "image/png", "input.png")
}

// ── Catalog targets ──────────────────────────────────────────────────────

#[tokio::test]
async fn results_carry_the_catalog_target_type() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));
    let sink = MemorySink::new();

    let results = d
        .run(&png_file(8, 8), "PNG to JPG", &sink)
        .await
        .expect("recompress should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].media_type, "image/jpeg");
    assert!(results[0].filename.ends_with(".jpg"));
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn mp4_transcodes_through_the_engine() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log.clone()));
    let sink = MemorySink::new();

    let file = InputFile::new(b"mp4-bytes".to_vec(), "video/mp4", "clip.mp4");
    let results = d.run(&file, "Video to GIF", &sink).await.unwrap();

    assert_eq!(results[0].media_type, "image/gif");
    assert_eq!(
        log.calls(),
        vec!["engine.initialize", "engine.transcode:gif"]
    );
}

#[tokio::test]
async fn engine_initialises_once_across_jobs() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log.clone()));
    let file = InputFile::new(b"mp4".to_vec(), "video/mp4", "clip.mp4");

    d.run(&file, "Video to GIF", &MemorySink::new()).await.unwrap();
    d.run(&file, "Video to GIF", &MemorySink::new()).await.unwrap();

    let inits = log.calls().iter().filter(|c| *c == "engine.initialize").count();
    assert_eq!(inits, 1);
}

// ── HEIC fallback chain ──────────────────────────────────────────────────

#[tokio::test]
async fn heic_uses_lightweight_decoder_first() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log.clone()));
    let file = InputFile::new(b"heic".to_vec(), "image/heic", "photo.heic");

    let results = d.run(&file, "HEIC to PNG", &MemorySink::new()).await.unwrap();

    assert_eq!(results[0].media_type, "image/png");
    assert_eq!(log.calls(), vec!["decoder.decode:image/png"]);
}

#[tokio::test]
async fn heic_decode_failure_falls_back_to_engine_in_order() {
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine::ok(log.clone())),
        decoder: Some(Arc::new(FakeDecoder {
            log: log.clone(),
            fail: true,
        })),
        rasterizer: Arc::new(FakeRasterizer {
            pages: 0,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators);
    let file = InputFile::new(b"heic".to_vec(), "", "IMG_0042.HEIC");

    let results = d.run(&file, "HEIC to PNG", &MemorySink::new()).await.unwrap();

    assert_eq!(results[0].media_type, "image/png");
    assert_eq!(
        log.calls(),
        vec![
            "decoder.decode:image/png",
            "engine.initialize",
            "engine.transcode:png"
        ]
    );
}

#[tokio::test]
async fn heic_without_decoder_still_converts_via_engine() {
    let log = Arc::new(CallLog::default());
    let mut collaborators = fakes(log.clone());
    collaborators.decoder = None;
    let d = dispatcher(collaborators);
    let file = InputFile::new(b"heic".to_vec(), "image/heic", "photo.heic");

    let results = d.run(&file, "HEIC to PNG", &MemorySink::new()).await.unwrap();
    assert_eq!(results[0].bytes, b"engine-output");
}

#[tokio::test]
async fn exhausted_chain_surfaces_last_failure_verbatim() {
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine {
            log: log.clone(),
            init_ok: false,
            transcode_delay: Duration::ZERO,
            output: vec![],
        }),
        decoder: Some(Arc::new(FakeDecoder {
            log: log.clone(),
            fail: true,
        })),
        rasterizer: Arc::new(FakeRasterizer {
            pages: 0,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators);
    let file = InputFile::new(b"heic".to_vec(), "image/heic", "photo.heic");

    let err = d
        .run(&file, "HEIC to PNG", &MemorySink::new())
        .await
        .unwrap_err();

    // Last attempt was the engine; its init failure is the surfaced message.
    assert!(matches!(err, ForgeError::EngineInit { .. }), "got {err}");
}

// ── Single-flight ────────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_is_rejected_while_first_is_running() {
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine {
            log: log.clone(),
            init_ok: true,
            transcode_delay: Duration::from_millis(200),
            output: b"gif".to_vec(),
        }),
        decoder: None,
        rasterizer: Arc::new(FakeRasterizer {
            pages: 0,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = Arc::new(dispatcher(collaborators));
    let file = InputFile::new(b"mp4".to_vec(), "video/mp4", "clip.mp4");

    let slow = {
        let d = Arc::clone(&d);
        let file = file.clone();
        tokio::spawn(async move { d.run(&file, "Video to GIF", &MemorySink::new()).await })
    };
    // Let the first job take the slot.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let before = log.calls().len();
    let err = d
        .run(&file, "Video to GIF", &MemorySink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::JobInProgress));
    // The rejection happened before any executor ran for the second job.
    assert_eq!(log.calls().len(), before);

    slow.await.unwrap().unwrap();

    // Slot is free again once the first job resolves.
    d.run(&file, "Video to GIF", &MemorySink::new()).await.unwrap();
}

// ── Multi-page delivery ──────────────────────────────────────────────────

#[tokio::test]
async fn pdf_yields_one_numbered_result_per_page_in_order() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));
    let sink = MemorySink::new();
    let file = InputFile::new(b"%PDF".to_vec(), "application/pdf", "report.pdf");

    let results = d.run(&file, "PDF to PNGs", &sink).await.unwrap();

    assert_eq!(results.len(), 3);
    let pages: Vec<_> = sink.results().iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
    let names: Vec<_> = sink.results().iter().map(|r| r.filename.clone()).collect();
    assert_eq!(names, vec!["page-1.png", "page-2.png", "page-3.png"]);
}

#[tokio::test]
async fn page_failure_aborts_after_delivering_earlier_pages() {
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine::ok(Arc::new(CallLog::default()))),
        decoder: None,
        rasterizer: Arc::new(FakeRasterizer {
            pages: 5,
            fail_at: Some(3),
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators);
    let sink = MemorySink::new();
    let file = InputFile::new(b"%PDF".to_vec(), "application/pdf", "report.pdf");

    let err = d.run(&file, "PDF to JPGs", &sink).await.unwrap_err();

    assert!(matches!(err, ForgeError::PageRender { page: 3, .. }), "got {err}");
    assert_eq!(sink.len(), 2);
    let pages: Vec<_> = sink.results().iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn streaming_emits_pages_then_terminal_error() {
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine::ok(Arc::new(CallLog::default()))),
        decoder: None,
        rasterizer: Arc::new(FakeRasterizer {
            pages: 4,
            fail_at: Some(3),
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = Arc::new(dispatcher(collaborators));
    let file = InputFile::new(b"%PDF".to_vec(), "application/pdf", "report.pdf");

    let mut stream = d.run_stream(file, "PDF to PNGs");
    let mut pages = Vec::new();
    let mut terminal: Option<ForgeError> = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(r) => pages.push(r.page),
            Err(e) => {
                terminal = Some(e);
                break;
            }
        }
    }

    assert_eq!(pages, vec![Some(1), Some(2)]);
    assert!(matches!(terminal, Some(ForgeError::PageRender { page: 3, .. })));
}

// ── Image round-trips and embedding ──────────────────────────────────────

#[tokio::test]
async fn png_jpeg_png_round_trip_preserves_geometry() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));

    let sink = MemorySink::new();
    d.run(&png_file(31, 17), "PNG to JPG", &sink).await.unwrap();
    let jpeg = sink.results()[0].clone();

    let jpeg_file = InputFile::new(jpeg.bytes, "image/jpeg", "converted.jpg");
    let sink2 = MemorySink::new();
    d.run(&jpeg_file, "JPG to PNG", &sink2).await.unwrap();

    let final_png = image::load_from_memory(&sink2.results()[0].bytes).unwrap();
    assert_eq!((final_png.width(), final_png.height()), (31, 17));
}

#[tokio::test]
async fn image_embeds_into_a_document() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));
    let sink = MemorySink::new();

    let results = d.run(&png_file(200, 100), "Image to PDF", &sink).await.unwrap();

    assert_eq!(results[0].media_type, "application/pdf");
    assert!(results[0].bytes.starts_with(b"%PDF-fake"));
}

// ── Preconditions and classification ─────────────────────────────────────

#[tokio::test]
async fn mismatched_operation_is_a_precondition_violation() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));

    let err = d
        .run(&png_file(4, 4), "Video to GIF", &MemorySink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::PreconditionViolation { .. }));
}

#[tokio::test]
async fn unknown_label_is_rejected() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));

    let err = d
        .run(&png_file(4, 4), "DOCX to PDF", &MemorySink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::UnknownOperation { .. }));
}

#[tokio::test]
async fn unsupported_file_classifies_to_empty_set() {
    let log = Arc::new(CallLog::default());
    let d = dispatcher(fakes(log));

    let file = InputFile::new(vec![], "application/zip", "archive.zip");
    assert!(d.classify(&file).is_empty());
}

// ── Engine degradation ───────────────────────────────────────────────────

#[tokio::test]
async fn failed_prewarm_leaves_image_paths_usable() {
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine {
            log: log.clone(),
            init_ok: false,
            transcode_delay: Duration::ZERO,
            output: vec![],
        }),
        decoder: None,
        rasterizer: Arc::new(FakeRasterizer {
            pages: 1,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators);

    d.prewarm_engine().await;

    // Image recompression never touches the engine.
    let results = d
        .run(&png_file(6, 6), "PNG to JPG", &MemorySink::new())
        .await
        .unwrap();
    assert_eq!(results[0].media_type, "image/jpeg");
}

// ── Status observation ───────────────────────────────────────────────────

struct CountingObserver {
    starts: AtomicUsize,
    artifacts: AtomicUsize,
    completes: AtomicUsize,
    errors: AtomicUsize,
    statuses: Mutex<Vec<String>>,
}

impl CountingObserver {
    fn new() -> Self {
        Self {
            starts: AtomicUsize::new(0),
            artifacts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            statuses: Mutex::new(Vec::new()),
        }
    }
}

impl StatusObserver for CountingObserver {
    fn on_job_start(&self, _label: &str) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }
    fn on_artifact(&self, _seq: usize, _filename: &str) {
        self.artifacts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_job_complete(&self, _artifacts: usize) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_job_error(&self, _message: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn observer_sees_fallback_and_completion() {
    let observer = Arc::new(CountingObserver::new());
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine::ok(log.clone())),
        decoder: Some(Arc::new(FakeDecoder {
            log: log.clone(),
            fail: true,
        })),
        rasterizer: Arc::new(FakeRasterizer {
            pages: 0,
            fail_at: None,
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators).with_observer(observer.clone());
    let file = InputFile::new(b"heic".to_vec(), "image/heic", "photo.heic");

    d.run(&file, "HEIC to PNG", &MemorySink::new()).await.unwrap();

    assert_eq!(observer.starts.load(Ordering::SeqCst), 1);
    assert_eq!(observer.artifacts.load(Ordering::SeqCst), 1);
    assert_eq!(observer.completes.load(Ordering::SeqCst), 1);
    assert_eq!(observer.errors.load(Ordering::SeqCst), 0);
    let statuses = observer.statuses.lock().unwrap().clone();
    assert!(
        statuses.iter().any(|s| s.contains("fallback")),
        "no fallback status in {statuses:?}"
    );
}

#[tokio::test]
async fn observer_sees_terminal_failure_message() {
    let observer = Arc::new(CountingObserver::new());
    let log = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        engine: Arc::new(FakeEngine::ok(log)),
        decoder: None,
        rasterizer: Arc::new(FakeRasterizer {
            pages: 2,
            fail_at: Some(1),
        }),
        writer: Arc::new(FakeWriter),
    };
    let d = dispatcher(collaborators).with_observer(observer.clone());
    let file = InputFile::new(b"%PDF".to_vec(), "application/pdf", "broken.pdf");

    let _ = d.run(&file, "PDF to PNGs", &MemorySink::new()).await;

    assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
    assert_eq!(observer.completes.load(Ordering::SeqCst), 0);
    let statuses = observer.statuses.lock().unwrap().clone();
    assert!(statuses.iter().any(|s| s.starts_with("failed:")));
}

//! Pipeline and batch integration tests with a synthetic page source.
//!
//! No pdfium is needed: "PDFs" here are small files with a `%PDF` header and
//! a `pages=N` marker, rendered by [`SquarePages`] into white 100×140 pages
//! with a centred 20×20 dark square.

use edgequake_longshot::{
    convert, convert_to_file, run_batch, Alignment, BatchConfig, BatchPhase, CancellationToken,
    ConversionConfig, ConversionProgressCallback, ConversionResult, ErrorKind, LongshotError,
    PageSource, RasterPage,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const INK: Rgb<u8> = Rgb([20, 20, 20]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct SquarePages {
    renders: AtomicUsize,
}

impl SquarePages {
    fn pages_in(path: &Path) -> Result<usize, LongshotError> {
        let text = fs::read_to_string(path).map_err(|_| LongshotError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        text.split_whitespace()
            .find_map(|tok| tok.strip_prefix("pages="))
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| LongshotError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "no page tree".into(),
            })
    }

    fn page() -> RasterPage {
        let mut img = RgbImage::from_pixel(100, 140, WHITE);
        for y in 60..80 {
            for x in 40..60 {
                img.put_pixel(x, y, INK);
            }
        }
        RasterPage::new(DynamicImage::ImageRgb8(img), 72)
    }
}

impl PageSource for SquarePages {
    fn page_count(&self, pdf_path: &Path) -> Result<usize, LongshotError> {
        Self::pages_in(pdf_path)
    }

    fn render_pages(
        &self,
        pdf_path: &Path,
        _dpi: u32,
        on_page: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<RasterPage>, LongshotError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let total = Self::pages_in(pdf_path)?;
        Ok((1..=total)
            .map(|n| {
                on_page(n, total);
                Self::page()
            })
            .collect())
    }
}

fn write_pdf(root: &Path, rel: &str, pages: usize) -> PathBuf {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(&p, format!("%PDF-1.7 synthetic pages={pages}\n")).unwrap();
    p
}

fn config_with(source: Arc<SquarePages>) -> edgequake_longshot::ConversionConfigBuilder {
    ConversionConfig::builder().page_source(source)
}

#[derive(Default)]
struct Recorder {
    phases: Mutex<Vec<BatchPhase>>,
    file_starts: AtomicUsize,
    completed: Mutex<Vec<PathBuf>>,
    pages_rendered: AtomicUsize,
    cancel_after_first: Option<CancellationToken>,
}

impl ConversionProgressCallback for Recorder {
    fn on_page_rendered(&self, _page_num: usize, _total_pages: usize) {
        self.pages_rendered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_phase(&self, phase: BatchPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_file_start(&self, _index: usize, _total: usize, _input: &Path) {
        self.file_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_file_complete(&self, _index: usize, _total: usize, result: &ConversionResult) {
        self.completed.lock().unwrap().push(result.input().to_path_buf());
        if let Some(ref token) = self.cancel_after_first {
            token.cancel();
        }
    }
}

// ── Single document ──────────────────────────────────────────────────────────

#[tokio::test]
async fn three_square_pages_stitch_to_40_by_130() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 3);
    let config = config_with(Arc::default())
        .crop_margin(10)
        .tolerance(5)
        .spacing(5)
        .build()
        .unwrap();

    let out = convert(&pdf, &config).await.unwrap();
    assert_eq!((out.width(), out.height()), (40, 130));

    // Square occupies 10..30 in each 40-px slot; slots start at 0, 45, 90.
    for slot_top in [0u32, 45, 90] {
        assert_eq!(*out.image.get_pixel(20, slot_top + 20), INK);
        assert_eq!(*out.image.get_pixel(5, slot_top + 5), WHITE);
    }
    // Spacing rows are background.
    assert_eq!(*out.image.get_pixel(20, 42), WHITE);
}

#[tokio::test]
async fn centered_mode_keeps_full_page_width() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 2);
    let config = config_with(Arc::default())
        .alignment(Alignment::Centered)
        .background(Rgb([0, 0, 255]))
        .build()
        .unwrap();

    let out = convert(&pdf, &config).await.unwrap();
    assert_eq!((out.width(), out.height()), (100, 80));
    // Cropped 40-px pages sit at x = 30; the side bands are canvas background.
    assert_eq!(*out.image.get_pixel(10, 20), Rgb([0, 0, 255]));
    assert_eq!(*out.image.get_pixel(50, 20), INK);
}

#[tokio::test]
async fn no_crop_stacks_whole_pages() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 2);
    let config = config_with(Arc::default()).crop(false).build().unwrap();

    let out = convert(&pdf, &config).await.unwrap();
    assert_eq!((out.width(), out.height()), (100, 280));
}

#[tokio::test]
async fn png_on_disk_matches_canvas() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 3);
    let out_path = dir.path().join("out/doc_long_screenshot.png");
    let config = config_with(Arc::default()).spacing(5).build().unwrap();

    let stats = convert_to_file(&pdf, &out_path, &config).await.unwrap();
    let decoded = image::open(&out_path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 130));
    assert_eq!(stats.page_count, 3);
    assert_eq!(stats.output_bytes, fs::metadata(&out_path).unwrap().len());
}

#[tokio::test]
async fn zero_page_document_is_a_composition_error() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 0);
    let config = config_with(Arc::default()).build().unwrap();

    let err = convert(&pdf, &config).await.unwrap_err();
    assert!(matches!(err, LongshotError::EmptyDocument));
    assert_eq!(err.kind(), ErrorKind::Composition);
}

#[tokio::test]
async fn page_events_are_reported() {
    let dir = TempDir::new().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf", 4);
    let recorder = Arc::new(Recorder::default());
    let config = config_with(Arc::default())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert(&pdf, &config).await.unwrap();
    assert_eq!(recorder.pages_rendered.load(Ordering::SeqCst), 4);
}

// ── Batch ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_isolates_a_bad_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    let output = dir.path().join("images");
    write_pdf(&input, "a.pdf", 1);
    write_pdf(&input, "b.pdf", 2);
    write_pdf(&input, "sub/c.pdf", 3);
    fs::write(input.join("broken.pdf"), b"").unwrap();

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .build()
        .unwrap();
    let config = config_with(Arc::default()).build().unwrap();

    let report = run_batch(&batch, &config).await.unwrap();
    assert_eq!(report.discovered, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.exit_code(), 2);

    let failure = report.failures().next().unwrap();
    assert!(failure.input().ends_with("broken.pdf"));
    assert!(matches!(
        failure,
        ConversionResult::Failed {
            kind: ErrorKind::Validation,
            ..
        }
    ));

    assert!(output.join("a.png").is_file());
    assert!(output.join("b.png").is_file());
    assert!(output.join("sub/c.png").is_file());
    assert!(!output.join("broken.png").exists());
}

#[tokio::test]
async fn unparsable_document_fails_without_stopping_the_batch() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("a.pdf"), b"%PDF-1.4 garbage").unwrap();
    write_pdf(&input, "z.pdf", 1);

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(dir.path().join("images"))
        .build()
        .unwrap();
    let report = run_batch(&batch, &config_with(Arc::default()).build().unwrap())
        .await
        .unwrap();

    assert_eq!((report.succeeded, report.failed), (1, 1));
    assert!(report.results[0].input().ends_with("a.pdf"));
}

#[tokio::test]
async fn skip_existing_second_run_converts_nothing() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    write_pdf(&input, "a.pdf", 1);
    write_pdf(&input, "b.pdf", 1);
    write_pdf(&input, "nested/c.pdf", 1);

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(dir.path().join("images"))
        .skip_existing(true)
        .build()
        .unwrap();

    let source = Arc::new(SquarePages::default());
    let config = config_with(Arc::clone(&source)).build().unwrap();

    let first = run_batch(&batch, &config).await.unwrap();
    assert_eq!(first.succeeded, 3);
    assert_eq!(source.renders.load(Ordering::SeqCst), 3);

    let recorder = Arc::new(Recorder::default());
    let config = config_with(Arc::clone(&source))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let second = run_batch(&batch, &config).await.unwrap();
    assert_eq!(source.renders.load(Ordering::SeqCst), 3, "no new conversions");
    assert_eq!(recorder.file_starts.load(Ordering::SeqCst), 0, "nothing entered Converting");
    assert_eq!(recorder.completed.lock().unwrap().len(), 3);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.succeeded, 0);
    assert!(second.no_work_performed());
    assert_eq!(second.exit_code(), 1);
}

#[tokio::test]
async fn inputs_sharing_an_output_are_not_both_reported_converted() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    let output = dir.path().join("images");
    write_pdf(&input, "a.pdf", 1);
    write_pdf(&input, "a.PDF", 3);
    if fs::read_dir(&input).unwrap().count() < 2 {
        println!("SKIP — case-insensitive filesystem");
        return;
    }

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .build()
        .unwrap();
    let source = Arc::new(SquarePages::default());
    let config = config_with(Arc::clone(&source)).build().unwrap();

    let report = run_batch(&batch, &config).await.unwrap();
    assert_eq!((report.discovered, report.succeeded, report.failed), (2, 1, 1));
    assert_eq!(report.exit_code(), 2);
    assert_eq!(source.renders.load(Ordering::SeqCst), 1, "the loser is never rendered");

    // "a.PDF" sorts first and owns images/a.png; its three pages are what is on disk.
    assert!(report.results[0].input().ends_with("a.PDF"));
    assert!(matches!(
        &report.results[1],
        ConversionResult::Failed { input, kind: ErrorKind::Validation, message }
            if input.ends_with("a.pdf") && message.contains("a.PDF")
    ));
    let decoded = image::open(output.join("a.png")).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 120));

    // The collision is not mistaken for an existing output on a resumed run.
    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .skip_existing(true)
        .build()
        .unwrap();
    let resumed = run_batch(&batch, &config).await.unwrap();
    assert_eq!((resumed.skipped, resumed.failed), (1, 1));
    assert_eq!(resumed.exit_code(), 2);
}

#[tokio::test]
async fn oversized_canvas_fails_only_its_own_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    let output = dir.path().join("images");
    write_pdf(&input, "big.pdf", 3);
    write_pdf(&input, "small.pdf", 1);

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(&output)
        .build()
        .unwrap();
    // small: 40×40 = 1600 px; big: 40×120 = 4800 px.
    let config = config_with(Arc::default())
        .max_canvas_pixels(2000)
        .build()
        .unwrap();

    let report = run_batch(&batch, &config).await.unwrap();
    assert_eq!((report.succeeded, report.failed), (1, 1));
    assert!(matches!(
        &report.results[0],
        ConversionResult::Failed { kind: ErrorKind::Composition, .. }
    ));
    assert!(!output.join("big.png").exists());
    assert!(output.join("small.png").is_file());
}

#[tokio::test]
async fn non_recursive_ignores_subdirectories() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    write_pdf(&input, "top.pdf", 1);
    write_pdf(&input, "sub/deep.pdf", 1);

    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(dir.path().join("images"))
        .recursive(false)
        .build()
        .unwrap();
    let report = run_batch(&batch, &config_with(Arc::default()).build().unwrap())
        .await
        .unwrap();
    assert_eq!(report.discovered, 1);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn empty_and_missing_input_directories() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("pdfs");
    fs::create_dir_all(&empty).unwrap();
    let config = config_with(Arc::default()).build().unwrap();

    let batch = BatchConfig::builder()
        .input_dir(&empty)
        .output_dir(dir.path().join("images"))
        .build()
        .unwrap();
    let report = run_batch(&batch, &config).await.unwrap();
    assert_eq!(report.discovered, 0);
    assert!(report.no_work_performed());
    assert_eq!(report.exit_code(), 1);

    let batch = BatchConfig::builder()
        .input_dir(dir.path().join("missing"))
        .build()
        .unwrap();
    let err = run_batch(&batch, &config).await.unwrap_err();
    assert!(matches!(err, LongshotError::InputDirNotFound { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn concurrent_batch_keeps_discovery_order() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    for (i, name) in ["e", "d", "c", "b", "a"].iter().enumerate() {
        write_pdf(&input, &format!("{name}.pdf"), i + 1);
    }

    let recorder = Arc::new(Recorder::default());
    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(dir.path().join("images"))
        .concurrency(3)
        .build()
        .unwrap();
    let config = config_with(Arc::default())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = run_batch(&batch, &config).await.unwrap();
    assert_eq!(report.succeeded, 5);

    let names: Vec<_> = report
        .results
        .iter()
        .map(|r| r.input().file_stem().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a", "b", "c", "d", "e"]);
    assert_eq!(recorder.completed.lock().unwrap().len(), 5);
    assert_eq!(
        *recorder.phases.lock().unwrap(),
        [
            BatchPhase::Scanning,
            BatchPhase::Processing,
            BatchPhase::Completed
        ]
    );
}

#[tokio::test]
async fn cancellation_stops_scheduling_and_keeps_finished_results() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("pdfs");
    write_pdf(&input, "a.pdf", 1);
    write_pdf(&input, "b.pdf", 1);
    write_pdf(&input, "c.pdf", 1);

    let token = CancellationToken::new();
    let recorder = Arc::new(Recorder {
        cancel_after_first: Some(token.clone()),
        ..Recorder::default()
    });
    let batch = BatchConfig::builder()
        .input_dir(&input)
        .output_dir(dir.path().join("images"))
        .build()
        .unwrap();
    let config = config_with(Arc::default())
        .progress_callback(recorder.clone())
        .cancellation_token(token)
        .build()
        .unwrap();

    let report = run_batch(&batch, &config).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(recorder.file_starts.load(Ordering::SeqCst), 1);
    assert_eq!(report.exit_code(), 130);
    assert!(!dir.path().join("images/b.png").exists());
}

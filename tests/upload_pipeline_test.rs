mod common;

use common::{flow, pdf, selection, FakeBackend, InstantSleeper};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

use transgrade_upload::models::{EnrichmentStage, JobStatus, PipelineVariant, SourceFile, INITIAL_STEP, TERMINAL_STEP};
use transgrade_upload::services::WarnWriter;
use transgrade_upload::workflow::UploadSession;
use transgrade_upload::{App, Config, SelectionContext, UploadOrchestrator};

fn orchestrator(backend: Arc<FakeBackend>, variant: PipelineVariant) -> UploadOrchestrator {
    let sleeper = Arc::new(InstantSleeper::default());
    UploadOrchestrator::new(Arc::new(flow(backend, sleeper)), variant)
}

#[tokio::test]
async fn three_page_pdf_runs_every_stage() {
    let backend = Arc::new(FakeBackend::with_pages(3));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete(), "error: {:?}", session.error);
    assert_eq!(session.step(), TERMINAL_STEP);
    assert_eq!(session.images.len(), 3);
    assert_eq!(session.ocr.as_ref().map(|o| o.total_pages), Some(3));
    assert_eq!(session.ocr.as_ref().unwrap().page_numbers(), vec![1, 2, 3]);
    assert_eq!(session.script_id.as_deref(), Some("script-1"));
    assert_eq!(session.saved_image_pages, vec![1, 2, 3]);
    assert_eq!(session.saved_ocr_pages, vec![1, 2, 3]);
    assert!(session.secondary.is_some());
    assert_eq!(session.enrichment.len(), 4);
    assert!(session.warnings.is_empty());
    assert!(session.error.is_none());

    // 各阶段严格按顺序执行
    let calls = backend.calls();
    let position = |call: &str| calls.iter().position(|c| c == call).unwrap();
    assert!(position("convert exam.pdf") < position("create_script"));
    assert!(position("create_script") < position("save_image 1"));
    assert!(position("save_image 3") < position("ocr 1"));
    assert!(position("ocr 3") < position("start_job deep_ocr script-1"));
    assert!(position("job_result deep_ocr") < position("save_ocr 1"));
    assert!(position("save_ocr 3") < position("enrich correct"));
    assert!(position("enrich analyze") < position("enrich validate"));
}

#[tokio::test]
async fn non_pdf_is_rejected_without_network_calls() {
    let backend = Arc::new(FakeBackend::with_pages(3));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let file = SourceFile::new("notes.txt", b"plain text".to_vec());
    let session = orchestrator.start(file, &selection()).await;

    assert!(session.has_error());
    assert!(session.error.as_deref().unwrap().contains("PDF"));
    assert_eq!(session.step(), INITIAL_STEP);
    assert!(session.images.is_empty());
    assert!(session.script_id.is_none());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn declared_content_type_wins_over_magic_bytes() {
    let backend = Arc::new(FakeBackend::with_pages(1));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let file = pdf("scan.pdf").with_content_type("image/png");
    let session = orchestrator.start(file, &selection()).await;

    assert!(session.has_error());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn missing_selection_fails_validation() {
    let backend = Arc::new(FakeBackend::with_pages(1));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let partial = SelectionContext {
        student_id: None,
        ..selection()
    };
    let session = orchestrator.start(pdf("exam.pdf"), &partial).await;

    assert!(session.error.as_deref().unwrap().contains("学生"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn conversion_failure_halts_at_first_step() {
    let backend = Arc::new(FakeBackend {
        pages: 3,
        fail_convert: true,
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert_eq!(session.step(), 1);
    assert!(session.error.as_deref().unwrap().contains("PDF 转图片失败"));
    assert!(session.script_id.is_none());
    assert_eq!(backend.count("create_script"), 0);
    assert_eq!(backend.calls(), vec!["convert exam.pdf".to_string()]);
}

#[tokio::test]
async fn empty_conversion_is_fatal() {
    let backend = Arc::new(FakeBackend::with_pages(0));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("blank.pdf"), &selection()).await;

    assert_eq!(session.step(), 1);
    assert!(session.has_error());
    assert_eq!(backend.count("create_script"), 0);
}

#[tokio::test]
async fn enrichment_failure_is_only_a_warning() {
    let backend = Arc::new(FakeBackend {
        pages: 2,
        fail_enrich: HashSet::from([EnrichmentStage::Analysis]),
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert!(session.error.is_none());
    assert!(!session.enrichment.contains_key(&EnrichmentStage::Analysis));
    assert!(session.enrichment.contains_key(&EnrichmentStage::Correction));
    // 后一步不受影响
    assert!(session.enrichment.contains_key(&EnrichmentStage::Validation));
    assert_eq!(session.warnings.len(), 1);
    assert_eq!(backend.count("enrich"), 4);
}

#[tokio::test]
async fn ocr_failure_halts_before_saving() {
    let backend = Arc::new(FakeBackend {
        pages: 3,
        fail_ocr_page: Some(2),
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert_eq!(session.step(), 5);
    assert!(session.error.as_deref().unwrap().contains("第 2 页"));
    assert!(session.ocr.is_none());
    // 不再请求第 3 页
    assert_eq!(backend.count("ocr"), 2);
    assert_eq!(backend.count("start_job"), 0);
    assert_eq!(backend.count("save_ocr"), 0);
}

#[tokio::test]
async fn image_save_failure_is_a_per_page_warning() {
    let backend = Arc::new(FakeBackend {
        pages: 3,
        fail_image_pages: HashSet::from([2]),
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert_eq!(session.saved_image_pages, vec![1, 3]);
    assert_eq!(session.warnings.len(), 1);
    assert!(session.warnings[0].contains("第 2 页"));
    assert_eq!(backend.count("ocr"), 3);
}

#[tokio::test]
async fn ocr_save_failure_is_fatal() {
    let backend = Arc::new(FakeBackend {
        pages: 2,
        fail_save_ocr: true,
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert_eq!(session.step(), 7);
    assert!(session.has_error());
    assert_eq!(backend.count("enrich"), 0);
}

#[tokio::test]
async fn existing_script_is_reused() {
    let backend = Arc::new(FakeBackend::with_pages(1).with_existing_script("script-77", "stu-42", "MATH-101"));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert_eq!(session.script_id.as_deref(), Some("script-77"));
    assert_eq!(backend.count("find_scripts"), 1);
}

#[tokio::test]
async fn secondary_job_polls_until_completed() {
    let backend = Arc::new(FakeBackend::with_pages(1).with_job_statuses(vec![
        JobStatus::Processing,
        JobStatus::Processing,
        JobStatus::Completed,
    ]));
    let sleeper = Arc::new(InstantSleeper::default());
    let orchestrator = UploadOrchestrator::new(
        Arc::new(flow(backend.clone(), sleeper.clone())),
        PipelineVariant::Math,
    );

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert_eq!(backend.count("start_job math_conversion"), 1);
    assert_eq!(backend.count("job_status"), 3);
    assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(5); 2]);
    assert_eq!(session.secondary.as_ref().unwrap()["job"], "math_conversion");

    // 结构化结果带上后台任务结果
    let saved = backend.saved_ocr.lock().unwrap();
    assert_eq!(saved[0].structured_json["secondary"]["job"], "math_conversion");
    assert_eq!(saved[0].context["variant"], "math");
}

#[tokio::test]
async fn secondary_job_timeout_continues_without_result() {
    let backend = Arc::new(FakeBackend::with_pages(1).with_job_statuses(vec![JobStatus::Processing; 60]));
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert!(session.secondary.is_none());
    assert_eq!(backend.count("job_status"), 60);
    assert_eq!(backend.count("job_result"), 0);
    assert!(session.warnings.iter().any(|w| w.contains("timeout")));
    assert_eq!(backend.count("save_ocr"), 1);
}

#[tokio::test]
async fn secondary_job_failure_continues_without_result() {
    let backend = Arc::new(
        FakeBackend::with_pages(1).with_job_statuses(vec![JobStatus::Failed(Some("textract error".to_string()))]),
    );
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Key);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete());
    assert!(session.secondary.is_none());
    assert!(session.warnings.iter().any(|w| w.contains("textract error")));
    assert_eq!(backend.count("start_job mcq_analysis"), 1);
}

#[tokio::test]
async fn secondary_job_start_failure_continues_without_polling() {
    let backend = Arc::new(FakeBackend {
        pages: 2,
        fail_start_job: true,
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend.clone(), PipelineVariant::Upload);

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;

    assert!(session.is_complete(), "error: {:?}", session.error);
    assert!(session.secondary.is_none());
    assert!(session.warnings.iter().any(|w| w.contains("deep_ocr")));
    assert_eq!(backend.count("start_job deep_ocr"), 1);
    assert_eq!(backend.count("job_status"), 0);
    assert_eq!(backend.count("job_result"), 0);
    assert_eq!(backend.count("save_ocr"), 2);
    assert_eq!(backend.count("enrich"), 4);
}

#[tokio::test]
async fn progress_is_published_in_order() {
    let backend = Arc::new(FakeBackend::with_pages(2));
    let orchestrator = orchestrator(backend, PipelineVariant::Upload);
    let mut rx = orchestrator.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let step = rx.borrow_and_update().step();
            seen.push(step);
            if step == TERMINAL_STEP {
                break;
            }
        }
        seen
    });

    let session = orchestrator.start(pdf("exam.pdf"), &selection()).await;
    assert!(session.is_complete());

    let seen = assert_ok!(observer.await);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "steps went backwards: {:?}", seen);
    assert_eq!(seen.last(), Some(&TERMINAL_STEP));
    assert_eq!(orchestrator.current().step(), TERMINAL_STEP);
}

#[tokio::test]
async fn restart_discards_previous_results_and_reset_clears() {
    let backend = Arc::new(FakeBackend {
        pages: 1,
        fail_convert: true,
        ..FakeBackend::default()
    });
    let orchestrator = orchestrator(backend, PipelineVariant::Upload);

    let failed = orchestrator.start(pdf("first.pdf"), &selection()).await;
    assert!(failed.has_error());

    orchestrator.reset();
    let current: UploadSession = orchestrator.current();
    assert_eq!(current.step(), INITIAL_STEP);
    assert!(current.error.is_none());
    assert!(current.source().is_none());

    let backend = Arc::new(FakeBackend::with_pages(1));
    let orchestrator = self::orchestrator(backend, PipelineVariant::Upload);
    let first = orchestrator.start(pdf("first.pdf"), &selection()).await;
    let second = orchestrator.start(pdf("second.pdf"), &selection()).await;
    assert!(first.is_complete());
    assert_eq!(second.file_name(), Some("second.pdf"));
    assert_eq!(second.images.len(), 1);
}

#[tokio::test]
async fn batch_run_writes_reports_and_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let reports = dir.path().join("reports");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("a.pdf"), b"%PDF-1.7\nA").unwrap();
    std::fs::write(input.join("b.pdf"), b"%PDF-1.7\nB").unwrap();
    std::fs::write(input.join("notes.txt"), b"not a pdf").unwrap();

    let config = Config {
        input_folder: input.display().to_string(),
        report_folder: reports.display().to_string(),
        output_log_file: dir.path().join("output.txt").display().to_string(),
        max_concurrent_uploads: 2,
        ..Config::default()
    };
    let backend = Arc::new(FakeBackend {
        pages: 1,
        fail_enrich: HashSet::from([EnrichmentStage::Restructure]),
        ..FakeBackend::default()
    });
    let warn_path = dir.path().join("warn.txt");

    let app = App::with_backend(config, selection(), backend)
        .with_warn_writer(WarnWriter::with_path(&warn_path));
    let stats = assert_ok!(app.run().await);

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.with_warnings, 2);
    assert_eq!(stats.failed, 1);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(reports.join("a.json")).unwrap()).unwrap();
    assert_eq!(report["complete"], true);
    assert_eq!(report["step"], TERMINAL_STEP);

    let rejected: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(reports.join("notes.json")).unwrap()).unwrap();
    assert_eq!(rejected["complete"], false);

    let warnings = std::fs::read_to_string(&warn_path).unwrap();
    assert_eq!(warnings.lines().count(), 2);
}

#[tokio::test]
async fn cancelling_stops_a_batch_with_hanging_requests() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        std::fs::write(input.join(name), b"%PDF-1.7\nX").unwrap();
    }

    let config = Config {
        input_folder: input.display().to_string(),
        report_folder: dir.path().join("reports").display().to_string(),
        max_concurrent_uploads: 2,
        ..Config::default()
    };
    let backend = Arc::new(FakeBackend {
        pages: 1,
        hang_convert: true,
        ..FakeBackend::default()
    });

    let app = App::with_backend(config, selection(), backend.clone())
        .with_warn_writer(WarnWriter::with_path(dir.path().join("warn.txt")));
    let cancel = app.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(5), app.run())
        .await
        .expect("run did not stop after cancellation");
    let stats = assert_ok!(stats);

    assert!(stats.cancelled);
    assert_eq!(stats.success, 0);
    assert_eq!(stats.failed, 2);
    // 第二批没有开始
    assert_eq!(backend.count("convert c.pdf"), 0);
}

//! Batch-export every enabled clip.

use std::io::Write;
use std::sync::atomic::Ordering;

use hunyclip_common::config::AppConfig;
use hunyclip_export_engine::{plan, BatchReport, ExportPlan, ExportToggles, TranscodeEngine, TranscodeProgress};

/// Toggles from the command line, with config defaults for the rest.
pub fn toggles(
    config: &AppConfig,
    cropped: bool,
    uncropped: bool,
    image: bool,
    prefix: Option<String>,
    caption: Option<String>,
) -> ExportToggles {
    let mut toggles = ExportToggles::new(cropped, uncropped, image);
    if config.export.still_extension.eq_ignore_ascii_case("png") {
        toggles.still_extension = config.export.still_extension.clone();
    } else {
        tracing::warn!(
            extension = %config.export.still_extension,
            "Stills are encoded as PNG; using .png"
        );
    }
    if let Some(prefix) = prefix {
        toggles = toggles.with_prefix(prefix);
    }
    match caption.as_deref().or(config.caption()) {
        Some(caption) => toggles.with_caption(caption),
        None => toggles,
    }
}

/// Warnings shown before an export about outputs that will not be written.
pub fn advisories(toggles: &ExportToggles) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !toggles.uncropped {
        warnings.push("Uncropped clips will not be exported.");
    }
    if !toggles.cropped {
        warnings.push("Cropped clips will not be exported.");
    }
    warnings
}

pub async fn run(config: &AppConfig, toggles: ExportToggles, dry_run: bool) -> anyhow::Result<()> {
    if !toggles.cropped && !toggles.uncropped && !toggles.image {
        anyhow::bail!("Nothing to export: pass --cropped, --uncropped and/or --image");
    }
    for warning in advisories(&toggles) {
        println!("Warning: {warning}");
    }

    let registry = super::load_open_registry(config)?;
    let source = super::frame_source(config);
    let plan = plan(&registry, &toggles, &source);
    print_plan(&plan);

    if dry_run || plan.jobs.is_empty() {
        return Ok(());
    }

    let backend = super::ffmpeg_backend(config);
    let progress: Box<dyn Fn(TranscodeProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames)  ",
            p.progress * 100.0,
            p.frames_written,
            p.total_frames,
        );
        let _ = std::io::stdout().flush();
    });
    let mut engine =
        TranscodeEngine::new(Box::new(backend), Box::new(source)).with_progress(progress);

    println!("\nExporting with {}...", engine.backend_name());

    let abort = engine.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nInterrupted: stopping after the current job");
            abort.store(true, Ordering::SeqCst);
        }
    });

    let result = tokio::task::spawn_blocking(move || engine.run(&plan)).await?;
    interrupt.abort();

    let report = result.map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;
    print_report(&report);
    Ok(())
}

fn print_plan(plan: &ExportPlan) {
    println!("Planned {} job(s):", plan.jobs.len());
    for job in &plan.jobs {
        println!("  {:<16} {} -> {}", job.kind, job.display_name, job.output_path.display());
    }
    for skipped in &plan.skipped {
        println!("  [SKIP] {skipped}");
    }
}

fn print_report(report: &BatchReport) {
    println!();
    for (outcome, path) in report.succeeded() {
        println!("[OK]   {} -> {}", outcome.display_name, path.display());
    }
    for (_, err) in report.skipped() {
        println!("[SKIP] {err}");
    }
    for (_, err) in report.failed() {
        println!("[FAIL] {err}");
    }

    println!(
        "\n{} written, {} skipped, {} failed",
        report.succeeded().count(),
        report.skipped().count(),
        report.failed().count()
    );
    if report.aborted {
        println!("Export aborted; {} job(s) not started.", report.pending);
    }
}

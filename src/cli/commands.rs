use std::sync::Arc;

use crate::background::handle::BackgroundHandle;
use crate::background::service::BackgroundService;
use crate::cli::config::{AppConfig, build_background_config, resolve_store_path};
use crate::export::export_model::{ExportReport, ImportPayload};
use crate::journey::journey_model::JourneyScript;
use crate::journey::runner::JourneyRunner;
use crate::navigation::channel::{InMemoryChannel, TabId};
use crate::store::store::JsonFileStore;
use crate::trace::journal::CaptureJournal;

/// Tab the CLI plays its journeys in.
const REPLAY_TAB: TabId = TabId(1);

// ============================================================================
// Service startup
// ============================================================================

/// Start a background service over the file-backed store. An explicit
/// `platform` becomes the active platform key.
pub async fn start_service(
    config: &AppConfig,
    store: Option<&str>,
    platform: Option<&str>,
    channel: InMemoryChannel,
) -> Result<BackgroundHandle, Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(resolve_store_path(config, store));
    let journal = match &config.capture.journal {
        Some(path) => CaptureJournal::new(path),
        None => CaptureJournal::disabled(),
    };

    let handle = BackgroundService::spawn(
        store,
        Arc::new(channel),
        journal,
        build_background_config(config, platform),
    );

    if let Some(platform) = platform {
        handle.set_platform(platform).await?;
    }
    Ok(handle)
}

// ============================================================================
// replay subcommand
// ============================================================================

/// Replay a journey script and return whether it passed with a valid export.
pub async fn cmd_replay(
    handle: &BackgroundHandle,
    channel: InMemoryChannel,
    script_path: &str,
    output: Option<&str>,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let script = JourneyScript::from_file(script_path)?;

    if verbose > 0 {
        eprintln!("Replaying '{}' ({} steps)...", script.name, script.steps.len());
    }

    let mut runner = JourneyRunner::new(handle.clone(), channel, REPLAY_TAB);
    let result = runner.run(&script).await;

    println!(
        "{}: {} ({} of {} steps)",
        result.name,
        if result.passed { "passed" } else { "FAILED" },
        result.steps_run,
        script.steps.len()
    );
    if let Some(error) = &result.error {
        println!("  error: {}", error);
    }

    let valid = match &result.export {
        Some(report) => {
            print_summary(report);
            if let Some(path) = output {
                std::fs::write(path, serde_json::to_string_pretty(&report.file)?)?;
                if verbose > 0 {
                    eprintln!("  Wrote: {}", path);
                }
            }
            report.valid
        }
        None => false,
    };

    Ok(result.passed && valid)
}

// ============================================================================
// export subcommand
// ============================================================================

/// Export the active platform and return whether the export is valid.
pub async fn cmd_export(
    handle: &BackgroundHandle,
    output: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let report = handle.export().await?;
    let json = serde_json::to_string_pretty(&report.file)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            print_summary(&report);
        }
        None => println!("{}", json),
    }

    for violation in &report.violations {
        eprintln!("  invalid: {}: {}", violation.path, violation.message);
    }
    Ok(report.valid)
}

// ============================================================================
// import / reset / status subcommands
// ============================================================================

pub async fn cmd_import(handle: &BackgroundHandle, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(input)?;
    let payload: ImportPayload = serde_json::from_str(&content)?;
    let registries = payload.into_registries();
    let platforms = registries.len();

    handle.import_registries(registries).await?;
    println!("Imported registries for {} platform(s)", platforms);
    Ok(())
}

pub async fn cmd_reset(handle: &BackgroundHandle, session: bool) -> Result<(), Box<dyn std::error::Error>> {
    let platform = handle.session().await?.platform;

    handle.reset_registry(None).await?;
    if session {
        handle.reset_session(None).await?;
        println!("Reset registry and capture session for '{}'", platform);
    } else {
        println!("Reset registry for '{}'", platform);
    }
    Ok(())
}

pub async fn cmd_status(handle: &BackgroundHandle) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = handle.session().await?;
    let registries = handle.registries().await?;

    println!("platform:           {}", snapshot.platform);
    println!("state:              {:?}", snapshot.state);
    println!("capture mode:       {}", snapshot.session.capture_mode);
    println!("pending navigation: {}", snapshot.session.pending_navigation);
    println!(
        "last element:       {}",
        snapshot.session.last_element_id.as_deref().unwrap_or("-")
    );

    match registries.get(&snapshot.platform) {
        Some(registry) => println!(
            "registry:           {} pages, {} elements (next page {}, next element {})",
            registry.pages.len(),
            registry.elements.len(),
            registry.counters.page,
            registry.counters.element
        ),
        None => println!("registry:           empty"),
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn print_summary(report: &ExportReport) {
    println!(
        "Exported {} pages, {} elements for '{}' ({})",
        report.file.pages.len(),
        report.file.elements.len(),
        report.file.platform,
        if report.valid {
            "valid".to_string()
        } else {
            format!("{} violations", report.violations.len())
        }
    );
}

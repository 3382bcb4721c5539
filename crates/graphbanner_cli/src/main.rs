//! Headless entry point for the graph banner core.
//!
//! # Responsibility
//! - Report the linked core version.
//! - Evaluate ignore rules from a settings file against note paths.
//! - Replay a scripted editing session against the in-memory host.

use graphbanner_core::{
    init_logging, BannerRuntime, BannerSettings, DeviceClass, EditModeBehavior, IgnoreRules,
    MemoryHost, NumericSetting, PlacementOutcome, ViewMode,
};
use std::process::ExitCode;

const USAGE: &str = "usage:
  graphbanner version
  graphbanner check-ignore <settings.json> <path>...
  graphbanner simulate [--log-dir <absolute-dir>]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("version") => {
            println!("graphbanner_core version={}", graphbanner_core::core_version());
            Ok(())
        }
        Some("check-ignore") => check_ignore(&args[1..]),
        Some("simulate") => simulate(&args[1..]),
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn check_ignore(args: &[String]) -> Result<(), String> {
    let (settings_path, paths) = args
        .split_first()
        .filter(|(_, paths)| !paths.is_empty())
        .ok_or_else(|| USAGE.to_string())?;

    let raw = std::fs::read_to_string(settings_path)
        .map_err(|err| format!("failed to read `{settings_path}`: {err}"))?;
    let settings: BannerSettings = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid settings in `{settings_path}`: {err}"))?;
    settings
        .validate()
        .map_err(|err| format!("invalid settings in `{settings_path}`: {err}"))?;

    let rules = IgnoreRules::compile(&settings.ignore_patterns);
    for path in paths {
        let verdict = if rules.is_ignored(path) {
            "ignored"
        } else {
            "shown"
        };
        println!("{verdict}\t{path}");
    }
    Ok(())
}

fn simulate(args: &[String]) -> Result<(), String> {
    match args {
        [] => {}
        [flag, dir] if flag == "--log-dir" => {
            init_logging(graphbanner_core::default_log_level(), dir)
                .map_err(|err| err.to_string())?;
        }
        _ => return Err(USAGE.to_string()),
    }

    let mut settings = BannerSettings::default();
    settings.capacity = 2;
    settings.ignore_patterns = vec!["Templates/*".to_string()];
    let mut runtime =
        BannerRuntime::new(MemoryHost::new(), settings).map_err(|err| err.to_string())?;
    let mut now_ms = 0;

    let alpha = runtime.host_mut().open_document("notes/alpha.md");
    report("open alpha", runtime.on_file_open());
    runtime.host_mut().show_document(alpha, "notes/beta.md");
    report("navigate to beta", runtime.on_file_open());

    for _ in 0..5 {
        now_ms += 50;
        runtime.on_layout_change(now_ms);
    }
    now_ms += runtime.settings().debounce_ms;
    report("layout burst settles", runtime.tick(now_ms));

    runtime.host_mut().open_document("Templates/daily.md");
    report("open ignored template", runtime.on_file_open());

    runtime.host_mut().show_document(alpha, "notes/alpha.md");
    if let Some(toggle) = runtime.toggle_current_note() {
        report(
            &format!("toggle alpha (disabled={})", toggle.disabled),
            Some(toggle.outcome),
        );
    }
    if let Some(toggle) = runtime.toggle_current_note() {
        report(
            &format!("toggle alpha (disabled={})", toggle.disabled),
            Some(toggle.outcome),
        );
    }

    report(
        "edit mode, hidden",
        runtime.set_edit_mode_behavior(EditModeBehavior::Hidden),
    );
    runtime.host_mut().set_mode(ViewMode::Edit);
    report("refresh in edit mode", runtime.on_file_open());
    runtime.host_mut().set_mode(ViewMode::Read);
    runtime.host_mut().set_device(DeviceClass::Mobile);
    report("same note on mobile", runtime.on_file_open());
    runtime.host_mut().set_device(DeviceClass::Desktop);

    match runtime.update_numeric_setting(NumericSetting::BannerHeightPx, "320", now_ms) {
        Ok(outcome) => report("banner height 320", outcome),
        Err(err) => println!("banner height rejected: {err}"),
    }
    if let Err(err) = runtime.update_numeric_setting(NumericSetting::Capacity, "lots", now_ms) {
        println!("capacity rejected: {err}");
    }

    let destroyed = runtime.shutdown();
    let host = runtime.host();
    println!(
        "summary created={} reinitializations={} inserts={} destroyed={} notices={}",
        host.created_count(),
        host.reinitializations().len(),
        host.insert_count(),
        destroyed,
        host.notices().len()
    );
    Ok(())
}

fn report(step: &str, outcome: Option<PlacementOutcome>) {
    match outcome {
        Some(outcome) => println!("{step}: {outcome:?}"),
        None => println!("{step}: no resolution"),
    }
}

//! `modinject` with no subcommand: activate, report, tear down.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use modinject_runtime::status::CLEARED;
use modinject_runtime::{extra_list_json, read_bundle_file, Injector, InjectorConfig};
use tracing::{debug, info, warn};

use crate::output::{StyledOutput, Tone};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Primary bundle, or @FILE to read it from a file
    #[arg(long, default_value = modinject_runtime::SELFTEST_TOKEN)]
    pub map: String,

    /// JSON array of extra bundles
    #[arg(long)]
    pub extra: Option<String>,

    /// File holding one extra bundle (repeatable)
    #[arg(long = "extra-file")]
    pub extra_files: Vec<PathBuf>,

    /// Snippet to run after the merge
    #[arg(long = "test")]
    pub snippet: Option<String>,

    /// Site directory the host imports from (repeatable)
    #[arg(long = "site")]
    pub site_paths: Vec<PathBuf>,

    /// Skip importing injected packages after the merge
    #[arg(long)]
    pub no_validate: bool,
}

pub fn execute(
    args: RunArgs,
    config: InjectorConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let status = activate_and_clear(args, config, |status| {
        out.toned(Tone::of_status(status), status)
    })?;
    debug!(status = %status, "run finished");
    Ok(())
}

/// Activate, hand the status to `report`, then finalize.
///
/// Returns the activation status.
pub fn activate_and_clear(
    args: RunArgs,
    mut config: InjectorConfig,
    report: impl FnOnce(&str),
) -> anyhow::Result<String> {
    let primary = bundle_arg(&args.map)?;
    let extra = extra_json(args.extra.as_deref(), &args.extra_files)?;

    config.host.site_paths.extend(args.site_paths);
    if args.no_validate {
        config.injector.validate = false;
    }
    config.validate()?;

    let mut injector = Injector::from_config(config);
    let status = injector.initialize_with_snippet(&primary, &extra, args.snippet.as_deref());
    report(&status);

    injector.finalize();
    let cleared = injector.current_status();
    if cleared == CLEARED || cleared.is_empty() {
        info!("{}", CLEARED);
    } else {
        warn!("{}", cleared);
    }
    Ok(status)
}

/// Bundle text from an argument; `@path` reads it from a file.
pub fn bundle_arg(arg: &str) -> anyhow::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => read_bundle_file(Path::new(path))
            .with_context(|| format!("reading bundle from {}", path)),
        None => Ok(arg.to_string()),
    }
}

/// The extra-bundle JSON list passed to activation.
///
/// Inline JSON is passed through untouched unless bundle files are given,
/// in which case both are merged into one list.
fn extra_json(inline: Option<&str>, files: &[PathBuf]) -> anyhow::Result<String> {
    if files.is_empty() {
        return Ok(inline.unwrap_or_default().to_string());
    }

    let mut bundles: Vec<String> = match inline.map(str::trim) {
        Some(text) if !text.is_empty() => serde_json::from_str(text)
            .context("--extra must be a JSON list of strings when combined with --extra-file")?,
        _ => Vec::new(),
    };
    for path in files {
        let bundle = read_bundle_file(path)
            .with_context(|| format!("reading extra bundle from {}", path.display()))?;
        bundles.push(bundle);
    }
    Ok(extra_list_json(&bundles))
}

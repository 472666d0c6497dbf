//! `modinject decode` — list what a bundle contains.

use modinject_runtime::{BundleDecoder, InjectorConfig, SourceMap};

use super::run::bundle_arg;
use crate::output::StyledOutput;

pub fn execute(
    bundle: &str,
    config: &InjectorConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let map = contents(bundle, config)?;
    for (path, source) in &map {
        out.line(path);
        out.dim(&format!("  {} bytes", source.len()));
    }
    out.dim(&format!("{} file(s)", map.len()));
    Ok(())
}

fn contents(bundle: &str, config: &InjectorConfig) -> anyhow::Result<SourceMap> {
    let decoder = BundleDecoder::new(config.injector.selftest_token.clone(), config.layout());
    Ok(decoder.decode(&bundle_arg(bundle)?)?)
}

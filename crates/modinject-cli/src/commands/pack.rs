//! `modinject pack` — encode a package as a bundle.

use std::path::Path;

use anyhow::Context;
use modinject_runtime::{collect_package, encode, InjectorConfig};
use tracing::info;

use crate::output::StyledOutput;

pub fn execute(
    path: &Path,
    output: Option<&Path>,
    config: &InjectorConfig,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let bundle = pack(path, config)?;
    match output {
        Some(target) => {
            std::fs::write(target, &bundle)
                .with_context(|| format!("writing bundle to {}", target.display()))?;
            info!(path = %target.display(), bytes = bundle.len(), "bundle written");
        }
        None => out.line(&bundle),
    }
    Ok(())
}

/// Collect `path` with the configured layout and encode it.
pub fn pack(path: &Path, config: &InjectorConfig) -> anyhow::Result<String> {
    let map = collect_package(path, &config.layout())?;
    if map.is_empty() {
        anyhow::bail!("no {} sources under {}", config.layout().suffix(), path.display());
    }
    info!(files = map.len(), "packed {}", path.display());
    Ok(encode(&map)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modinject_runtime::decode;
    use std::fs;

    #[test]
    fn test_pack_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("tools");
        fs::create_dir_all(pkg.join("sub")).unwrap();
        fs::write(pkg.join("__init__.py"), "X = 1\n").unwrap();
        fs::write(pkg.join("sub/__init__.py"), "").unwrap();
        fs::write(pkg.join("notes.txt"), "skip me").unwrap();

        let bundle = pack(&pkg, &InjectorConfig::default()).unwrap();
        let map = decode(&bundle).unwrap();
        let paths: Vec<_> = map.keys().cloned().collect();
        assert_eq!(paths, ["tools/__init__.py", "tools/sub/__init__.py"]);
    }

    #[test]
    fn test_pack_without_sources_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "# hi").unwrap();
        assert!(pack(dir.path(), &InjectorConfig::default()).is_err());
    }
}

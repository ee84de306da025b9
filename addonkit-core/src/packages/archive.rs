//! Picking a module file out of a package archive

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::PackageError;

/// Runtime identifier of the running platform, e.g. `linux-x64`
pub fn runtime_identifier() -> String {
    format!("{}-{}", os_identifier(), arch_identifier())
}

fn os_identifier() -> &'static str {
    match std::env::consts::OS {
        "macos" => "osx",
        "windows" => "win",
        other => other,
    }
}

fn arch_identifier() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "x86",
        "arm" => "arm",
        other => other,
    }
}

/// Archive folders probed for a module, most specific first
pub fn default_search_dirs() -> Vec<String> {
    let rid = runtime_identifier();
    vec![
        format!("runtimes/{rid}/native"),
        format!("runtimes/{}/native", os_identifier()),
        format!("lib/{rid}"),
        "lib/native".to_string(),
        "lib".to_string(),
    ]
}

/// Find `file_name` in the archive and return its bytes.
///
/// Each folder in `search_dirs` is tried in order; after that, any entry
/// under `lib/` or `runtimes/` whose name ends in `file_name`.
/// Matching ignores ASCII case and accepts `\` separators.
pub fn extract_module(
    archive: &[u8],
    package_id: &str,
    file_name: &str,
    search_dirs: &[String],
) -> Result<Vec<u8>, PackageError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let entries: Vec<(usize, String)> = (0..zip.len())
        .filter_map(|i| {
            let entry = zip.by_index(i).ok()?;
            (!entry.is_dir()).then(|| (i, entry.name().replace('\\', "/")))
        })
        .collect();

    let index = select_entry(&entries, file_name, search_dirs).ok_or_else(|| {
        PackageError::ModuleNotInArchive {
            package: package_id.to_string(),
            file: file_name.to_string(),
        }
    })?;

    let mut entry = zip.by_index(index)?;
    tracing::debug!(
        package = %package_id,
        entry = %entry.name(),
        "Extracting module from package"
    );
    let mut bytes = Vec::with_capacity(prealloc_hint(entry.size()));
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Upper bound on what an entry header can make us reserve up front
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// The declared size comes from the archive and is not trusted
fn prealloc_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn select_entry(
    entries: &[(usize, String)],
    file_name: &str,
    search_dirs: &[String],
) -> Option<usize> {
    for dir in search_dirs {
        let wanted = format!("{}/{}", dir.trim_end_matches('/'), file_name);
        let found = entries
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(&wanted));
        if let Some((index, _)) = found {
            return Some(*index);
        }
    }

    let suffix = format!("/{}", file_name.to_ascii_lowercase());
    entries
        .iter()
        .find(|(_, name)| {
            let lower = name.to_ascii_lowercase();
            let packaged = lower.starts_with("lib/") || lower.starts_with("runtimes/");
            packaged && lower.ends_with(&suffix)
        })
        .map(|(index, _)| *index)
}

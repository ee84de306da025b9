//! Package dependencies: make sure each declared package is present as a
//! module file in the addon's directory, fetching it from the registry when
//! needed, then load it into the addon's isolation context.

mod archive;
mod receipt;
mod source;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use addonkit_api::Dependency;

use crate::error::PackageError;
use crate::invoke::invoke_async;
use crate::isolation::{IsolationContext, module_file_name};
use crate::loading_error::LoadingError;
use crate::version::Version;

pub use archive::{default_search_dirs, extract_module, runtime_identifier};
pub use receipt::{PackageReceipt, RECEIPT_FILE, ReceiptEntry, accepts_installed};
pub use source::{DEFAULT_PACKAGE_SOURCE, HttpPackageSource, PackageSource};

/// Where a package module currently lives, process-wide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCacheEntry {
    pub version: String,
    pub path: PathBuf,
}

/// Outcome of one addon's package pass
#[derive(Debug, Default)]
pub struct PackageReport {
    /// Every required package dependency is loaded
    pub loaded: bool,
    /// Errors recorded during the pass
    pub errors: Vec<LoadingError>,
}

struct PackageRequest<'a> {
    package_id: &'a str,
    module_name: &'a str,
    version: Option<&'a str>,
}

/// Fetches, caches and loads package dependencies
pub struct PackageManager {
    source: Arc<dyn PackageSource>,
    search_dirs: Vec<String>,
    /// `(package id, module name)` -> where it was first loaded from
    cache: Mutex<HashMap<(String, String), PackageCacheEntry>>,
}

impl PackageManager {
    pub fn new(source: Arc<dyn PackageSource>) -> Self {
        Self::with_search_dirs(source, default_search_dirs())
    }

    pub fn with_search_dirs(source: Arc<dyn PackageSource>, search_dirs: Vec<String>) -> Self {
        Self {
            source,
            search_dirs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<(String, String), PackageCacheEntry>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Snapshot of a cache entry
    pub fn cached(&self, package_id: &str, module_name: &str) -> Option<PackageCacheEntry> {
        self.cache()
            .get(&(package_id.to_string(), module_name.to_string()))
            .cloned()
    }

    /// Satisfy every package dependency of one addon.
    ///
    /// A failing required dependency stops the pass and records
    /// [`LoadingError::FailedPackageFetch`]; a failing optional one is
    /// logged and skipped.
    pub async fn load_package_dependencies(
        &self,
        addon: &str,
        dependencies: &[Dependency],
        context: &IsolationContext,
    ) -> PackageReport {
        let mut report = PackageReport {
            loaded: true,
            errors: Vec::new(),
        };

        for dep in dependencies {
            let Dependency::Package {
                package_id,
                module_name,
                version,
                required,
            } = dep
            else {
                continue;
            };

            let request = PackageRequest {
                package_id,
                module_name,
                version: version.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            };

            tracing::debug!(
                addon = %addon,
                package = %package_id,
                version = %request.version.unwrap_or("latest"),
                "Processing package dependency"
            );

            let outcome =
                invoke_async(self.load_single(&request, context, &mut report.errors)).await;
            let Err(failure) = outcome else {
                continue;
            };

            if *required {
                tracing::error!(
                    addon = %addon,
                    package = %package_id,
                    error = %failure,
                    "Failed to load required package dependency"
                );
                report.errors.push(LoadingError::FailedPackageFetch {
                    package: package_id.clone(),
                    message: failure.to_string(),
                });
                report.loaded = false;
                return report;
            }

            tracing::warn!(
                addon = %addon,
                package = %package_id,
                error = %failure,
                "Failed to load optional package dependency"
            );
        }

        report
    }

    async fn load_single(
        &self,
        request: &PackageRequest<'_>,
        context: &IsolationContext,
        errors: &mut Vec<LoadingError>,
    ) -> Result<(), PackageError> {
        let expected = context.dir().join(module_file_name(request.module_name));
        let mut outdated = None;

        if expected.is_file() {
            let installed = PackageReceipt::load(context.dir())
                .ok()
                .and_then(|r| r.installed_version(request.module_name).map(str::to_string));
            if accepts_installed(installed.as_deref(), request.version) {
                tracing::debug!(package = %request.package_id, "Package already present");
                let version = installed.unwrap_or_else(|| "unknown".to_string());
                return self.load_into(request, &version, &expected, context);
            }
            if let (Some(found), Some(required)) = (installed, request.version) {
                outdated = Some(LoadingError::IncompatiblePackageVersion {
                    package: request.package_id.to_string(),
                    required: required.to_string(),
                    found,
                });
            }
            tracing::debug!(
                package = %request.package_id,
                "Package present but outdated, fetching"
            );
        }

        if let Some(entry) = self.reusable_entry(request) {
            tracing::debug!(
                package = %request.package_id,
                path = %entry.path.display(),
                "Reusing package loaded by another addon"
            );
            return self.load_into(request, &entry.version, &entry.path, context);
        }

        // The outdated copy only matters if it cannot be replaced
        let version = match self.fetch(request, context.dir()).await {
            Ok(version) => version,
            Err(e) => {
                errors.extend(outdated);
                return Err(e);
            }
        };
        self.load_into(request, &version, &expected, context)
    }

    /// Cache entry on disk at an acceptable version
    fn reusable_entry(&self, request: &PackageRequest<'_>) -> Option<PackageCacheEntry> {
        let entry = self.cached(request.package_id, request.module_name)?;
        (entry.path.is_file() && accepts_installed(Some(entry.version.as_str()), request.version))
            .then_some(entry)
    }

    async fn fetch(
        &self,
        request: &PackageRequest<'_>,
        dir: &Path,
    ) -> Result<String, PackageError> {
        let available = self.source.versions(request.package_id).await?;
        let version = select_version(request.package_id, &available, request.version)?;

        let archive = self.source.download(request.package_id, &version).await?;
        let file_name = module_file_name(request.module_name);
        let bytes = extract_module(&archive, request.package_id, &file_name, &self.search_dirs)?;

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        let mut receipt = PackageReceipt::load(dir).unwrap_or_default();
        receipt.record(request.module_name, request.package_id, &version);
        receipt.save(dir)?;

        tracing::info!(package = %request.package_id, version = %version, "Fetched package");
        Ok(version)
    }

    /// Load a resolved file and track it. An entry already cached from a
    /// different location wins and is reused.
    fn load_into(
        &self,
        request: &PackageRequest<'_>,
        version: &str,
        path: &Path,
        context: &IsolationContext,
    ) -> Result<(), PackageError> {
        let key = (
            request.package_id.to_string(),
            request.module_name.to_string(),
        );

        let existing = self.cache().get(&key).cloned();
        if let Some(entry) = existing.filter(|e| e.path.is_file()) {
            if entry.path != path {
                tracing::warn!(
                    package = %request.package_id,
                    existing = %entry.path.display(),
                    new = %path.display(),
                    "Package already loaded from a different location, reusing it"
                );
            }
            context.load_file(&entry.path)?;
            return Ok(());
        }

        context.load_file(path)?;
        self.cache().insert(
            key,
            PackageCacheEntry {
                version: version.to_string(),
                path: path.to_path_buf(),
            },
        );
        Ok(())
    }
}

/// Pick the version to fetch: the requested one if published, else the
/// highest published one
fn select_version(
    package_id: &str,
    available: &[String],
    requested: Option<&str>,
) -> Result<String, PackageError> {
    let parsed = available
        .iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (parsed, v)));

    match requested {
        Some(requested) => {
            let wanted = Version::parse(requested).map_err(|_| PackageError::InvalidVersion {
                package: package_id.to_string(),
                version: requested.to_string(),
            })?;
            parsed
                .into_iter()
                .find(|(v, _)| *v == wanted)
                .map(|(_, raw)| raw.clone())
                .ok_or_else(|| PackageError::VersionNotAvailable {
                    package: package_id.to_string(),
                    version: requested.to_string(),
                })
        }
        None => parsed
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| PackageError::PackageNotFound {
                package: package_id.to_string(),
            }),
    }
}

/// Warn about packages that enabled addons request at different explicit
/// versions. One warning per package id; nothing is blocked.
pub fn check_for_version_conflicts<'a>(
    enabled: impl IntoIterator<Item = (&'a str, &'a [Dependency])>,
) -> Vec<String> {
    let mut usage: BTreeMap<&str, Vec<(&str, Option<&str>)>> = BTreeMap::new();
    for (addon, dependencies) in enabled {
        for dep in dependencies {
            if let Dependency::Package {
                package_id,
                version,
                ..
            } = dep
            {
                let version = version.as_deref().filter(|v| !v.trim().is_empty());
                usage.entry(package_id.as_str()).or_default().push((addon, version));
            }
        }
    }

    let mut warnings = Vec::new();
    for (package_id, users) in usage {
        let mut distinct: Vec<&str> = users.iter().filter_map(|(_, v)| *v).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            continue;
        }

        let used_by: Vec<String> = users
            .iter()
            .map(|(addon, v)| format!("{} ({})", addon, v.unwrap_or("latest")))
            .collect();
        let warning = format!(
            "Version conflict detected for package '{}'. Used by: {}",
            package_id,
            used_by.join(", ")
        );
        tracing::warn!(package = %package_id, "{}", warning);
        warnings.push(warning);
    }
    warnings
}

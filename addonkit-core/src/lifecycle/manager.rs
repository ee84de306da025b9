//! AddonManager - discovery, load order and the enable/disable/delete
//! state machine

use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_api::{Addon, AddonContext, AddonManifest, Dependency};
use serde::Serialize;

use super::capabilities::CapabilityRegistry;
use super::host::{ConfirmPrompt, DialogChoice, HostServices};
use super::meta::MetaStore;
use super::record::{AddonRecord, AddonState, AddonSummary};
use super::snapshot::AddonSnapshot;
use crate::config::AddonHostConfig;
use crate::error::ManagerError;
use crate::graph::{self, DependencyGraph, validate_dependencies};
use crate::invoke::{invoke, invoke_async};
use crate::isolation::{
    IsolationContext, ModuleLoader, ModuleRegistry, NativeModuleLoader, find_module_file,
};
use crate::loading_error::LoadingError;
use crate::packages::{
    HttpPackageSource, PackageManager, PackageSource, check_for_version_conflicts,
    default_search_dirs,
};
use crate::version::{self, Version};

/// What happened during [`AddonManager::start`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartupReport {
    /// File-based addons discovered
    pub loaded: usize,
    /// File-based addons enabled after the batch
    pub enabled: usize,
    /// Addons carrying at least one error, built-in included
    pub addons_with_errors: usize,
    /// Package version conflicts among enabled addons
    pub conflict_warnings: Vec<String>,
}

/// Result of [`AddonManager::disable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled,
    AlreadyDisabled,
    /// Enabled dependents exist and the user did not confirm
    Cancelled,
}

/// Builder for [`AddonManager`]. Unset collaborators default to native
/// module loading and the HTTP package source from the config.
pub struct AddonManagerBuilder {
    config: AddonHostConfig,
    host: Arc<dyn HostServices>,
    builtin: Box<dyn Addon>,
    loader: Option<Arc<dyn ModuleLoader>>,
    source: Option<Arc<dyn PackageSource>>,
    registry: Option<Arc<ModuleRegistry>>,
}

impl AddonManagerBuilder {
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn package_source(mut self, source: Arc<dyn PackageSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Create the manager and read the meta store
    pub fn build(self) -> Result<AddonManager, ManagerError> {
        let source: Arc<dyn PackageSource> = match self.source {
            Some(source) => source,
            None => Arc::new(HttpPackageSource::new(
                self.config.packages.url.clone(),
                self.config.packages.timeout(),
            )?),
        };
        let search_dirs = self
            .config
            .packages
            .search_dirs
            .clone()
            .unwrap_or_else(default_search_dirs);

        let manifest = self.builtin.manifest();
        let dependencies = self.builtin.dependencies();
        let mut builtin = AddonRecord::new(self.builtin, manifest, dependencies, None, None);
        builtin.builtin = true;
        builtin.state = AddonState::Disabled;

        let meta = MetaStore::load(&self.config.meta_path());

        Ok(AddonManager {
            host: self.host,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(ModuleRegistry::new())),
            loader: self.loader.unwrap_or_else(|| Arc::new(NativeModuleLoader)),
            packages: PackageManager::with_search_dirs(source, search_dirs),
            capabilities: CapabilityRegistry::new(),
            meta,
            records: vec![builtin],
            deleted: HashSet::new(),
            started: false,
            config: self.config,
        })
    }
}

/// Owns every addon record and drives their lifecycle.
///
/// The built-in addon is always the first record. Everything an addon does
/// goes through guarded calls, so a faulty addon only ever affects its own
/// record.
pub struct AddonManager {
    config: AddonHostConfig,
    host: Arc<dyn HostServices>,
    registry: Arc<ModuleRegistry>,
    loader: Arc<dyn ModuleLoader>,
    packages: PackageManager,
    capabilities: CapabilityRegistry,
    meta: MetaStore,
    records: Vec<AddonRecord>,
    /// Identifiers deleted during this process
    deleted: HashSet<String>,
    started: bool,
}

impl AddonManager {
    pub fn builder(
        config: AddonHostConfig,
        host: Arc<dyn HostServices>,
        builtin: Box<dyn Addon>,
    ) -> AddonManagerBuilder {
        AddonManagerBuilder {
            config,
            host,
            builtin,
            loader: None,
            source: None,
            registry: None,
        }
    }

    /// Enable the built-in addon, then discover, order and enable every
    /// installed addon
    pub async fn start(&mut self) -> Result<StartupReport, ManagerError> {
        if self.started {
            return Err(ManagerError::AlreadyStarted);
        }
        self.started = true;

        tracing::info!(
            addons_dir = %self.config.addons_dir().display(),
            host_version = %self.host.app_version(),
            "Starting addon manager"
        );

        if !self.enable_at(0).await {
            tracing::error!(
                addon = %self.records[0].identifier(),
                "Built-in addon failed to enable"
            );
        }

        let batch = self.discover_all()?;
        self.load_batch(&batch).await;

        for record in &mut self.records {
            if record.state == AddonState::Installed {
                record.state = AddonState::Disabled;
            }
        }

        let report = StartupReport {
            loaded: batch.len(),
            enabled: self
                .records
                .iter()
                .filter(|r| !r.builtin && r.is_enabled())
                .count(),
            addons_with_errors: self.records.iter().filter(|r| r.has_errors()).count(),
            conflict_warnings: self.version_conflicts(),
        };

        if report.addons_with_errors > 0 {
            self.host.report_addon_errors(report.addons_with_errors).await;
        }
        self.host.reload_ui().await;

        tracing::info!(
            loaded = report.loaded,
            enabled = report.enabled,
            with_errors = report.addons_with_errors,
            "Addon manager started"
        );
        Ok(report)
    }

    /// Enable one addon. Returns whether it ended up enabled; failures are
    /// recorded on the addon, replacing those of earlier attempts.
    pub async fn enable(&mut self, identifier: &str) -> Result<bool, ManagerError> {
        let index = self.require(identifier)?;
        if self.records[index].is_enabled() {
            return Ok(true);
        }

        self.records[index].errors.clear();
        let enabled = self.enable_at(index).await;
        self.host.reload_ui().await;
        Ok(enabled)
    }

    /// Disable one addon, asking for confirmation first when enabled addons
    /// require it
    pub async fn disable(&mut self, identifier: &str) -> Result<DisableOutcome, ManagerError> {
        let index = self.require(identifier)?;
        if self.records[index].builtin {
            let err = ManagerError::BuiltinProtected {
                identifier: identifier.to_string(),
                action: "disabled",
            };
            self.host.user_error(&err.to_string());
            return Err(err);
        }
        if !self.records[index].is_enabled() {
            return Ok(DisableOutcome::AlreadyDisabled);
        }

        let dependents = self.dependents_requiring_confirmation(identifier);
        if !dependents.is_empty() {
            let prompt = self.cascade_prompt(index, &dependents);
            if self.host.confirm(&prompt).await != DialogChoice::Primary {
                tracing::info!(addon = %identifier, "Disable cancelled");
                return Ok(DisableOutcome::Cancelled);
            }

            for dependent in &dependents {
                if let Some(i) = self.index(dependent) {
                    self.disable_at(i);
                }
            }
        }

        self.disable_at(index);
        self.host.reload_ui().await;
        Ok(DisableOutcome::Disabled)
    }

    /// Disable if needed, unload and remove an addon's module file
    pub async fn delete(&mut self, identifier: &str) -> Result<(), ManagerError> {
        let index = self.require(identifier)?;
        if self.records[index].builtin {
            let err = ManagerError::BuiltinProtected {
                identifier: identifier.to_string(),
                action: "deleted",
            };
            self.host.user_error(&err.to_string());
            return Err(err);
        }

        if self.records[index].is_enabled() {
            let stranded: Vec<&str> = graph::dependents(identifier, &self.records)
                .into_iter()
                .filter(|r| r.is_enabled())
                .map(|r| r.identifier())
                .collect();
            if !stranded.is_empty() {
                tracing::warn!(
                    addon = %identifier,
                    dependents = ?stranded,
                    "Deleting an addon other enabled addons require"
                );
            }
            self.disable_at(index);
        }

        let record = self.records.remove(index);
        let module_path = record.module_path.clone();
        record.teardown();

        self.capabilities.unregister(identifier);
        self.meta.remove(identifier);
        self.persist_meta();
        self.deleted.insert(identifier.to_string());

        let removed = match module_path {
            Some(path) => match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove module file"
                    );
                    Err(e)
                }
                _ => Ok(()),
            },
            None => Ok(()),
        };

        tracing::info!(addon = %identifier, "Addon deleted");
        self.host.reload_ui().await;
        removed.map_err(ManagerError::from)
    }

    /// Load one addon directory at runtime and enable it unless the user
    /// disabled it before
    pub async fn install_from_directory(&mut self, dir: &Path) -> Result<String, ManagerError> {
        let mut record = self.discover(dir)?;
        let identifier = record.identifier().to_string();
        if self.deleted.contains(&identifier) {
            tracing::info!(addon = %identifier, "Addon reinstalled after delete, restart required");
            record.needs_restart = true;
        }

        self.records.push(record);
        let index = self.records.len() - 1;

        let validation = validate_dependencies(&self.records[index], &self.records);
        let cycle = DependencyGraph::build(&self.records)
            .find_cycle()
            .filter(|cycle| cycle.contains(&identifier));
        let mut errors = Vec::new();
        if let Err(error) = validation {
            errors.push(error);
        }
        if let Some(cycle) = cycle {
            errors.push(LoadingError::CircularDependency { cycle });
        }
        self.records[index].push_errors(errors);

        if self.meta.is_disabled(&identifier) {
            tracing::debug!(addon = %identifier, "Addon disabled by user, not enabling");
        } else if !self.records[index].has_critical_errors() {
            self.enable_at(index).await;
        }

        let record = &mut self.records[index];
        if record.state == AddonState::Installed {
            record.state = AddonState::Disabled;
        }

        self.host.reload_ui().await;
        Ok(identifier)
    }

    /// Defer enabling of an addon to the next process start
    pub fn mark_needs_restart(&mut self, identifier: &str) -> Result<(), ManagerError> {
        let index = self.require(identifier)?;
        self.records[index].needs_restart = true;
        Ok(())
    }

    pub fn addon(&self, identifier: &str) -> Option<&AddonRecord> {
        self.records.iter().find(|r| r.identifier() == identifier)
    }

    /// Records in `state`; [`AddonState::Installed`] returns all of them
    pub fn addons(&self, state: AddonState) -> Vec<&AddonRecord> {
        self.records
            .iter()
            .filter(|r| r.state.matches(state))
            .collect()
    }

    pub fn state(&self, identifier: &str) -> Option<AddonState> {
        self.addon(identifier).map(AddonRecord::state)
    }

    /// Installed and enabled
    pub fn is_available(&self, identifier: &str) -> bool {
        self.addon(identifier).is_some_and(AddonRecord::is_enabled)
    }

    /// Installed, enabled and at a version inside `range`
    pub fn is_available_in_range(&self, identifier: &str, range: &str) -> bool {
        self.addon(identifier)
            .filter(|r| r.is_enabled())
            .is_some_and(|r| version::satisfies(&r.manifest.version, Some(range)))
    }

    pub fn builtin(&self) -> &AddonRecord {
        &self.records[0]
    }

    pub fn summaries(&self) -> Vec<AddonSummary> {
        self.records.iter().map(AddonRecord::summary).collect()
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn packages(&self) -> &PackageManager {
        &self.packages
    }

    pub fn config(&self) -> &AddonHostConfig {
        &self.config
    }

    /// Package version conflicts among enabled addons
    pub fn version_conflicts(&self) -> Vec<String> {
        check_for_version_conflicts(
            self.records
                .iter()
                .filter(|r| r.is_enabled())
                .map(|r| (r.identifier(), r.dependencies.as_slice())),
        )
    }

    /// Enabled addons that would be disabled along with `identifier`:
    /// the transitive closure of enabled addons requiring it, ordered so
    /// every addon comes before the ones it depends on.
    pub fn dependents_requiring_confirmation(&self, identifier: &str) -> Vec<String> {
        let mut closure: Vec<&AddonRecord> = Vec::new();
        let mut seen = HashSet::from([identifier.to_string()]);
        let mut queue = VecDeque::from([identifier.to_string()]);

        while let Some(current) = queue.pop_front() {
            for dependent in graph::dependents(&current, &self.records) {
                if dependent.is_enabled() && seen.insert(dependent.identifier().to_string()) {
                    queue.push_back(dependent.identifier().to_string());
                    closure.push(dependent);
                }
            }
        }

        let mut order = DependencyGraph::build(&closure).topological_order();
        order.reverse();
        for record in &closure {
            if !order.iter().any(|id| id == record.identifier()) {
                order.push(record.identifier().to_string());
            }
        }
        order
    }

    fn index(&self, identifier: &str) -> Option<usize> {
        self.records.iter().position(|r| r.identifier() == identifier)
    }

    fn require(&self, identifier: &str) -> Result<usize, ManagerError> {
        self.index(identifier).ok_or_else(|| ManagerError::NotFound {
            identifier: identifier.to_string(),
        })
    }

    fn persist_meta(&self) {
        if let Err(e) = self.meta.save() {
            tracing::error!(
                path = %self.meta.path().display(),
                error = %e,
                "Failed to save meta store"
            );
        }
    }

    /// Read the addons root and build a record per addon directory.
    /// Returns the identifiers loaded.
    fn discover_all(&mut self) -> Result<Vec<String>, ManagerError> {
        let root = self.config.addons_dir().to_path_buf();
        std::fs::create_dir_all(&root)?;

        let mut dirs: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut loaded = Vec::new();
        for dir in dirs {
            match self.discover(&dir) {
                Ok(record) => {
                    tracing::info!(
                        addon = %record.identifier(),
                        version = %record.manifest.version,
                        "Addon loaded"
                    );
                    loaded.push(record.identifier().to_string());
                    self.records.push(record);
                }
                Err(e @ ManagerError::NoModule { .. }) => {
                    tracing::debug!(error = %e, "Skipping directory");
                }
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "Failed to load addon");
                }
            }
        }
        Ok(loaded)
    }

    /// Load one addon directory into a fresh isolation context without
    /// enabling it
    fn discover(&self, dir: &Path) -> Result<AddonRecord, ManagerError> {
        let no_module = || ManagerError::NoModule {
            dir: dir.to_path_buf(),
        };
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(no_module)?;
        let module = find_module_file(dir, name).ok_or_else(no_module)?;

        let rejected = |reason: String| ManagerError::Discovery {
            path: module.clone(),
            reason,
        };

        if self.registry.is_registered(name) {
            return Err(rejected(format!(
                "an addon from a directory named '{name}' is already loaded"
            )));
        }

        // Locals drop in reverse order: instances before their context.
        let context = IsolationContext::new(
            name,
            module.clone(),
            self.registry.clone(),
            self.loader.clone(),
        );
        let handle = context
            .load_main()
            .map_err(|e| rejected(e.to_string()))?;
        let mut addons = invoke(|| handle.instantiate()).map_err(|f| rejected(f.to_string()))?;

        if addons.len() != 1 {
            return Err(rejected(format!(
                "expected exactly one addon in the module, found {}",
                addons.len()
            )));
        }
        let Some(addon) = addons.pop() else {
            return Err(rejected("module produced no addon".to_string()));
        };

        let manifest = invoke(|| Ok::<_, Infallible>(addon.manifest()))
            .map_err(|f| rejected(f.to_string()))?;
        let dependencies = invoke(|| Ok::<_, Infallible>(addon.dependencies()))
            .map_err(|f| rejected(f.to_string()))?;

        let identifier = manifest.identifier.as_str();
        if identifier.trim().is_empty() {
            return Err(rejected("addon identifier is empty".to_string()));
        }
        if let Some(existing) = self.records.iter().find(|r| r.identifier() == identifier) {
            let reason = if existing.builtin {
                format!("identifier '{identifier}' is reserved for the built-in addon")
            } else {
                format!("identifier '{identifier}' is already used by another addon")
            };
            return Err(rejected(reason));
        }

        drop(handle);
        Ok(AddonRecord::new(
            addon,
            manifest,
            dependencies,
            Some(module.clone()),
            Some(Arc::new(context)),
        ))
    }

    /// Validate, order and enable a freshly discovered batch
    async fn load_batch(&mut self, batch: &[String]) {
        let members: HashSet<&str> = batch.iter().map(String::as_str).collect();

        let failures: Vec<(usize, LoadingError)> = batch
            .iter()
            .filter_map(|id| {
                let index = self.index(id)?;
                validate_dependencies(&self.records[index], &self.records)
                    .err()
                    .map(|e| (index, e))
            })
            .collect();
        for (index, error) in failures {
            tracing::warn!(
                addon = %self.records[index].identifier(),
                %error,
                "Dependency check failed"
            );
            self.records[index].push_errors(vec![error]);
        }

        let resolved = {
            let nodes: Vec<&AddonRecord> = self
                .records
                .iter()
                .filter(|r| members.contains(r.identifier()))
                .collect();
            DependencyGraph::build(&nodes).resolve()
        };

        let order = match resolved {
            Ok(order) => order,
            Err(cycle) => {
                tracing::error!(
                    %cycle,
                    "Circular dependency detected. No addon from this batch will be enabled."
                );
                let on_cycle: HashSet<&String> = cycle.cycle.iter().collect();
                for id in on_cycle {
                    if let Some(index) = self.index(id) {
                        self.records[index].push_errors(vec![LoadingError::CircularDependency {
                            cycle: cycle.cycle.clone(),
                        }]);
                    }
                }
                return;
            }
        };

        for id in order {
            let Some(index) = self.index(&id) else {
                continue;
            };
            if self.meta.is_disabled(&id) {
                tracing::debug!(addon = %id, "Addon disabled by user, skipping");
                self.records[index].state = AddonState::Disabled;
                continue;
            }
            if self.records[index].has_critical_errors() {
                self.records[index].state = AddonState::Disabled;
                continue;
            }
            self.enable_at(index).await;
        }
    }

    /// One enable attempt. Errors of the attempt are appended to the record
    /// in one step at the end.
    async fn enable_at(&mut self, index: usize) -> bool {
        if self.records[index].is_enabled() {
            return true;
        }

        let host_version = self.host.app_version();
        let mut phase = Vec::new();
        let enabled = self.preload(index, &host_version, &mut phase).await
            && self.run_enable(index, &host_version, &mut phase).await;

        let record = &mut self.records[index];
        let identifier = record.identifier().to_string();
        record.push_errors(phase);

        if enabled {
            record.state = AddonState::Enabled;
            tracing::info!(addon = %identifier, "Addon enabled");
            if !record.builtin {
                self.meta.set(&identifier, true);
            }
        } else {
            record.state = AddonState::Disabled;
            self.capabilities.unregister(&identifier);
        }
        self.persist_meta();
        enabled
    }

    /// Preconditions checked in order; the first failure stops the attempt
    async fn preload(
        &self,
        index: usize,
        host_version: &str,
        phase: &mut Vec<LoadingError>,
    ) -> bool {
        let record = &self.records[index];

        if let Err(error) = check_host_version(&record.manifest, host_version) {
            tracing::debug!(addon = %record.identifier(), %error, "Host version not supported");
            phase.push(error);
            return false;
        }

        if let Err(error) = self.check_addon_dependencies(record) {
            tracing::error!(addon = %record.identifier(), %error, "Addon dependency not satisfied");
            phase.push(error);
            return false;
        }

        if let Some(context) = &record.context {
            let report = self
                .packages
                .load_package_dependencies(record.identifier(), &record.dependencies, context)
                .await;
            phase.extend(report.errors);
            if !report.loaded {
                return false;
            }
        }

        if record.needs_restart {
            let error = LoadingError::RestartRequired {
                name: record.name().to_string(),
            };
            self.host
                .show_message("Addon needs restart", &error.to_string())
                .await;
            phase.push(error);
            return false;
        }

        true
    }

    /// Required addon dependencies present, enabled and in range
    fn check_addon_dependencies(&self, record: &AddonRecord) -> Result<(), LoadingError> {
        for dep in &record.dependencies {
            let Dependency::Addon {
                identifier,
                version_range,
                required: true,
            } = dep
            else {
                continue;
            };

            let Some(target) = self.addon(identifier) else {
                return Err(LoadingError::MissingDependency {
                    identifier: identifier.clone(),
                });
            };
            if !target.is_enabled() {
                return Err(LoadingError::DependencyNotEnabled {
                    identifier: identifier.clone(),
                });
            }
            if let Some(range) = version_range.as_deref().filter(|r| !r.trim().is_empty()) {
                if !version::satisfies(&target.manifest.version, Some(range)) {
                    return Err(LoadingError::IncompatibleAddonVersion {
                        identifier: identifier.clone(),
                        required: range.to_string(),
                        found: target.manifest.version.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Run both enable callbacks, then publish the capabilities they
    /// registered
    async fn run_enable(
        &mut self,
        index: usize,
        host_version: &str,
        phase: &mut Vec<LoadingError>,
    ) -> bool {
        let addons = Arc::new(AddonSnapshot::capture(&self.records));
        let record = &mut self.records[index];
        let identifier = record.identifier().to_string();
        let addon_dir = record.addon_dir().map(Path::to_path_buf).unwrap_or_default();
        let mut ctx =
            AddonContext::new(identifier.clone(), addon_dir, host_version).with_addons(addons);
        if let Some(context) = &record.context {
            ctx = ctx.with_resolver(context.clone());
        }
        let addon = &mut record.addon;

        if let Err(failure) = invoke(|| addon.on_enable(&mut ctx)) {
            tracing::error!(addon = %identifier, error = %failure, "Failed to enable addon");
            phase.push(failure.into_loading_error());
            return false;
        }
        if let Err(failure) = invoke_async(addon.on_enable_async(&mut ctx)).await {
            tracing::error!(addon = %identifier, error = %failure, "Failed to enable addon");
            phase.push(failure.into_loading_error());
            return false;
        }

        let specs = ctx.take_pending_capabilities();
        for spec in &specs {
            if let Some(owner) = self.capabilities.check_conflict(&identifier, spec) {
                let error = LoadingError::load_exception(format!(
                    "capability '{}' is already registered by '{}'",
                    spec.key(),
                    owner
                ));
                tracing::error!(addon = %identifier, %error, "Capability conflict");
                phase.push(error);
                return false;
            }
        }
        self.capabilities.register(&identifier, specs);
        true
    }

    /// Run `on_disable` and mark the record disabled whatever it returns.
    /// The flag is saved before the next addon in a cascade is touched.
    fn disable_at(&mut self, index: usize) {
        let record = &mut self.records[index];
        let identifier = record.identifier().to_string();
        let addon = &mut record.addon;

        if let Err(failure) = invoke(|| addon.on_disable()) {
            tracing::error!(addon = %identifier, error = %failure, "Failed to disable addon");
        }
        record.state = AddonState::Disabled;

        self.capabilities.unregister(&identifier);
        self.meta.set(&identifier, false);
        self.persist_meta();
        tracing::info!(addon = %identifier, "Addon disabled");
    }

    fn cascade_prompt(&self, index: usize, dependents: &[String]) -> ConfirmPrompt {
        let names: Vec<&str> = dependents
            .iter()
            .filter_map(|id| self.addon(id))
            .map(AddonRecord::name)
            .collect();

        ConfirmPrompt {
            title: "Disable dependent addons?".to_string(),
            message: format!(
                "The following addons depend on '{}':\n\n{}\n\nDisabling this addon will also disable these addons. Do you want to continue?",
                self.records[index].name(),
                names.join(", ")
            ),
            primary: "Disable Anyway".to_string(),
            cancel: "Cancel".to_string(),
            affected: dependents.to_vec(),
        }
    }
}

impl std::fmt::Debug for AddonManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonManager")
            .field("addons_dir", &self.config.addons_dir)
            .field("records", &self.records)
            .field("started", &self.started)
            .finish()
    }
}

/// Host version against the addon's declared bounds. Bounds that do not
/// parse fail closed.
fn check_host_version(manifest: &AddonManifest, host_version: &str) -> Result<(), LoadingError> {
    let current = Version::parse(host_version).ok();

    if let Some(min) = manifest
        .min_host_version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        let supported = match (&current, Version::parse(min)) {
            (Some(current), Ok(min)) => *current >= min,
            _ => false,
        };
        if !supported {
            return Err(LoadingError::OutdatedHost {
                required: min.to_string(),
                current: host_version.to_string(),
            });
        }
    }

    if let Some(max) = manifest
        .max_host_version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        let supported = match (&current, Version::parse(max)) {
            (Some(current), Ok(max)) => *current <= max,
            _ => false,
        };
        if !supported {
            return Err(LoadingError::OutdatedAddon {
                maximum: max.to_string(),
                current: host_version.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(min: Option<&str>, max: Option<&str>) -> AddonManifest {
        AddonManifest {
            identifier: "a".into(),
            min_host_version: min.map(str::to_string),
            max_host_version: max.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_host_version_without_bounds() {
        assert!(check_host_version(&manifest(None, None), "1.0.0").is_ok());
        assert!(check_host_version(&manifest(Some(""), Some(" ")), "1.0.0").is_ok());
    }

    #[test]
    fn test_host_version_below_minimum() {
        let err = check_host_version(&manifest(Some("2.0"), None), "1.9.9").unwrap_err();
        assert_eq!(
            err,
            LoadingError::OutdatedHost {
                required: "2.0".into(),
                current: "1.9.9".into(),
            }
        );
    }

    #[test]
    fn test_host_version_above_maximum() {
        let err = check_host_version(&manifest(None, Some("1.5")), "1.6.0").unwrap_err();
        assert!(matches!(err, LoadingError::OutdatedAddon { .. }));
        assert!(check_host_version(&manifest(Some("1.0"), Some("1.5")), "1.5.0").is_ok());
    }

    #[test]
    fn test_unparseable_bound_fails_closed() {
        assert!(check_host_version(&manifest(Some("banana"), None), "1.0.0").is_err());
    }
}

//! Test doubles for hosts and addon authors
//!
//! [`MockAddon`] scripts lifecycle callbacks, [`StaticModuleLoader`] maps
//! module files to in-process addons, [`MockPackageSource`] serves packages
//! from memory and [`RecordingHost`] answers prompts and records what the
//! manager told the user.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use addonkit_api::{
    Addon, AddonContext, AddonError, AddonManifest, CapabilitySpec, Dependency, async_trait,
};

use crate::error::{IsolationError, PackageError};
use crate::isolation::{ModuleHandle, ModuleLoader, module_file_name, module_name};
use crate::lifecycle::{ConfirmPrompt, DialogChoice, HostServices};
use crate::packages::PackageSource;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// What a scripted callback does
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
}

impl Behavior {
    fn run(&self) -> Result<(), AddonError> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail(message) => Err(AddonError::custom(message.clone())),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// Ordered log of callbacks, shared between mocks: `"<id>:<callback>"`
#[derive(Debug, Clone, Default)]
pub struct CallJournal(Arc<Mutex<Vec<String>>>);

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, identifier: &str, callback: &str) {
        lock(&self.0).push(format!("{identifier}:{callback}"));
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    /// How often `entry` was recorded
    pub fn count(&self, entry: &str) -> usize {
        lock(&self.0).iter().filter(|e| *e == entry).count()
    }

    /// Position of the first `entry`, for ordering assertions
    pub fn position(&self, entry: &str) -> Option<usize> {
        lock(&self.0).iter().position(|e| e == entry)
    }
}

/// Scriptable addon
///
/// Every callback succeeds unless told otherwise. A successful `on_enable`
/// registers the configured capabilities.
#[derive(Debug, Clone)]
pub struct MockAddon {
    manifest: AddonManifest,
    dependencies: Vec<Dependency>,
    capabilities: Vec<CapabilitySpec>,
    on_enable: Behavior,
    on_enable_async: Behavior,
    on_disable: Behavior,
    modules: Vec<String>,
    checks: Vec<(String, Option<String>)>,
    watched: Option<PathBuf>,
    journal: CallJournal,
}

impl MockAddon {
    pub fn new(identifier: &str, version: &str) -> Self {
        Self {
            manifest: AddonManifest {
                identifier: identifier.to_string(),
                version: version.to_string(),
                ..Default::default()
            },
            dependencies: Vec::new(),
            capabilities: Vec::new(),
            on_enable: Behavior::Succeed,
            on_enable_async: Behavior::Succeed,
            on_disable: Behavior::Succeed,
            modules: Vec::new(),
            checks: Vec::new(),
            watched: None,
            journal: CallJournal::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.manifest.name = name.to_string();
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_capability(mut self, kind: &str, name: &str) -> Self {
        self.capabilities.push(CapabilitySpec::new(kind, name, ""));
        self
    }

    pub fn with_host_bounds(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.manifest.min_host_version = min.map(str::to_string);
        self.manifest.max_host_version = max.map(str::to_string);
        self
    }

    /// Load `name` through the context while enabling; journals
    /// `loaded:<name>` or `host:<name>` when nothing addon-side provides it
    pub fn loads_module(mut self, name: &str) -> Self {
        self.modules.push(name.to_string());
        self
    }

    /// Ask the context about `other` while enabling; journals
    /// `found:<other>` or `missing:<other>`
    pub fn checks_for(mut self, other: &str, range: Option<&str>) -> Self {
        self.checks
            .push((other.to_string(), range.map(str::to_string)));
        self
    }

    /// Journal `read:<contents>` of `path` from `on_disable`, to observe
    /// what the host had persisted at that point
    pub fn reads_on_disable(mut self, path: impl Into<PathBuf>) -> Self {
        self.watched = Some(path.into());
        self
    }

    pub fn with_journal(mut self, journal: &CallJournal) -> Self {
        self.journal = journal.clone();
        self
    }

    pub fn fail_enable(mut self, message: &str) -> Self {
        self.on_enable = Behavior::Fail(message.to_string());
        self
    }

    pub fn panic_on_enable(mut self, message: &str) -> Self {
        self.on_enable = Behavior::Panic(message.to_string());
        self
    }

    pub fn fail_enable_async(mut self, message: &str) -> Self {
        self.on_enable_async = Behavior::Fail(message.to_string());
        self
    }

    pub fn fail_disable(mut self, message: &str) -> Self {
        self.on_disable = Behavior::Fail(message.to_string());
        self
    }

    pub fn journal(&self) -> &CallJournal {
        &self.journal
    }
}

#[async_trait]
impl Addon for MockAddon {
    fn manifest(&self) -> AddonManifest {
        self.manifest.clone()
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        self.journal.record(&self.manifest.identifier, "on_enable");
        self.on_enable.run()?;
        let id = &self.manifest.identifier;
        for name in &self.modules {
            let outcome = match ctx.load_module(name)? {
                Some(_) => "loaded",
                None => "host",
            };
            self.journal.record(id, &format!("{outcome}:{name}"));
        }
        for (other, range) in &self.checks {
            let present = match range {
                Some(range) => ctx.is_addon_available_in_range(other, range),
                None => ctx.is_addon_available(other),
            };
            let outcome = if present { "found" } else { "missing" };
            self.journal.record(id, &format!("{outcome}:{other}"));
        }
        for spec in &self.capabilities {
            ctx.register_capability(spec.clone())?;
        }
        Ok(())
    }

    async fn on_enable_async(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        tokio::task::yield_now().await;
        self.journal
            .record(&self.manifest.identifier, "on_enable_async");
        self.on_enable_async.run()
    }

    fn on_disable(&mut self) -> Result<(), AddonError> {
        self.journal.record(&self.manifest.identifier, "on_disable");
        if let Some(path) = &self.watched {
            let contents = std::fs::read_to_string(path).unwrap_or_default();
            self.journal
                .record(&self.manifest.identifier, &format!("read:{contents}"));
        }
        self.on_disable.run()
    }
}

type Factory = Arc<dyn Fn() -> Vec<Box<dyn Addon>> + Send + Sync>;

/// Module loader backed by in-process factories.
///
/// The file must exist, as with a real library. Its stem selects the
/// factory; stems without one open as plain libraries exporting nothing.
#[derive(Default)]
pub struct StaticModuleLoader {
    factories: Mutex<HashMap<String, Factory>>,
    opened: AtomicUsize,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the addons a module stem produces
    pub fn register(
        &self,
        stem: &str,
        factory: impl Fn() -> Vec<Box<dyn Addon>> + Send + Sync + 'static,
    ) {
        lock(&self.factories).insert(stem.to_string(), Arc::new(factory));
    }

    /// Module `stem` exports one fresh copy of `addon`
    pub fn add_addon(&self, stem: &str, addon: MockAddon) {
        self.register(stem, move || vec![Box::new(addon.clone()) as Box<dyn Addon>]);
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn ModuleHandle>, IsolationError> {
        if !path.is_file() {
            return Err(IsolationError::ModuleNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = module_name(path);
        let factory = {
            let factories = lock(&self.factories);
            factories
                .get(&name)
                .or_else(|| name.strip_prefix("lib").and_then(|n| factories.get(n)))
                .cloned()
        };
        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(StaticModule {
            name,
            path: path.to_path_buf(),
            factory,
        }))
    }
}

struct StaticModule {
    name: String,
    path: PathBuf,
    factory: Option<Factory>,
}

impl ModuleHandle for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self) -> Result<Vec<Box<dyn Addon>>, IsolationError> {
        Ok(self.factory.as_ref().map(|f| f()).unwrap_or_default())
    }
}

/// Write an addon directory with a placeholder module file named after it
pub fn install_addon_dir(addons_root: &Path, identifier: &str) -> std::io::Result<PathBuf> {
    let dir = addons_root.join(identifier);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(module_file_name(identifier)), b"")?;
    Ok(dir)
}

/// In-memory package registry counting every request
#[derive(Default)]
pub struct MockPackageSource {
    /// Lower-cased package id -> version -> archive
    packages: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    version_queries: AtomicUsize,
    downloads: AtomicUsize,
}

impl MockPackageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, package_id: &str, version: &str, archive: Vec<u8>) {
        lock(&self.packages)
            .entry(package_id.to_lowercase())
            .or_default()
            .insert(version.to_string(), archive);
    }

    /// Publish a package carrying one module file under `lib/`
    pub fn publish_module(
        &self,
        package_id: &str,
        version: &str,
        module: &str,
        contents: &[u8],
    ) -> Result<(), PackageError> {
        let path = format!("lib/{}", module_file_name(module));
        self.publish(package_id, version, build_archive(&[(path.as_str(), contents)])?);
        Ok(())
    }

    pub fn version_queries(&self) -> usize {
        self.version_queries.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Every request that would have hit the network
    pub fn fetch_count(&self) -> usize {
        self.version_queries() + self.downloads()
    }
}

#[async_trait]
impl PackageSource for MockPackageSource {
    async fn versions(&self, package_id: &str) -> Result<Vec<String>, PackageError> {
        self.version_queries.fetch_add(1, Ordering::SeqCst);
        lock(&self.packages)
            .get(&package_id.to_lowercase())
            .map(|versions| versions.keys().cloned().collect())
            .ok_or_else(|| PackageError::PackageNotFound {
                package: package_id.to_string(),
            })
    }

    async fn download(&self, package_id: &str, version: &str) -> Result<Vec<u8>, PackageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        lock(&self.packages)
            .get(&package_id.to_lowercase())
            .and_then(|versions| versions.get(version).cloned())
            .ok_or_else(|| PackageError::VersionNotAvailable {
                package: package_id.to_string(),
                version: version.to_string(),
            })
    }
}

/// Zip archive with the given `(path, contents)` entries
pub fn build_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (path, contents) in entries {
        writer.start_file(*path, options)?;
        writer.write_all(contents)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Host double: answers every prompt with one scripted choice and records
/// what it was told
pub struct RecordingHost {
    version: String,
    choice: Mutex<DialogChoice>,
    prompts: Mutex<Vec<ConfirmPrompt>>,
    messages: Mutex<Vec<(String, String)>>,
    error_reports: Mutex<Vec<usize>>,
    user_errors: Mutex<Vec<String>>,
    reloads: AtomicUsize,
}

impl RecordingHost {
    /// Host at `version` that cancels every prompt
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            choice: Mutex::new(DialogChoice::Cancel),
            prompts: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            error_reports: Mutex::new(Vec::new()),
            user_errors: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
        }
    }

    pub fn answer(&self, choice: DialogChoice) {
        *lock(&self.choice) = choice;
    }

    pub fn prompts(&self) -> Vec<ConfirmPrompt> {
        lock(&self.prompts).clone()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        lock(&self.messages).clone()
    }

    pub fn error_reports(&self) -> Vec<usize> {
        lock(&self.error_reports).clone()
    }

    pub fn user_errors(&self) -> Vec<String> {
        lock(&self.user_errors).clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostServices for RecordingHost {
    fn app_version(&self) -> String {
        self.version.clone()
    }

    async fn confirm(&self, prompt: &ConfirmPrompt) -> DialogChoice {
        lock(&self.prompts).push(prompt.clone());
        *lock(&self.choice)
    }

    async fn show_message(&self, title: &str, message: &str) {
        lock(&self.messages).push((title.to_string(), message.to_string()));
    }

    async fn report_addon_errors(&self, count: usize) {
        lock(&self.error_reports).push(count);
    }

    async fn reload_ui(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }

    fn user_error(&self, message: &str) {
        lock(&self.user_errors).push(message.to_string());
    }
}

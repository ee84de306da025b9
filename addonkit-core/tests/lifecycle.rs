//! Lifecycle tests for AddonManager
//!
//! Addons are served by StaticModuleLoader from placeholder module files in a
//! temporary addons root, so discovery, ordering and the enable/disable/delete
//! state machine run exactly as they would against native libraries.

use std::path::PathBuf;
use std::sync::Arc;

use addonkit_core::isolation::{ModuleHandle, module_file_name};
use addonkit_core::testing::{
    CallJournal, MockAddon, MockPackageSource, RecordingHost, StaticModuleLoader,
    install_addon_dir,
};
use addonkit_core::{
    Addon, AddonHostConfig, AddonManager, AddonState, CORE_ADDON_ID, CoreAddon, Dependency,
    DialogChoice, DisableOutcome, LoadingError, ManagerError,
};
use tempfile::TempDir;

const HOST_VERSION: &str = "2.0.0";

struct Harness {
    root: TempDir,
    host: Arc<RecordingHost>,
    loader: Arc<StaticModuleLoader>,
    source: Arc<MockPackageSource>,
    journal: CallJournal,
}

impl Harness {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            host: Arc::new(RecordingHost::new(HOST_VERSION)),
            loader: Arc::new(StaticModuleLoader::new()),
            source: Arc::new(MockPackageSource::new()),
            journal: CallJournal::new(),
        }
    }

    /// Place an addon directory and teach the loader its module
    fn install(&self, addon: MockAddon) -> PathBuf {
        let id = addon.manifest().identifier;
        self.install_as(&id, addon)
    }

    fn install_as(&self, dir_name: &str, addon: MockAddon) -> PathBuf {
        let dir = install_addon_dir(self.root.path(), dir_name).unwrap();
        self.loader
            .add_addon(dir_name, addon.with_journal(&self.journal));
        dir
    }

    fn write_meta(&self, json: &str) {
        std::fs::write(self.root.path().join("meta.json"), json).unwrap();
    }

    fn read_meta(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.root.path().join("meta.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn manager(&self) -> AddonManager {
        AddonManager::builder(
            AddonHostConfig::with_addons_dir(self.root.path()),
            self.host.clone(),
            Box::new(CoreAddon::new(HOST_VERSION)),
        )
        .loader(self.loader.clone())
        .package_source(self.source.clone())
        .build()
        .unwrap()
    }
}

fn errors_of(manager: &AddonManager, id: &str) -> Vec<LoadingError> {
    manager.addon(id).unwrap().errors().to_vec()
}

#[tokio::test]
async fn builtin_addon_is_enabled_before_installed_addons() {
    let h = Harness::new();
    h.install(
        MockAddon::new("a", "1.0.0")
            .depends_on(Dependency::addon(CORE_ADDON_ID).with_version("^2.0")),
    );

    let mut manager = h.manager();
    assert_eq!(manager.builtin().state(), AddonState::Disabled);

    let report = manager.start().await.unwrap();

    assert!(manager.builtin().is_enabled());
    assert!(manager.builtin().is_builtin());
    assert_eq!(manager.state("a"), Some(AddonState::Enabled));
    assert_eq!(report.loaded, 1);
    assert_eq!(report.enabled, 1);
    assert!(manager.capabilities().find("command", "addons").is_some());
}

#[tokio::test]
async fn addons_enable_in_dependency_order() {
    let h = Harness::new();
    // Discovery sees "app" first; its dependencies must still go first
    h.install(
        MockAddon::new("app", "1.0.0")
            .depends_on(Dependency::addon("lib"))
            .depends_on(Dependency::addon("util")),
    );
    h.install(MockAddon::new("lib", "1.0.0").depends_on(Dependency::addon("util")));
    h.install(MockAddon::new("util", "1.0.0"));

    let mut manager = h.manager();
    let report = manager.start().await.unwrap();
    assert_eq!(report.enabled, 3);

    let util = h.journal.position("util:on_enable").unwrap();
    let lib = h.journal.position("lib:on_enable").unwrap();
    let app = h.journal.position("app:on_enable").unwrap();
    assert!(util < lib && lib < app);

    // Async part runs after the sync part of the same addon
    assert!(h.journal.position("lib:on_enable_async").unwrap() > lib);
}

#[tokio::test]
async fn missing_required_dependency_keeps_addon_disabled() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("ghost")));

    let mut manager = h.manager();
    let report = manager.start().await.unwrap();

    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
    assert_eq!(
        errors_of(&manager, "a"),
        vec![LoadingError::MissingDependency {
            identifier: "ghost".into()
        }]
    );
    assert_eq!(h.journal.count("a:on_enable"), 0);
    assert_eq!(report.addons_with_errors, 1);
    assert_eq!(h.host.error_reports(), vec![1]);

    // A later enable attempt still fails the same way
    assert!(!manager.enable("a").await.unwrap());
    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
}

#[tokio::test]
async fn missing_optional_dependency_is_ignored() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("ghost").optional()));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("a"), Some(AddonState::Enabled));
    assert!(errors_of(&manager, "a").is_empty());
    assert!(h.host.error_reports().is_empty());
}

#[tokio::test]
async fn incompatible_dependency_version_is_recorded() {
    let h = Harness::new();
    h.install(
        MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("b").with_version("^2.0.0")),
    );
    h.install(MockAddon::new("b", "1.4.0"));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("b"), Some(AddonState::Enabled));
    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
    assert_eq!(
        errors_of(&manager, "a"),
        vec![LoadingError::IncompatibleAddonVersion {
            identifier: "b".into(),
            required: "^2.0.0".into(),
            found: "1.4.0".into(),
        }]
    );
}

#[tokio::test]
async fn circular_dependency_aborts_the_whole_batch() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("b")));
    h.install(MockAddon::new("b", "1.0.0").depends_on(Dependency::addon("a")));
    h.install(MockAddon::new("c", "1.0.0"));

    let mut manager = h.manager();
    let report = manager.start().await.unwrap();

    let a_errors = errors_of(&manager, "a");
    let b_errors = errors_of(&manager, "b");
    assert_eq!(a_errors.len(), 1);
    assert_eq!(a_errors, b_errors);
    let LoadingError::CircularDependency { cycle } = &a_errors[0] else {
        panic!("expected a circular dependency, got {:?}", a_errors[0]);
    };
    assert_eq!(cycle.len(), 2);
    assert!(cycle.contains(&"a".to_string()) && cycle.contains(&"b".to_string()));

    // Nothing from the batch is enabled, the built-in addon is unaffected
    assert_eq!(manager.state("c"), Some(AddonState::Disabled));
    assert!(errors_of(&manager, "c").is_empty());
    assert!(manager.builtin().is_enabled());
    assert_eq!(report.enabled, 0);
}

#[tokio::test]
async fn failing_enable_is_contained() {
    let h = Harness::new();
    h.install(
        MockAddon::new("broken", "1.0.0")
            .fail_enable("boom")
            .with_capability("command", "x"),
    );
    h.install(MockAddon::new("panicky", "1.0.0").panic_on_enable("kaboom"));
    h.install(MockAddon::new("fine", "1.0.0"));

    let mut manager = h.manager();
    let report = manager.start().await.unwrap();

    assert_eq!(manager.state("fine"), Some(AddonState::Enabled));
    assert_eq!(manager.state("broken"), Some(AddonState::Disabled));
    assert_eq!(manager.state("panicky"), Some(AddonState::Disabled));
    assert_eq!(
        errors_of(&manager, "broken"),
        vec![LoadingError::LoadException {
            message: "boom".into()
        }]
    );
    assert_eq!(
        errors_of(&manager, "panicky"),
        vec![LoadingError::LoadException {
            message: "panicked: kaboom".into()
        }]
    );
    assert!(manager.capabilities().find("command", "x").is_none());
    assert_eq!(report.addons_with_errors, 2);
    assert_eq!(h.host.error_reports(), vec![2]);
}

#[tokio::test]
async fn failing_async_enable_discards_capabilities() {
    let h = Harness::new();
    h.install(
        MockAddon::new("a", "1.0.0")
            .with_capability("command", "go")
            .fail_enable_async("late failure"),
    );

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
    assert_eq!(h.journal.count("a:on_enable"), 1);
    assert!(manager.capabilities().by_addon("a").is_empty());
}

#[tokio::test]
async fn conflicting_capability_fails_the_second_addon() {
    let h = Harness::new();
    h.install(MockAddon::new("first", "1.0.0").with_capability("command", "format"));
    h.install(MockAddon::new("second", "1.0.0").with_capability("command", "format"));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("first"), Some(AddonState::Enabled));
    assert_eq!(manager.state("second"), Some(AddonState::Disabled));
    assert_eq!(manager.capabilities().find("command", "format").unwrap().addon, "first");
    let message = errors_of(&manager, "second")[0].to_string();
    assert!(message.contains("command:format"));
    assert!(message.contains("first"));
}

#[tokio::test]
async fn host_version_bounds_are_enforced() {
    let h = Harness::new();
    h.install(MockAddon::new("future", "1.0.0").with_host_bounds(Some("3.0"), None));
    h.install(MockAddon::new("legacy", "1.0.0").with_host_bounds(None, Some("1.9")));
    h.install(MockAddon::new("current", "1.0.0").with_host_bounds(Some("2.0"), Some("2.5")));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(
        errors_of(&manager, "future"),
        vec![LoadingError::OutdatedHost {
            required: "3.0".into(),
            current: HOST_VERSION.into(),
        }]
    );
    assert!(matches!(
        errors_of(&manager, "legacy").as_slice(),
        [LoadingError::OutdatedAddon { .. }]
    ));
    assert_eq!(manager.state("current"), Some(AddonState::Enabled));
}

#[tokio::test]
async fn user_disabled_addons_stay_disabled() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0"));
    h.install(MockAddon::new("b", "1.0.0"));
    h.write_meta(r#"{ "a": false, "b": true, "uninstalled": true }"#);

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
    assert!(errors_of(&manager, "a").is_empty());
    assert_eq!(manager.state("b"), Some(AddonState::Enabled));
    assert_eq!(h.journal.count("a:on_enable"), 0);

    let meta = h.read_meta();
    assert_eq!(meta["a"], false);
    assert_eq!(meta["b"], true);
    assert!(meta.get(CORE_ADDON_ID).is_none());
}

#[tokio::test]
async fn corrupt_meta_store_is_reset() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0"));
    h.write_meta("not json at all");

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("a"), Some(AddonState::Enabled));
    assert_eq!(h.read_meta()["a"], true);
}

#[tokio::test]
async fn disabled_dependency_blocks_dependent() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("b")));
    h.install(MockAddon::new("b", "1.0.0"));
    h.write_meta(r#"{ "b": false }"#);

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(
        errors_of(&manager, "a"),
        vec![LoadingError::DependencyNotEnabled {
            identifier: "b".into()
        }]
    );

    // Enabling the dependency then retrying clears the old errors
    assert!(manager.enable("b").await.unwrap());
    assert!(manager.enable("a").await.unwrap());
    assert!(errors_of(&manager, "a").is_empty());
    assert_eq!(h.read_meta()["b"], true);
}

#[tokio::test]
async fn rejected_confirmation_leaves_everything_unchanged() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").named("Alpha").depends_on(Dependency::addon("b")));
    h.install(MockAddon::new("b", "1.0.0").named("Beta").with_capability("command", "b"));

    let mut manager = h.manager();
    manager.start().await.unwrap();
    let before = manager.summaries();
    let reloads = h.host.reload_count();

    h.host.answer(DialogChoice::Secondary);
    let outcome = manager.disable("b").await.unwrap();

    assert_eq!(outcome, DisableOutcome::Cancelled);
    assert_eq!(manager.summaries(), before);
    assert_eq!(h.journal.count("b:on_disable"), 0);
    assert!(manager.capabilities().find("command", "b").is_some());
    assert_eq!(h.host.reload_count(), reloads);

    let prompts = h.host.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].title, "Disable dependent addons?");
    assert_eq!(prompts[0].primary, "Disable Anyway");
    assert_eq!(prompts[0].affected, vec!["a"]);
    assert!(prompts[0].message.contains("'Beta'"));
    assert!(prompts[0].message.contains("Alpha"));
}

#[tokio::test]
async fn confirmed_disable_cascades_dependents_first() {
    let h = Harness::new();
    let meta_path = h.root.path().join("meta.json");
    h.install(MockAddon::new("base", "1.0.0").reads_on_disable(&meta_path));
    h.install(MockAddon::new("mid", "1.0.0").depends_on(Dependency::addon("base")));
    h.install(MockAddon::new("top", "1.0.0").depends_on(Dependency::addon("mid")));
    h.install(
        MockAddon::new("loose", "1.0.0").depends_on(Dependency::addon("base").optional()),
    );

    let mut manager = h.manager();
    manager.start().await.unwrap();
    assert_eq!(
        manager.dependents_requiring_confirmation("base"),
        vec!["top", "mid"]
    );

    h.host.answer(DialogChoice::Primary);
    let outcome = manager.disable("base").await.unwrap();
    assert_eq!(outcome, DisableOutcome::Disabled);

    let top = h.journal.position("top:on_disable").unwrap();
    let mid = h.journal.position("mid:on_disable").unwrap();
    let base = h.journal.position("base:on_disable").unwrap();
    assert!(top < mid && mid < base);

    for id in ["base", "mid", "top"] {
        assert_eq!(manager.state(id), Some(AddonState::Disabled));
    }
    // Optional dependents are left alone
    assert_eq!(manager.state("loose"), Some(AddonState::Enabled));

    // Each dependent's flag was on disk before the next addon was touched
    let seen = h
        .journal
        .entries()
        .into_iter()
        .find_map(|e| e.strip_prefix("base:read:").map(str::to_string))
        .unwrap();
    let seen: serde_json::Value = serde_json::from_str(&seen).unwrap();
    assert_eq!(seen["top"], false);
    assert_eq!(seen["mid"], false);
    assert_eq!(seen["base"], true);

    let meta = h.read_meta();
    assert_eq!(meta["base"], false);
    assert_eq!(meta["mid"], false);
    assert_eq!(meta["top"], false);
    assert_eq!(meta["loose"], true);

    assert_eq!(manager.disable("base").await.unwrap(), DisableOutcome::AlreadyDisabled);
}

#[tokio::test]
async fn failing_disable_still_disables() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").fail_disable("stuck").with_capability("command", "a"));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.disable("a").await.unwrap(), DisableOutcome::Disabled);
    assert_eq!(manager.state("a"), Some(AddonState::Disabled));
    assert!(manager.capabilities().by_addon("a").is_empty());
}

#[tokio::test]
async fn builtin_addon_cannot_be_deleted_or_disabled() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0"));

    let mut manager = h.manager();
    manager.start().await.unwrap();
    let before = manager.summaries();
    let meta_before = h.read_meta();

    let err = manager.delete(CORE_ADDON_ID).await.unwrap_err();
    assert!(matches!(err, ManagerError::BuiltinProtected { action: "deleted", .. }));

    let err = manager.disable(CORE_ADDON_ID).await.unwrap_err();
    assert!(matches!(err, ManagerError::BuiltinProtected { action: "disabled", .. }));

    assert_eq!(manager.summaries(), before);
    assert_eq!(h.read_meta(), meta_before);
    assert_eq!(h.host.user_errors().len(), 2);
}

#[tokio::test]
async fn unknown_identifiers_are_reported() {
    let h = Harness::new();
    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert!(matches!(
        manager.enable("nope").await,
        Err(ManagerError::NotFound { .. })
    ));
    assert!(matches!(
        manager.delete("nope").await,
        Err(ManagerError::NotFound { .. })
    ));
    assert!(matches!(manager.start().await, Err(ManagerError::AlreadyStarted)));
}

#[tokio::test]
async fn delete_tears_down_and_removes_module() {
    let h = Harness::new();
    let dir = h.install(MockAddon::new("a", "1.0.0").with_capability("command", "a"));

    let mut manager = h.manager();
    manager.start().await.unwrap();
    assert!(manager.registry().is_registered("a"));

    manager.delete("a").await.unwrap();

    assert_eq!(h.journal.count("a:on_disable"), 1);
    assert!(manager.addon("a").is_none());
    assert!(!manager.registry().is_registered("a"));
    assert_eq!(manager.registry().module_count(), 0);
    assert!(!dir.join(module_file_name("a")).exists());
    assert!(manager.capabilities().by_addon("a").is_empty());
    assert!(h.read_meta().get("a").is_none());
}

#[tokio::test]
async fn reinstall_after_delete_needs_restart() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").named("Alpha"));

    let mut manager = h.manager();
    manager.start().await.unwrap();
    manager.delete("a").await.unwrap();

    let dir = install_addon_dir(h.root.path(), "a").unwrap();
    let id = manager.install_from_directory(&dir).await.unwrap();
    assert_eq!(id, "a");

    let record = manager.addon("a").unwrap();
    assert!(record.needs_restart());
    assert_eq!(record.state(), AddonState::Disabled);
    assert_eq!(
        record.errors(),
        [LoadingError::RestartRequired {
            name: "Alpha".into()
        }]
    );
    assert!(!record.has_critical_errors());

    let messages = h.host.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("Alpha"));
}

#[tokio::test]
async fn addon_loads_module_shipped_by_sibling() {
    let h = Harness::new();
    let provider = h.install(MockAddon::new("provider", "1.0.0"));
    std::fs::write(provider.join(module_file_name("shared")), b"").unwrap();
    h.install(
        MockAddon::new("consumer", "1.0.0")
            .loads_module("shared")
            .loads_module("absent"),
    );

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("consumer"), Some(AddonState::Enabled));
    assert_eq!(h.journal.count("consumer:loaded:shared"), 1);
    assert_eq!(h.journal.count("consumer:host:absent"), 1);

    let registry = manager.registry();
    assert_eq!(registry.owner_of("shared").as_deref(), Some("consumer"));
    let shared = registry.cached("shared").unwrap();
    assert_eq!(shared.path(), provider.join(module_file_name("shared")).as_path());
    assert!(registry.cached("absent").is_none());
}

#[tokio::test]
async fn optional_dependency_is_visible_to_addon_code() {
    let h = Harness::new();
    h.install(MockAddon::new("spellcheck", "1.2.0"));
    h.install(
        MockAddon::new("editor", "1.0.0")
            .depends_on(Dependency::addon("spellcheck").with_version("^1.0").optional())
            .checks_for("spellcheck", Some("^1.0"))
            .checks_for("thesaurus", None),
    );

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("editor"), Some(AddonState::Enabled));
    assert_eq!(h.journal.count("editor:found:spellcheck"), 1);
    assert_eq!(h.journal.count("editor:missing:thesaurus"), 1);
}

#[tokio::test]
async fn out_of_range_optional_dependency_reads_as_missing() {
    let h = Harness::new();
    h.install(MockAddon::new("spellcheck", "2.0.0"));
    h.install(
        MockAddon::new("editor", "1.0.0")
            .depends_on(Dependency::addon("spellcheck").with_version("^1.0").optional())
            .checks_for("spellcheck", Some("^1.0")),
    );

    let mut manager = h.manager();
    manager.start().await.unwrap();

    assert_eq!(manager.state("editor"), Some(AddonState::Enabled));
    assert!(errors_of(&manager, "editor").is_empty());
    assert_eq!(h.journal.count("editor:missing:spellcheck"), 1);
}

#[tokio::test]
async fn install_from_directory_enables_new_addon() {
    let h = Harness::new();
    h.install(MockAddon::new("base", "1.2.0"));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    let dir = h.install(
        MockAddon::new("plugin", "0.1.0")
            .depends_on(Dependency::addon("base").with_version("~1.2")),
    );
    let id = manager.install_from_directory(&dir).await.unwrap();

    assert_eq!(manager.state(&id), Some(AddonState::Enabled));
    assert!(manager.is_available("plugin"));
    assert!(manager.is_available_in_range("base", ">=1.0 <2.0"));
    assert!(!manager.is_available_in_range("base", "^2.0"));

    // Installing the same directory twice is rejected
    assert!(matches!(
        manager.install_from_directory(&dir).await,
        Err(ManagerError::Discovery { .. })
    ));
}

#[tokio::test]
async fn discovery_failures_skip_only_the_bad_directory() {
    let h = Harness::new();
    h.install(MockAddon::new("good", "1.0.0"));
    // Plain library: the module exports no addon
    install_addon_dir(h.root.path(), "plain").unwrap();
    // Two addons in one module
    install_addon_dir(h.root.path(), "double").unwrap();
    h.loader.register("double", || {
        vec![
            Box::new(MockAddon::new("d1", "1.0.0")) as Box<dyn Addon>,
            Box::new(MockAddon::new("d2", "1.0.0")),
        ]
    });
    // Identifier already taken by another directory, and the reserved one
    h.install_as("impostor", MockAddon::new("good", "2.0.0"));
    h.install_as("fake-core", MockAddon::new(CORE_ADDON_ID, "9.0.0"));
    // Directory without a module file
    std::fs::create_dir_all(h.root.path().join("empty")).unwrap();

    let mut manager = h.manager();
    let report = manager.start().await.unwrap();

    assert_eq!(report.loaded, 1);
    assert_eq!(manager.addons(AddonState::Installed).len(), 2);
    assert_eq!(manager.addon("good").unwrap().manifest().version, "1.0.0");
    assert_eq!(manager.addons(AddonState::Enabled).len(), 2);
    assert!(manager.addons(AddonState::Disabled).is_empty());
    // Rejected directories leave nothing registered behind
    assert_eq!(manager.registry().context_count(), 1);
}

#[tokio::test]
async fn summaries_serialize_for_presentation() {
    let h = Harness::new();
    h.install(MockAddon::new("a", "1.0.0").depends_on(Dependency::addon("ghost")));

    let mut manager = h.manager();
    manager.start().await.unwrap();

    let json = serde_json::to_value(manager.summaries()).unwrap();
    assert_eq!(json[0]["identifier"], CORE_ADDON_ID);
    assert_eq!(json[0]["builtin"], true);
    assert_eq!(json[1]["state"], "disabled");
    assert_eq!(json[1]["has_critical_errors"], true);
}

//! Isolation contexts created, used and torn down from many threads at once

use std::sync::Arc;
use std::thread;

use addonkit_core::isolation::module_file_name;
use addonkit_core::testing::{StaticModuleLoader, install_addon_dir};
use addonkit_core::{IsolationContext, ModuleLoader, ModuleRegistry};
use tempfile::TempDir;

const WORKERS: usize = 16;

fn context(
    root: &TempDir,
    id: &str,
    registry: &Arc<ModuleRegistry>,
    loader: &Arc<StaticModuleLoader>,
) -> IsolationContext {
    let main = root.path().join(id).join(module_file_name(id));
    IsolationContext::new(
        id,
        main,
        registry.clone(),
        loader.clone() as Arc<dyn ModuleLoader>,
    )
}

#[test]
fn concurrent_loads_of_one_module_share_a_single_instance() {
    let root = TempDir::new().unwrap();
    let registry = Arc::new(ModuleRegistry::new());
    let loader = Arc::new(StaticModuleLoader::new());

    let provider_dir = install_addon_dir(root.path(), "provider").unwrap();
    std::fs::write(provider_dir.join(module_file_name("shared")), b"").unwrap();
    let _provider = context(&root, "provider", &registry, &loader);

    let ids: Vec<String> = (0..WORKERS).map(|i| format!("worker-{i}")).collect();
    for id in &ids {
        install_addon_dir(root.path(), id).unwrap();
    }

    let handles = thread::scope(|scope| {
        let spawned: Vec<_> = ids
            .iter()
            .map(|id| {
                let (root, registry, loader) = (&root, &registry, &loader);
                scope.spawn(move || {
                    let ctx = context(root, id, registry, loader);
                    ctx.load_main().unwrap();
                    let shared = ctx.load("shared").unwrap().unwrap();
                    (ctx, shared)
                })
            })
            .collect();
        spawned
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    let first = &handles[0].1;
    for (_, shared) in &handles {
        assert!(Arc::ptr_eq(first, shared));
    }
    assert_eq!(registry.context_count(), WORKERS + 1);
    // Every worker's own module plus the shared one
    assert_eq!(registry.module_count(), WORKERS + 1);
    assert!(registry.owner_of("shared").is_some());
}

#[test]
fn concurrent_unloads_leave_the_registry_empty() {
    let root = TempDir::new().unwrap();
    let registry = Arc::new(ModuleRegistry::new());
    let loader = Arc::new(StaticModuleLoader::new());

    let contexts: Vec<IsolationContext> = (0..WORKERS)
        .map(|i| {
            let id = format!("addon-{i}");
            install_addon_dir(root.path(), &id).unwrap();
            let ctx = context(&root, &id, &registry, &loader);
            ctx.load_main().unwrap();
            ctx
        })
        .collect();
    assert_eq!(registry.module_count(), WORKERS);

    thread::scope(|scope| {
        for ctx in &contexts {
            scope.spawn(move || {
                ctx.unload();
                // Second unload is a no-op
                ctx.unload();
            });
        }
    });

    assert_eq!(registry.context_count(), 0);
    assert_eq!(registry.module_count(), 0);
    for ctx in &contexts {
        assert!(ctx.is_unloaded());
        assert!(ctx.load_main().is_err());
    }
}

#[test]
fn register_and_drop_churn_is_consistent() {
    let root = TempDir::new().unwrap();
    let registry = Arc::new(ModuleRegistry::new());
    let loader = Arc::new(StaticModuleLoader::new());

    for i in 0..WORKERS {
        install_addon_dir(root.path(), &format!("churn-{i}")).unwrap();
    }

    thread::scope(|scope| {
        for i in 0..WORKERS {
            let (root, registry, loader) = (&root, &registry, &loader);
            scope.spawn(move || {
                let id = format!("churn-{i}");
                for _ in 0..25 {
                    let ctx = context(root, &id, registry, loader);
                    ctx.load_main().unwrap();
                    assert!(registry.is_registered(&id));
                    drop(ctx);
                }
            });
        }
    });

    assert_eq!(registry.context_count(), 0);
    assert_eq!(registry.module_count(), 0);
    assert_eq!(loader.open_count(), WORKERS * 25);
}

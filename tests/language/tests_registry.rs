use std::sync::atomic::{AtomicUsize, Ordering};

use grove::{Language, LanguageRegistry, parse};

use crate::helpers::grammars;

#[test]
fn test_registry_loads_blob_once() {
    let registry = LanguageRegistry::new();
    let bytes = grammars::statements_builder().to_bytes().unwrap();
    let loads = AtomicUsize::new(0);
    let load = || {
        loads.fetch_add(1, Ordering::SeqCst);
        Language::load(&bytes)
    };

    let first = registry.get_or_load("statements", load).unwrap();
    let second = registry
        .get_or_load("statements", || Language::load(&bytes))
        .unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(!parse(&second, "aa;", None).has_error());
}

#[test]
fn test_load_errors_propagate() {
    let registry = LanguageRegistry::new();
    let err = registry
        .get_or_load("corrupt", || Language::load(b"GRVE"))
        .unwrap_err();
    assert!(err.is_malformed());
    assert!(registry.is_empty());
}

#[test]
fn test_insert_replaces_entry() {
    let registry = LanguageRegistry::new();
    assert!(registry.insert("doc", grammars::statements()).is_none());
    let previous = registry.insert("doc", grammars::assignment()).unwrap();
    assert!(!parse(&previous, "aa;", None).has_error());

    let current = registry.get("doc").unwrap();
    assert!(!parse(&current, "a = 1", None).has_error());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_shared_across_parsing_threads() {
    let registry = LanguageRegistry::new();
    let loads = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let language = registry
                    .get_or_load("lines", || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        Ok(grammars::lines())
                    })
                    .unwrap();
                assert!(!parse(&language, "ab\ncd\n", None).has_error());
            });
        }
    });
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    let names = registry.names();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].as_str(), "lines");
}

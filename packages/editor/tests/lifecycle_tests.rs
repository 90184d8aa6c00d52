//! Manager and wrapper lifecycle: ready, destroy, view binding

use quire_editor::{
    create_editor_manager, CallLog, EditorError, EditorWrapper, Extension, HeadlessView, ManagerPhase,
    ManagerSettings, WrapperProps,
};
use serde_json::Value;
use std::rc::Rc;

/// Extension logging each lifecycle hook as `<hook>:<name>`
fn lifecycle(name: &str, log: &CallLog) -> Extension {
    let (create, ready, destroy) = (log.clone(), log.clone(), log.clone());
    Extension::new(name)
        .on_create(move |ctx| create.record(format!("create:{}", ctx.name())))
        .on_ready(move |ctx| ready.record(format!("ready:{}", ctx.name())))
        .on_destroy(move |ctx| destroy.record(format!("destroy:{}", ctx.name())))
}

#[test]
fn test_hooks_fire_in_registry_order() {
    let log = CallLog::new();
    let manager = create_editor_manager(
        vec![
            lifecycle("low", &log).with_priority(1).into(),
            lifecycle("high", &log).with_priority(500).into(),
        ],
        ManagerSettings::default(),
    )
    .unwrap();

    manager.ready().unwrap();
    manager.destroy();

    assert_eq!(
        log.entries(),
        vec!["create:high", "create:low", "ready:high", "ready:low", "destroy:low", "destroy:high"]
    );
}

#[test]
fn test_ready_is_idempotent() {
    let log = CallLog::new();
    let manager = create_editor_manager(vec![lifecycle("ext", &log).into()], ManagerSettings::default()).unwrap();
    assert_eq!(manager.phase(), ManagerPhase::Constructed);

    for _ in 0..3 {
        manager.ready().unwrap();
    }

    assert_eq!(log.count("ready:"), 1);
    assert_eq!(manager.phase(), ManagerPhase::Ready);
}

#[test]
fn test_destroy_twice_tears_down_once() {
    let log = CallLog::new();
    let manager = create_editor_manager(vec![lifecycle("ext", &log).into()], ManagerSettings::default()).unwrap();

    manager.destroy();
    manager.destroy();

    assert_eq!(log.count("destroy:"), 1);
    assert!(manager.is_destroyed());
    assert!(matches!(manager.schema(), Err(EditorError::ManagerDestroyed)));
    assert!(matches!(manager.create_state("", None), Err(EditorError::ManagerDestroyed)));
    assert!(matches!(manager.ready(), Err(EditorError::ManagerDestroyed)));
}

#[test]
fn test_mount_builds_view_then_readies() {
    let log = CallLog::new();
    let manager = create_editor_manager(vec![lifecycle("ext", &log).into()], ManagerSettings::default()).unwrap();
    let on_change = log.clone();
    let props = WrapperProps::new()
        .on_change(move |event| on_change.record(format!("on_change:first={}", event.first_render)));

    let editor = EditorWrapper::mount(manager, HeadlessView::new(log.clone()), props).unwrap();

    assert_eq!(
        log.entries(),
        vec!["create:ext", "view.construct:0", "on_change:first=true", "ready:ext"]
    );
    assert!(editor.handle().is_some());
    assert_eq!(editor.manager().phase(), ManagerPhase::Ready);
}

#[test]
fn test_view_binds_once() {
    let manager = create_editor_manager(vec![], ManagerSettings::default()).unwrap();
    let mut editor = EditorWrapper::new(manager, HeadlessView::default(), WrapperProps::new()).unwrap();
    assert!(editor.handle().is_none());

    let handle = editor.create_view().unwrap();
    assert_eq!(handle.attributes.get("role").map(String::as_str), Some("textbox"));
    assert!(matches!(editor.create_view(), Err(EditorError::ViewAlreadyBound)));
}

#[test]
fn test_wrapper_destroy_is_idempotent() {
    let log = CallLog::new();
    let manager = create_editor_manager(vec![lifecycle("ext", &log).into()], ManagerSettings::default()).unwrap();
    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(log.clone()), WrapperProps::new()).unwrap();

    editor.destroy();
    editor.destroy();

    assert_eq!(log.count("view.destroy"), 1);
    assert_eq!(log.count("destroy:ext"), 1);
    assert!(editor.is_destroyed());
    assert!(editor.view().is_destroyed());
    assert!(editor.manager().is_destroyed());
}

#[test]
fn test_operations_after_destroy_fail() {
    let manager = create_editor_manager(vec![], ManagerSettings::default()).unwrap();
    let shared = Rc::clone(&manager);
    let mut editor = EditorWrapper::mount(manager, HeadlessView::default(), WrapperProps::new()).unwrap();
    editor.destroy();

    // The manager outlives this wrapper, so the wrapper itself reports unbound
    let tr = editor.state().tr().insert_text(1, "a");
    assert!(matches!(editor.dispatch(tr), Err(EditorError::ViewNotBound)));
    assert!(matches!(
        editor.run_command("insertText", &Value::from("a")),
        Err(EditorError::ViewNotBound)
    ));
    assert!(matches!(editor.clear_content(), Err(EditorError::ViewNotBound)));
    assert!(matches!(editor.create_view(), Err(EditorError::ViewNotBound)));
    assert!(!shared.is_destroyed());
}

#[test]
fn test_shared_manager_survives_one_wrapper() {
    let log = CallLog::new();
    let manager = create_editor_manager(vec![lifecycle("ext", &log).into()], ManagerSettings::default()).unwrap();

    let mut first = EditorWrapper::mount(Rc::clone(&manager), HeadlessView::default(), WrapperProps::new()).unwrap();
    let mut second = EditorWrapper::mount(Rc::clone(&manager), HeadlessView::default(), WrapperProps::new()).unwrap();
    drop(manager);

    first.destroy();
    assert!(!second.manager().is_destroyed());
    assert!(second.run_command("insertText", &Value::from("still here")).unwrap());

    second.destroy();
    assert!(second.manager().is_destroyed());
    assert_eq!(log.count("ready:"), 1);
    assert_eq!(log.count("destroy:"), 1);
}

#[test]
fn test_destroyed_manager_rejects_wrapper() {
    let manager = create_editor_manager(vec![], ManagerSettings::default()).unwrap();
    let mut editor = EditorWrapper::mount(Rc::clone(&manager), HeadlessView::default(), WrapperProps::new()).unwrap();
    manager.destroy();

    let tr = editor.state().tr().insert_text(1, "a");
    assert!(matches!(editor.dispatch(tr), Err(EditorError::ManagerDestroyed)));
    assert!(EditorWrapper::new(manager, HeadlessView::default(), WrapperProps::new()).is_err());
}

#[test]
fn test_destroy_from_ready_hook_stops_ready() {
    let log = CallLog::new();
    let ready = log.clone();
    let killer = lifecycle("first", &log).with_priority(500).on_ready(move |ctx| {
        ready.record("ready:first");
        ctx.manager().destroy();
    });
    let manager = create_editor_manager(
        vec![killer.into(), lifecycle("second", &log).with_priority(1).into()],
        ManagerSettings::default(),
    )
    .unwrap();

    manager.ready().unwrap();

    assert_eq!(
        log.entries(),
        vec!["create:first", "create:second", "ready:first", "destroy:second", "destroy:first"]
    );
    assert!(manager.is_destroyed());
    assert!(matches!(manager.ready(), Err(EditorError::ManagerDestroyed)));
}

#[test]
fn test_destroy_from_update_hook_stops_fan_out() {
    let log = CallLog::new();
    let first = log.clone();
    let second = log.clone();
    let killer = Extension::new("killer").with_priority(500).on_state_update(move |ctx, _| {
        first.record("update:killer");
        ctx.manager().destroy();
    });
    let bystander = Extension::new("bystander")
        .with_priority(1)
        .on_state_update(move |_, _| second.record("update:bystander"));
    let manager = create_editor_manager(vec![killer.into(), bystander.into()], ManagerSettings::default()).unwrap();
    let mut editor = EditorWrapper::mount(manager, HeadlessView::default(), WrapperProps::new()).unwrap();

    editor.run_command("insertText", &Value::from("a")).unwrap();

    assert_eq!(log.entries(), vec!["update:killer"]);
    assert!(editor.manager().is_destroyed());
    assert!(matches!(
        editor.run_command("insertText", &Value::from("b")),
        Err(EditorError::ManagerDestroyed)
    ));
}

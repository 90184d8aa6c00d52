//! End-to-end scenarios: composing extensions into a working editor

use quire_editor::model::{Mark, MarkSpec, NodeSpec};
use quire_editor::{
    create_editor_manager, CallLog, EditorError, EditorWrapper, Extension, HeadlessView, ManagerSettings,
    WrapperProps,
};

#[test]
fn test_base_and_bold_compose() -> anyhow::Result<()> {
    let log = CallLog::new();
    let updates = log.clone();

    let base = Extension::new("Base")
        .with_priority(0)
        .with_node(NodeSpec::new("paragraph").with_content("inline*").with_group("block"));
    let bold = Extension::new("Bold")
        .with_priority(1)
        .with_mark(MarkSpec::new("bold"))
        .on_state_update(move |_, update| updates.record(format!("update:{}", update.state.version())));

    let manager = create_editor_manager(vec![base.into(), bold.into()], ManagerSettings::default())?;

    // Base replaces the baseline paragraph
    assert_eq!(manager.type_owners()?.get("paragraph").map(String::as_str), Some("Base"));

    let state = manager.create_state("", None)?;
    assert_eq!(state.doc().child_count(), 1);
    assert_eq!(state.doc().content[0].kind, "paragraph");
    assert_eq!(state.doc().content[0].child_count(), 0);

    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(log.clone()), WrapperProps::new())?;
    let tr = editor
        .state()
        .tr()
        .insert_text(1, "a")
        .add_mark(1, 2, Mark::new("bold"));
    editor.dispatch(tr)?;

    let text = &editor.state().doc().content[0].content[0];
    assert_eq!(text.text.as_deref(), Some("a"));
    assert!(text.has_mark("bold"));
    assert_eq!(log.count("update:"), 1);
    Ok(())
}

#[test]
fn test_two_paragraph_contributors_conflict() {
    let first = Extension::new("ParagraphOne")
        .with_node(NodeSpec::new("paragraph").with_content("inline*").with_group("block"));
    let second = Extension::new("ParagraphTwo")
        .with_node(NodeSpec::new("paragraph").with_content("text*").with_group("block"));

    let err = create_editor_manager(vec![first.into(), second.into()], ManagerSettings::default()).unwrap_err();
    let message = err.to_string();

    assert!(matches!(err, EditorError::SchemaConflict { .. }));
    assert!(message.contains("ParagraphOne"));
    assert!(message.contains("ParagraphTwo"));
}

#[test]
fn test_missing_dependency_fails_build() {
    let dependent = Extension::new("Dependent").requires("missing-ext");
    let err = create_editor_manager(vec![dependent.into()], ManagerSettings::default()).unwrap_err();

    match err {
        EditorError::MissingDependency { extension, dependency } => {
            assert_eq!(extension, "Dependent");
            assert_eq!(dependency, "missing-ext");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_same_input_same_schema() -> anyhow::Result<()> {
    let items = || {
        vec![
            quire_editor::builtin::heading().into(),
            quire_editor::builtin::italic().into(),
            quire_editor::builtin::bold().with_priority(500).into(),
        ]
    };
    let first = create_editor_manager(items(), ManagerSettings::default())?;
    let second = create_editor_manager(items(), ManagerSettings::default())?;

    let names = |m: &quire_editor::EditorManager| -> anyhow::Result<Vec<String>> {
        let schema = m.schema()?;
        Ok(schema
            .node_types()
            .map(|t| t.name().to_string())
            .chain(schema.mark_types().map(|t| t.name().to_string()))
            .collect())
    };
    assert_eq!(names(&first)?, names(&second)?);
    assert_eq!(names(&first)?, vec!["doc", "paragraph", "text", "heading", "bold", "italic"]);
    Ok(())
}

#[test]
fn test_bold_command_end_to_end() -> anyhow::Result<()> {
    let manager = create_editor_manager(vec![quire_editor::builtin::bold().into()], ManagerSettings::default())?;
    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(CallLog::new()), WrapperProps::new())?;

    editor.run_command("insertText", &"Hello".into())?;
    editor.run_command("selectAll", &serde_json::Value::Null)?;
    assert!(editor.run_command("toggleBold", &serde_json::Value::Null)?);

    let paragraph = &editor.state().doc().content[0];
    assert!(paragraph.content.iter().all(|t| t.has_mark("bold")));
    assert_eq!(paragraph.text_content(), "Hello");
    Ok(())
}

#[test]
fn test_typing_over_select_all() -> anyhow::Result<()> {
    let manager = create_editor_manager(vec![], ManagerSettings::default())?;
    let props = WrapperProps::new().with_content(quire_editor::Content::with_handler("Hello\nWorld", "text"));
    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(CallLog::new()), props)?;

    editor.run_command("selectAll", &serde_json::Value::Null)?;
    assert!(editor.run_command("insertText", &"x".into())?);

    assert_eq!(editor.state().doc().child_count(), 1);
    assert_eq!(editor.state().doc().text_content(), "x");
    editor.run_command("insertText", &"y".into())?;
    assert_eq!(editor.state().doc().text_content(), "xy");
    Ok(())
}

#[test]
fn test_typing_over_selection_across_paragraphs() -> anyhow::Result<()> {
    let manager = create_editor_manager(vec![], ManagerSettings::default())?;
    let props = WrapperProps::new()
        .with_content(quire_editor::Content::with_handler("Hello\nWorld", "text"))
        // "Hel|lo" .. "Wo|rld"
        .with_selection(quire_editor::model::Selection::range(4, 10));
    let mut editor = EditorWrapper::mount(manager, HeadlessView::new(CallLog::new()), props)?;

    assert!(editor.run_command("insertText", &"p, wo".into())?);

    assert_eq!(editor.state().doc().child_count(), 1);
    assert_eq!(editor.state().doc().text_content(), "Help, world");
    Ok(())
}

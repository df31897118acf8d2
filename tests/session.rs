use std::fs;

use collectra::grid::GridOptions;
use collectra::ir::io_yaml::{from_yaml_str, read_yaml_document};
use collectra::ir::{CropRegion, CropRegionInput, NodeId, NodeKind};
use collectra::session::{Session, USER_TEXT_LABEL};
use collectra::CollectraError;

mod common;

use common::{copy_fixture, COMPLEX, SAMPLE};

fn open_copy(fixture: &str) -> (tempfile::TempDir, Session) {
    let dir = tempfile::tempdir().unwrap();
    let path = copy_fixture(fixture, dir.path());
    let session = Session::open(&path).unwrap().with_seed(42);
    (dir, session)
}

fn region() -> CropRegion {
    CropRegion::new(0.5, 0.5, 0.1, 0.1)
}

#[test]
fn open_loads_nodes_and_metadata() {
    let (_dir, session) = open_copy(COMPLEX);
    let graph = session.graph();
    assert_eq!(graph.len(), 6);
    let metadata = graph.metadata().unwrap();
    assert_eq!(metadata.workflow.as_deref(), Some("receipt_ocr"));
}

#[test]
fn create_crop_defaults_parent_to_root_image() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let id = session.create_crop(region(), "user_crop", None).unwrap();

    assert!(id.as_str().starts_with("user_crop-"));
    let info = session.node_info(id.as_str()).unwrap();
    assert_eq!(info.parents, vec![NodeId::from("img_001")]);
    assert_eq!(info.data, "test_image.jpg");
    assert!(info.children.is_empty());

    // only the crop is created; it resolves blank and editable
    assert_eq!(session.graph().len(), 4);
    let display = session.resolve(id.as_str()).unwrap();
    assert!(display.is_blank());
    assert!(!display.locked);
}

#[test]
fn create_crop_under_explicit_parent_turns_it_into_a_container() {
    let (_dir, mut session) = open_copy(SAMPLE);
    session.create_crop(region(), "nested", Some("crop_001")).unwrap();

    let display = session.resolve("crop_001").unwrap();
    assert!(display.locked);
    assert!(display.is_blank());
}

#[test]
fn create_crop_with_unknown_parent_fails_without_changes() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let err = session
        .create_crop(region(), "user_crop", Some("ghost"))
        .unwrap_err();
    assert!(matches!(err, CollectraError::NotFound(ref id) if id == "ghost"));
    assert_eq!(session.graph().len(), 3);
}

#[test]
fn create_crop_with_incomplete_region_fails() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let partial = CropRegionInput {
        x_center: Some(0.5),
        ..Default::default()
    };
    assert!(matches!(
        session.create_crop(partial, "user_crop", None),
        Err(CollectraError::Validation { .. })
    ));
    assert_eq!(session.graph().len(), 3);
}

#[test]
fn create_crop_without_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "").unwrap();
    let mut session = Session::open(&path).unwrap();
    assert!(matches!(
        session.create_crop(region(), "user_crop", None),
        Err(CollectraError::NotFound(_))
    ));
}

#[test]
fn mutations_are_persisted() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let crop = session.create_crop(region(), "user_crop", None).unwrap();
    let text = session
        .edit_text(None, "New text", Some(crop.as_str()))
        .unwrap();

    let on_disk = read_yaml_document(session.path()).unwrap();
    let node = on_disk.get(text.as_str()).unwrap();
    assert_eq!(node.label(), USER_TEXT_LABEL);
    assert_eq!(node.data(), "New text");
    assert_eq!(node.parents(), &[crop.clone()]);
    assert_eq!(
        on_disk.children_of_type(crop.as_str(), NodeKind::Text).unwrap(),
        vec![&text]
    );
}

#[test]
fn node_id_takes_precedence_over_crop_id() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let id = session
        .edit_text(Some("text_001"), "Updated", Some("crop_001"))
        .unwrap();

    assert_eq!(id.as_str(), "text_001");
    assert_eq!(session.graph().len(), 3);
    assert_eq!(
        session.resolve("crop_001").unwrap().value.as_deref(),
        Some("Updated")
    );
}

#[test]
fn edit_text_on_unknown_node_fails() {
    let (_dir, mut session) = open_copy(SAMPLE);
    assert!(matches!(
        session.edit_text(Some("nonexistent"), "value", None),
        Err(CollectraError::NotFound(_))
    ));
}

#[test]
fn edit_crop_region_replaces_all_fields() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let updated = CropRegion::new(0.6, 0.4, 0.3, 0.2);
    session.edit_crop_region("crop_001", updated).unwrap();

    let on_disk = read_yaml_document(session.path()).unwrap();
    assert_eq!(on_disk.crop_region("crop_001").unwrap(), updated);
}

#[test]
fn delete_annotation_removes_text_children_first() {
    let (_dir, mut session) = open_copy(SAMPLE);
    let removed = session.delete_annotation("crop_001").unwrap();
    assert_eq!(
        removed,
        vec![NodeId::from("text_001"), NodeId::from("crop_001")]
    );

    let on_disk = read_yaml_document(session.path()).unwrap();
    assert_eq!(on_disk.len(), 1);
    assert!(on_disk.children("img_001").unwrap().is_empty());
}

#[test]
fn delete_leaves_deeper_corrections_attached_to_nothing() {
    let (_dir, mut session) = open_copy(COMPLEX);
    session.delete_annotation("leaf_crop_001").unwrap();

    // text_002 survives; its parent text_001 was a direct child and is gone
    let graph = session.graph();
    assert!(graph.get("text_001").is_none());
    let survivor = graph.get("text_002").unwrap();
    assert!(survivor.parents().is_empty());
    graph.verify_adjacency().unwrap();
}

#[test]
fn failed_persist_leaves_memory_ahead_of_disk() {
    let graph = from_yaml_str(&fs::read_to_string(SAMPLE).unwrap()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let unwritable = dir.path().join("missing_dir").join("results.yaml");
    let mut session = Session::from_graph(graph, &unwritable);

    let err = session
        .edit_text(Some("text_001"), "Changed", None)
        .unwrap_err();
    assert!(matches!(err, CollectraError::Io(_)));
    assert_eq!(session.graph().get("text_001").unwrap().data(), "Changed");
    assert!(!unwritable.exists());
}

#[test]
fn grid_reflects_session_state() {
    let (_dir, mut session) = open_copy(SAMPLE);
    session.edit_text(Some("text_001"), "Edited", None).unwrap();

    let report = session.grid(&GridOptions::default()).unwrap();
    let crop = report.rows.iter().find(|r| r.id.as_str() == "crop_001").unwrap();
    assert_eq!(crop.display_value.as_deref(), Some("Edited"));
}

#[test]
fn mutation_keeps_nodes_under_numeric_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.yaml");
    let mut yaml = fs::read_to_string(SAMPLE).unwrap();
    yaml.push_str("\n2024:\n  type: collectra.Text\n  id: dated_text\n  parents: crop_001\n  data: Dated\n");
    fs::write(&path, yaml).unwrap();

    let mut session = Session::open(&path).unwrap().with_seed(1);
    session.edit_text(Some("text_001"), "Edited", None).unwrap();

    let on_disk = read_yaml_document(&path).unwrap();
    let dated = on_disk.get("dated_text").unwrap();
    assert_eq!(dated.label(), "2024");
    assert_eq!(dated.data(), "Dated");
}

//! Template loading from disk.

use std::io::Write;

use vms_schema::{extract_non_relational, extract_relational, FieldType, Template, TemplateError};

const EXPORT: &str = r#"[
    {
        "id": "_pb_users_auth_",
        "name": "users",
        "type": "auth",
        "system": false,
        "schema": [
            {"id": "u1", "system": false, "name": "name", "type": "text", "required": false, "presentable": true, "unique": false, "options": {"min": null, "max": null, "pattern": ""}},
            {"id": "u2", "system": false, "name": "created_at", "type": "autodate", "options": {"onCreate": true, "onUpdate": false}}
        ],
        "indexes": [],
        "listRule": "id = @request.auth.id",
        "viewRule": "id = @request.auth.id",
        "createRule": "",
        "updateRule": "id = @request.auth.id",
        "deleteRule": "id = @request.auth.id",
        "options": {"allowEmailAuth": true, "minPasswordLength": 8}
    },
    {
        "id": "cam_tpl_01",
        "name": "cameras",
        "type": "base",
        "schema": [
            {"name": "owner", "type": "relation", "required": true, "options": {"collectionId": "_pb_users_auth_", "cascadeDelete": true, "maxSelect": 1}},
            {"name": "site", "type": "relation", "options": {"collectionId": "site_tpl_01", "maxSelect": 1}}
        ],
        "listRule": null,
        "options": {}
    },
    {
        "id": "site_tpl_01",
        "name": "sites",
        "type": "base",
        "schema": [
            {"name": "cameras", "type": "relation", "options": {"collectionId": "cam_tpl_01", "maxSelect": null}}
        ]
    }
]"#;

fn write_template(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_exported_template() {
    let file = write_template(EXPORT);
    let template = Template::load(file.path()).unwrap();

    assert_eq!(template.len(), 3);
    assert!(template.dangling_relations().is_empty());

    let users = &template.collections()[0];
    assert_eq!(users.kind, "auth");
    assert_eq!(users.create_rule.as_deref(), Some(""));
    assert_eq!(users.options["minPasswordLength"], 8);

    let plain = extract_non_relational(users);
    assert_eq!(plain.len(), 2);
    assert_eq!(plain[1].field_type, FieldType::Date);
    assert!(plain.iter().all(|f| f.extra.is_empty()));

    let cameras = &template.collections()[1];
    assert!(extract_non_relational(cameras).is_empty());
    assert_eq!(extract_relational(cameras).len(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("pb_schema.json");

    match Template::load(&missing) {
        Err(TemplateError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected io error, got {:?}", other),
    }
}

#[test]
fn test_truncated_file_is_parse_error() {
    let file = write_template(&EXPORT[..EXPORT.len() / 2]);
    assert!(matches!(Template::load(file.path()), Err(TemplateError::Parse(_))));
}

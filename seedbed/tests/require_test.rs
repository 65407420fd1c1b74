use std::fs;
use std::path::PathBuf;

use seedbed::document::Value;
use seedbed::errors::ErrorKind;
use seedbed::format;
use seedbed::pipeline::{pull, push, PushOptions};
use seedbed::store::memory::InMemoryStore;
use seedbed::store::Store;

fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_require_merges_child_collections() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "child.yml", "people:\n- _id: Axl Rose\n");
    let parent = write_fixture(
        &dir,
        "parent.yml",
        "$require: ./child.yml\nbands:\n- _id: Guns N' Roses\n  members:\n  - Axl Rose\n",
    );

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    // exactly the one required document, not duplicated
    let people = store.find_all("people").unwrap().collect_documents().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].get("_id").unwrap(), Value::from("Axl Rose"));

    let bands = store.find_all("bands").unwrap().collect_documents().unwrap();
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0].get("_id").unwrap(), Value::from("Guns N' Roses"));
}

#[test]
fn test_required_documents_seed_the_base() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "child.yml", "people:\n- name: base\n");
    let parent = write_fixture(
        &dir,
        "parent.yml",
        "$require: ./child.yml\npeople:\n- name: local\n",
    );

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    let people = store.find_all("people").unwrap().collect_documents().unwrap();
    assert_eq!(people.len(), 2);
    // required documents come first, locally declared ones after
    assert_eq!(people[0].get("name").unwrap(), Value::from("base"));
    assert_eq!(people[1].get("name").unwrap(), Value::from("local"));
}

#[test]
fn test_required_templates_do_not_override_local_ones() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        &dir,
        "child.yml",
        "$person:\n  species: martian\n  limbs: 4\nothers:\n- $extend: $person\n",
    );
    let parent = write_fixture(
        &dir,
        "parent.yml",
        "$require: ./child.yml\n$person:\n  species: human\npeople:\n- $extend: $person\n  name: Axl\n",
    );

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    let people = store.find_all("people").unwrap().collect_documents().unwrap();
    // the local $person template wins wholesale
    assert_eq!(people[0].get("species").unwrap(), Value::from("human"));
    assert_eq!(people[0].get("limbs").unwrap(), Value::Null);
}

#[test]
fn test_nested_requires_resolve_recursively() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "grandchild.yml", "crew:\n- role: tech\n");
    write_fixture(
        &dir,
        "child.yml",
        "$require: ./grandchild.yml\npeople:\n- name: Axl\n",
    );
    let parent = write_fixture(&dir, "parent.yml", "$require: ./child.yml\nbands:\n- name: GNR\n");

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    let payload = pull(&store).unwrap();
    let mut names: Vec<&String> = payload.keys().collect();
    names.sort();
    assert_eq!(names, vec!["bands", "crew", "people"]);
}

#[test]
fn test_circular_require_is_resolution_error() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "a.yml", "$require: ./b.yml\nfirst:\n- x: 1\n");
    let b = write_fixture(&dir, "b.yml", "$require: ./a.yml\nsecond:\n- x: 2\n");

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&b).unwrap();
    let err = push(&store, &raw, &PushOptions::new().with_source(&b)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ResolutionError);
}

#[test]
fn test_missing_required_file_is_resolution_error() {
    let dir = tempfile::tempdir().unwrap();
    let parent = write_fixture(&dir, "parent.yml", "$require: ./nowhere.yml\npeople: []\n");

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    let err = push(
        &store,
        &raw,
        &PushOptions::new().keep_existing().with_source(&parent),
    )
    .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ResolutionError);
    assert!(store.list_collections().unwrap().is_empty());
}

#[test]
fn test_unsupported_require_extension_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "child.toml", "people = []\n");
    let parent = write_fixture(&dir, "parent.yml", "$require: ./child.toml\npeople: []\n");

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    let err = push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
}

#[test]
fn test_require_from_json_parent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "child.json", "{\"people\": [{\"name\": \"Axl\"}]}");
    let parent = write_fixture(
        &dir,
        "parent.json",
        "{\"$require\": \"./child.json\", \"bands\": [{\"name\": \"GNR\"}]}",
    );

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    let people = store.find_all("people").unwrap().collect_documents().unwrap();
    assert_eq!(people[0].get("name").unwrap(), Value::from("Axl"));
}

#[test]
fn test_required_documents_participate_in_local_expansion() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        &dir,
        "child.yml",
        "people:\n- $extend: $person\n  name: Axl\n",
    );
    let parent = write_fixture(
        &dir,
        "parent.yml",
        "$require: ./child.yml\n$person:\n  species: human\n",
    );

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    // a required document may $extend a template the parent defines
    let people = store.find_all("people").unwrap().collect_documents().unwrap();
    assert_eq!(people[0].get("species").unwrap(), Value::from("human"));
}

#[test]
fn test_directive_free_guarantee_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(
        &dir,
        "child.yml",
        "$base:\n  kind: seeded\npeople:\n- $extend: $base\n  name: Axl\n",
    );
    let parent = write_fixture(&dir, "parent.yml", "$require: ./child.yml\n");

    let store = Store::new(InMemoryStore::new("test"));
    let raw = format::read_payload(&parent).unwrap();
    push(&store, &raw, &PushOptions::new().with_source(&parent)).unwrap();

    let payload = pull(&store).unwrap();
    for (name, docs) in &payload {
        assert!(!name.starts_with('$'));
        for doc in docs {
            for (key, _) in doc.iter() {
                assert!(!seedbed::common::DIRECTIVE_KEYS.contains(&key.as_str()));
            }
        }
    }
    assert_eq!(
        payload["people"][0].get("kind").unwrap(),
        Value::from("seeded")
    );
}

use seedbed::doc;
use seedbed::document::Value;
use seedbed::format;
use seedbed::pipeline::{pull, pull_to_sink, push, PushOptions};
use seedbed::store::redb::RedbStore;
use seedbed::store::Store;

#[test]
fn test_push_pull_through_a_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fixtures.redb");

    let raw = doc! {
        "$person": { species: "human" },
        people: [
            { "$extend": "$person", "_id": "Axl Rose" },
            { "$extend": "$person", "_id": "Slash" },
        ],
        bands: [
            { "_id": "Guns N' Roses", members: ["Axl Rose", "Slash"] },
        ],
    };

    {
        let store = Store::new(RedbStore::open(&db_path).unwrap());
        push(&store, &raw, &PushOptions::new()).unwrap();
    }

    // a fresh handle sees the same data in the same order
    let store = Store::new(RedbStore::open(&db_path).unwrap());
    let payload = pull(&store).unwrap();
    assert_eq!(payload["people"].len(), 2);
    assert_eq!(
        payload["people"][0].get("_id").unwrap(),
        Value::from("Axl Rose")
    );
    assert_eq!(
        payload["people"][0].get("species").unwrap(),
        Value::from("human")
    );
    assert_eq!(payload["bands"].len(), 1);
}

#[test]
fn test_drop_semantics_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("drop.redb");
    let store = Store::new(RedbStore::open(&db_path).unwrap());
    let raw = doc! { sample: [ { a: 1 } ] };

    push(&store, &raw, &PushOptions::new()).unwrap();
    push(&store, &raw, &PushOptions::new().keep_existing()).unwrap();
    assert_eq!(
        store.find_all("sample").unwrap().collect_documents().unwrap().len(),
        2
    );

    push(&store, &raw, &PushOptions::new()).unwrap();
    assert_eq!(
        store.find_all("sample").unwrap().collect_documents().unwrap().len(),
        1
    );
}

#[test]
fn test_streaming_pull_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stream.redb");
    let store = Store::new(RedbStore::open(&db_path).unwrap());

    push(
        &store,
        &doc! { people: [ { "_id": 1, name: "Axl" } ] },
        &PushOptions::new(),
    )
    .unwrap();

    let mut sink: Vec<u8> = Vec::new();
    pull_to_sink(&store, &mut sink).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&sink).unwrap();
    assert_eq!(parsed["people"][0]["name"], "Axl");
}

#[test]
fn test_snapshot_file_from_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("snap.redb");
    let store = Store::new(RedbStore::open(&db_path).unwrap());

    push(
        &store,
        &doc! { people: [ { "_id": "Axl Rose", plays: "vocals" } ] },
        &PushOptions::new(),
    )
    .unwrap();

    let out = dir.path().join("snapshot.yml");
    let payload = pull(&store).unwrap();
    format::write_payload(&out, &payload).unwrap();

    let reread = format::read_payload(&out).unwrap();
    assert_eq!(
        reread.get("people.0.plays").unwrap(),
        Value::from("vocals")
    );
}

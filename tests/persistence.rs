//! Persistence tests for the knowledge base.
//!
//! Verify that cards, the id allocator, and the seed marker behavior
//! survive a handle drop and reopen cycle.

use rafiq::kb::{KnowledgeBase, NewCard};

fn sample(title: &str) -> NewCard {
    NewCard {
        kind: "dua".into(),
        title: title.into(),
        translation_en: Some("A test entry".into()),
        source_name: "Test Source".into(),
        reference: "T1".into(),
        ..Default::default()
    }
}

#[test]
fn cards_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.redb");

    let id = {
        let kb = KnowledgeBase::new(&path);
        kb.init().unwrap();
        kb.add_card(sample("Persisted Dua")).unwrap().id
    };

    let kb = KnowledgeBase::new(&path);
    let card = kb.get_card(id).unwrap().unwrap();
    assert_eq!(card.title, "Persisted Dua");
    assert_eq!(kb.count().unwrap(), 1);
}

#[test]
fn id_allocator_resumes_after_reopen_and_delete() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.redb");

    let max_id_before = {
        let kb = KnowledgeBase::new(&path);
        kb.init().unwrap();
        kb.add_card(sample("Alpha")).unwrap();
        kb.add_card(sample("Beta")).unwrap();
        let gamma = kb.add_card(sample("Gamma")).unwrap();
        // Delete the highest id; it must never come back.
        kb.delete_card(gamma.id).unwrap();
        gamma.id
    };

    let kb = KnowledgeBase::new(&path);
    let delta = kb.add_card(sample("Delta")).unwrap();
    assert!(
        delta.id > max_id_before,
        "new id {} should be > pre-reopen max {}",
        delta.id,
        max_id_before
    );
}

#[test]
fn seeding_is_idempotent_across_reopens() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.redb");

    let seeded = {
        let kb = KnowledgeBase::new(&path);
        kb.seed_if_empty().unwrap()
    };
    assert!(seeded > 0);

    let kb = KnowledgeBase::new(&path);
    assert_eq!(kb.seed_if_empty().unwrap(), 0);
    assert_eq!(kb.count().unwrap(), seeded as u64);
}

#[test]
fn export_after_reopen_is_ordered_by_id() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.redb");

    {
        let kb = KnowledgeBase::new(&path);
        kb.init().unwrap();
        kb.add_card(sample("First")).unwrap();
        kb.add_card(sample("Second")).unwrap();
        kb.add_card(sample("Third")).unwrap();
    }

    let kb = KnowledgeBase::new(&path);
    let out = dir.path().join("export.json");
    kb.export_json(&out).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    let ids: Vec<u64> = parsed.iter().map(|c| c["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

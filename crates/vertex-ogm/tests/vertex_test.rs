//! Single-record merge protocol against the in-memory graph

use pretty_assertions::assert_eq;

use vertex_ogm::test_utils::Person;
use vertex_ogm::{InMemoryGraph, OgmError, PropertyMap, PropertyValue, Record, Vertex, VertexId};

fn fred_fields() -> PropertyMap {
    PropertyMap::from([
        ("name".to_string(), PropertyValue::from("fred")),
        ("age".to_string(), PropertyValue::from(22i64)),
        ("sex".to_string(), PropertyValue::from("m")),
    ])
}

/// A copy of the record that only knows its id.
fn partial_copy(id: &VertexId) -> Person {
    let mut person = Person::empty();
    person.set_id(Some(id.clone()));
    person
}

#[test_log::test(tokio::test)]
async fn test_create_vertex_then_get() {
    let g = InMemoryGraph::new();
    let created = Person::create_vertex(&g, None, fred_fields()).await.unwrap().unwrap();
    assert_eq!(created.name.as_deref(), Some("fred"));
    assert_eq!(created.age, Some(22));
    assert_eq!(created.sex.as_deref(), Some("m"));

    let id = created.id.clone().unwrap();
    let loaded = Person::get_vertex(&g, &id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.name, created.name);
    assert_eq!(loaded.age, created.age);
    assert_eq!(loaded.sex, created.sex);
}

#[test_log::test(tokio::test)]
async fn test_get_vertex_missing_is_none() {
    let g = InMemoryGraph::new();
    let missing = Person::get_vertex(&g, &VertexId::generate()).await.unwrap();
    assert!(missing.is_none());
}

#[test_log::test(tokio::test)]
async fn test_get_or_create_is_idempotent() {
    let g = InMemoryGraph::new();
    let id = VertexId::generate();

    let first = Person::get_or_create_vertex(&g, Some(id.clone()), fred_fields())
        .await
        .unwrap()
        .unwrap();

    let mut other_fields = fred_fields();
    other_fields.insert("name".into(), "ron".into());
    let second = Person::get_or_create_vertex(&g, Some(id.clone()), other_fields)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(g.vertex_count(), 1);
    assert_eq!(second.name.as_deref(), Some("fred"));
    assert_eq!(first, second);
}

#[test_log::test(tokio::test)]
async fn test_create_vertex_reports_database_state() {
    let g = InMemoryGraph::new();
    let id = VertexId::generate();
    Person::create_vertex(&g, Some(id.clone()), fred_fields()).await.unwrap();
    g.set_raw_property(&id, "sex", PropertyValue::from("f"));

    let again = Person::create_vertex(&g, Some(id), PropertyMap::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.sex.as_deref(), Some("f"));
}

#[test_log::test(tokio::test)]
async fn test_concurrent_get_or_create_yields_one_vertex() {
    let g = std::sync::Arc::new(InMemoryGraph::new());
    let id = VertexId::generate();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let g = g.clone();
            let id = id.clone();
            tokio::spawn(async move {
                Person::get_or_create_vertex(g.as_ref(), Some(id), fred_fields()).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }
    assert_eq!(g.vertex_count(), 1);
}

#[test_log::test(tokio::test)]
async fn test_create_with_manual_id_keeps_it() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m"));
    let id = VertexId::generate();
    person.id = Some(id.clone());

    assert!(person.create(&g).await.unwrap());
    assert_eq!(person.id, Some(id));
    assert_eq!(person.name.as_deref(), Some("fred"));
    assert_eq!(person.age, Some(22));
    assert_eq!(person.sex.as_deref(), Some("m"));
}

#[test_log::test(tokio::test)]
async fn test_create_is_idempotent() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();

    person.name = Some("frederick".into());
    person.create(&g).await.unwrap();

    assert_eq!(g.vertex_count(), 1);
    // the existing vertex wins and the record is reloaded from it
    assert_eq!(person.name.as_deref(), Some("fred"));
}

#[test_log::test(tokio::test)]
async fn test_save_pushes_local_edits() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();

    person.name = Some("frederick".into());
    person.age = Some(23);
    assert!(person.save(&g).await.unwrap());

    assert_eq!(person.name.as_deref(), Some("frederick"));
    assert_eq!(person.age, Some(23));
    assert_eq!(person.sex.as_deref(), Some("m"));

    let id = person.id.clone().unwrap();
    let loaded = Person::get_vertex(&g, &id).await.unwrap().unwrap();
    assert_eq!(loaded.name.as_deref(), Some("frederick"));
    assert_eq!(loaded.age, Some(23));
    assert_eq!(loaded.sex.as_deref(), Some("m"));
}

#[test_log::test(tokio::test)]
async fn test_save_on_missing_vertex_returns_false() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    assert!(!person.save(&g).await.unwrap());
    assert_eq!(g.vertex_count(), 0);
}

#[test_log::test(tokio::test)]
async fn test_save_leaves_unset_fields_on_server() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();

    person.sex = None;
    person.save(&g).await.unwrap();

    let id = person.id.clone().unwrap();
    assert_eq!(g.property(&id, "sex"), Some(PropertyValue::from("m")));
    // the reload brings the server value back
    assert_eq!(person.sex.as_deref(), Some("m"));
}

#[test_log::test(tokio::test)]
async fn test_repeated_save_without_edits_changes_nothing() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();
    let id = person.id.clone().unwrap();

    for _ in 0..2 {
        assert!(person.save(&g).await.unwrap());
        assert_eq!(person.name.as_deref(), Some("fred"));
        assert_eq!(person.age, Some(22));
        assert_eq!(person.sex.as_deref(), Some("m"));
        assert_eq!(g.property(&id, "name"), Some(PropertyValue::from("fred")));
        assert_eq!(g.property(&id, "age"), Some(PropertyValue::from(22i64)));
        assert_eq!(g.property(&id, "sex"), Some(PropertyValue::from("m")));
    }
    assert_eq!(g.vertex_count(), 1);
}

#[test_log::test(tokio::test)]
async fn test_unset_field_needs_drop_property_to_clear() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();
    let id = person.id.clone().unwrap();

    person.sex = None;
    person.save(&g).await.unwrap();
    assert_eq!(g.property(&id, "sex"), Some(PropertyValue::from("m")));
    assert_eq!(person.sex.as_deref(), Some("m"));

    person.drop_property(&g, "sex").await.unwrap();
    assert_eq!(g.property(&id, "sex"), None);
    assert_eq!(person.sex, None);
    assert_eq!(person.age, Some(22));
}

#[test_log::test(tokio::test)]
async fn test_failed_reload_leaves_record_untouched() {
    let g = InMemoryGraph::new();
    let id = VertexId::generate();
    Person::create_vertex(&g, Some(id.clone()), fred_fields()).await.unwrap();
    // another client stores a value the schema cannot read
    g.set_raw_property(&id, "sex", PropertyValue::Bool(true));

    let mut copy = partial_copy(&id);
    copy.age = Some(99);
    let err = copy.save(&g).await.unwrap_err();

    assert!(matches!(err, OgmError::FieldType { .. }));
    assert_eq!(g.property(&id, "age"), Some(PropertyValue::from(99i64)));
    assert_eq!(copy.id, Some(id));
    assert_eq!(copy.name, None);
    assert_eq!(copy.age, Some(99));
    assert_eq!(copy.sex, None);
}

#[test_log::test(tokio::test)]
async fn test_local_edits_only_pushed_on_save() {
    let g = InMemoryGraph::new();
    let mut fred = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    fred.create(&g).await.unwrap();
    let id = fred.id.clone().unwrap();
    let mut evil_fred = Person::get_vertex(&g, &id).await.unwrap().unwrap();

    fred.name = Some("frederick".into());

    evil_fred.name = Some("evil frederick".into());
    evil_fred.age = Some(10000);
    evil_fred.sex = Some("evil".into());
    evil_fred.save(&g).await.unwrap();
    assert_eq!(evil_fred.name.as_deref(), Some("evil frederick"));
    assert_eq!(evil_fred.age, Some(10000));
    assert_eq!(evil_fred.sex.as_deref(), Some("evil"));
    assert_eq!(fred.name.as_deref(), Some("frederick"));

    fred.save(&g).await.unwrap();
    assert_eq!(fred.name.as_deref(), Some("frederick"));
    assert_eq!(fred.age, Some(22));
    assert_eq!(fred.sex.as_deref(), Some("m"));
    assert_eq!(evil_fred.name.as_deref(), Some("evil frederick"));
    assert_eq!(evil_fred.age, Some(10000));
    assert_eq!(evil_fred.sex.as_deref(), Some("evil"));
}

#[test_log::test(tokio::test)]
async fn test_partial_copies_converge_on_save() {
    let g = InMemoryGraph::new();
    let id = VertexId::generate();
    Person::create_vertex(&g, Some(id.clone()), fred_fields()).await.unwrap();

    // each holder only knows part of the record
    let mut ages = partial_copy(&id);
    ages.age = Some(30);
    let mut names = partial_copy(&id);
    names.name = Some("frederick".into());

    ages.save(&g).await.unwrap();
    names.save(&g).await.unwrap();

    assert_eq!(g.property(&id, "age"), Some(PropertyValue::from(30i64)));
    assert_eq!(g.property(&id, "name"), Some(PropertyValue::from("frederick")));
    assert_eq!(g.property(&id, "sex"), Some(PropertyValue::from("m")));

    // the later saver sees everyone's writes
    assert_eq!(names.age, Some(30));
    assert_eq!(names.name.as_deref(), Some("frederick"));
    assert_eq!(names.sex.as_deref(), Some("m"));
}

#[test_log::test(tokio::test)]
async fn test_update_is_local_only() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();

    let trips = g.round_trips();
    person
        .update(PropertyMap::from([
            ("name".to_string(), PropertyValue::from("frederick")),
            ("age".to_string(), PropertyValue::from("50")),
        ]))
        .unwrap();

    assert_eq!(person.name.as_deref(), Some("frederick"));
    assert_eq!(person.age, Some(50));
    assert_eq!(g.round_trips(), trips);
}

#[test_log::test(tokio::test)]
async fn test_drop_property_removes_on_both_sides() {
    let g = InMemoryGraph::new();
    let mut person = Person::new("fred", 22, Some("m")).with_id(VertexId::generate());
    person.create(&g).await.unwrap();
    let id = person.id.clone().unwrap();

    for field in ["name", "age", "sex"] {
        person.drop_property(&g, field).await.unwrap();
    }

    assert_eq!(person.name, None);
    assert_eq!(person.age, None);
    assert_eq!(person.sex, None);
    for field in ["name", "age", "sex"] {
        assert_eq!(g.property(&id, field), None);
    }
}

#[test_log::test(tokio::test)]
async fn test_delete_removes_vertex() {
    let g = InMemoryGraph::new();
    let created = Person::create_vertex(&g, None, fred_fields()).await.unwrap().unwrap();
    let id = created.id.clone().unwrap();

    Person::delete_vertex(&g, &created).await.unwrap();
    assert!(Person::get_vertex(&g, &id).await.unwrap().is_none());

    // deleting again is not an error
    created.delete(&g).await.unwrap();
}

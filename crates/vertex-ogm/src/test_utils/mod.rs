//! Fixture records and generators shared by unit and integration tests

use fake::faker::name::en::FirstName;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::identifiers::VertexId;
use crate::services::vertices::VertexSet;

crate::vertex_record! {
    /// The canonical fixture: a person vertex.
    pub struct Person: "person" {
        pub name: String,
        pub age: i64,
        pub sex: String,
    }
}

impl Person {
    pub fn new(name: &str, age: i64, sex: Option<&str>) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            age: Some(age),
            sex: sex.map(str::to_string),
        }
    }

    pub fn with_id(mut self, id: impl Into<VertexId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A person with a fresh id, a fake first name, an age in `-10..200` and a
/// sex of `m`, `f` or unset.
pub fn random_person() -> Person {
    let mut rng = rand::thread_rng();
    let sex = [Some("m"), Some("f"), None]
        .choose(&mut rng)
        .copied()
        .flatten();

    Person::new(&FirstName().fake::<String>(), rng.gen_range(-10..200), sex)
        .with_id(VertexId::generate())
}

/// `count` random people in a collection.
pub fn random_people(count: usize) -> VertexSet<Person> {
    (0..count).map(|_| random_person()).collect()
}

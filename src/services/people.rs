use serde_json::Value;

use super::{DatabaseService, Resource, Schema};
use crate::auth::DatabaseKind;

/// Pages of the People database
pub struct Person;

impl Resource for Person {
    const KIND: DatabaseKind = DatabaseKind::People;
    const NAME: &'static str = "Person";
    const SCHEMA: Schema = &[("Name", "title"), ("TotalHours", "rollup"), ("Role", "select")];

    type Filter = ();

    fn filter(_: &()) -> Option<Value> {
        None
    }
}

pub type PeopleService = DatabaseService<Person>;

// Service layer: one service per remote resource type
//
// Every service is built once at startup with the shared client resolver and
// resolves a tenant handle per call. Remote failures become `ApiError`s here.

mod database;
mod login;
mod pages;
mod people;
mod projects;
mod timereports;
mod users;

pub use database::{DatabaseService, Resource};
pub use login::{LoginRequest, LoginResponse, LoginService};
pub use pages::PagesService;
pub use people::{PeopleService, Person};
pub use projects::{Project, ProjectFilter, ProjectPatch, ProjectsService};
pub use timereports::{NewTimeReport, TimeReport, TimeReportFilter, TimeReportsService};
pub use users::UsersService;

use crate::error::ApiError;
use crate::notion::models::{Page, PagePatch};

/// Canonical (hyphenated, lowercase) form of a page or user id
///
/// Anything that is not a UUID cannot name a remote object, so it is reported
/// as missing without a round trip.
pub fn parse_id(id: &str) -> Result<String, ApiError> {
    uuid::Uuid::parse_str(id.trim())
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|_| ApiError::NotFound(format!("No object with id '{}'", id)))
}

/// Whether two remote ids name the same object, ignoring dashes and case
pub fn same_id(a: &str, b: &str) -> bool {
    let strip = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '-')
            .flat_map(char::to_lowercase)
            .collect()
    };
    strip(a) == strip(b)
}

/// Property layout a resource's pages must carry
pub type Schema = &'static [(&'static str, &'static str)];

/// Reject pages whose properties drifted from the expected layout
pub fn check_schema(resource: &str, schema: Schema, page: &Page) -> Result<(), ApiError> {
    for (name, expected) in schema {
        match page.property(name) {
            Some(kind) if kind.type_name() == *expected => {}
            Some(kind) => {
                return Err(ApiError::RemoteUnavailable(format!(
                    "{} page {}: property '{}' is {} but {} was expected",
                    resource,
                    page.id,
                    name,
                    kind.type_name(),
                    expected
                )));
            }
            None => {
                return Err(ApiError::RemoteUnavailable(format!(
                    "{} page {}: property '{}' is missing",
                    resource, page.id, name
                )));
            }
        }
    }
    Ok(())
}

/// Validate a write against the resource layout before it leaves the process
pub fn check_patch(resource: &str, schema: Schema, patch: &PagePatch) -> Result<(), ApiError> {
    if patch.is_empty() {
        return Err(ApiError::ValidationFailed(
            "Patch must change at least one property".to_string(),
        ));
    }

    for (name, value) in &patch.properties {
        let expected = schema
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                ApiError::ValidationFailed(format!("{} has no property '{}'", resource, name))
            })?;

        if value.type_name() != expected {
            return Err(ApiError::ValidationFailed(format!(
                "Property '{}' is {} and cannot be written as {}",
                name,
                expected,
                value.type_name()
            )));
        }
    }
    Ok(())
}

use serde::Deserialize;
use serde_json::{json, Value};

use super::{DatabaseService, Resource, Schema};
use crate::auth::DatabaseKind;
use crate::error::ApiError;
use crate::notion::models::{PagePatch, PropertyPatch, SelectName};

/// Pages of the Projects database
pub struct Project;

impl Resource for Project {
    const KIND: DatabaseKind = DatabaseKind::Projects;
    const NAME: &'static str = "Project";
    const SCHEMA: Schema = &[
        ("Projectname", "title"),
        ("Status", "select"),
        ("Hours", "number"),
        ("HoursLeft", "formula"),
        ("WorkedHours", "rollup"),
        ("Timespan", "date"),
    ];

    type Filter = ProjectFilter;

    fn filter(filter: &ProjectFilter) -> Option<Value> {
        filter
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|status| json!({"property": "Status", "select": {"equals": status}}))
    }
}

pub type ProjectsService = DatabaseService<Project>;

/// Query string of `GET /api/projects`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<String>,
}

/// Body of `PATCH /api/projects/:id`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectPatch {
    pub status: Option<String>,
    pub hours: Option<f64>,
}

impl TryFrom<ProjectPatch> for PagePatch {
    type Error = ApiError;

    fn try_from(patch: ProjectPatch) -> Result<Self, Self::Error> {
        let mut page = PagePatch::default();

        if let Some(status) = patch.status {
            let status = status.trim();
            if status.is_empty() {
                return Err(ApiError::ValidationFailed("status must not be empty".to_string()));
            }
            page = page.set(
                "Status",
                PropertyPatch::Select(Some(SelectName {
                    name: status.to_string(),
                })),
            );
        }

        if let Some(hours) = patch.hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(ApiError::ValidationFailed(format!(
                    "hours must be a non-negative number, got {}",
                    hours
                )));
            }
            page = page.set("Hours", PropertyPatch::Number(Some(hours)));
        }

        if page.is_empty() {
            return Err(ApiError::ValidationFailed(
                "Provide at least one of status, hours".to_string(),
            ));
        }
        Ok(page)
    }
}

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{check_schema, parse_id, DatabaseService, Resource, Schema};
use crate::auth::DatabaseKind;
use crate::error::ApiError;
use crate::notion::models::{
    DateRange, NewPage, Page, Parent, PropertyKind, PropertyPatch, PropertyValue, RelationRef,
    RichText,
};
use crate::resolver::RequestContext;

/// Related pages fetched in parallel while collating
const COLLATE_CONCURRENCY: usize = 8;

/// Pages of the Timereports database
pub struct TimeReport;

impl Resource for TimeReport {
    const KIND: DatabaseKind = DatabaseKind::TimeReports;
    const NAME: &'static str = "Time report";
    const SCHEMA: Schema = &[
        ("Date", "date"),
        ("Person", "relation"),
        ("Hours", "number"),
        ("Project", "relation"),
        ("Note", "title"),
    ];

    type Filter = TimeReportFilter;

    fn filter(filter: &TimeReportFilter) -> Option<Value> {
        let mut clauses: Vec<Value> = Vec::new();
        if let Some(person) = &filter.person {
            clauses.push(json!({"property": "Person", "relation": {"contains": person}}));
        }
        if let Some(project) = &filter.project {
            clauses.push(json!({"property": "Project", "relation": {"contains": project}}));
        }

        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(json!({ "and": clauses })),
        }
    }
}

pub type TimeReportsService = DatabaseService<TimeReport>;

/// Restrict time reports to one person and/or one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeReportFilter {
    pub person: Option<String>,
    pub project: Option<String>,
}

impl TimeReportFilter {
    pub fn new(person: Option<&str>, project: Option<&str>) -> Result<Self, ApiError> {
        let id = |value: Option<&str>, field: &str| -> Result<Option<String>, ApiError> {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| {
                    parse_id(v).map_err(|_| {
                        ApiError::ValidationFailed(format!("{} must be a page id, got '{}'", field, v))
                    })
                })
                .transpose()
        };
        Ok(Self {
            person: id(person, "person")?,
            project: id(project, "project")?,
        })
    }
}

/// Body of `POST /api/timereports`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTimeReport {
    pub date: String,
    pub person_id: String,
    pub project_id: String,
    pub hours: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewTimeReport {
    fn into_page(self, database_id: &str) -> Result<NewPage, ApiError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::ValidationFailed(format!("date must be YYYY-MM-DD, got '{}'", self.date))
        })?;
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(ApiError::ValidationFailed(format!(
                "hours must be a positive number, got {}",
                self.hours
            )));
        }
        let relation = |id: &str, field: &str| -> Result<PropertyPatch, ApiError> {
            let id = parse_id(id).map_err(|_| {
                ApiError::ValidationFailed(format!("{} must be a page id, got '{}'", field, id))
            })?;
            Ok(PropertyPatch::Relation(vec![RelationRef { id }]))
        };

        let mut properties = BTreeMap::new();
        properties.insert(
            "Date".to_string(),
            PropertyPatch::Date(Some(DateRange {
                start: date.format("%Y-%m-%d").to_string(),
                end: None,
                time_zone: None,
            })),
        );
        properties.insert("Person".to_string(), relation(&self.person_id, "person_id")?);
        properties.insert("Project".to_string(), relation(&self.project_id, "project_id")?);
        properties.insert("Hours".to_string(), PropertyPatch::Number(Some(self.hours)));
        properties.insert(
            "Note".to_string(),
            PropertyPatch::Title(
                self.note
                    .filter(|n| !n.trim().is_empty())
                    .map(|n| vec![RichText::plain(n)])
                    .unwrap_or_default(),
            ),
        );

        Ok(NewPage {
            parent: Parent::DatabaseId {
                database_id: database_id.to_string(),
            },
            properties,
        })
    }
}

impl DatabaseService<TimeReport> {
    /// List time reports with each relation's first related page inlined
    ///
    /// Every distinct related page is fetched once per call. Related pages that
    /// are gone or not shared with the integration are left uncollated.
    pub async fn list_collated(
        &self,
        ctx: &RequestContext,
        filter: &TimeReportFilter,
    ) -> Result<Vec<Page>, ApiError> {
        let mut pages = self.list(ctx, filter).await?;
        let (client, _) = self.bound_client(ctx)?;

        let related: BTreeSet<String> = pages
            .iter()
            .flat_map(|page| page.properties.values())
            .filter_map(|prop| match &prop.value {
                PropertyKind::Relation { relation, .. } => relation.first().map(|r| r.id.clone()),
                _ => None,
            })
            .collect();

        tracing::debug!(
            "Collating {} time reports against {} related pages",
            pages.len(),
            related.len()
        );

        let fetched: HashMap<String, BTreeMap<String, PropertyValue>> = stream::iter(related)
            .map(|id| {
                let client = client.clone();
                async move {
                    match client.retrieve_page(&id).await {
                        Ok(page) => Ok(Some((id, page.properties))),
                        Err(e) if e.is_inaccessible() => {
                            tracing::debug!("Related page {} is not accessible, skipping", id);
                            Ok(None)
                        }
                        Err(e) => Err(ApiError::from(e)),
                    }
                }
            })
            .buffer_unordered(COLLATE_CONCURRENCY)
            .try_filter_map(|entry| async move { Ok(entry) })
            .try_collect()
            .await?;

        for page in &mut pages {
            for prop in page.properties.values_mut() {
                if let PropertyKind::Relation {
                    relation,
                    relation_properties,
                    ..
                } = &mut prop.value
                {
                    if let Some(first) = relation.first() {
                        *relation_properties = fetched.get(&first.id).cloned();
                    }
                }
            }
        }

        Ok(pages)
    }

    /// Create a time report page in the bound database
    pub async fn create(&self, ctx: &RequestContext, report: NewTimeReport) -> Result<Page, ApiError> {
        let (client, database_id) = self.bound_client(ctx)?;
        let new_page = report.into_page(&database_id)?;

        let page = client.create_page(&new_page).await?;
        tracing::info!("Created time report {} in workspace {}", page.id, ctx.workspace_id);
        check_schema(TimeReport::NAME, TimeReport::SCHEMA, &page)?;
        Ok(page)
    }
}

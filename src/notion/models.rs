// Typed schema for the Notion document format
//
// Pages are decoded into these types at the service boundary so that shape
// drift in the remote API fails loudly instead of leaking into the UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ==================================================================================================
// Pages and properties
// ==================================================================================================

fn page_object() -> String {
    "page".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "page_object")]
    pub object: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Page {
    /// Database this page lives in, if any
    pub fn database_id(&self) -> Option<&str> {
        match &self.parent {
            Some(Parent::DatabaseId { database_id }) => Some(database_id),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyKind> {
        self.properties.get(name).map(|p| &p.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    DatabaseId { database_id: String },
    PageId { page_id: String },
    BlockId { block_id: String },
    Workspace { workspace: bool },
}

/// A property as it appears on a page: optional id plus the typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub value: PropertyKind,
}

impl From<PropertyKind> for PropertyValue {
    fn from(value: PropertyKind) -> Self {
        Self { id: None, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Number {
        number: Option<f64>,
    },
    Select {
        select: Option<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Date {
        date: Option<DateRange>,
    },
    Checkbox {
        checkbox: bool,
    },
    Email {
        email: Option<String>,
    },
    Url {
        url: Option<String>,
    },
    People {
        people: Vec<User>,
    },
    Formula {
        formula: FormulaValue,
    },
    Rollup {
        rollup: RollupValue,
    },
    Relation {
        relation: Vec<RelationRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_more: Option<bool>,
        /// Properties of the first related page, filled in by collation
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation_properties: Option<BTreeMap<String, PropertyValue>>,
    },
    CreatedTime {
        created_time: String,
    },
    LastEditedTime {
        last_edited_time: String,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyKind::Title { .. } => "title",
            PropertyKind::RichText { .. } => "rich_text",
            PropertyKind::Number { .. } => "number",
            PropertyKind::Select { .. } => "select",
            PropertyKind::Status { .. } => "status",
            PropertyKind::MultiSelect { .. } => "multi_select",
            PropertyKind::Date { .. } => "date",
            PropertyKind::Checkbox { .. } => "checkbox",
            PropertyKind::Email { .. } => "email",
            PropertyKind::Url { .. } => "url",
            PropertyKind::People { .. } => "people",
            PropertyKind::Formula { .. } => "formula",
            PropertyKind::Rollup { .. } => "rollup",
            PropertyKind::Relation { .. } => "relation",
            PropertyKind::CreatedTime { .. } => "created_time",
            PropertyKind::LastEditedTime { .. } => "last_edited_time",
            PropertyKind::Unsupported => "unsupported",
        }
    }

    /// Concatenated plain text of a title or rich text property
    pub fn plain_text(&self) -> Option<String> {
        match self {
            PropertyKind::Title { title: parts } | PropertyKind::RichText { rich_text: parts } => {
                Some(parts.iter().map(RichText::content).collect())
            }
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            PropertyKind::Number { number } => *number,
            PropertyKind::Formula {
                formula: FormulaValue::Number { number },
            } => *number,
            PropertyKind::Rollup {
                rollup: RollupValue::Number { number, .. },
            } => *number,
            _ => None,
        }
    }

    pub fn select_name(&self) -> Option<&str> {
        match self {
            PropertyKind::Select { select: Some(opt) } | PropertyKind::Status { status: Some(opt) } => {
                Some(&opt.name)
            }
            _ => None,
        }
    }
}

fn text_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default = "text_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: text_type(),
            text: Some(TextContent {
                content: content.into(),
                link: None,
            }),
            annotations: None,
            plain_text: None,
            href: None,
        }
    }

    pub fn content(&self) -> &str {
        self.plain_text
            .as_deref()
            .or(self.text.as_ref().map(|t| t.content.as_str()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    Number { number: Option<f64> },
    String { string: Option<String> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateRange> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupValue {
    Number {
        number: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<String>,
    },
    Date {
        date: Option<DateRange>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<String>,
    },
    Array {
        array: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

// ==================================================================================================
// Users
// ==================================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<PersonDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<BotDetails>,
}

impl User {
    pub fn email(&self) -> Option<&str> {
        self.person.as_ref().and_then(|p| p.email.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<BotOwner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
}

/// Who owns a bot: a single user (public OAuth grant) or the whole workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BotOwner {
    User {
        #[serde(default)]
        user: Option<Box<User>>,
    },
    Workspace {
        #[serde(default)]
        workspace: Option<bool>,
    },
}

// ==================================================================================================
// Lists, databases, patches
// ==================================================================================================

fn list_object() -> String {
    "list".to_string()
}

/// Paginated list envelope, also used for the aggregated responses we return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "list_object")]
    pub object: String,
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> ListResponse<T> {
    pub fn complete(results: Vec<T>) -> Self {
        Self {
            object: list_object(),
            results,
            next_cursor: None,
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
}

impl DatabaseSummary {
    pub fn title_text(&self) -> String {
        self.title.iter().map(RichText::content).collect()
    }
}

/// Partial page update in Notion's write format
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePatch {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl PagePatch {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.archived.is_none()
    }

    pub fn set(mut self, name: impl Into<String>, value: PropertyPatch) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// A single property write, keyed by its type like the remote API expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyPatch {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Number(Option<f64>),
    Select(Option<SelectName>),
    Status(Option<SelectName>),
    Date(Option<DateRange>),
    Checkbox(bool),
    Email(Option<String>),
    Url(Option<String>),
    Relation(Vec<RelationRef>),
}

impl PropertyPatch {
    /// Property type this write targets
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyPatch::Title(_) => "title",
            PropertyPatch::RichText(_) => "rich_text",
            PropertyPatch::Number(_) => "number",
            PropertyPatch::Select(_) => "select",
            PropertyPatch::Status(_) => "status",
            PropertyPatch::Date(_) => "date",
            PropertyPatch::Checkbox(_) => "checkbox",
            PropertyPatch::Email(_) => "email",
            PropertyPatch::Url(_) => "url",
            PropertyPatch::Relation(_) => "relation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectName {
    pub name: String,
}

/// Body for creating a page inside a database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPage {
    pub parent: Parent,
    pub properties: BTreeMap<String, PropertyPatch>,
}

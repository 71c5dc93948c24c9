//! AggregateQuery: read-only views built from a closed set of pipeline stages.
//!
//! Stages are validated against the declared fields of each collection and
//! normalised into the fixed order match → join → project → sort → paginate,
//! whatever order the caller supplied them in.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::RelationKind;
use crate::store::{
    Collection, Document, DocumentStore, ID_FIELD, Predicate, StoreResult, StoreState,
    predicate::{compare_values, get_path, set_path},
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// `asc`/`ascending` (any case) sort ascending; anything else descends.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") | Some("ascending") => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }
}

/// How a join nests its matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// All matches as an array (empty when none).
    All,
    /// The first match, or the field is left absent.
    First,
    /// The first match; rows without one are dropped.
    Inner,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub from: Collection,
    pub local_key: String,
    pub foreign_key: String,
    pub as_field: String,
    pub mode: JoinMode,
    /// Extra condition on the joined documents.
    pub filter: Predicate,
}

/// A computed projection value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Copy a (possibly nested) field.
    Field(String),
    /// Length of a joined array; 0 when absent.
    Count(String),
    /// Sub-object selection of a joined document (or of each element of a joined array).
    Pick(String, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectField {
    /// Output name; dotted names build nested objects.
    pub name: String,
    pub expr: Expr,
}

impl ProjectField {
    pub fn field(name: &str) -> Self {
        ProjectField {
            name: name.to_string(),
            expr: Expr::Field(name.to_string()),
        }
    }

    pub fn renamed(name: &str, source: &str) -> Self {
        ProjectField {
            name: name.to_string(),
            expr: Expr::Field(source.to_string()),
        }
    }

    pub fn count(name: &str, source: &str) -> Self {
        ProjectField {
            name: name.to_string(),
            expr: Expr::Count(source.to_string()),
        }
    }

    pub fn pick(name: &str, source: &str, fields: &[&str]) -> Self {
        ProjectField {
            name: name.to_string(),
            expr: Expr::Pick(
                source.to_string(),
                fields.iter().map(|f| f.to_string()).collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Page window. Always valid: out-of-range inputs fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u64,
    limit: u64,
}

impl Page {
    pub fn new(page: i64, limit: i64) -> Self {
        Page {
            page: u64::try_from(page).ok().filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE),
            limit: u64::try_from(limit)
                .ok()
                .filter(|l| *l >= 1)
                .unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Parses raw query-string values; non-numeric input gets the default.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let num = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
        Page::new(num(page), num(limit))
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Stage
///
/// The closed set of pipeline stages.
#[derive(Debug, Clone)]
pub enum Stage {
    Match(Predicate),
    Join(Join),
    Project(Vec<ProjectField>),
    Sort(SortSpec),
    Paginate(Page),
}

/// What the validator knows about a field of the row being built.
#[derive(Debug, Clone)]
enum Shape {
    Scalar,
    Doc(Collection),
    Docs(Collection),
    Object(Vec<String>),
}

#[derive(Debug, Clone, Default)]
struct RowShape(HashMap<String, Shape>);

impl RowShape {
    fn of(collection: Collection) -> Self {
        RowShape(
            collection
                .fields()
                .iter()
                .map(|f| (f.to_string(), Shape::Scalar))
                .collect(),
        )
    }

    fn lookup(&self, path: &str) -> Option<Shape> {
        if let Some(shape) = self.0.get(path) {
            return Some(shape.clone());
        }
        let (head, tail) = path.split_once('.')?;
        match self.0.get(head)? {
            Shape::Doc(c) | Shape::Docs(c) if c.declares(tail) => Some(Shape::Scalar),
            Shape::Object(fields) if fields.iter().any(|f| f == tail) => Some(Shape::Scalar),
            _ => None,
        }
    }

    fn require(&self, path: &str, stage: &str) -> ApiResult<Shape> {
        self.lookup(path)
            .ok_or_else(|| ApiError::invalid(format!("unknown field '{}' in {} stage", path, stage)))
    }
}

/// Pipeline
///
/// A validated, normalised aggregation over one source collection.
#[derive(Debug, Clone)]
pub struct Pipeline {
    collection: Collection,
    filter: Predicate,
    joins: Vec<Join>,
    projection: Option<Vec<ProjectField>>,
    sort: Option<SortSpec>,
    page: Option<Page>,
}

impl Pipeline {
    /// Validates and normalises `stages`. Unknown fields, a sort key absent from
    /// the output shape, and duplicate project/sort/paginate stages are rejected.
    pub fn new(collection: Collection, stages: Vec<Stage>) -> ApiResult<Self> {
        let mut matches = Vec::new();
        let mut joins = Vec::new();
        let mut projection = None;
        let mut sort = None;
        let mut page = None;

        for stage in stages {
            match stage {
                Stage::Match(p) => matches.push(p),
                Stage::Join(j) => joins.push(j),
                Stage::Project(fields) => {
                    if projection.replace(fields).is_some() {
                        return Err(ApiError::invalid("pipeline has more than one project stage"));
                    }
                }
                Stage::Sort(s) => {
                    if sort.replace(s).is_some() {
                        return Err(ApiError::invalid("pipeline has more than one sort stage"));
                    }
                }
                Stage::Paginate(p) => {
                    if page.replace(p).is_some() {
                        return Err(ApiError::invalid("pipeline has more than one paginate stage"));
                    }
                }
            }
        }

        let mut shape = RowShape::of(collection);

        for predicate in &matches {
            for field in predicate.fields() {
                shape.require(field, "match")?;
            }
        }

        for join in &joins {
            shape.require(&join.local_key, "join")?;
            let joined = RowShape::of(join.from);
            joined.require(&join.foreign_key, "join")?;
            for field in join.filter.fields() {
                joined.require(field, "join")?;
            }
            let nested = match join.mode {
                JoinMode::All => Shape::Docs(join.from),
                JoinMode::First | JoinMode::Inner => Shape::Doc(join.from),
            };
            shape.0.insert(join.as_field.clone(), nested);
        }

        if let Some(fields) = &projection {
            let mut out = RowShape::default();
            out.0.insert(ID_FIELD.to_string(), Shape::Scalar);
            for field in fields {
                let produced = match &field.expr {
                    Expr::Field(path) => shape.require(path, "project")?,
                    Expr::Count(path) => match shape.require(path, "project")? {
                        Shape::Docs(_) => Shape::Scalar,
                        _ => {
                            return Err(ApiError::invalid(format!(
                                "'{}' is not a joined array and cannot be counted",
                                path
                            )));
                        }
                    },
                    Expr::Pick(path, subfields) => match shape.require(path, "project")? {
                        Shape::Doc(c) | Shape::Docs(c) => {
                            if let Some(bad) = subfields.iter().find(|f| !c.declares(f)) {
                                return Err(ApiError::invalid(format!(
                                    "unknown field '{}' on {} in project stage",
                                    bad, c
                                )));
                            }
                            Shape::Object(subfields.clone())
                        }
                        _ => {
                            return Err(ApiError::invalid(format!(
                                "'{}' is not a joined document",
                                path
                            )));
                        }
                    },
                };
                if let Some((head, tail)) = field.name.split_once('.') {
                    let parent = out
                        .0
                        .entry(head.to_string())
                        .or_insert_with(|| Shape::Object(Vec::new()));
                    if let Shape::Object(children) = parent {
                        children.push(tail.to_string());
                    }
                }
                out.0.insert(field.name.clone(), produced);
            }
            shape = out;
        }

        if let Some(spec) = &sort {
            if shape.lookup(&spec.field).is_none() {
                return Err(ApiError::invalid(format!(
                    "cannot sort on unknown field '{}'",
                    spec.field
                )));
            }
        }

        Ok(Pipeline {
            collection,
            filter: Predicate::and(matches),
            joins,
            projection,
            sort,
            page,
        })
    }

    pub fn builder(collection: Collection) -> PipelineBuilder {
        PipelineBuilder {
            collection,
            stages: Vec::new(),
            orphan_join_filter: false,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }
}

/// Collects stages and validates them on [`PipelineBuilder::build`].
pub struct PipelineBuilder {
    collection: Collection,
    stages: Vec<Stage>,
    /// Set when `join_where` was called without a join to attach to.
    orphan_join_filter: bool,
}

impl PipelineBuilder {
    pub fn matching(mut self, predicate: Predicate) -> Self {
        self.stages.push(Stage::Match(predicate));
        self
    }

    pub fn join(
        mut self,
        from: Collection,
        local_key: &str,
        foreign_key: &str,
        as_field: &str,
        mode: JoinMode,
    ) -> Self {
        self.stages.push(Stage::Join(Join {
            from,
            local_key: local_key.to_string(),
            foreign_key: foreign_key.to_string(),
            as_field: as_field.to_string(),
            mode,
            filter: Predicate::All,
        }));
        self
    }

    /// Narrows the immediately preceding join to foreign documents matching
    /// `filter`. Without one, [`PipelineBuilder::build`] fails.
    pub fn join_where(mut self, filter: Predicate) -> Self {
        match self.stages.last_mut() {
            Some(Stage::Join(join)) => join.filter = filter,
            _ => self.orphan_join_filter = true,
        }
        self
    }

    pub fn project(mut self, fields: Vec<ProjectField>) -> Self {
        self.stages.push(Stage::Project(fields));
        self
    }

    pub fn sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.stages.push(Stage::Sort(SortSpec {
            field: field.to_string(),
            direction,
        }));
        self
    }

    pub fn paginate(mut self, page: Page) -> Self {
        self.stages.push(Stage::Paginate(page));
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> ApiResult<Pipeline> {
        if self.orphan_join_filter {
            return Err(ApiError::invalid("join filter must directly follow a join stage"));
        }
        Pipeline::new(self.collection, self.stages)
    }
}

/// Runs a pipeline in process on top of a store's `find`.
/// Joins issue one `find` per join with an `In` filter over the distinct local keys.
pub async fn execute<S: DocumentStore + ?Sized>(
    store: &S,
    pipeline: &Pipeline,
) -> StoreResult<Vec<Document>> {
    let mut rows = store.find(pipeline.collection, &pipeline.filter).await?;

    for join in &pipeline.joins {
        let mut keys: Vec<Value> = Vec::new();
        let mut seen = HashSet::new();
        for row in &rows {
            for key in local_keys(row, &join.local_key) {
                if seen.insert(key.to_string()) {
                    keys.push(key.clone());
                }
            }
        }

        let foreign = if keys.is_empty() {
            Vec::new()
        } else {
            let lookup = Predicate::and(vec![
                Predicate::In(join.foreign_key.clone(), keys),
                join.filter.clone(),
            ]);
            store.find(join.from, &lookup).await?
        };

        let mut by_key: HashMap<String, Vec<&Document>> = HashMap::new();
        for doc in &foreign {
            if let Some(value) = get_path(doc, &join.foreign_key) {
                by_key.entry(value.to_string()).or_default().push(doc);
            }
        }

        rows.retain_mut(|row| {
            let matched: Vec<Value> = local_keys(row, &join.local_key)
                .iter()
                .filter_map(|key| by_key.get(&key.to_string()))
                .flatten()
                .map(|doc| Value::Object((*doc).clone()))
                .collect();
            match join.mode {
                JoinMode::All => {
                    row.insert(join.as_field.clone(), Value::Array(matched));
                    true
                }
                JoinMode::First | JoinMode::Inner => match matched.into_iter().next() {
                    Some(first) => {
                        row.insert(join.as_field.clone(), first);
                        true
                    }
                    None => {
                        row.remove(&join.as_field);
                        join.mode == JoinMode::First
                    }
                },
            }
        });
    }

    if let Some(fields) = &pipeline.projection {
        rows = rows.iter().map(|row| project(row, fields)).collect();
    }

    if let Some(spec) = &pipeline.sort {
        rows.sort_by(|a, b| {
            let primary = compare_values(get_path(a, &spec.field), get_path(b, &spec.field));
            let primary = match spec.direction {
                SortDirection::Ascending => primary,
                SortDirection::Descending => primary.reverse(),
            };
            primary.then_with(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
        });
    }

    if let Some(page) = pipeline.page {
        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        rows = rows.into_iter().skip(skip).take(limit).collect();
    }

    Ok(rows)
}

fn local_keys(row: &Document, path: &str) -> Vec<Value> {
    match get_path(row, path) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(value) => vec![value.clone()],
    }
}

fn pick(value: &Value, fields: &[String]) -> Value {
    match value {
        Value::Object(doc) => Value::Object(
            fields
                .iter()
                .filter_map(|f| doc.get(f).map(|v| (f.clone(), v.clone())))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| pick(item, fields)).collect()),
        other => other.clone(),
    }
}

fn project(row: &Document, fields: &[ProjectField]) -> Document {
    let mut out = Document::new();
    if let Some(id) = row.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        let value = match &field.expr {
            Expr::Field(path) => get_path(row, path).cloned(),
            Expr::Count(path) => {
                let n = get_path(row, path)
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                Some(Value::from(n))
            }
            Expr::Pick(path, subfields) => get_path(row, path).map(|v| pick(v, subfields)),
        };
        if let Some(value) = value {
            set_path(&mut out, &field.name, value);
        }
    }
    out
}

/// QueryConfig
///
/// Normalised listing parameters: `page` 1, `limit` 10 and descending order
/// unless the caller says otherwise. `sort_by` falls back to each view's
/// default field when absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryConfig {
    pub page: Page,
    pub sort_by: Option<String>,
    pub sort_type: SortDirection,
    pub query: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl QueryConfig {
    /// The requested sort field, or `default` when absent or blank.
    pub(crate) fn sort_field<'a>(&'a self, default: &'a str) -> &'a str {
        self.sort_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
    }
}

const VIDEO_CARD_FIELDS: &[&str] = &["_id", "title", "thumbnail", "duration", "views", "owner"];
const PROFILE_FIELDS: &[&str] = &["_id", "username", "email", "avatar"];

/// View
///
/// The named read models served by the API.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Published videos with their like counts, optionally filtered by owner and text.
    AllVideos,
    /// Videos liked by `actor`, each with its current like count.
    LikedVideos { actor: Uuid },
    /// Profiles subscribed to `channel`.
    ChannelSubscribers { channel: Uuid },
    /// Channel profiles `subscriber` follows.
    SubscribedChannels { subscriber: Uuid },
}

impl View {
    pub fn pipeline(&self, config: &QueryConfig) -> ApiResult<Pipeline> {
        let builder = match self {
            View::AllVideos => {
                let mut filters = vec![Predicate::eq("isPublished", true)];
                if let Some(owner) = config.owner_id {
                    filters.push(Predicate::eq("owner", owner.to_string()));
                }
                if let Some(text) = config.query.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                    let pattern = regex::escape(text);
                    let title = Predicate::regex("title", &pattern)
                        .map_err(|e| ApiError::invalid(e.to_string()))?;
                    let description = Predicate::regex("description", &pattern)
                        .map_err(|e| ApiError::invalid(e.to_string()))?;
                    filters.push(Predicate::Or(vec![title, description]));
                }

                let mut fields: Vec<ProjectField> = Collection::Videos
                    .fields()
                    .iter()
                    .filter(|f| **f != ID_FIELD)
                    .map(|f| ProjectField::field(f))
                    .collect();
                fields.push(ProjectField::count("likes", "likes"));

                Pipeline::builder(Collection::Videos)
                    .matching(Predicate::and(filters))
                    .join(Collection::Relations, "_id", "target", "likes", JoinMode::All)
                    .join_where(Predicate::eq("kind", RelationKind::Video.as_str()))
                    .project(fields)
                    .sort(config.sort_field("createdAt"), config.sort_type)
            }
            View::LikedVideos { actor } => Pipeline::builder(Collection::Relations)
                .matching(Predicate::and(vec![
                    Predicate::eq("actor", actor.to_string()),
                    Predicate::eq("kind", RelationKind::Video.as_str()),
                ]))
                .join(Collection::Videos, "target", "_id", "video", JoinMode::Inner)
                .join(Collection::Relations, "target", "target", "likes", JoinMode::All)
                .join_where(Predicate::eq("kind", RelationKind::Video.as_str()))
                .project(vec![
                    ProjectField::pick("video", "video", VIDEO_CARD_FIELDS),
                    ProjectField::count("likes.count", "likes"),
                    ProjectField::renamed("likedAt", "createdAt"),
                ])
                .sort(config.sort_field("likedAt"), config.sort_type),
            View::ChannelSubscribers { channel } => Pipeline::builder(Collection::Relations)
                .matching(Predicate::and(vec![
                    Predicate::eq("kind", RelationKind::Channel.as_str()),
                    Predicate::eq("target", channel.to_string()),
                ]))
                .join(Collection::Users, "actor", "_id", "subscriber", JoinMode::Inner)
                .project(vec![
                    ProjectField::pick("subscriber", "subscriber", PROFILE_FIELDS),
                    ProjectField::renamed("subscribedAt", "createdAt"),
                ])
                .sort(config.sort_field("subscribedAt"), config.sort_type),
            View::SubscribedChannels { subscriber } => Pipeline::builder(Collection::Relations)
                .matching(Predicate::and(vec![
                    Predicate::eq("kind", RelationKind::Channel.as_str()),
                    Predicate::eq("actor", subscriber.to_string()),
                ]))
                .join(Collection::Users, "target", "_id", "channel", JoinMode::Inner)
                .project(vec![
                    ProjectField::pick("channel", "channel", PROFILE_FIELDS),
                    ProjectField::renamed("subscribedAt", "createdAt"),
                ])
                .sort(config.sort_field("subscribedAt"), config.sort_type),
        };

        builder.paginate(config.page).build()
    }
}

/// AggregateQuery
///
/// Executes validated pipelines. Never mutates; an empty page is a success.
/// Reads across joined collections are read-committed, not a snapshot.
#[derive(Clone)]
pub struct AggregateQuery {
    store: StoreState,
}

impl AggregateQuery {
    pub fn new(store: StoreState) -> Self {
        Self { store }
    }

    pub async fn run(&self, pipeline: &Pipeline) -> ApiResult<Vec<Document>> {
        let rows = self.store.run_pipeline(pipeline).await?;
        tracing::debug!(
            collection = %pipeline.collection(),
            rows = rows.len(),
            "aggregate query finished"
        );
        Ok(rows)
    }

    pub async fn run_view(&self, view: &View, config: &QueryConfig) -> ApiResult<Vec<Document>> {
        let pipeline = view.pipeline(config)?;
        self.run(&pipeline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;
    use std::sync::Arc;

    async fn seeded(n: usize) -> AggregateQuery {
        let store = InMemoryDocumentStore::new();
        for i in 0..n {
            let doc = json!({ "_id": format!("v{:02}", i), "title": format!("t{}", i), "views": i });
            store
                .insert(Collection::Videos, doc.as_object().cloned().unwrap())
                .await
                .unwrap();
        }
        AggregateQuery::new(Arc::new(store))
    }

    fn by_views(page: Page) -> Pipeline {
        Pipeline::builder(Collection::Videos)
            .paginate(page)
            .sort("views", SortDirection::Ascending)
            .build()
            .unwrap()
    }

    #[test]
    fn page_defaults_replace_bad_input() {
        assert_eq!(Page::parse(Some("abc"), Some("-3")), Page::default());
        assert_eq!(Page::parse(Some("0"), None), Page::default());
        let page = Page::parse(Some("3"), Some("10"));
        assert_eq!(page.skip(), 20);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        assert_eq!(SortDirection::parse(None), SortDirection::Descending);
        assert_eq!(SortDirection::parse(Some("ASC")), SortDirection::Ascending);
        assert_eq!(SortDirection::parse(Some("sideways")), SortDirection::Descending);
    }

    #[test]
    fn unknown_match_field_is_rejected() {
        let err = Pipeline::builder(Collection::Videos)
            .matching(Predicate::eq("colour", "red"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn sort_on_field_dropped_by_projection_is_rejected() {
        let err = Pipeline::builder(Collection::Videos)
            .project(vec![ProjectField::field("title")])
            .sort("views", SortDirection::Ascending)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("views"));
    }

    #[test]
    fn sort_on_nested_projected_field_is_accepted() {
        Pipeline::builder(Collection::Relations)
            .join(Collection::Relations, "target", "target", "likes", JoinMode::All)
            .project(vec![ProjectField::count("likes.count", "likes")])
            .sort("likes.count", SortDirection::Descending)
            .build()
            .unwrap();
    }

    #[test]
    fn join_filter_without_a_join_is_rejected() {
        let err = Pipeline::builder(Collection::Videos)
            .matching(Predicate::eq("isPublished", true))
            .join_where(Predicate::eq("kind", "video"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn duplicate_paginate_is_rejected() {
        let err = Pipeline::builder(Collection::Videos)
            .paginate(Page::default())
            .paginate(Page::default())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[tokio::test]
    async fn pages_walk_sorted_rows_and_run_out_cleanly() {
        let query = seeded(25).await;

        let first = query.run(&by_views(Page::new(1, 10))).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0]["views"], json!(0));
        assert_eq!(first[9]["views"], json!(9));

        let third = query.run(&by_views(Page::new(3, 10))).await.unwrap();
        assert_eq!(third.len(), 5);
        assert_eq!(third[0]["views"], json!(20));
        assert_eq!(third[4]["views"], json!(24));

        let fourth = query.run(&by_views(Page::new(4, 10))).await.unwrap();
        assert!(fourth.is_empty());
    }

    #[tokio::test]
    async fn first_join_leaves_field_absent_when_nothing_matches() {
        let store = InMemoryDocumentStore::new();
        let actor = Uuid::new_v4();
        store
            .insert(
                Collection::Relations,
                json!({ "_id": "r1", "actor": actor.to_string(), "kind": "video", "target": "gone" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let query = AggregateQuery::new(Arc::new(store));

        // Liked views use an inner join, so a like on a missing video is not listed.
        let rows = query
            .run_view(&View::LikedVideos { actor }, &QueryConfig::default())
            .await
            .unwrap();
        assert!(rows.is_empty());

        let pipeline = Pipeline::builder(Collection::Relations)
            .join(Collection::Videos, "target", "_id", "video", JoinMode::First)
            .build()
            .unwrap();
        let rows = query.run(&pipeline).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key("video"));
    }
}

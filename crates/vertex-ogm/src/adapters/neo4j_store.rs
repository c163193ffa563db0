use async_trait::async_trait;
use dotenv::dotenv;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query, Row};
use std::{env, sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    data::{
        errors::GraphSourceError,
        identifiers::{Identity, VertexId},
        trace_context::TraceContext,
        types::{ElementMap, PropertyMap, PropertyValue},
    },
    traits::{GraphSource, MergeV, Step, Traversal},
};

macro_rules! trace_neo4j {
    ($trace_ctx:expr, $op:expr, $($arg:tt)*) => {
        debug!("[Neo4j:{}][trace:{}] {}", $op, $trace_ctx.trace_id, format!($($arg)*));
    };
}

/// Configuration for Neo4j connection
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub pool_size: usize,
    pub connection_retry_count: u32,
    pub connection_retry_delay: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            pool_size: 10,
            connection_retry_count: 3,
            connection_retry_delay: Duration::from_secs(2),
        }
    }
}

impl Neo4jConfig {
    /// Reads `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`
    /// and `NEO4J_POOL_SIZE`, loading a `.env` file first if present.
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();
        Self {
            uri: env::var("NEO4J_URI").unwrap_or(defaults.uri),
            username: env::var("NEO4J_USERNAME").unwrap_or(defaults.username),
            password: env::var("NEO4J_PASSWORD").unwrap_or(defaults.password),
            database: env::var("NEO4J_DATABASE").ok(),
            pool_size: env::var("NEO4J_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            ..defaults
        }
    }
}

/// Neo4j backed [`GraphSource`].
///
/// Vertex identity lives in an `id` property. A composed traversal compiles to
/// one Cypher statement, so each chunk is one round trip.
pub struct Neo4jGraph {
    graph: Arc<Graph>,
    config: Neo4jConfig,
}

impl Neo4jGraph {
    pub fn get_config(&self) -> &Neo4jConfig {
        &self.config
    }

    /// Connects with retries.
    pub async fn new(config: Neo4jConfig) -> Result<Self, GraphSourceError> {
        let mut config_builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.username)
            .password(&config.password)
            .max_connections(config.pool_size);
        if let Some(db) = &config.database {
            config_builder = config_builder.db(db.as_str());
        }
        let neo4j_config = config_builder.build().map_err(|e| {
            GraphSourceError::ConnectionError(format!("Failed to build Neo4j config: {}", e))
        })?;

        let mut last_error = None;
        for attempt in 1..=config.connection_retry_count {
            match Graph::connect(neo4j_config.clone()).await {
                Ok(graph) => match graph.run(Query::new("RETURN 1".to_string())).await {
                    Ok(()) => {
                        info!("Connected to Neo4j at {} (attempt {})", config.uri, attempt);
                        return Ok(Self {
                            graph: Arc::new(graph),
                            config,
                        });
                    }
                    Err(e) => {
                        error!("Connection test failed: {}", e);
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    error!("Failed to connect to Neo4j (attempt {}): {}", attempt, e);
                    last_error = Some(e);
                }
            }
            if attempt < config.connection_retry_count {
                tokio::time::sleep(config.connection_retry_delay).await;
            }
        }

        Err(GraphSourceError::ConnectionError(format!(
            "Failed to connect to Neo4j after {} attempts. Last error: {:?}",
            config.connection_retry_count, last_error
        )))
    }

    async fn fetch(&self, compiled: CompiledQuery) -> Result<Vec<Row>, GraphSourceError> {
        let mut result = self
            .graph
            .execute(compiled.into_query())
            .await
            .map_err(|e| GraphSourceError::QueryError(format!("Failed to execute query: {}", e)))?;

        let mut rows = Vec::new();
        loop {
            match result.next().await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break,
                Err(e) => {
                    return Err(GraphSourceError::QueryError(format!("Failed to read row: {}", e)))
                }
            }
        }
        Ok(rows)
    }
}

/// A Cypher statement plus its parameters, kept driver independent until sent.
#[derive(Debug, Clone, PartialEq)]
struct CompiledQuery {
    text: String,
    params: Vec<(String, PropertyValue)>,
}

impl CompiledQuery {
    fn into_query(self) -> Query {
        self.params
            .into_iter()
            .fold(Query::new(self.text), |query, (key, value)| query.param(&key, to_bolt(value)))
    }
}

const RETURN_ELEMENT: &str = "RETURN {v}.id AS id, labels({v})[0] AS label, properties({v}) AS props";

fn return_element(var: &str) -> String {
    RETURN_ELEMENT.replace("{v}", var)
}

/// Backtick-quotes a label or property key.
fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn id_value(id: &VertexId) -> PropertyValue {
    match id {
        VertexId::Int(i) => PropertyValue::Integer(*i),
        VertexId::Str(s) => PropertyValue::String(s.clone()),
    }
}

fn to_bolt(value: PropertyValue) -> BoltType {
    match value {
        PropertyValue::Bool(b) => b.into(),
        PropertyValue::Integer(i) => i.into(),
        PropertyValue::Float(f) => f.into(),
        PropertyValue::String(s) => s.into(),
        PropertyValue::List(items) => items.into_iter().map(to_bolt).collect::<Vec<BoltType>>().into(),
    }
}

/// Renders `var.key = $param` assignments, skipping the reserved id key.
fn assignments(
    var: &str,
    prefix: &str,
    payload: PropertyMap,
    params: &mut Vec<(String, PropertyValue)>,
) -> Option<String> {
    let mut entries: Vec<(String, PropertyValue)> =
        payload.into_iter().filter(|(key, _)| key != "id" && key != "label").collect();
    if entries.is_empty() {
        return None;
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let rendered = entries
        .into_iter()
        .enumerate()
        .map(|(j, (key, value))| {
            let param = format!("{}_{}", prefix, j);
            let assignment = format!("{}.{} = ${}", var, quote(&key), param);
            params.push((param, value));
            assignment
        })
        .collect::<Vec<_>>();
    Some(rendered.join(", "))
}

/// Compiles a traversal into a single statement returning the terminal element.
///
/// Returns `None` when no step can touch the graph.
fn compile(traversal: Traversal) -> Option<CompiledQuery> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params = Vec::new();
    let mut terminal: Option<String> = None;

    for (i, step) in traversal.into_steps().into_iter().enumerate() {
        match step {
            Step::MergeV(MergeV {
                id,
                label,
                on_create,
                on_match,
            }) => {
                let var = format!("v{}", i);
                let id_param = format!("id{}", i);
                let label = quote(&label);
                match (id, on_create) {
                    (Some(id), Some(create)) => {
                        params.push((id_param.clone(), id_value(&id)));
                        clauses.push(format!("MERGE ({}:{} {{id: ${}}})", var, label, id_param));
                        if let Some(set) = assignments(&var, &format!("c{}", i), create, &mut params) {
                            clauses.push(format!("ON CREATE SET {}", set));
                        }
                        if let Some(set) = on_match
                            .and_then(|m| assignments(&var, &format!("m{}", i), m, &mut params))
                        {
                            clauses.push(format!("ON MATCH SET {}", set));
                        }
                    }
                    (Some(id), None) => {
                        params.push((id_param.clone(), id_value(&id)));
                        if !clauses.is_empty() {
                            clauses.push("WITH *".to_string());
                        }
                        clauses.push(format!("OPTIONAL MATCH ({}:{} {{id: ${}}})", var, label, id_param));
                        if let Some(set) = on_match
                            .and_then(|m| assignments(&var, &format!("m{}", i), m, &mut params))
                        {
                            clauses.push(format!("SET {}", set));
                        }
                    }
                    (None, Some(create)) => {
                        params.push((id_param.clone(), PropertyValue::String(Uuid::new_v4().to_string())));
                        clauses.push(format!("CREATE ({}:{} {{id: ${}}})", var, label, id_param));
                        if let Some(set) = assignments(&var, &format!("c{}", i), create, &mut params) {
                            clauses.push(format!("SET {}", set));
                        }
                    }
                    (None, None) => {
                        terminal = None;
                        continue;
                    }
                }
                terminal = Some(var);
            }
            Step::SetProperty { id, label, key, value } => {
                let var = format!("s{}", i);
                let id_param = format!("id{}", i);
                params.push((id_param.clone(), id_value(&id)));
                if !clauses.is_empty() {
                    clauses.push("WITH *".to_string());
                }
                clauses.push(format!(
                    "OPTIONAL MATCH ({}:{} {{id: ${}}})",
                    var,
                    quote(&label),
                    id_param
                ));
                match value {
                    Some(value) => {
                        let param = format!("p{}", i);
                        clauses.push(format!("SET {}.{} = ${}", var, quote(&key), param));
                        params.push((param, value));
                    }
                    None => clauses.push(format!("REMOVE {}.{}", var, quote(&key))),
                }
                terminal = Some(var);
            }
        }
    }

    if clauses.is_empty() {
        return None;
    }
    match terminal {
        Some(var) => clauses.push(return_element(&var)),
        None => clauses.push("RETURN null AS id, null AS label, null AS props".to_string()),
    }
    Some(CompiledQuery {
        text: clauses.join("\n"),
        params,
    })
}

fn json_to_identity(value: serde_json::Value) -> Result<Option<Identity>, GraphSourceError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(|i| Some(Identity::Int(i)))
            .ok_or_else(|| GraphSourceError::MappingError(format!("Non-integer vertex id {}", n))),
        // stored strings are returned verbatim, even when they look like UUIDs
        serde_json::Value::String(s) => Ok(Some(Identity::Str(s))),
        other => Err(GraphSourceError::MappingError(format!("Unsupported vertex id {}", other))),
    }
}

/// Maps a `RETURN id, label, props` row; a null id means no element.
fn row_to_element(row: &Row) -> Result<Option<ElementMap>, GraphSourceError> {
    let id = row
        .get::<serde_json::Value>("id")
        .map_err(|e| GraphSourceError::MappingError(format!("Failed to read id: {}", e)))?;
    let identity = match json_to_identity(id)? {
        Some(identity) => identity,
        None => return Ok(None),
    };
    let label = row
        .get::<Option<String>>("label")
        .map_err(|e| GraphSourceError::MappingError(format!("Failed to read label: {}", e)))?;
    let props = row
        .get::<serde_json::Value>("props")
        .map_err(|e| GraphSourceError::MappingError(format!("Failed to read properties: {}", e)))?;

    let mut properties = PropertyMap::new();
    if let serde_json::Value::Object(object) = props {
        for (key, value) in object {
            if key == "id" {
                continue;
            }
            match PropertyValue::from_json(value) {
                Some(value) => {
                    properties.insert(key, value);
                }
                None => debug!("Skipping unsupported property {}", key),
            }
        }
    }

    Ok(Some(ElementMap {
        id: Some(identity),
        label,
        properties,
    }))
}

#[async_trait]
impl GraphSource for Neo4jGraph {
    #[instrument(skip(self, trace_ctx, ids), fields(trace_id = %trace_ctx.trace_id, count = ids.len()))]
    async fn element_maps(
        &self,
        trace_ctx: &TraceContext,
        label: &str,
        ids: &[VertexId],
    ) -> Result<Vec<ElementMap>, GraphSourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = CompiledQuery {
            text: format!(
                "MATCH (n:{}) WHERE n.id IN $ids\n{}",
                quote(label),
                return_element("n")
            ),
            params: vec![(
                "ids".to_string(),
                PropertyValue::List(ids.iter().map(id_value).collect()),
            )],
        };
        trace_neo4j!(trace_ctx, "element_maps", "Looking up {} ids", ids.len());

        let mut elements = Vec::with_capacity(ids.len());
        for row in self.fetch(compiled).await? {
            if let Some(element) = row_to_element(&row)? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    #[instrument(skip(self, trace_ctx, traversal), fields(trace_id = %trace_ctx.trace_id, steps = traversal.len()))]
    async fn submit(
        &self,
        trace_ctx: &TraceContext,
        traversal: Traversal,
    ) -> Result<Option<ElementMap>, GraphSourceError> {
        if traversal.is_empty() {
            return Err(GraphSourceError::InvalidInput("empty traversal".to_string()));
        }
        let compiled = match compile(traversal) {
            Some(compiled) => compiled,
            None => return Ok(None),
        };
        trace_neo4j!(trace_ctx, "submit", "{}", compiled.text);

        match self.fetch(compiled).await?.first() {
            Some(row) => row_to_element(row),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    async fn remove_property(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
        key: &str,
    ) -> Result<Option<PropertyValue>, GraphSourceError> {
        let compiled = CompiledQuery {
            text: format!("MATCH (n {{id: $id}}) REMOVE n.{key} RETURN n.{key} AS value", key = quote(key)),
            params: vec![("id".to_string(), id_value(id))],
        };
        trace_neo4j!(trace_ctx, "remove_property", "Removing {} from {}", key, id);

        match self.fetch(compiled).await?.first() {
            Some(row) => {
                let value = row
                    .get::<serde_json::Value>("value")
                    .map_err(|e| GraphSourceError::MappingError(format!("Failed to read value: {}", e)))?;
                Ok(PropertyValue::from_json(value))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    async fn drop_vertex(
        &self,
        trace_ctx: &TraceContext,
        id: &VertexId,
    ) -> Result<(), GraphSourceError> {
        trace_neo4j!(trace_ctx, "drop_vertex", "Dropping {}", id);
        let query = CompiledQuery {
            text: "MATCH (n {id: $id}) DETACH DELETE n".to_string(),
            params: vec![("id".to_string(), id_value(id))],
        }
        .into_query();
        self.graph
            .run(query)
            .await
            .map_err(|e| GraphSourceError::QueryError(format!("Failed to drop vertex: {}", e)))
    }
}

//! Neo4j backend.
//!
//! Stores airports, amenities and policies as `Airport`, `Amenity` and
//! `Policy` nodes. Flights and tickets are not modelled in the graph, so
//! those families (and therefore full export) are unsupported.
//!
//! Similarity search goes through Neo4j vector indexes
//! (`db.index.vector.queryNodes`). Opening hours are stored as `HH:MM:SS`
//! strings and embeddings as float lists.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::BoxFuture;
use neo4rs::{query, Graph, Node, Query};
use tracing::{debug, error, info, warn};

use super::{config_mismatch, limit_param};
use crate::config::{DatastoreConfig, Neo4jConfig};
use crate::datastore::lifecycle::{self, VectorIndex, AMENITIES_INDEX, POLICIES_INDEX, VECTOR_INDEXES};
use crate::datastore::{
    AirportStore, AmenityStore, Capability, Client, Kind, PolicyStore, QueryOutput, SEARCH_LIMIT,
};
use crate::error::{DatastoreError, Result};
use crate::models::time::{format_time_of_day, parse_time_of_day};
use crate::models::{Airport, Amenity, Dataset, Embedding, Policy, WEEKLY_HOUR_COLUMNS};

const CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT airport_id IF NOT EXISTS FOR (a:Airport) REQUIRE a.id IS UNIQUE",
    "CREATE CONSTRAINT amenity_id IF NOT EXISTS FOR (a:Amenity) REQUIRE a.id IS UNIQUE",
    "CREATE CONSTRAINT policy_id IF NOT EXISTS FOR (p:Policy) REQUIRE p.id IS UNIQUE",
];

fn create_index_cypher(index: &VectorIndex) -> String {
    format!(
        "CREATE VECTOR INDEX {} IF NOT EXISTS
         FOR (n:{}) ON n.{}
         OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: 'cosine'}}}}",
        index.name,
        index.label,
        index.column,
        index.dimensions()
    )
}

fn drop_index_cypher(index: &VectorIndex) -> String {
    format!("DROP INDEX {} IF EXISTS", index.name)
}

/// `k` is clamped to the label's node count; the index rejects larger values
/// on some server versions.
fn vector_search_cypher(index: &VectorIndex) -> String {
    format!(
        "MATCH (n:{}) WITH count(n) AS total WHERE total > 0
         CALL db.index.vector.queryNodes($index, CASE WHEN $k < total THEN $k ELSE total END, $embedding)
         YIELD node, score
         RETURN node ORDER BY score DESC",
        index.label
    )
}

fn create_amenity_cypher() -> String {
    let hours: Vec<String> = WEEKLY_HOUR_COLUMNS
        .iter()
        .map(|column| format!("{0}: ${0}", column))
        .collect();
    format!(
        "CREATE (:Amenity {{id: $id, name: $name, description: $description, \
         location: $location, terminal: $terminal, category: $category, hour: $hour, \
         {}, content: $content, embedding: $embedding}})",
        hours.join(", ")
    )
}

/// Neo4j graph client.
pub struct Neo4jClient {
    graph: Mutex<Option<Arc<Graph>>>,
}

impl Neo4jClient {
    /// Connects and runs a trivial query to verify credentials.
    pub async fn connect(config: Neo4jConfig) -> Result<Self> {
        info!(uri = %config.uri, "Connecting to Neo4j");
        let graph = Graph::new(&config.uri, &config.auth.username, &config.auth.password).await?;
        graph.run(query("RETURN 1")).await?;
        info!("Connected to Neo4j");

        Ok(Self {
            graph: Mutex::new(Some(Arc::new(graph))),
        })
    }

    fn graph(&self) -> Result<Arc<Graph>> {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DatastoreError::Closed)
    }

    async fn fetch_nodes(&self, q: Query, column: &str) -> Result<Vec<Node>> {
        let graph = self.graph()?;
        let mut result = graph.execute(q).await?;
        let mut nodes = Vec::new();
        while let Some(row) = result.next().await? {
            let node: Node = row
                .get(column)
                .map_err(|e| DatastoreError::Decode(format!("column '{}': {}", column, e)))?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    async fn fetch_node(&self, q: Query, column: &str) -> Result<Option<Node>> {
        Ok(self.fetch_nodes(q, column).await?.into_iter().next())
    }

    async fn vector_search(
        &self,
        index: &VectorIndex,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<Node>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let q = query(&vector_search_cypher(index))
            .param("index", index.name)
            .param("k", limit_param(top_k))
            .param("embedding", embedding.to_f64_vec());
        self.fetch_nodes(q, "node").await
    }
}

/// Registry constructor for [`Kind::Neo4j`].
pub fn create(config: DatastoreConfig) -> BoxFuture<'static, Result<Box<dyn Client>>> {
    Box::pin(async move {
        match config {
            DatastoreConfig::Neo4j(config) => {
                let client = Neo4jClient::connect(config).await?;
                Ok(Box::new(client) as Box<dyn Client>)
            }
            other => Err(config_mismatch(Kind::Neo4j, &other)),
        }
    })
}

// ============================================================================
// Node conversion
// ============================================================================

fn property<T>(node: &Node, key: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    node.get::<T>(key)
        .map_err(|e| DatastoreError::Decode(format!("property '{}': {}", key, e)))
}

fn node_to_airport(node: &Node) -> Result<Airport> {
    Ok(Airport {
        id: property(node, "id")?,
        iata: property(node, "iata")?,
        name: property(node, "name")?,
        city: property(node, "city")?,
        country: property(node, "country")?,
    })
}

fn node_to_amenity(node: &Node) -> Result<Amenity> {
    let mut hours = [None; 14];
    for (slot, column) in hours.iter_mut().zip(WEEKLY_HOUR_COLUMNS) {
        // Absent or null properties are closed days.
        *slot = match node.get::<String>(column).ok() {
            Some(text) => Some(parse_time_of_day(&text)?),
            None => None,
        };
    }
    let embedding: Vec<f64> = property(node, "embedding")?;

    Ok(Amenity::from_parts(
        property(node, "id")?,
        property(node, "name")?,
        property(node, "description")?,
        property(node, "location")?,
        property(node, "terminal")?,
        property(node, "category")?,
        property(node, "hour")?,
        hours,
        property(node, "content")?,
        Embedding::try_from(embedding)?,
    ))
}

fn airport_query(a: &Airport) -> Query {
    query(
        "CREATE (:Airport {id: $id, iata: $iata, name: $name, city: $city, country: $country})",
    )
    .param("id", a.id)
    .param("iata", a.iata.clone())
    .param("name", a.name.clone())
    .param("city", a.city.clone())
    .param("country", a.country.clone())
}

fn amenity_query(cypher: &str, a: &Amenity) -> Query {
    let mut q = query(cypher)
        .param("id", a.id)
        .param("name", a.name.clone())
        .param("description", a.description.clone())
        .param("location", a.location.clone())
        .param("terminal", a.terminal.clone())
        .param("category", a.category.clone())
        .param("hour", a.hour.clone())
        .param("content", a.content.clone())
        .param("embedding", a.embedding.to_f64_vec());
    for (column, time) in WEEKLY_HOUR_COLUMNS.iter().zip(a.weekly_hours()) {
        q = q.param(column, time.map(|t| format_time_of_day(&t)));
    }
    q
}

fn policy_query(p: &Policy) -> Query {
    query("CREATE (:Policy {id: $id, content: $content, embedding: $embedding})")
        .param("id", p.id)
        .param("content", p.content.clone())
        .param("embedding", p.embedding.to_f64_vec())
}

// ============================================================================
// Contract
// ============================================================================

#[async_trait]
impl AirportStore for Neo4jClient {
    async fn get_airport_by_id(&self, id: i64) -> Result<QueryOutput<Option<Airport>>> {
        let node = self
            .fetch_node(
                query("MATCH (airport:Airport {id: $id}) RETURN airport").param("id", id),
                "airport",
            )
            .await?;
        let airport = node.as_ref().map(node_to_airport).transpose()?;
        Ok(QueryOutput::plain(airport))
    }

    async fn get_airport_by_iata(&self, iata: &str) -> Result<QueryOutput<Option<Airport>>> {
        let node = self
            .fetch_node(
                query(
                    "MATCH (airport:Airport) WHERE toLower(airport.iata) = toLower($iata)
                     RETURN airport ORDER BY airport.id LIMIT 1",
                )
                .param("iata", iata),
                "airport",
            )
            .await?;
        let airport = node.as_ref().map(node_to_airport).transpose()?;
        Ok(QueryOutput::plain(airport))
    }

    async fn search_airports(
        &self,
        country: Option<&str>,
        city: Option<&str>,
        name: Option<&str>,
    ) -> Result<QueryOutput<Vec<Airport>>> {
        let q = query(
            "MATCH (airport:Airport)
             WHERE ($country IS NULL OR toLower(airport.country) CONTAINS toLower($country))
               AND ($city IS NULL OR toLower(airport.city) CONTAINS toLower($city))
               AND ($name IS NULL OR toLower(airport.name) CONTAINS toLower($name))
             RETURN airport ORDER BY airport.id LIMIT $limit",
        )
        .param("country", country.map(str::to_string))
        .param("city", city.map(str::to_string))
        .param("name", name.map(str::to_string))
        .param("limit", SEARCH_LIMIT);

        let airports = self
            .fetch_nodes(q, "airport")
            .await?
            .iter()
            .map(node_to_airport)
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryOutput::plain(airports))
    }
}

#[async_trait]
impl AmenityStore for Neo4jClient {
    async fn get_amenity(&self, id: i64) -> Result<QueryOutput<Option<Amenity>>> {
        let node = self
            .fetch_node(
                query("MATCH (amenity:Amenity {id: $id}) RETURN amenity").param("id", id),
                "amenity",
            )
            .await?;
        let amenity = node.as_ref().map(node_to_amenity).transpose()?;
        Ok(QueryOutput::plain(amenity))
    }

    async fn amenities_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<Amenity>>> {
        let amenities = self
            .vector_search(&AMENITIES_INDEX, query, top_k)
            .await?
            .iter()
            .map(node_to_amenity)
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryOutput::plain(amenities))
    }
}

#[async_trait]
impl PolicyStore for Neo4jClient {
    async fn policies_search(
        &self,
        query: &Embedding,
        _similarity_threshold: f64,
        top_k: usize,
    ) -> Result<QueryOutput<Vec<String>>> {
        let contents = self
            .vector_search(&POLICIES_INDEX, query, top_k)
            .await?
            .iter()
            .map(|node| property::<String>(node, "content"))
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryOutput::plain(contents))
    }
}

#[async_trait]
impl Client for Neo4jClient {
    fn kind(&self) -> Kind {
        Kind::Neo4j
    }

    fn airports(&self) -> Option<&dyn AirportStore> {
        Some(self)
    }

    fn amenities(&self) -> Option<&dyn AmenityStore> {
        Some(self)
    }

    fn policies(&self) -> Option<&dyn PolicyStore> {
        Some(self)
    }

    /// Replaces the graph in one transaction with strictly sequential writes.
    ///
    /// Schema statements cannot share a transaction with data writes, so
    /// indexes are dropped before and rebuilt after the transaction.
    async fn initialize_data(&self, dataset: &Dataset) -> Result<()> {
        lifecycle::ensure_supported(self.kind(), self.capabilities(), dataset)?;
        let graph = self.graph()?;

        for index in &VECTOR_INDEXES {
            graph.run(query(&drop_index_cypher(index))).await?;
        }
        for constraint in CONSTRAINTS {
            graph.run(query(constraint)).await?;
        }

        let mut txn = graph.start_txn().await?;
        txn.run(query("MATCH (n) DETACH DELETE n")).await?;

        for airport in &dataset.airports {
            txn.run(airport_query(airport)).await?;
        }
        debug!(count = dataset.airports.len(), "Created airport nodes");

        let create_amenity = create_amenity_cypher();
        for amenity in &dataset.amenities {
            txn.run(amenity_query(&create_amenity, amenity)).await?;
        }
        debug!(count = dataset.amenities.len(), "Created amenity nodes");

        for policy in &dataset.policies {
            txn.run(policy_query(policy)).await?;
        }
        debug!(count = dataset.policies.len(), "Created policy nodes");

        txn.commit().await?;

        for index in &VECTOR_INDEXES {
            graph.run(query(&create_index_cypher(index))).await?;
            info!(index = index.name, label = index.label, "Created vector index");
        }
        // Index population is asynchronous; searches fail until it is online.
        graph.run(query("CALL db.awaitIndexes(300)")).await?;
        Ok(())
    }

    /// Flights and tickets live outside the graph, so no complete dataset
    /// can be produced.
    async fn export_data(&self) -> Result<Dataset> {
        Err(DatastoreError::Unsupported {
            kind: self.kind(),
            capability: Capability::Flights,
        })
    }

    async fn close(&self) {
        let Some(graph) = self
            .graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("Neo4j driver already released");
            return;
        };

        for index in &VECTOR_INDEXES {
            if let Err(e) = graph.run(query(&drop_index_cypher(index))).await {
                error!(index = index.name, error = %e, "Failed to drop vector index");
            }
        }
        drop(graph);
        info!("Neo4j driver released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_index_cypher() {
        let cypher = create_index_cypher(&AMENITIES_INDEX);
        assert!(cypher.starts_with("CREATE VECTOR INDEX amenities_index IF NOT EXISTS"));
        assert!(cypher.contains("FOR (n:Amenity) ON n.embedding"));
        assert!(cypher.contains("`vector.dimensions`: 768"));
        assert!(cypher.contains("'cosine'"));
    }

    #[test]
    fn test_drop_index_cypher() {
        assert_eq!(
            drop_index_cypher(&POLICIES_INDEX),
            "DROP INDEX policies_index IF EXISTS"
        );
    }

    #[test]
    fn test_create_amenity_binds_every_hour() {
        let cypher = create_amenity_cypher();
        for column in WEEKLY_HOUR_COLUMNS {
            assert!(cypher.contains(&format!("{0}: ${0}", column)), "{}", column);
        }
        assert!(cypher.ends_with("content: $content, embedding: $embedding})"));
    }

    #[test]
    fn test_vector_search_clamps_k_to_node_count() {
        let cypher = vector_search_cypher(&POLICIES_INDEX);
        assert!(cypher.starts_with("MATCH (n:Policy) WITH count(n) AS total WHERE total > 0"));
        assert!(cypher.contains("CASE WHEN $k < total THEN $k ELSE total END"));
        assert!(!cypher.contains("LIMIT"));
        assert_eq!(limit_param(usize::MAX), i64::MAX);
    }

    fn released_client() -> Neo4jClient {
        Neo4jClient {
            graph: Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn test_export_is_unsupported_without_touching_the_graph() {
        let client = released_client();
        let err = client.export_data().await.unwrap_err();
        assert!(matches!(
            err,
            DatastoreError::Unsupported {
                kind: Kind::Neo4j,
                capability: Capability::Flights
            }
        ));
        assert!(client.flights().is_none());
        assert!(client.tickets().is_none());
    }

    #[tokio::test]
    async fn test_search_after_release_is_closed() {
        let client = released_client();
        let embedding = Embedding::new(vec![0.1; crate::models::EMBEDDING_DIMENSIONS]).unwrap();
        let err = client
            .vector_search(&AMENITIES_INDEX, &embedding, usize::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, DatastoreError::Closed));
    }
}

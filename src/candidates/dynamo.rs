//! DynamoDB candidate storage.
//!
//! The table is keyed on `id`. Lookups by composite key go through the
//! [`COMPOSITE_KEY_INDEX`] global secondary index on `compositeKey`.

use std::collections::HashMap;

use anyhow::Context as _;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::Candidate;
use super::repository::{CandidateRepository, StorageError};

pub const COMPOSITE_KEY_INDEX: &str = "GSI-Candidates-CompositeKey";

type Item = HashMap<String, AttributeValue>;

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// The process-wide client, built from the default AWS provider chain
/// (environment, profile, container or instance role) on first use.
pub async fn shared_client() -> &'static Client {
    CLIENT
        .get_or_init(|| async {
            let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            info!(region = ?sdk.region(), "dynamodb client ready");
            Client::new(&sdk)
        })
        .await
}

#[derive(Clone)]
pub struct DynamoCandidateRepository {
    client: Client,
    table: String,
}

impl DynamoCandidateRepository {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self { client, table: table.into() }
    }

    /// A repository over [`shared_client`].
    pub async fn shared(table: &str) -> Self {
        Self::new(shared_client().await.clone(), table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn key(id: &str) -> AttributeValue {
    AttributeValue::S(id.to_owned())
}

fn decode(item: Item) -> Result<Candidate, StorageError> {
    Ok(serde_dynamo::from_item(item).context("decode candidate")?)
}

fn encode(candidate: &Candidate) -> Result<Item, StorageError> {
    Ok(serde_dynamo::to_item(candidate).context("encode candidate")?)
}

/// `SET #f0 = :v0, #f1 = :v1, ...` over the non-null fields, with its
/// name and value placeholders. `None` when nothing is left to set.
#[derive(Debug)]
struct SetExpression {
    expression: String,
    names: HashMap<String, String>,
    values: Item,
}

impl SetExpression {
    fn from_fields(fields: Map<String, Value>) -> Result<Option<Self>, StorageError> {
        let mut assignments = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        for (i, (field, value)) in fields.into_iter().filter(|(_, v)| !v.is_null()).enumerate() {
            let name = format!("#f{i}");
            let placeholder = format!(":v{i}");
            let value: AttributeValue = serde_dynamo::to_attribute_value(value)
                .with_context(|| format!("encode field `{field}`"))?;

            assignments.push(format!("{name} = {placeholder}"));
            names.insert(name, field);
            values.insert(placeholder, value);
        }

        if assignments.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { expression: format!("SET {}", assignments.join(", ")), names, values }))
    }
}

#[async_trait]
impl CandidateRepository for DynamoCandidateRepository {
    async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>, StorageError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("id", key(id))
            .send()
            .await
            .context("GetItem")?;

        out.item.filter(|item| !item.is_empty()).map(decode).transpose()
    }

    async fn get_by_composite_key(&self, composite_key: &str) -> Result<Option<Candidate>, StorageError> {
        let out = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(COMPOSITE_KEY_INDEX)
            .key_condition_expression("#ck = :ck")
            .expression_attribute_names("#ck", "compositeKey")
            .expression_attribute_values(":ck", AttributeValue::S(composite_key.to_owned()))
            .send()
            .await
            .context("Query")?;

        out.items.unwrap_or_default().into_iter().next().map(decode).transpose()
    }

    /// Puts the record unless the item under its id already carries the
    /// same composite key. The same id on another sheet replaces the item.
    async fn create(&self, candidate: Candidate) -> Result<(), StorageError> {
        let composite_key = candidate.composite_key.clone();
        let item = encode(&candidate)?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#id) OR #ck <> :ck")
            .expression_attribute_names("#id", "id")
            .expression_attribute_names("#ck", "compositeKey")
            .expression_attribute_values(":ck", AttributeValue::S(composite_key.clone()))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(table = %self.table, id = %candidate.id, "candidate stored");
                Ok(())
            }
            Err(e) if e.as_service_error().is_some_and(|e| e.is_conditional_check_failed_exception()) => {
                Err(StorageError::Conflict(composite_key))
            }
            Err(e) => Err(anyhow::Error::new(e).context("PutItem").into()),
        }
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::MissingId);
        }
        let Some(set) = SetExpression::from_fields(fields)? else {
            return Ok(());
        };

        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("id", key(id))
            .update_expression(set.expression)
            .condition_expression("attribute_exists(#id)")
            .set_expression_attribute_names(Some(set.names))
            .expression_attribute_names("#id", "id")
            .set_expression_attribute_values(Some(set.values))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            // Absent id: nothing to update.
            Err(e) if e.as_service_error().is_some_and(|e| e.is_conditional_check_failed_exception()) => {
                debug!(table = %self.table, id = %id, "update of absent candidate ignored");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("UpdateItem").into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("id", key(id))
            .send()
            .await
            .context("DeleteItem")?;
        Ok(())
    }
}

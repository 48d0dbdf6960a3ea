//! SpiceDB client over the HTTP/JSON gateway.
//!
//! Enumerating endpoints (`read`, `lookup`) stream newline-delimited JSON
//! objects of the form `{"result": ...}` or `{"error": ...}`; the whole body
//! is drained and decoded line by line.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_object, validate_tuple, HealthStatus, ObjectReference, RelationshipStore,
    StoredTuple, TupleFilter,
};

const PERMISSIONSHIP_HAS_PERMISSION: &str = "PERMISSIONSHIP_HAS_PERMISSION";

/// Connection settings for [`SpiceDbHttpStore`].
#[derive(Debug, Clone)]
pub struct SpiceDbConfig {
    /// Base URL of the HTTP gateway, e.g. `http://localhost:8443`.
    pub endpoint: String,
    /// Preshared key sent as a bearer token.
    pub preshared_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Read at full consistency instead of minimizing latency.
    pub fully_consistent: bool,
}

impl SpiceDbConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            preshared_key: None,
            timeout: Duration::from_secs(10),
            fully_consistent: false,
        }
    }
}

/// RelationshipStore backed by a SpiceDB HTTP gateway.
#[derive(Debug, Clone)]
pub struct SpiceDbHttpStore {
    client: Client,
    config: SpiceDbConfig,
}

impl SpiceDbHttpStore {
    /// Creates a client; no request is made until the first call.
    pub fn new(config: SpiceDbConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::InternalError {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn consistency(&self) -> Consistency {
        if self.config.fully_consistent {
            Consistency {
                fully_consistent: Some(true),
                minimize_latency: None,
            }
        } else {
            Consistency {
                fully_consistent: None,
                minimize_latency: Some(true),
            }
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> StorageResult<reqwest::Response> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(ref key) = self.config.preshared_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response = request.send().await.map_err(map_transport_error)?;
        check_status(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> StorageResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, body)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::SerializationError {
                message: format!("invalid response from {path}: {e}"),
            })
    }

    async fn post_stream<B, T>(&self, path: &str, body: &B) -> StorageResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self
            .post(path, body)
            .await?
            .text()
            .await
            .map_err(map_transport_error)?;
        decode_stream(path, &text)
    }
}

#[async_trait]
impl RelationshipStore for SpiceDbHttpStore {
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn write_tuples(&self, tuples: Vec<StoredTuple>) -> StorageResult<()> {
        if tuples.is_empty() {
            debug!("no relationships to write");
            return Ok(());
        }
        for tuple in &tuples {
            validate_tuple(tuple)?;
        }
        let request = WriteRelationshipsRequest {
            updates: tuples
                .iter()
                .map(|t| RelationshipUpdate {
                    operation: "OPERATION_TOUCH",
                    relationship: Relationship::from(t),
                })
                .collect(),
        };
        let _: serde_json::Value = self.post_json("/v1/relationships/write", &request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn check_permission(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<bool> {
        validate_object(resource)?;
        validate_object(subject)?;
        let request = CheckPermissionRequest {
            consistency: self.consistency(),
            resource: WireObject::from(resource),
            permission,
            subject: WireSubject::from(subject),
        };
        let response: CheckPermissionResponse =
            self.post_json("/v1/permissions/check", &request).await?;
        Ok(response.permissionship == PERMISSIONSHIP_HAS_PERMISSION)
    }

    #[instrument(skip(self))]
    async fn read_tuples(&self, filter: &TupleFilter) -> StorageResult<Vec<StoredTuple>> {
        let request = ReadRelationshipsRequest {
            consistency: self.consistency(),
            relationship_filter: WireFilter {
                resource_type: filter.resource_type.clone().unwrap_or_default(),
                optional_resource_id: filter.resource_id.clone(),
                optional_relation: filter.relation.clone(),
                optional_subject_filter: filter
                    .subject_type
                    .clone()
                    .map(|subject_type| SubjectFilter { subject_type }),
            },
        };
        let results: Vec<ReadRelationshipsResult> =
            self.post_stream("/v1/relationships/read", &request).await?;
        Ok(results
            .into_iter()
            .map(|r| r.relationship.into_stored())
            .collect())
    }

    #[instrument(skip(self))]
    async fn lookup_resources(
        &self,
        resource_type: &str,
        permission: &str,
        subject: &ObjectReference,
    ) -> StorageResult<Vec<String>> {
        validate_object(subject)?;
        let request = LookupResourcesRequest {
            consistency: self.consistency(),
            resource_object_type: resource_type,
            permission,
            subject: WireSubject::from(subject),
        };
        let results: Vec<LookupResourcesResult> =
            self.post_stream("/v1/permissions/resources", &request).await?;
        Ok(results.into_iter().map(|r| r.resource_object_id).collect())
    }

    #[instrument(skip(self))]
    async fn lookup_subjects(
        &self,
        resource: &ObjectReference,
        permission: &str,
        subject_type: &str,
    ) -> StorageResult<Vec<String>> {
        validate_object(resource)?;
        let request = LookupSubjectsRequest {
            consistency: self.consistency(),
            resource: WireObject::from(resource),
            permission,
            subject_object_type: subject_type,
        };
        let results: Vec<LookupSubjectsResult> =
            self.post_stream("/v1/permissions/subjects", &request).await?;
        Ok(results
            .into_iter()
            .map(|r| r.subject.subject_object_id)
            .collect())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        let mut request = self
            .client
            .post(self.url("/v1/schema/read"))
            .json(&serde_json::json!({}));
        if let Some(ref key) = self.config.preshared_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        // A store without a schema answers 404, which still proves it is up.
        let healthy = !status.is_server_error() && status != StatusCode::UNAUTHORIZED;
        Ok(HealthStatus {
            healthy,
            latency: started.elapsed(),
            message: Some(format!("spicedb answered {}", status.as_u16())),
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> StorageError {
    if e.is_timeout() {
        StorageError::QueryTimeout {
            message: e.to_string(),
        }
    } else {
        StorageError::ConnectionError {
            message: e.to_string(),
        }
    }
}

async fn check_status(response: reqwest::Response) -> StorageResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<WireError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    warn!(status = status.as_u16(), %message, "spicedb returned an error");
    Err(match status {
        StatusCode::BAD_REQUEST => StorageError::InvalidInput { message },
        StatusCode::GATEWAY_TIMEOUT => StorageError::QueryTimeout { message },
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            StorageError::ConnectionError { message }
        }
        _ => StorageError::QueryError {
            message: format!("{}: {message}", status.as_u16()),
        },
    })
}

fn decode_stream<T: DeserializeOwned>(path: &str, text: &str) -> StorageResult<Vec<T>> {
    let mut results = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let frame: StreamFrame<T> =
            serde_json::from_str(line).map_err(|e| StorageError::SerializationError {
                message: format!("invalid stream frame from {path}: {e}"),
            })?;
        match (frame.result, frame.error) {
            (_, Some(e)) => {
                error!(path, message = %e.message, "spicedb stream failed");
                return Err(StorageError::QueryError { message: e.message });
            }
            (Some(result), None) => results.push(result),
            (None, None) => {}
        }
    }
    Ok(results)
}

// ---- wire types ----

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject {
    object_type: String,
    object_id: String,
}

impl From<&ObjectReference> for WireObject {
    fn from(object: &ObjectReference) -> Self {
        Self {
            object_type: object.object_type.clone(),
            object_id: object.object_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireSubject {
    object: WireObject,
}

impl From<&ObjectReference> for WireSubject {
    fn from(object: &ObjectReference) -> Self {
        Self {
            object: WireObject::from(object),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Relationship {
    resource: WireObject,
    relation: String,
    subject: WireSubject,
}

impl From<&StoredTuple> for Relationship {
    fn from(t: &StoredTuple) -> Self {
        Self {
            resource: WireObject {
                object_type: t.resource_type.clone(),
                object_id: t.resource_id.clone(),
            },
            relation: t.relation.clone(),
            subject: WireSubject {
                object: WireObject {
                    object_type: t.subject_type.clone(),
                    object_id: t.subject_id.clone(),
                },
            },
        }
    }
}

impl Relationship {
    fn into_stored(self) -> StoredTuple {
        StoredTuple::new(
            self.resource.object_type,
            self.resource.object_id,
            self.relation,
            self.subject.object.object_type,
            self.subject.object.object_id,
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Consistency {
    #[serde(skip_serializing_if = "Option::is_none")]
    fully_consistent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimize_latency: Option<bool>,
}

#[derive(Debug, Serialize)]
struct RelationshipUpdate {
    operation: &'static str,
    relationship: Relationship,
}

#[derive(Debug, Serialize)]
struct WriteRelationshipsRequest {
    updates: Vec<RelationshipUpdate>,
}

#[derive(Debug, Serialize)]
struct CheckPermissionRequest<'a> {
    consistency: Consistency,
    resource: WireObject,
    permission: &'a str,
    subject: WireSubject,
}

#[derive(Debug, Deserialize)]
struct CheckPermissionResponse {
    #[serde(default)]
    permissionship: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubjectFilter {
    subject_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFilter {
    #[serde(skip_serializing_if = "String::is_empty")]
    resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional_relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional_subject_filter: Option<SubjectFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadRelationshipsRequest {
    consistency: Consistency,
    relationship_filter: WireFilter,
}

#[derive(Debug, Deserialize)]
struct ReadRelationshipsResult {
    relationship: Relationship,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupResourcesRequest<'a> {
    consistency: Consistency,
    resource_object_type: &'a str,
    permission: &'a str,
    subject: WireSubject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResourcesResult {
    resource_object_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupSubjectsRequest<'a> {
    consistency: Consistency,
    resource: WireObject,
    permission: &'a str,
    subject_object_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedSubject {
    subject_object_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupSubjectsResult {
    subject: ResolvedSubject,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct StreamFrame<T> {
    result: Option<T>,
    error: Option<WireError>,
}

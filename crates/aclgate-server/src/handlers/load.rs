//! Loading relationships into the store.
//!
//! Both load paths funnel through the bulk tuple grammar before writing:
//! translated documents are serialized and re-parsed, so the store only ever
//! receives tuples an externally authored list could also have produced.

use std::sync::Arc;

use aclgate_domain::model::AclDocument;
use aclgate_domain::resolver::RelationshipWriter;
use aclgate_domain::{parse_relationships, translate, DomainResult, ParsedBatch, Tuple};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Relationships submitted to the grammar.
    pub loaded: usize,
    /// Relationships that parsed and were written.
    pub accepted: usize,
    /// Relationships rejected by the grammar.
    pub dropped: usize,
}

/// Outcome of loading a document: the translated relationships in emission
/// order plus the counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLoad {
    pub relationships: Vec<String>,
    pub report: LoadReport,
}

/// Writes translated documents and tuple lists to the store.
pub struct LoadHandler<W> {
    writer: Arc<W>,
}

impl<W> Clone for LoadHandler<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: RelationshipWriter> LoadHandler<W> {
    pub fn new(writer: Arc<W>) -> Self {
        Self { writer }
    }

    /// Translates `document` and writes the resulting tuples.
    #[instrument(skip(self, document), fields(entities = document.entity_count()))]
    pub async fn load_document(&self, document: &AclDocument) -> DomainResult<DocumentLoad> {
        let relationships: Vec<String> = translate(document)
            .iter()
            .map(Tuple::to_string)
            .collect();
        let batch = parse_relationships(&relationships);
        let report = self.write_batch(relationships.len(), batch).await?;
        Ok(DocumentLoad {
            relationships,
            report,
        })
    }

    /// Parses `relationships` and writes the well-formed ones.
    #[instrument(skip(self, relationships), fields(count = relationships.len()))]
    pub async fn load_relationships(&self, relationships: &[String]) -> DomainResult<LoadReport> {
        let batch = parse_relationships(relationships);
        self.write_batch(relationships.len(), batch).await
    }

    async fn write_batch(&self, loaded: usize, batch: ParsedBatch) -> DomainResult<LoadReport> {
        if !batch.tuples.is_empty() {
            self.writer.write_relationships(&batch.tuples).await?;
        }
        let report = LoadReport {
            loaded,
            accepted: batch.accepted(),
            dropped: batch.dropped(),
        };
        metrics::counter!("aclgate_tuples_loaded_total").increment(report.accepted as u64);
        metrics::counter!("aclgate_tuples_dropped_total").increment(report.dropped as u64);
        info!(
            loaded = report.loaded,
            accepted = report.accepted,
            dropped = report.dropped,
            "relationships loaded"
        );
        Ok(report)
    }
}

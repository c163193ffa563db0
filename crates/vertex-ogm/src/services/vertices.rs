//! Record collections and the chunked batch merge protocol
//!
//! A batch is split into chunks; each chunk becomes one composed traversal with
//! a merge step per record. A chained traversal only reports its terminal
//! element, so after each chunk the protocol looks the chunk's ids up again and
//! reconciles every returned map into the matching local record.

use std::collections::{hash_map, HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use crate::config::BatchConfig;
use crate::data::{
    errors::{OgmError, OgmResult},
    identifiers::VertexId,
    trace_context::TraceContext,
    types::PropertyValue,
};
use crate::services::sanitize::sanitize;
use crate::traits::{DumpOptions, GraphSource, MergeV, Record, Traversal};

/// Outcome of a batch create or save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub operation: &'static str,
    /// Records sent to the graph.
    pub submitted: usize,
    /// Records refreshed from the graph afterwards.
    pub reconciled: usize,
    /// Composed queries issued.
    pub chunks: usize,
    /// Submitted ids the follow-up lookup did not return.
    pub missing: Vec<VertexId>,
    /// Ids whose stored properties could not be read into the record type.
    /// Those records keep their local values.
    pub failed: Vec<VertexId>,
}

impl BatchReport {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            submitted: 0,
            reconciled: 0,
            chunks: 0,
            missing: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }

    /// Converts missing and failed ids into an [`OgmError::PartialBatch`].
    pub fn ensure_complete(self) -> OgmResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(OgmError::PartialBatch {
                operation: self.operation,
                submitted: self.submitted,
                missing: self
                    .missing
                    .iter()
                    .chain(self.failed.iter())
                    .map(VertexId::key)
                    .collect(),
            })
        }
    }
}

/// An unordered set of records deduplicated by id.
///
/// Records that arrive without an id get a generated one, so every member can
/// be addressed by the batch protocol. Inserting a record whose id is already
/// present keeps the existing member.
#[derive(Debug, Clone)]
pub struct VertexSet<R: Record> {
    records: HashMap<String, R>,
    config: BatchConfig,
}

impl<R: Record> Default for VertexSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> VertexSet<R> {
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    pub fn with_config(config: BatchConfig) -> Self {
        Self {
            records: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Adds a record; returns `false` if a record with the same id was already present.
    pub fn insert(&mut self, mut record: R) -> bool {
        let id = match record.id() {
            Some(id) => id.clone(),
            None => {
                let id = VertexId::generate();
                record.set_id(Some(id.clone()));
                id
            }
        };
        match self.records.entry(id.key()) {
            hash_map::Entry::Occupied(_) => {
                debug!(label = R::LABEL, %id, "Duplicate id, keeping existing record");
                false
            }
            hash_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &VertexId) -> bool {
        self.records.contains_key(&id.key())
    }

    pub fn get(&self, id: &VertexId) -> Option<&R> {
        self.records.get(&id.key())
    }

    /// Mutable access for field edits. Changing the id through it is not supported.
    pub fn get_mut(&mut self, id: &VertexId) -> Option<&mut R> {
        self.records.get_mut(&id.key())
    }

    pub fn remove(&mut self, id: &VertexId) -> Option<R> {
        self.records.remove(&id.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    /// Mutable iteration for field edits. Changing ids through it is not supported.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.records.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &VertexId> {
        self.records.values().filter_map(Record::id)
    }

    pub fn into_records(self) -> Vec<R> {
        self.records.into_values().collect()
    }

    /// Creates every record that does not exist yet, chunk by chunk, then
    /// refreshes each record from the graph.
    ///
    /// Existing vertices are left untouched by the merge but still reconciled.
    #[instrument(skip(self, g), fields(label = R::LABEL, count = self.len()))]
    pub async fn create<G>(&mut self, g: &G) -> OgmResult<BatchReport>
    where
        G: GraphSource + ?Sized,
    {
        let trace_ctx = TraceContext::for_operation("batch_create");
        let mut report = BatchReport::new("create");

        for chunk in self.chunks() {
            let mut traversal = Traversal::new();
            let mut ids = Vec::with_capacity(chunk.len());
            for key in &chunk {
                let (id, record) = self.member(key)?;
                traversal = traversal
                    .merge_v(MergeV::new(Some(id.clone()), R::LABEL).on_create(record.dump_props()));
                ids.push(id);
            }
            self.run_chunk(g, &trace_ctx, traversal, ids, &mut report).await?;
        }

        log_report(&report);
        Ok(report)
    }

    /// Saves every record onto its existing vertex, chunk by chunk.
    ///
    /// Unlike a single-record save, fields that are `None` locally are removed
    /// on the server through explicit property sets. Records without a vertex
    /// are not created and show up in [`BatchReport::missing`].
    #[instrument(skip(self, g), fields(label = R::LABEL, count = self.len()))]
    pub async fn save<G>(&mut self, g: &G) -> OgmResult<BatchReport>
    where
        G: GraphSource + ?Sized,
    {
        let trace_ctx = TraceContext::for_operation("batch_save");
        let mut report = BatchReport::new("save");
        let all_fields = DumpOptions {
            exclude_none: false,
            include_label: false,
        };

        for chunk in self.chunks() {
            let mut traversal = Traversal::new();
            let mut ids = Vec::with_capacity(chunk.len());
            for key in &chunk {
                let (id, record) = self.member(key)?;
                traversal = traversal
                    .merge_v(MergeV::new(Some(id.clone()), R::LABEL).on_match(record.dump_props()));
                // the merge payload cannot carry nulls
                for (name, value) in record.dump(all_fields) {
                    if value.is_none() {
                        traversal = traversal.set_property(id.clone(), R::LABEL, name, None);
                    }
                }
                ids.push(id);
            }
            self.run_chunk(g, &trace_ctx, traversal, ids, &mut report).await?;
        }

        log_report(&report);
        Ok(report)
    }

    /// Collection-wide delete is not offered; delete records one by one.
    pub async fn delete<G>(&self, _g: &G) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        debug!(label = R::LABEL, "Batch delete is a no-op");
        Ok(())
    }

    /// Partitions the member keys; chunk membership follows map iteration order.
    fn chunks(&self) -> Vec<Vec<String>> {
        let keys: Vec<String> = self.records.keys().cloned().collect();
        keys.chunks(self.config.chunk_size())
            .map(<[String]>::to_vec)
            .collect()
    }

    fn member(&self, key: &str) -> OgmResult<(VertexId, &R)> {
        let record = self
            .records
            .get(key)
            .ok_or_else(|| OgmError::MissingIdentity { label: R::LABEL })?;
        let id = record
            .id()
            .cloned()
            .ok_or(OgmError::MissingIdentity { label: R::LABEL })?;
        Ok((id, record))
    }

    /// Sends one composed traversal, then re-reads and reconciles its ids.
    async fn run_chunk<G>(
        &mut self,
        g: &G,
        trace_ctx: &TraceContext,
        traversal: Traversal,
        ids: Vec<VertexId>,
        report: &mut BatchReport,
    ) -> OgmResult<()>
    where
        G: GraphSource + ?Sized,
    {
        debug!(steps = traversal.len(), records = ids.len(), "Submitting chunk");
        report.chunks += 1;
        report.submitted += ids.len();

        // the terminal element says nothing about the other records
        g.submit(&trace_ctx.new_child(), traversal).await?;
        let elements = g.element_maps(&trace_ctx.new_child(), R::LABEL, &ids).await?;

        let mut reconciled = HashSet::with_capacity(elements.len());
        let mut failed = HashSet::new();
        for element in elements {
            let props = sanitize(Some(element))?;
            let key = match props.get("id") {
                Some(PropertyValue::String(key)) => key.clone(),
                _ => {
                    warn!(label = R::LABEL, "Lookup returned an element without id");
                    continue;
                }
            };
            match self.records.get_mut(&key) {
                Some(record) => match record.refresh(props) {
                    Ok(_) => {
                        reconciled.insert(key);
                    }
                    Err(e) => {
                        warn!(label = R::LABEL, id = %key, error = %e, "Could not reconcile record");
                        failed.insert(key);
                    }
                },
                None => warn!(label = R::LABEL, id = %key, "Lookup returned an id outside the chunk"),
            }
        }

        report.reconciled += reconciled.len();
        for id in ids {
            let key = id.key();
            if failed.contains(&key) {
                report.failed.push(id);
            } else if !reconciled.contains(&key) {
                report.missing.push(id);
            }
        }
        Ok(())
    }
}

fn log_report(report: &BatchReport) {
    if report.is_complete() {
        info!(
            operation = report.operation,
            submitted = report.submitted,
            chunks = report.chunks,
            "Batch reconciled"
        );
    } else {
        warn!(
            operation = report.operation,
            submitted = report.submitted,
            missing = report.missing.len(),
            failed = report.failed.len(),
            "Batch left records unreconciled"
        );
    }
}

impl<R: Record> FromIterator<R> for VertexSet<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<R: Record> Extend<R> for VertexSet<R> {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl<R: Record> IntoIterator for VertexSet<R> {
    type Item = R;
    type IntoIter = hash_map::IntoValues<String, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}

impl<'a, R: Record> IntoIterator for &'a VertexSet<R> {
    type Item = &'a R;
    type IntoIter = hash_map::Values<'a, String, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

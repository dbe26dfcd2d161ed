use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::models::bulk::BulkAction;
use crate::models::record::Record;

/// One `_bulk` request body and the ids it carries, in payload order.
#[derive(Debug)]
pub struct Batch {
    sequence: usize,
    ids: Vec<String>,
    payload: Vec<u8>,
}

impl Batch {
    pub fn get_sequence(&self) -> usize {
        self.sequence
    }
    pub fn get_ids(&self) -> &[String] {
        &self.ids
    }
    pub fn get_payload(&self) -> &[u8] {
        &self.payload
    }
    pub fn len(&self) -> usize {
        self.ids.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
    pub fn into_parts(self) -> (Vec<String>, Vec<u8>) {
        (self.ids, self.payload)
    }
}

/// Accumulates NDJSON action/document pairs until `batch_size` records are buffered.
#[derive(Debug)]
pub struct Batcher {
    index_name: String,
    doc_type: Option<String>,
    batch_size: usize,
    position: usize,
    ids: Vec<String>,
    buffer: Vec<u8>,
}

impl Batcher {
    pub fn new(index_name: &str, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            index_name: index_name.to_string(),
            doc_type: None,
            batch_size,
            position: 0,
            ids: Vec::with_capacity(batch_size),
            buffer: Vec::new(),
        }
    }

    /// Adds `_type` to every action line, for clusters before 7.x.
    pub fn with_doc_type(mut self, doc_type: &str) -> Self {
        self.doc_type = Some(doc_type.to_string());
        self
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches `total` records will produce.
    pub fn batches_for(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    /// Buffers `record`; returns the batch once full, or when `last` is set.
    pub fn accept<T: Serialize>(&mut self, record: &Record<T>, last: bool) -> Result<Option<Batch>> {
        let mark = self.buffer.len();
        if let Err(source) = self.write_record(record) {
            self.buffer.truncate(mark);
            return Err(PipelineError::Generation {
                id: record.get_id().to_string(),
                source,
            });
        }
        self.ids.push(record.get_id().to_string());
        self.position += 1;

        if self.ids.len() >= self.batch_size || last {
            Ok(self.flush())
        } else {
            Ok(None)
        }
    }

    /// Drops anything buffered by an aborted run and restarts sequence numbers.
    pub fn reset(&mut self) {
        self.position = 0;
        self.ids.clear();
        self.buffer.clear();
    }

    /// Emits whatever is still buffered.
    pub fn finish(&mut self) -> Option<Batch> {
        self.flush()
    }

    fn write_record<T: Serialize>(
        &mut self,
        record: &Record<T>,
    ) -> std::result::Result<(), serde_json::Error> {
        let action = BulkAction::index(&self.index_name, self.doc_type.as_deref(), record.get_id());
        serde_json::to_writer(&mut self.buffer, &action)?;
        self.buffer.push(b'\n');
        serde_json::to_writer(&mut self.buffer, record.get_payload())?;
        self.buffer.push(b'\n');
        Ok(())
    }

    fn flush(&mut self) -> Option<Batch> {
        if self.ids.is_empty() {
            return None;
        }
        // position of the record that triggered the flush, 0-based
        let sequence = (self.position - 1) / self.batch_size + 1;
        let ids = std::mem::replace(&mut self.ids, Vec::with_capacity(self.batch_size));
        let payload = std::mem::take(&mut self.buffer);
        Some(Batch {
            sequence,
            ids,
            payload,
        })
    }
}

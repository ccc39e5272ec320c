#[cfg(test)]
mod tests;

use ::lancedb::{
    Connection, DistanceType,
    arrow::SendableRecordBatchStream,
    query::{ExecutableQuery, QueryBase},
};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{Builder, TempDir};
use tracing::{debug, info, warn};

use super::{IndexEntry, RetrievalResult, ScoredChunk, VectorIndex};
use crate::chunking::Chunk;
use crate::{RagError, Result};

const TABLE_NAME: &str = "chunks";

fn index_error(context: &str, err: impl std::fmt::Display) -> RagError {
    RagError::Index(format!("{}: {}", context, err))
}

/// On-disk index backed by a LanceDB table, queried with cosine distance
pub struct LanceIndex {
    connection: Connection,
    path: PathBuf,
    vector_dimension: Option<usize>,
    next_ordinal: usize,
    /// Set for indexes built in a scratch directory; removed on drop
    staging: Option<TempDir>,
}

impl std::fmt::Debug for LanceIndex {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceIndex")
            .field("path", &self.path)
            .field("vector_dimension", &self.vector_dimension)
            .field("next_ordinal", &self.next_ordinal)
            .field("staging", &self.staging.is_some())
            .finish_non_exhaustive()
    }
}

impl LanceIndex {
    /// Open an existing index directory
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(RagError::Index(format!(
                "No index found at {}",
                path.display()
            )));
        }

        let mut index = Self::connect(path, None).await?;
        if index.table_exists().await? {
            let table = index.open_table().await?;
            index.vector_dimension = Some(Self::detect_vector_dimension(&table).await?);
            index.next_ordinal = table
                .count_rows(None)
                .await
                .map_err(|e| index_error("Failed to count rows", e))?;
        }

        info!(
            "Opened LanceDB index at {} with {} entries",
            path.display(),
            index.next_ordinal
        );
        Ok(index)
    }

    /// Start an empty index at `path`, dropping any table already stored there
    #[inline]
    pub async fn create(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;
        let index = Self::connect(path, None).await?;
        index.drop_table_if_exists().await?;
        Ok(index)
    }

    /// Start an empty index in a scratch directory under `parent`
    ///
    /// The directory lives as long as the index; call [`VectorIndex::persist`] to
    /// keep the contents.
    #[inline]
    pub async fn temporary_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)?;
        let staging = Builder::new().prefix(".vectors-").tempdir_in(parent)?;
        let path = staging.path().to_path_buf();
        Self::connect(&path, Some(staging)).await
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    async fn connect(path: &Path, staging: Option<TempDir>) -> Result<Self> {
        let uri = format!("file://{}", path.display());
        debug!("Connecting to LanceDB at {}", uri);

        let connection = ::lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| index_error("Failed to connect to LanceDB", e))?;

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            vector_dimension: None,
            next_ordinal: 0,
            staging,
        })
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| index_error("Failed to list tables", e))?;
        Ok(table_names.iter().any(|name| name == TABLE_NAME))
    }

    async fn open_table(&self) -> Result<::lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| index_error("Failed to open table", e))
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping existing chunks table at {}", self.path.display());
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| index_error("Failed to drop table", e))?;
        }
        Ok(())
    }

    async fn detect_vector_dimension(table: &::lancedb::Table) -> Result<usize> {
        let schema = table
            .schema()
            .await
            .map_err(|e| index_error("Failed to get table schema", e))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Index("Could not find vector column or determine dimension".to_string())
            })
    }

    fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
        let list_size = i32::try_from(vector_dim)
            .map_err(|_| RagError::Index(format!("Vector dimension {} too large", vector_dim)))?;

        Ok(Arc::new(Schema::new(vec![
            Field::new("ordinal", DataType::UInt64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    list_size,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, false),
            Field::new("page_number", DataType::UInt32, true),
            Field::new("last_page_number", DataType::UInt32, true),
            Field::new("offset", DataType::UInt64, false),
        ])))
    }

    fn create_record_batch(&self, entries: &[IndexEntry], vector_dim: usize) -> Result<RecordBatch> {
        let len = entries.len();
        let schema = Self::create_schema(vector_dim)?;

        let mut ordinals = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut texts = Vec::with_capacity(len);
        let mut source_ids = Vec::with_capacity(len);
        let mut page_numbers = Vec::with_capacity(len);
        let mut last_page_numbers = Vec::with_capacity(len);
        let mut offsets = Vec::with_capacity(len);

        for (i, entry) in entries.iter().enumerate() {
            ordinals.push((self.next_ordinal + i) as u64);
            flat_values.extend_from_slice(&entry.embedding);
            texts.push(entry.chunk.text.as_str());
            source_ids.push(entry.chunk.source_id.as_str());
            page_numbers.push(entry.chunk.page_number);
            last_page_numbers.push(entry.chunk.last_page_number);
            offsets.push(entry.chunk.offset as u64);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| index_error("Failed to create vector array", e))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(UInt64Array::from(ordinals)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(source_ids)),
            Arc::new(UInt32Array::from(page_numbers)),
            Arc::new(UInt32Array::from(last_page_numbers)),
            Arc::new(UInt64Array::from(offsets)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| index_error("Failed to create record batch", e))
    }

    async fn parse_search_results_stream(
        mut results: SendableRecordBatchStream,
    ) -> Result<Vec<ScoredChunk>> {
        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| index_error("Failed to read result stream", e))?
        {
            hits.extend(Self::parse_search_batch(&batch)?);
        }
        Ok(hits)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
        fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
            batch
                .column_by_name(name)
                .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<T>()
                .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
        }

        let ordinals = column::<UInt64Array>(batch, "ordinal")?;
        let texts = column::<StringArray>(batch, "text")?;
        let source_ids = column::<StringArray>(batch, "source_id")?;
        let page_numbers = column::<UInt32Array>(batch, "page_number")?;
        let last_page_numbers = column::<UInt32Array>(batch, "last_page_number")?;
        let offsets = column::<UInt64Array>(batch, "offset")?;
        let distances = column::<Float32Array>(batch, "_distance")?;

        let optional = |array: &UInt32Array, row: usize| {
            if array.is_null(row) {
                None
            } else {
                Some(array.value(row))
            }
        };

        let hits = (0..batch.num_rows())
            .map(|row| ScoredChunk {
                chunk: Chunk {
                    text: texts.value(row).to_string(),
                    source_id: source_ids.value(row).to_string(),
                    page_number: optional(page_numbers, row),
                    last_page_number: optional(last_page_numbers, row),
                    offset: offsets.value(row) as usize,
                },
                // Cosine distance is 1 - cosine similarity
                score: 1.0 - distances.value(row),
                ordinal: ordinals.value(row) as usize,
            })
            .collect();

        Ok(hits)
    }

    async fn copy_into(&self, target: &Path) -> Result<()> {
        let target_index = Self::create(target).await?;
        if !self.table_exists().await? {
            return Ok(());
        }

        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| index_error("Failed to get table schema", e))?;
        let batches: Vec<RecordBatch> = table
            .query()
            .execute()
            .await
            .map_err(|e| index_error("Failed to scan table", e))?
            .try_collect()
            .await
            .map_err(|e| index_error("Failed to read table", e))?;

        let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        target_index
            .connection
            .create_table(TABLE_NAME, reader)
            .execute()
            .await
            .map_err(|e| index_error("Failed to write table copy", e))?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        let Some(first) = entries.first() else {
            debug!("No entries to store");
            return Ok(());
        };

        let vector_dim = self.vector_dimension.unwrap_or(first.embedding.len());
        if vector_dim == 0 {
            return Err(RagError::Index("Embeddings must not be empty".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != vector_dim) {
            return Err(RagError::Index(format!(
                "Embedding dimension mismatch: index holds {}-dimensional vectors, got {}",
                vector_dim,
                bad.embedding.len()
            )));
        }

        let record_batch = self.create_record_batch(&entries, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        if self.vector_dimension.is_none() {
            self.drop_table_if_exists().await?;
            self.connection
                .create_table(TABLE_NAME, reader)
                .execute()
                .await
                .map_err(|e| index_error("Failed to create table", e))?;
        } else {
            self.open_table()
                .await?
                .add(reader)
                .execute()
                .await
                .map_err(|e| index_error("Failed to insert entries", e))?;
        }

        self.vector_dimension = Some(vector_dim);
        self.next_ordinal += entries.len();
        debug!("Stored {} entries in LanceDB", entries.len());
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        let Some(vector_dim) = self.vector_dimension else {
            return Ok(RetrievalResult::default());
        };
        if vector.len() != vector_dim {
            return Err(RagError::Index(format!(
                "Embedding dimension mismatch: index holds {}-dimensional vectors, got {}",
                vector_dim,
                vector.len()
            )));
        }
        if k == 0 {
            return Ok(RetrievalResult::default());
        }

        // LanceDB orders equal distances arbitrarily, so every row is scored and
        // the cut at k happens in `ranked`, where ties fall back to the ordinal
        let candidates = self.next_ordinal.max(k);
        let results = self
            .open_table()
            .await?
            .vector_search(vector)
            .map_err(|e| index_error("Failed to create vector search", e))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(candidates)
            .execute()
            .await
            .map_err(|e| index_error("Failed to execute search", e))?;

        let hits = Self::parse_search_results_stream(results).await?;
        Ok(RetrievalResult::ranked(hits, k))
    }

    async fn len(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        self.open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| index_error("Failed to count rows", e))
    }

    async fn persist(&self, path: &Path) -> Result<()> {
        if path == self.path {
            debug!("LanceDB index already stored at {}", path.display());
            return Ok(());
        }

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // Scratch copy next to the target, renamed into place once complete
        let scratch = Builder::new()
            .prefix(".vectors-persist-")
            .tempdir_in(parent)?;
        let scratch_path = scratch.path().join("index");
        self.copy_into(&scratch_path).await?;

        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        fs::rename(&scratch_path, path).map_err(|e| {
            warn!("Failed to move index into {}: {}", path.display(), e);
            index_error("Failed to move index into place", e)
        })?;

        info!(
            "Persisted LanceDB index with {} entries to {}",
            self.next_ordinal,
            path.display()
        );
        Ok(())
    }
}

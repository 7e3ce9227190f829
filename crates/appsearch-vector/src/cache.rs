//! Lance-backed embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Consulted before embedding and written through on misses, so descriptions
//! unchanged between ingestion runs are not embedded again.
use anyhow::Result;
use lancedb::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, FixedSizeListArray};
use arrow_array::cast::AsArray;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use chrono::Utc;

use crate::schema::build_cache_schema;
use crate::table::{ensure_table, has_table, open_db};

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub content_hash: String,
    pub vector: Vec<f32>,
}

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

pub struct EmbeddingCache { conn: Connection, table: String, embedder_id: String, dim: i32 }

impl EmbeddingCache {
    /// One table per vector width; rows are further scoped by embedder id.
    pub async fn open(dir: &Path, embedder_id: &str, dim: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = open_db(dir).await?;
        Ok(Self { conn, table: format!("vectors_{dim}"), embedder_id: embedder_id.to_string(), dim: i32::try_from(dim)? })
    }

    pub async fn get_many(&self, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        let mut out = HashMap::new();
        if hashes.is_empty() || !has_table(&self.conn, &self.table).await? { return Ok(out); }
        let wanted: HashSet<&str> = hashes.iter().map(String::as_str).collect();
        let t = self.conn.open_table(&self.table).execute().await?;
        let filter = format!("embedder_id = '{}'", self.embedder_id.replace('\'', "''"));
        let mut stream = t.query().only_if(filter).execute().await?;
        while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
            let hash_col = batch
                .column_by_name("content_hash")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("cache.content_hash column missing"))?;
            let vec_col = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| anyhow::anyhow!("cache.vector column missing"))?;
            for i in 0..batch.num_rows() {
                let h = hash_col.value(i);
                if !wanted.contains(h) { continue; }
                let list = vec_col.value(i);
                let vals = list
                    .as_primitive::<arrow_array::types::Float32Type>()
                    .values()
                    .iter()
                    .copied()
                    .collect::<Vec<f32>>();
                if vals.len() == self.dim as usize { out.insert(h.to_string(), vals); }
            }
        }
        Ok(out)
    }

    pub async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        if entries.is_empty() { return Ok(()); }
        let schema = build_cache_schema(self.dim);
        ensure_table(&self.conn, &self.table, schema.clone()).await?;
        let t = self.conn.open_table(&self.table).execute().await?;
        let now = Utc::now().timestamp_millis();
        let mut hashes = Vec::new();
        let mut eids = Vec::new();
        let mut created = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        for e in entries {
            hashes.push(e.content_hash.clone());
            eids.push(self.embedder_id.clone());
            created.push(now);
            vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
        }
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(hashes)),
                Arc::new(StringArray::from(eids)),
                Arc::new(arrow_array::TimestampMillisecondArray::from(created)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim)),
            ],
        )?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        t.add(reader).execute().await?;
        Ok(())
    }
}

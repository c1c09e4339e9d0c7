
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ChunkMeta, FlatIndex, IndexSnapshot};
use crate::{RagError, Result};

/// Serialized vectors plus the build manifest
pub const INDEX_FILE_NAME: &str = "index.json";
/// Serialized chunk texts and metadata, aligned with the vectors
pub const METADATA_FILE_NAME: &str = "metadata.json";

const STAGING_PREFIX: &str = ".staging-";

/// Summary of a persisted index build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    #[serde(flatten)]
    manifest: &'a IndexManifest,
    vectors: Vec<&'a [f32]>,
}

#[derive(Deserialize)]
struct IndexFile {
    #[serde(flatten)]
    manifest: IndexManifest,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct MetadataFileRef<'a> {
    build_id: Uuid,
    texts: &'a [String],
    metas: &'a [ChunkMeta],
}

#[derive(Deserialize)]
struct MetadataFile {
    build_id: Uuid,
    texts: Vec<String>,
    metas: Vec<ChunkMeta>,
}

/// On-disk home of the index: a directory holding the vector file and the metadata file.
///
/// Saves are staged in a sibling directory and renamed into place, so readers see
/// either the previous build or the new one. Both files carry the same build id;
/// a mismatch on load means a torn write.
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    #[inline]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE_NAME)
    }

    /// Whether both persisted files are present
    #[inline]
    pub fn exists(&self) -> bool {
        self.index_path().is_file() && self.metadata_path().is_file()
    }

    /// Persist `snapshot`, replacing whatever was stored before
    #[inline]
    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<IndexManifest> {
        fs::create_dir_all(&self.dir)?;

        let manifest = IndexManifest {
            build_id: Uuid::new_v4(),
            created_at: Utc::now(),
            model: snapshot.model().to_string(),
            dimension: snapshot.index().dimension(),
            count: snapshot.len(),
        };

        let staging = self
            .dir
            .join(format!("{}{}", STAGING_PREFIX, manifest.build_id));
        fs::create_dir_all(&staging)?;

        let result = self.write_and_publish(&staging, snapshot, &manifest);
        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                warn!(
                    "Failed to remove staging directory {}: {}",
                    staging.display(),
                    e
                );
            }
        }
        result?;

        info!(
            "Saved index {} ({} vectors, {} dimensions) to {}",
            manifest.build_id,
            manifest.count,
            manifest.dimension,
            self.dir.display()
        );
        Ok(manifest)
    }

    fn write_and_publish(
        &self,
        staging: &Path,
        snapshot: &IndexSnapshot,
        manifest: &IndexManifest,
    ) -> Result<()> {
        let staged_index = staging.join(INDEX_FILE_NAME);
        let staged_metadata = staging.join(METADATA_FILE_NAME);

        write_json(
            &staged_index,
            &IndexFileRef {
                manifest,
                vectors: snapshot.index().vectors().collect(),
            },
        )?;
        write_json(
            &staged_metadata,
            &MetadataFileRef {
                build_id: manifest.build_id,
                texts: snapshot.texts(),
                metas: snapshot.metas(),
            },
        )?;

        debug!("Publishing staged index from {}", staging.display());
        fs::rename(&staged_metadata, self.metadata_path())?;
        fs::rename(&staged_index, self.index_path())?;
        Ok(())
    }

    /// Load the persisted snapshot.
    ///
    /// Fails with [`RagError::IndexNotFound`] when either file is missing, which means
    /// ingestion has never completed.
    #[inline]
    pub fn load(&self) -> Result<IndexSnapshot> {
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();

        if !index_path.is_file() || !metadata_path.is_file() {
            return Err(RagError::IndexNotFound(self.dir.clone()));
        }

        let index_file: IndexFile = self.read_json(&index_path)?;
        let metadata: MetadataFile = self.read_json(&metadata_path)?;

        if index_file.manifest.build_id != metadata.build_id {
            return Err(self.corrupt(format!(
                "index build {} does not match metadata build {}",
                index_file.manifest.build_id, metadata.build_id
            )));
        }

        let index =
            FlatIndex::build(index_file.vectors).map_err(|e| self.corrupt(e.to_string()))?;
        if index.dimension() != index_file.manifest.dimension {
            return Err(self.corrupt(format!(
                "manifest declares {} dimensions, vectors have {}",
                index_file.manifest.dimension,
                index.dimension()
            )));
        }

        let snapshot = IndexSnapshot::new(
            index,
            metadata.texts,
            metadata.metas,
            index_file.manifest.model,
        )
        .map_err(|e| self.corrupt(e.to_string()))?;

        debug!(
            "Loaded index {} with {} chunks from {}",
            index_file.manifest.build_id,
            snapshot.len(),
            self.dir.display()
        );
        Ok(snapshot)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RagError::IndexNotFound(self.dir.clone()),
            _ => RagError::Io(e),
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| self.corrupt(format!("{}: {}", path.display(), e)))
    }

    fn corrupt(&self, message: String) -> RagError {
        RagError::CorruptIndex {
            path: self.dir.clone(),
            message,
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(io::Error::from)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

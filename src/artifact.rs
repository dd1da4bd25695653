//! The compressed artifact and where it is kept.

use crate::code::CodeTable;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::hash::Hash;
use std::io;
use std::path::{Path, PathBuf};

/// Everything needed to decode: the packed bits, their true length, the
/// number of symbols they hold and the code table that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Symbol: Serialize + Clone",
    deserialize = "Symbol: Deserialize<'de> + Eq + Hash + Clone"
))]
pub struct PackedArtifact<Symbol> {
    data: Vec<u8>,
    bit_len: usize,
    symbol_count: usize,
    table: CodeTable<Symbol>,
}

impl<Symbol> PackedArtifact<Symbol> {
    pub fn new(
        data: Vec<u8>,
        bit_len: usize,
        symbol_count: usize,
        table: CodeTable<Symbol>,
    ) -> Self {
        Self {
            data,
            bit_len,
            symbol_count,
            table,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encoded length in bits, without padding.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    pub fn table(&self) -> &CodeTable<Symbol> {
        &self.table
    }
}

impl<Symbol> PackedArtifact<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    /// The artifact of an empty input.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, CodeTable::empty())
    }
}

impl<Symbol> PackedArtifact<Symbol>
where
    Symbol: Serialize + DeserializeOwned + Eq + Hash + Clone,
{
    /// Serializes the artifact as MessagePack.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(data)?)
    }
}

impl<Symbol> PartialEq for PackedArtifact<Symbol>
where
    Symbol: Eq + Hash + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.bit_len == other.bit_len
            && self.symbol_count == other.symbol_count
            && self.table == other.table
    }
}

impl<Symbol> Eq for PackedArtifact<Symbol> where Symbol: Eq + Hash + Clone {}

/// Persists and reloads one artifact as a unit.
pub trait ArtifactStore<Symbol> {
    fn save(&mut self, artifact: &PackedArtifact<Symbol>) -> Result<()>;
    fn load(&self) -> Result<PackedArtifact<Symbol>>;
}

/// Keeps the artifact in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<Symbol> ArtifactStore<Symbol> for FileStore
where
    Symbol: Serialize + DeserializeOwned + Eq + Hash + Clone,
{
    fn save(&mut self, artifact: &PackedArtifact<Symbol>) -> Result<()> {
        let data = artifact.to_bytes()?;
        fs::write(&self.path, &data)?;
        log::info!("wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<PackedArtifact<Symbol>> {
        let data = fs::read(&self.path)?;
        log::info!("read {} bytes from {}", data.len(), self.path.display());
        PackedArtifact::from_bytes(&data)
    }
}

/// Keeps the serialized artifact in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob(&self) -> Option<&[u8]> {
        self.blob.as_deref()
    }
}

impl<Symbol> ArtifactStore<Symbol> for MemoryStore
where
    Symbol: Serialize + DeserializeOwned + Eq + Hash + Clone,
{
    fn save(&mut self, artifact: &PackedArtifact<Symbol>) -> Result<()> {
        self.blob = Some(artifact.to_bytes()?);
        Ok(())
    }

    fn load(&self) -> Result<PackedArtifact<Symbol>> {
        match &self.blob {
            Some(data) => PackedArtifact::from_bytes(data),
            None => Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no artifact has been saved",
            ))),
        }
    }
}

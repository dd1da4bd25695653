//! Entry point that compresses a text file to an artifact on disk and
//! decodes it back.

use crate::artifact::{ArtifactStore, FileStore, PackedArtifact};
use crate::codec::{compress, decompress};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations and switches for one [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// UTF-8 text to compress
    pub input: PathBuf,

    /// Where the compressed artifact is written
    pub artifact: PathBuf,

    /// Where the decoded text is written, if anywhere
    pub decoded: Option<PathBuf>,

    /// Compare the decoded text with the input
    pub verify: bool,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            artifact: artifact.into(),
            decoded: None,
            verify: true,
        }
    }

    /// Parses `--in <path>`, `--out <path>`, `--decoded <path>` and
    /// `--no-verify`. Only `--in` is required; the artifact defaults to
    /// `compressed.bin`.
    pub fn from_args(args: &[String]) -> std::result::Result<Self, String> {
        let mut input: Option<PathBuf> = None;
        let mut artifact: Option<PathBuf> = None;
        let mut decoded: Option<PathBuf> = None;
        let mut verify = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--in" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--in requires a path".to_string());
                    }
                    input = Some(PathBuf::from(&args[i]));
                }
                "--out" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--out requires a path".to_string());
                    }
                    artifact = Some(PathBuf::from(&args[i]));
                }
                "--decoded" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--decoded requires a path".to_string());
                    }
                    decoded = Some(PathBuf::from(&args[i]));
                }
                "--no-verify" => {
                    verify = false;
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let input = input.ok_or_else(|| "--in is required".to_string())?;
        Ok(Self {
            input,
            artifact: artifact.unwrap_or_else(|| PathBuf::from("compressed.bin")),
            decoded,
            verify,
        })
    }
}

/// What a [`run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub symbols: usize,
    pub distinct_symbols: usize,
    pub encoded_bits: usize,
    pub artifact_bytes: u64,
    pub verified: bool,
}

impl Report {
    /// Artifact size relative to the UTF-8 size of the input.
    pub fn ratio(&self, input_bytes: u64) -> f64 {
        if input_bytes == 0 {
            return 0.0;
        }
        self.artifact_bytes as f64 / input_bytes as f64
    }
}

/// Reads a whole UTF-8 file as a sequence of `char` symbols.
pub fn read_symbols(path: &Path) -> Result<Vec<char>> {
    let text = fs::read_to_string(path)?;
    Ok(text.chars().collect())
}

/// Compresses `config.input`, stores the artifact, loads it back and decodes
/// it. With `verify` set, a decoded text that differs from the input fails
/// with [`Error::Verification`].
pub fn run(config: &Config) -> Result<Report> {
    let symbols = read_symbols(&config.input)?;
    log::info!(
        "read {} symbols from {}",
        symbols.len(),
        config.input.display()
    );

    let artifact = compress(&symbols)?;
    let mut store = FileStore::new(&config.artifact);
    store.save(&artifact)?;

    let loaded: PackedArtifact<char> = store.load()?;
    let decoded = decompress(&loaded)?;

    if config.verify && decoded != symbols {
        return Err(Error::Verification {
            expected: symbols.len(),
            actual: decoded.len(),
        });
    }

    if let Some(path) = &config.decoded {
        let text: String = decoded.iter().collect();
        fs::write(path, text)?;
        log::info!("wrote decoded text to {}", path.display());
    }

    Ok(Report {
        symbols: symbols.len(),
        distinct_symbols: artifact.table().len(),
        encoded_bits: artifact.bit_len(),
        artifact_bytes: fs::metadata(&config.artifact)?.len(),
        verified: config.verify,
    })
}

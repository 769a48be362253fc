use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::store::{FileStore, MemStore, Store, StoreError};

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// Files under the data directory
    #[default]
    File,
    /// Process memory; nothing survives exit
    Memory,
}

/// Storage settings, taken from flags or `DIME_*` environment variables.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Directory holding the `dicom/` and `png/` stores
    #[arg(long, env = "DIME_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    /// Storage backend
    #[arg(long, env = "DIME_BACKEND", value_enum, default_value_t = Backend::File, global = true)]
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            backend: Backend::default(),
        }
    }
}

impl Config {
    pub fn open_store(&self) -> Result<Box<dyn Store>, StoreError> {
        Ok(match self.backend {
            Backend::File => Box::new(FileStore::new(&self.data_dir)?),
            Backend::Memory => Box::new(MemStore::new()),
        })
    }
}

use std::io;
use std::path::PathBuf;

use changes_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Incomplete = 1,
    Config = 3,
    Io = 4,
}

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input and output folders must differ ({path})")]
    SameFolder { path: PathBuf },

    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("i/o error: {0}")]
    Stream(#[from] io::Error),
}

impl FlattenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::SameFolder { .. } => ExitCode::Config,
            Self::Io { .. } | Self::Stream(_) => ExitCode::Io,
        }
    }
}

pub type FlattenResult<T> = Result<T, FlattenError>;

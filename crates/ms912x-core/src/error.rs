use crate::model::Mode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("cannot parse {what}: {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("{mode}@{refresh_hz}Hz is not supported by the adapter")]
    Unsupported { mode: Mode, refresh_hz: u32 },

    #[error("no connected connector reported for driver {0}")]
    NoConnector(String),
}

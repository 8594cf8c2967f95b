use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("channel intensity {0} is outside 0..=255")]
    IntensityOutOfRange(i64),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

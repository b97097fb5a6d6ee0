pub type DictionaryResult<T> = Result<T, DictionaryError>;

/// Failures raised by dictionary implementations. These are reported to
/// commanders verbatim and are never fatal to the microservice.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    /// The not-found signal: the dictionary has no definition for this
    /// target/packet pair.
    #[error("packet {target} {packet} is not defined")]
    UnknownPacket { target: String, packet: String },

    #[error("{target} {packet} has no parameter named {name}")]
    UnknownParam {
        target: String,
        packet: String,
        name: String,
    },

    #[error("value {value} out of range for {item} ({minimum}..={maximum})")]
    OutOfRange {
        item: String,
        value: String,
        minimum: i64,
        maximum: i64,
    },

    /// The command parameter payload was not valid JSON. Displays as the
    /// parser's message so commanders see it verbatim.
    #[error(transparent)]
    Params(#[from] serde_json::Error),

    #[error("command build failed: {0}")]
    Build(String),
}

use thiserror::Error;

/// Errors internal to the AI analysis client.
///
/// None of these cross the client boundary: the public surface converts them
/// to "no result" after logging. They exist so the retry layer can tell
/// transient transport faults from permanent ones.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network, TLS, timeout, or non-2xx status from the underlying client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call was made with nothing to analyze.
    #[error("empty input: nothing to analyze")]
    EmptyInput,

    /// Service-level error (bad base URL, error payload).
    #[error("analysis service error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Too many structurally invalid items; the whole batch is rejected
    /// rather than passing corrupt data forward.
    #[error("invalid response shape: {invalid} of {total} items malformed")]
    InvalidShape { invalid: usize, total: usize },
}

//! Language Model traits

use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::{GenerateRequest, Result, StreamChunk};

/// Streamed model turn
pub type ModelStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>>;

/// Language Model interface
///
/// One call produces one turn: text deltas and tool-call requests,
/// terminated by [`StreamChunk::Done`]. Dropping the stream or cancelling
/// the token aborts generation and must release the upstream request.
///
/// # Example
///
/// ```ignore
/// let request = GenerateRequest::new(snapshot.to_vec()).with_tools(tools);
/// let mut stream = llm.generate_stream(request, cancel.child_token());
/// while let Some(chunk) = stream.next().await {
///     // ...
/// }
/// ```
pub trait LanguageModel: Send + Sync + 'static {
    /// Stream one model turn
    fn generate_stream<'a>(
        &'a self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> ModelStream<'a>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

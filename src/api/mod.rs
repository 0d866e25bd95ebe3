pub mod api_structs;

use crate::{
    database::PointsStore,
    error::{PointsError, PointsResult},
    model::{recalculator::BatchRecalculator, single_run::score_run}
};
use api_structs::{FilterRequest, FilterResponse, RunRequest, RunResponse};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Handles one line of a request stream.
#[allow(async_fn_in_trait)]
pub trait LineProcessor {
    type Response: Serialize;

    async fn process(&self, line: &str) -> PointsResult<Self::Response>;
}

/// Scores single runs from persisted parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunProcessor;

impl LineProcessor for RunProcessor {
    type Response = RunResponse;

    async fn process(&self, line: &str) -> PointsResult<RunResponse> {
        score_run(&parse_request::<RunRequest>(line)?)
    }
}

/// Refits whole filters.
pub struct FilterProcessor<S> {
    recalculator: BatchRecalculator<S>
}

impl<S: PointsStore> FilterProcessor<S> {
    pub fn new(recalculator: BatchRecalculator<S>) -> Self {
        FilterProcessor { recalculator }
    }

    pub fn recalculator(&self) -> &BatchRecalculator<S> {
        &self.recalculator
    }
}

impl<S: PointsStore> LineProcessor for FilterProcessor<S> {
    type Response = FilterResponse;

    async fn process(&self, line: &str) -> PointsResult<FilterResponse> {
        let request = parse_request::<FilterRequest>(line)?;
        let timings = self.recalculator.recalculate(request.filter_id).await?;

        Ok(FilterResponse {
            filter_id: request.filter_id,
            timings
        })
    }
}

/// Deserializes a request line. Absent required fields are reported by name.
pub fn parse_request<T: DeserializeOwned>(line: &str) -> PointsResult<T> {
    serde_json::from_str(line).map_err(|e| match missing_field(&e) {
        Some(key) => PointsError::MissingKey(format!("'{}'", key)),
        None => PointsError::InputMalformed(e)
    })
}

fn missing_field(e: &serde_json::Error) -> Option<String> {
    if !e.is_data() {
        return None;
    }

    let message = e.to_string();
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next().map(str::to_string)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub succeeded: usize,
    pub failed: usize
}

/// Processes `input` line by line until EOF.
///
/// Responses go to `output` and failure records to `errors`, one JSON object
/// per line. A failing line never stops the stream; only I/O errors on the
/// streams themselves do.
pub async fn serve<P, R, O, E>(processor: &P, input: R, mut output: O, mut errors: E) -> io::Result<ServeStats>
where
    P: LineProcessor,
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin
{
    let mut stats = ServeStats::default();
    let mut lines = input.split(b'\n');

    while let Some(bytes) = lines.next_segment().await? {
        let result = match String::from_utf8(bytes) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => processor.process(line.trim()).await,
            Err(e) => Err(PointsError::from(e))
        };

        match result {
            Ok(response) => {
                write_line(&mut output, &serde_json::to_string(&response)?).await?;
                stats.succeeded += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(error = %e, "Request failed, storage unavailable");
                } else {
                    debug!(error = %e, "Request failed");
                }

                write_line(&mut errors, &e.to_record().to_string()).await?;
                stats.failed += 1;
            }
        }
    }

    info!(succeeded = stats.succeeded, failed = stats.failed, "Input stream closed");
    Ok(stats)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

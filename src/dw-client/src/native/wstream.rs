use futures_util::future::ready;
use futures_util::io::AsyncBufReadExt;
use futures_util::io::AsyncRead;
use futures_util::io::BufReader;
use futures_util::stream::Stream;
use futures_util::stream::StreamExt;
use serde_json::Value;
use tracing::error;
use tracing::trace;

use dw_types::K8Watch;
use dw_types::MetaStatus;
use dw_types::Spec;

use crate::ClientError;
use crate::TokenStreamResult;

/// Watch responses are one JSON event per line.
/// Blank lines are skipped; a read failure ends the stream with an error item.
pub fn watch_lines<R, S>(reader: R) -> impl Stream<Item = TokenStreamResult<S>>
where
    R: AsyncRead + Unpin,
    S: Spec,
{
    BufReader::new(reader).lines().filter_map(|line| {
        ready(match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok(vec![decode_watch_event::<S>(&line)])),
            Err(err) => {
                error!(%err, "watch stream read failed");
                Some(Err(err.into()))
            }
        })
    })
}

/// decode one watch line; `ERROR` events carry a Status object
pub fn decode_watch_event<S>(line: &str) -> Result<K8Watch<S>, ClientError>
where
    S: Spec,
{
    trace!("decoding raw stream : {}", line);

    let value: Value = serde_json::from_str(line).map_err(|err| {
        error!("parsing error, chunk_len: {}, error: {}", line.len(), err);
        err
    })?;

    decode_watch_value(value)
}

/// decode an already parsed watch event
pub fn decode_watch_value<S>(value: Value) -> Result<K8Watch<S>, ClientError>
where
    S: Spec,
{
    if value.get("type").and_then(Value::as_str) == Some("ERROR") {
        let status: MetaStatus = serde_json::from_value(
            value.get("object").cloned().unwrap_or_default(),
        )?;
        error!(%status, "watch error event");
        return Err(ClientError::Status(status));
    }

    serde_json::from_value(value).map_err(|err| {
        error!(%err, "undecodable watch event");
        err.into()
    })
}

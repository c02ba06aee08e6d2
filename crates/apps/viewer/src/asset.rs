use bytes::Bytes;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{info, warn};

#[derive(Debug)]
pub enum FetchError {
    Request(reqwest::Error),
    Status(u16),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Request(e) => write!(f, "request failed: {e}"),
            FetchError::Status(code) => write!(f, "server answered {code}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Result of the background download, delivered once.
pub type PendingBlob = oneshot::Receiver<Result<Bytes, FetchError>>;

/// Single GET of a binary blob. The body is returned untouched.
pub async fn fetch_blob(http: &reqwest::Client, url: &str) -> Result<Bytes, FetchError> {
    let resp = http.get(url).send().await.map_err(FetchError::Request)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp.bytes().await.map_err(FetchError::Request)?;
    info!(url, bytes = body.len(), "asset downloaded");
    Ok(body)
}

/// Checks the download without blocking.
///
/// Returns the blob once it has arrived. A failed or abandoned download is
/// logged and the viewer keeps running on its generated dataset. Either way
/// the receiver is cleared once the download has settled.
pub fn poll_blob(pending: &mut Option<PendingBlob>) -> Option<Bytes> {
    let rx = pending.as_mut()?;
    let outcome = match rx.try_recv() {
        Err(TryRecvError::Empty) => return None,
        Ok(Ok(blob)) => Some(blob),
        Ok(Err(err)) => {
            warn!(%err, "monolith unavailable; continuing with generated data");
            None
        }
        Err(TryRecvError::Closed) => {
            warn!("monolith download ended without a result");
            None
        }
    };
    *pending = None;
    outcome
}

#[cfg(test)]
mod tests {
    use super::{FetchError, PendingBlob, poll_blob};
    use bytes::Bytes;
    use tokio::sync::oneshot;

    #[test]
    fn waits_until_the_download_settles() {
        let (tx, rx) = oneshot::channel();
        let mut pending: Option<PendingBlob> = Some(rx);
        assert_eq!(poll_blob(&mut pending), None);
        assert!(pending.is_some());

        tx.send(Ok(Bytes::from_static(b"tree"))).unwrap();
        assert_eq!(poll_blob(&mut pending), Some(Bytes::from_static(b"tree")));
        assert!(pending.is_none());
        assert_eq!(poll_blob(&mut pending), None);
    }

    #[test]
    fn failed_download_is_dropped_without_a_blob() {
        let (tx, rx) = oneshot::channel();
        let mut pending: Option<PendingBlob> = Some(rx);
        tx.send(Err(FetchError::Status(404))).unwrap();
        assert_eq!(poll_blob(&mut pending), None);
        assert!(pending.is_none());
    }

    #[test]
    fn abandoned_download_is_dropped_without_a_blob() {
        let (tx, rx) = oneshot::channel::<Result<Bytes, FetchError>>();
        let mut pending: Option<PendingBlob> = Some(rx);
        drop(tx);
        assert_eq!(poll_blob(&mut pending), None);
        assert!(pending.is_none());
    }
}

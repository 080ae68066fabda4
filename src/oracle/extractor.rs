//! Per-page name extraction with a bounded, single-shot oracle call.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{EXTRACT_NAME_PROMPT, VisionOracle};
use crate::config::DEFAULT_ORACLE_TIMEOUT;
use crate::error::OracleError;

/// Outcome of reading one cropped region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameExtraction {
    /// The oracle returned non-blank text (trimmed).
    Text(String),
    /// The oracle answered, but with nothing usable.
    Empty,
    /// Transport error, oracle error or timeout. Terminal for the page.
    Failed(String),
}

/// Wraps a [`VisionOracle`] with the per-call timeout.
pub struct NameExtractor {
    oracle: Arc<dyn VisionOracle>,
    timeout: Duration,
}

impl NameExtractor {
    pub fn new(oracle: Arc<dyn VisionOracle>) -> Self {
        Self {
            oracle,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the name in a PNG-encoded region. Never fails and never retries.
    pub async fn extract(&self, png: &[u8]) -> NameExtraction {
        let call = self.oracle.read_image(png, EXTRACT_NAME_PROMPT);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout(self.timeout)),
        };

        match result {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!(model = self.oracle.model_name(), "Oracle returned no text");
                    NameExtraction::Empty
                } else {
                    debug!(model = self.oracle.model_name(), extracted = %text, "Oracle extracted name");
                    NameExtraction::Text(text.to_string())
                }
            }
            Err(e) => {
                warn!(model = self.oracle.model_name(), error = %e, "Oracle call failed");
                NameExtraction::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(&'static str),
        Error,
        Hang,
    }

    struct ScriptedOracle {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VisionOracle for ScriptedOracle {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn read_image(&self, _png: &[u8], instruction: &str) -> Result<String, OracleError> {
            assert_eq!(instruction, EXTRACT_NAME_PROMPT);
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Error => Err(OracleError::Http {
                    provider: "scripted".into(),
                    status: 502,
                    body: "bad gateway".into(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("too late".into())
                }
            }
        }
    }

    #[tokio::test]
    async fn trims_extracted_text() {
        let oracle = ScriptedOracle::new(Reply::Text("  Dana Levi \n"));
        let extractor = NameExtractor::new(oracle);
        assert_eq!(
            extractor.extract(b"png").await,
            NameExtraction::Text("Dana Levi".into())
        );
    }

    #[tokio::test]
    async fn blank_reply_is_empty_not_failure() {
        let extractor = NameExtractor::new(ScriptedOracle::new(Reply::Text("   ")));
        assert_eq!(extractor.extract(b"png").await, NameExtraction::Empty);
    }

    #[tokio::test]
    async fn oracle_error_is_absorbed_without_retry() {
        let oracle = ScriptedOracle::new(Reply::Error);
        let extractor = NameExtractor::new(oracle.clone());
        match extractor.extract(b"png").await {
            NameExtraction::Failed(detail) => assert!(detail.contains("502")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let extractor = NameExtractor::new(ScriptedOracle::new(Reply::Hang))
            .with_timeout(Duration::from_millis(20));
        match extractor.extract(b"png").await {
            NameExtraction::Failed(detail) => assert!(detail.contains("timed out")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
}

use aho_corasick::AhoCorasick;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockStatus {
    Ok,
    Blocked { signature: String },
}

impl BlockStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, BlockStatus::Blocked { .. })
    }
}

/// Classifies rendered markup by the storefront's denial text.
///
/// Signatures are plain substrings; Aho-Corasick gives a single linear scan
/// over pages that are often several hundred KB.
pub struct BlockDetector {
    signatures: Vec<String>,
    matcher: Option<AhoCorasick>,
}

impl BlockDetector {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signatures: Vec<String> = signatures
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        let matcher = if signatures.is_empty() {
            None
        } else {
            match AhoCorasick::new(&signatures) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("block detector: invalid signature set ({}), detection disabled", e);
                    None
                }
            }
        };
        Self {
            signatures,
            matcher,
        }
    }

    pub fn classify(&self, html: &str) -> BlockStatus {
        let Some(matcher) = self.matcher.as_ref() else {
            return BlockStatus::Ok;
        };
        match matcher.find(html) {
            Some(m) => BlockStatus::Blocked {
                signature: self.signatures[m.pattern().as_usize()].clone(),
            },
            None => BlockStatus::Ok,
        }
    }
}

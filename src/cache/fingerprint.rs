//! Deterministic request fingerprints used as cache addresses.

use crate::models::RequestContext;
use sha2::{Digest, Sha256};

/// Value hashed for a selected field the request does not carry (integer zero)
const MISSING_FIELD_VALUE: &str = "i:0";

/// Derives a stable key from the symbol and a fixed subset of request fields.
///
/// Field names are sorted and de-duplicated once at construction, so the output
/// never depends on map iteration order or on the order fields were configured in.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    fields: Vec<String>,
}

impl Fingerprinter {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        fields.sort();
        fields.dedup();
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Hex-encoded 128-bit SHA-256 prefix over the canonical field rendering
    pub fn fingerprint(&self, context: &RequestContext) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"symbol=");
        hasher.update(context.symbol().as_bytes());

        for name in &self.fields {
            let value = context
                .get(name)
                .map(|v| v.canonical())
                .unwrap_or_else(|| MISSING_FIELD_VALUE.to_string());
            hasher.update(b"|");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }
}

//! Per-request correlation ids (UUID v7, time-ordered).

use std::fmt;
use uuid::Uuid;

/// Id attached to the `api_request` span and echoed in `x-request-id`.
///
/// A caller-supplied id is kept when it parses as a UUID, so a proxy in front
/// of the gateway can stitch its own logs to ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn generate() -> Self {
        CorrelationId(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        raw.trim().parse().map(CorrelationId)
    }

    /// Keep a valid inbound id, else generate one
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(Self::parse) {
            Some(Ok(id)) => id,
            _ => Self::generate(),
        }
    }

    /// Header-safe textual form
    pub fn hyphenated(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }

    #[test]
    fn test_inbound_id_is_kept() {
        let inbound = CorrelationId::generate().hyphenated();
        let id = CorrelationId::from_header(Some(&format!(" {} ", inbound)));
        assert_eq!(id.hyphenated(), inbound);
    }

    #[test]
    fn test_garbage_is_replaced() {
        let id = CorrelationId::from_header(Some("not-a-uuid"));
        assert_eq!(id.0.get_version_num(), 7);
        assert!(CorrelationId::from_header(None).hyphenated().len() == 36);
    }
}

use bigdecimal::BigDecimal;
use std::fmt;

/// Failure talking to an external collaborator (invoicer or ordering platform).
#[derive(Debug)]
pub enum IntegrationError {
    /// Network or transport failure.
    Transport(String),
    /// Non-2xx response.
    Http { status: u16, body: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Credentials rejected even after re-authentication.
    Unauthorized,
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationError::Transport(msg) => write!(f, "transport error: {}", msg),
            IntegrationError::Http { status, body } => {
                write!(f, "http error status={} body={}", status, body)
            }
            IntegrationError::Decode(msg) => write!(f, "decode error: {}", msg),
            IntegrationError::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

impl std::error::Error for IntegrationError {}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            IntegrationError::Decode(e.to_string())
        } else {
            IntegrationError::Transport(e.to_string())
        }
    }
}

/// How a per-ticket failure should be reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Mapping file needs an entry; recurs every cycle until fixed.
    Configuration,
    /// Network/HTTP or local ledger read failure; retried next cycle.
    Transient,
    /// Ticket is missing a required field.
    MalformedInput,
}

/// Per-ticket failure. The ticket is skipped this cycle and retried next poll.
#[derive(Debug)]
pub enum ReconcileError {
    /// SKU id absent from the item reference map.
    Configuration { sku_id: String },
    Transient(IntegrationError),
    MalformedInput { field: &'static str, detail: String },
    /// Ledger read failed before anything was sent upstream.
    Ledger(sqlx::Error),
}

impl ReconcileError {
    pub fn class(&self) -> FailureClass {
        match self {
            ReconcileError::Configuration { .. } => FailureClass::Configuration,
            ReconcileError::Transient(_) | ReconcileError::Ledger(_) => FailureClass::Transient,
            ReconcileError::MalformedInput { .. } => FailureClass::MalformedInput,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Configuration { sku_id } => {
                write!(f, "item {} not mapped in item reference map", sku_id)
            }
            ReconcileError::Transient(e) => write!(f, "integration failure: {}", e),
            ReconcileError::MalformedInput { field, detail } => {
                write!(f, "malformed ticket field {}: {}", field, detail)
            }
            ReconcileError::Ledger(e) => write!(f, "ledger read failed: {}", e),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReconcileError::Transient(e) => Some(e),
            ReconcileError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IntegrationError> for ReconcileError {
    fn from(e: IntegrationError) -> Self {
        ReconcileError::Transient(e)
    }
}

impl From<sqlx::Error> for ReconcileError {
    fn from(e: sqlx::Error) -> Self {
        ReconcileError::Ledger(e)
    }
}

/// Whole-cycle failure reading the ticket feed or the mapping file.
#[derive(Debug)]
pub enum FeedError {
    Io(std::io::Error),
    /// Not valid structured data.
    Decode(String),
    Transient(IntegrationError),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Io(e) => write!(f, "io error: {}", e),
            FeedError::Decode(msg) => write!(f, "unable to decode json: {}", msg),
            FeedError::Transient(e) => write!(f, "feed fetch failed: {}", e),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<std::io::Error> for FeedError {
    fn from(e: std::io::Error) -> Self {
        FeedError::Io(e)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Decode(e.to_string())
    }
}

impl From<IntegrationError> for FeedError {
    fn from(e: IntegrationError) -> Self {
        FeedError::Transient(e)
    }
}

/// Fatal condition: an invoice may exist upstream without a trustworthy ledger
/// record. The process stops and waits for an operator.
#[derive(Debug)]
pub enum Halt {
    /// Billed amount differs from the ticket total.
    AmountMismatch {
        code: String,
        expected: BigDecimal,
        invoiced: BigDecimal,
        /// `None` when the mismatch was caught before the invoice was created.
        invoice_id: Option<i64>,
    },
    /// Receipt could not be fetched for an invoice that was already issued.
    Receipt {
        code: String,
        invoice_id: i64,
        source: IntegrationError,
    },
    /// Ledger insert failed after the invoice was issued.
    Persistence {
        code: String,
        invoice_id: i64,
        source: sqlx::Error,
    },
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::AmountMismatch {
                code,
                expected,
                invoiced,
                invoice_id,
            } => match invoice_id {
                Some(id) => write!(
                    f,
                    "ticket {} invoiced as {} with {} but ticket price is {}",
                    code, id, invoiced, expected
                ),
                None => write!(
                    f,
                    "ticket {} lines sum to {} but ticket price is {}",
                    code, invoiced, expected
                ),
            },
            Halt::Receipt {
                code,
                invoice_id,
                source,
            } => write!(
                f,
                "ticket {} invoiced as {} but receipt unavailable: {}",
                code, invoice_id, source
            ),
            Halt::Persistence {
                code,
                invoice_id,
                source,
            } => write!(
                f,
                "ticket {} invoiced as {} but ledger insert failed: {}",
                code, invoice_id, source
            ),
        }
    }
}

impl std::error::Error for Halt {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::money;

    #[test]
    fn classifies_failures() {
        let unmapped = ReconcileError::Configuration {
            sku_id: "sku-9".to_string(),
        };
        assert_eq!(unmapped.class(), FailureClass::Configuration);
        assert!(unmapped.to_string().contains("sku-9"));

        let http = ReconcileError::from(IntegrationError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert_eq!(http.class(), FailureClass::Transient);

        let malformed = ReconcileError::MalformedInput {
            field: "startDate",
            detail: "missing".to_string(),
        };
        assert_eq!(malformed.class(), FailureClass::MalformedInput);
    }

    #[test]
    fn halt_message_names_ticket_and_amounts() {
        let halt = Halt::AmountMismatch {
            code: "ABC123".to_string(),
            expected: money::parse("12.00").unwrap(),
            invoiced: money::parse("11.50").unwrap(),
            invoice_id: None,
        };
        let msg = halt.to_string();
        assert!(msg.contains("ABC123"));
        assert!(msg.contains("11.50"));
        assert!(msg.contains("12.00"));
    }
}

//! Human-readable transaction dumps for debug logging.

use crate::model::Transaction;
use base64::{prelude::BASE64_STANDARD, Engine as _};
use std::fmt::Display;
use tracing::debug;

const PLACEHOLDER: &str = "<none>";

fn or_placeholder<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn encode_blob(blob: Option<&Vec<u8>>) -> String {
    or_placeholder(blob.map(|bytes| BASE64_STANDARD.encode(bytes)))
}

/// Multi-line description of a transaction and its payment.
///
/// Never fails: absent fields are rendered as `<none>`.
pub fn describe_transaction(transaction: &Transaction) -> String {
    let lines = [
        "Transaction:".to_string(),
        format!(" - Identifier: {}", or_placeholder(transaction.id.as_ref())),
        format!(
            " - Date: {}",
            or_placeholder(transaction.date.map(|d| d.to_rfc3339()))
        ),
        format!(" - State: {}", transaction.state),
        format!(" - Receipt: {}", encode_blob(transaction.receipt.as_ref())),
        "Payment:".to_string(),
        format!(" - Product Identifier: {}", transaction.payment.product_id),
        format!(" - Quantity: {}", transaction.payment.quantity),
        format!(
            " - Request Data: {}",
            encode_blob(transaction.payment.request_data.as_ref())
        ),
    ];
    lines.join("\n")
}

/// Emits [`describe_transaction`] line by line at debug level.
pub fn log_transaction(transaction: &Transaction) {
    for line in describe_transaction(transaction).lines() {
        debug!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Payment, TransactionState};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_describe_full_transaction() {
        let mut tx = Transaction::purchased("1000000042", "pro_upgrade", b"receipt".to_vec());
        tx.date = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        tx.payment.quantity = 2;
        tx.payment.request_data = Some(vec![1, 2, 3]);

        let text = describe_transaction(&tx);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Transaction:",
                " - Identifier: 1000000042",
                " - Date: 2024-03-01T12:00:00+00:00",
                " - State: Purchased",
                " - Receipt: cmVjZWlwdA==",
                "Payment:",
                " - Product Identifier: pro_upgrade",
                " - Quantity: 2",
                " - Request Data: AQID",
            ]
        );
    }

    #[test]
    fn test_describe_uses_placeholders_for_absent_fields() {
        let tx = Transaction::new(Payment::new("coins_100"), TransactionState::Purchasing);

        let text = describe_transaction(&tx);
        assert!(text.contains(" - Identifier: <none>"));
        assert!(text.contains(" - Date: <none>"));
        assert!(text.contains(" - State: Purchasing"));
        assert!(text.contains(" - Receipt: <none>"));
        assert!(text.contains(" - Request Data: <none>"));
    }
}

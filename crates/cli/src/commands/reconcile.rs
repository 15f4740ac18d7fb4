//! Reconcile the payment failure log against stored orders.
//!
//! Every line in the log is a payment the gateway captured but the store
//! did not record at the time. A later retry may have stored it since;
//! anything still missing needs a manual order or a refund.

use std::path::Path;

use tracing::{info, warn};

use saumara_core::{OrderNumber, PaymentFailure};
use saumara_storefront::checkout::JsonlFailureLog;
use saumara_storefront::db::OrderRepository;

use super::{CommandError, connect};

/// What happened to one logged failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An order now exists for the intent.
    Recorded(OrderNumber),
    /// Still no order; the customer was charged for nothing.
    Outstanding,
}

/// Collapse repeated log entries for the same intent, keeping the latest.
pub fn latest_per_intent(failures: Vec<PaymentFailure>) -> Vec<PaymentFailure> {
    let mut latest: Vec<PaymentFailure> = Vec::with_capacity(failures.len());
    for failure in failures {
        match latest.iter_mut().find(|f| f.intent_id == failure.intent_id) {
            Some(existing) if existing.recorded_at <= failure.recorded_at => *existing = failure,
            Some(_) => {}
            None => latest.push(failure),
        }
    }
    latest
}

/// Check every logged failure against the orders table.
///
/// # Errors
///
/// Returns an error if the log cannot be read or the database query fails.
pub async fn run(path: &Path) -> Result<(), CommandError> {
    let failures = latest_per_intent(JsonlFailureLog::read_all(path)?);
    info!(path = %path.display(), entries = failures.len(), "Loaded failure log");

    let repo = OrderRepository::new(connect().await?);
    let mut outstanding = 0usize;

    for failure in &failures {
        let resolution = match repo.get_by_intent(&failure.intent_id).await? {
            Some(order) => Resolution::Recorded(order.order_number),
            None => Resolution::Outstanding,
        };

        match resolution {
            Resolution::Recorded(number) => info!(
                correlation_id = %failure.intent_id,
                payment_id = %failure.payment_id,
                order_number = %number,
                "Recorded"
            ),
            Resolution::Outstanding => {
                outstanding = outstanding.saturating_add(1);
                warn!(
                    correlation_id = %failure.intent_id,
                    payment_id = %failure.payment_id,
                    customer = %failure.customer.email,
                    total = %failure.total,
                    error = %failure.error,
                    "Outstanding: payment captured with no order"
                );
            }
        }
    }

    info!(
        "Reconciliation complete: {} recorded, {} outstanding",
        failures.len().saturating_sub(outstanding),
        outstanding
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use saumara_core::{CheckoutForm, IntentId, PaymentId};

    use super::*;

    fn failure(intent: &str, error: &str, age_secs: i64) -> PaymentFailure {
        let mut failure = PaymentFailure::new(
            IntentId::new(intent),
            PaymentId::new("pay_1"),
            CheckoutForm::default(),
            Vec::new(),
            error,
        );
        failure.recorded_at = Utc::now() - Duration::seconds(age_secs);
        failure
    }

    #[test]
    fn test_latest_entry_per_intent_wins() {
        let collapsed = latest_per_intent(vec![
            failure("order_A", "first", 30),
            failure("order_B", "other", 20),
            failure("order_A", "second", 10),
            failure("order_A", "stale", 60),
        ]);

        assert_eq!(collapsed.len(), 2);
        let a = collapsed.iter().find(|f| f.intent_id.as_str() == "order_A").unwrap();
        assert_eq!(a.error, "second");
    }

    #[test]
    fn test_reads_log_written_by_storefront() {
        use saumara_storefront::checkout::FailureSink;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failures.jsonl");
        let log = JsonlFailureLog::new(&path);
        log.record(&failure("order_A", "store down", 0)).unwrap();
        log.record(&failure("order_B", "store down", 0)).unwrap();

        let failures = latest_per_intent(JsonlFailureLog::read_all(&path).unwrap());
        assert_eq!(failures.len(), 2);
    }
}

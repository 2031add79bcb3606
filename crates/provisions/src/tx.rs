//! Transaction payloads submitted during provisioning.

use conformance_types::{Address, Drops, TrustlineSpec};
use serde_json::{json, Value};

/// Native currency payment from `from` to `to`.
pub fn payment(from: &Address, to: &Address, amount: Drops) -> Value {
    json!({
        "TransactionType": "Payment",
        "Account": from,
        "Destination": to,
        "Amount": amount,
    })
}

/// Trust line from `holder` to the issuer named in `spec`.
pub fn trust_set(holder: &Address, spec: &TrustlineSpec) -> Value {
    json!({
        "TransactionType": "TrustSet",
        "Account": holder,
        "LimitAmount": {
            "currency": spec.currency,
            "issuer": spec.issuer,
            "value": spec.limit,
        },
    })
}

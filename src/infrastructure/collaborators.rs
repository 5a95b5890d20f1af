use crate::domain::ports::{
    GatewayAck, IdentityProvider, InitiationRequest, Notification, Notifier, PaymentGateway,
    VerifiedIdentity,
};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Gateway stand-in that accepts every initiation and records the requests
/// it saw. Real callbacks are injected by the caller through
/// `PaymentGatewayAdapter::reconcile`.
#[derive(Default)]
pub struct SandboxGateway {
    accept: bool,
    requests: Mutex<Vec<InitiationRequest>>,
}

impl SandboxGateway {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<InitiationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Renders the asynchronous callback body for an accepted initiation,
    /// in the same shape the live gateway posts back.
    pub fn callback_body(checkout_ref: &str, merchant_ref: &str, success: bool) -> String {
        let callback = if success {
            serde_json::json!({
                "MerchantRequestID": merchant_ref,
                "CheckoutRequestID": checkout_ref,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "MpesaReceiptNumber", "Value": format!("RCPT{}", &checkout_ref[2..])},
                    ]
                }
            })
        } else {
            serde_json::json!({
                "MerchantRequestID": merchant_ref,
                "CheckoutRequestID": checkout_ref,
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user",
            })
        };
        serde_json::json!({"Body": {"stkCallback": callback}}).to_string()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn initiate(&self, request: &InitiationRequest) -> Result<GatewayAck> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(if self.accept {
            GatewayAck {
                accepted: true,
                detail: "Success. Request accepted for processing".into(),
            }
        } else {
            GatewayAck {
                accepted: false,
                detail: "The initiator information is invalid".into(),
            }
        })
    }
}

/// Notifier that only logs. Delivery is fire-and-forget by contract, so
/// the replay binary does not need a real channel.
#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            kind = ?notification.kind,
            title = %notification.title,
            "notification"
        );
        Ok(())
    }
}

/// Identity provider backed by a credential table, for tests and replay.
#[derive(Default)]
pub struct StaticIdentity {
    credentials: Mutex<HashMap<String, VerifiedIdentity>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, credential: &str, external_id: &str, email: &str) {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                credential.to_string(),
                VerifiedIdentity {
                    external_id: external_id.to_string(),
                    email: email.to_string(),
                },
            );
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(credential)
            .cloned()
            .ok_or(EngineError::InvalidCredential)
    }
}

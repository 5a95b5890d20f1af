//! Parser for the gateway's STK-push callback payload.
//!
//! The transport layer hands the raw JSON body here; the parsed summary
//! maps directly onto `PaymentGatewayAdapter::reconcile`. Signature
//! verification of the callback is the transport's concern, not ours.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

/// The reconcile-relevant facts extracted from a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackSummary {
    pub checkout_ref: String,
    pub success: bool,
    pub transaction_id: Option<String>,
}

impl CallbackSummary {
    /// Parses a raw callback body. Result code zero means success;
    /// the receipt number in the metadata becomes the external
    /// transaction id.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        let envelope: CallbackEnvelope = serde_json::from_str(raw)?;
        let callback = envelope.body.stk_callback;
        let transaction_id = callback.callback_metadata.and_then(|metadata| {
            metadata
                .items
                .iter()
                .find(|item| item.name == "MpesaReceiptNumber")
                .and_then(|item| item.value.as_ref())
                .and_then(|value| value.as_str().map(str::to_string))
        });
        Ok(Self {
            checkout_ref: callback.checkout_request_id,
            success: callback.result_code == 0,
            transaction_id,
        })
    }
}

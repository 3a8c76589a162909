//! Typed view of the asynchronous STK push result notification.
//!
//! The gateway posts a nested JSON envelope; the interesting values live
//! in a list of named metadata items and must be looked up by name, not
//! position.

use serde::Deserialize;
use serde_json::Value;

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
    pub item: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl StkCallback {
    /// ResultCode 0 is the gateway's success marker.
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.callback_metadata
            .as_ref()?
            .item
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// Paid amount in the smallest currency unit.
    pub fn amount(&self) -> Option<i64> {
        self.metadata_value("Amount").and_then(value_as_i64)
    }

    pub fn phone_number(&self) -> Option<String> {
        self.metadata_value("PhoneNumber").and_then(|value| {
            value
                .as_str()
                .map(str::to_string)
                .or_else(|| value.as_i64().map(|n| n.to_string()))
        })
    }

    pub fn receipt(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber")
            .and_then(|value| value.as_str().map(str::to_string))
    }
}

// The gateway is loose with numeric types: amounts arrive as integers,
// whole-number floats, or numeric strings.
fn value_as_i64(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64() {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            return Some(f as i64);
        }
        return None;
    }
    value.as_str().and_then(|s| s.trim().parse::<i64>().ok())
}

//! Payment instructions shown to customers after ordering.

use serde::Serialize;

use rounds_core::Money;
use rounds_core::promptpay::{PromptPayTarget, render_payload};

use crate::models::PaymentInfo;

/// Bank transfer details plus a `PromptPay` QR for the order amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub promptpay_id: Option<String>,
    pub amount: Money,
    pub promptpay_payload: Option<String>,
    pub qr_image_url: Option<String>,
}

/// URL of the rendered QR image for `payload`.
#[must_use]
pub fn qr_image_url(renderer_base: &str, payload: &str) -> String {
    format!("{renderer_base}{}", urlencoding::encode(payload))
}

/// Build the payment instructions for an order. A missing or unusable
/// `PromptPay` id leaves the QR fields empty; bank details are still shown.
#[must_use]
pub fn payment_instructions(
    payment: &PaymentInfo,
    amount: Money,
    renderer_base: &str,
) -> PaymentInstructions {
    let payload = payment.promptpay_id.as_deref().and_then(|id| {
        let rendered = PromptPayTarget::parse(id)
            .and_then(|target| render_payload(&target, Some(amount.rounded())));
        match rendered {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(error = %e, "Shop has an unusable PromptPay id");
                None
            }
        }
    });

    PaymentInstructions {
        bank_name: payment.bank_name.clone(),
        account_name: payment.account_name.clone(),
        account_number: payment.account_number.clone(),
        promptpay_id: payment.promptpay_id.clone(),
        amount,
        qr_image_url: payload.as_deref().map(|p| qr_image_url(renderer_base, p)),
        promptpay_payload: payload,
    }
}

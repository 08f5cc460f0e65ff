//! PromptPay payment payloads.
//!
//! Builds the EMVCo merchant-presented QR string that Thai banking apps scan.
//! Each field is `ID (2 digits) + LENGTH (2 digits) + VALUE`; the payload ends
//! with a CRC16-CCITT checksum over everything before it, including the
//! checksum field's own ID and length.

use rust_decimal::Decimal;

use crate::types::Money;

const PAYLOAD_FORMAT: &str = "000201";
const STATIC_QR: &str = "010211";
const DYNAMIC_QR: &str = "010212";
const MERCHANT_ACCOUNT_TAG: &str = "29";
const PROMPTPAY_AID: &str = "A000000677010111";
const COUNTRY_TH: &str = "5802TH";
const CURRENCY_THB: &str = "5303764";
const AMOUNT_TAG: &str = "54";
const CHECKSUM_PREFIX: &str = "6304";

/// Errors from building a PromptPay payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptPayError {
    /// Not a Thai mobile number, national id or tax id.
    #[error("PromptPay id must be a 10-digit mobile number or 13-digit id")]
    InvalidTarget,
    /// Negative amounts cannot be paid.
    #[error("payment amount cannot be negative")]
    NegativeAmount,
}

/// Who receives the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPayTarget {
    /// Mobile number, stored in international form without `+` (`0066…`).
    Mobile(String),
    /// 13-digit national id or tax id.
    NationalId(String),
}

impl PromptPayTarget {
    /// Parse a PromptPay id as entered by a shop owner.
    ///
    /// Separators (spaces, dashes, a leading `+`) are ignored. Ten-digit
    /// numbers starting with `0` and `66`-prefixed eleven-digit numbers are
    /// mobile numbers; thirteen digits is a national id.
    ///
    /// # Errors
    ///
    /// Returns [`PromptPayError::InvalidTarget`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, PromptPayError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let has_other = raw
            .chars()
            .any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-' || c == '+'));
        if has_other {
            return Err(PromptPayError::InvalidTarget);
        }

        match digits.len() {
            10 => digits
                .strip_prefix('0')
                .map(|local| Self::Mobile(format!("0066{local}")))
                .ok_or(PromptPayError::InvalidTarget),
            11 if digits.starts_with("66") => Ok(Self::Mobile(format!("00{digits}"))),
            13 => Ok(Self::NationalId(digits)),
            _ => Err(PromptPayError::InvalidTarget),
        }
    }

    fn field(&self) -> String {
        match self {
            Self::Mobile(number) => tlv("01", number),
            Self::NationalId(id) => tlv("02", id),
        }
    }
}

fn tlv(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}

/// Build the payload for paying `amount` to `target`.
///
/// With an amount the QR is dynamic (point-of-initiation `12`) and the
/// amount is embedded with two decimals; without one it is static (`11`)
/// and the payer types the amount.
///
/// # Errors
///
/// Returns [`PromptPayError::NegativeAmount`] for negative amounts.
pub fn render_payload(
    target: &PromptPayTarget,
    amount: Option<Money>,
) -> Result<String, PromptPayError> {
    if amount.is_some_and(|a| a.is_negative()) {
        return Err(PromptPayError::NegativeAmount);
    }

    let merchant = format!("{}{}", tlv("00", PROMPTPAY_AID), target.field());

    let mut payload = String::with_capacity(128);
    payload.push_str(PAYLOAD_FORMAT);
    payload.push_str(if amount.is_some() { DYNAMIC_QR } else { STATIC_QR });
    payload.push_str(&tlv(MERCHANT_ACCOUNT_TAG, &merchant));
    payload.push_str(COUNTRY_TH);
    payload.push_str(CURRENCY_THB);
    if let Some(amount) = amount {
        let value = format_amount(amount.amount());
        payload.push_str(&tlv(AMOUNT_TAG, &value));
    }
    payload.push_str(CHECKSUM_PREFIX);

    let crc = crc16_ccitt(payload.as_bytes());
    payload.push_str(&format!("{crc:04X}"));
    Ok(payload)
}

fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// CRC16-CCITT (polynomial `0x1021`, initial value `0xFFFF`, no reflection).
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 == 0 {
                crc << 1
            } else {
                (crc << 1) ^ 0x1021
            };
        }
    }
    crc
}

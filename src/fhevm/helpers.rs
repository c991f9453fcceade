// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Small utilities shared by the SDK and the demo API.

use std::{fmt::Display, future::Future, str::FromStr, time::Duration};

use alloy::primitives::{Address, Bytes, U256};

use super::error::FhevmError;

/// Default number of attempts for [`retry_with_backoff`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run `op` until it succeeds or `max_attempts` are spent, doubling the delay
/// after every failure. Returns the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut op: F,
    max_attempts: u32,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}

/// Parse a plaintext from decimal or `0x`-prefixed hex.
pub fn parse_value(raw: &str) -> Result<U256, FhevmError> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return Err(FhevmError::InvalidValue(format!(
            "Value cannot be negative: {raw}"
        )));
    }

    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(raw, 10),
    };
    parsed.map_err(|e| FhevmError::InvalidValue(format!("{raw}: {e}")))
}

/// Render `value` as a fixed-point number with `decimals` fractional digits.
pub fn format_encrypted_value(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let fraction = value % divisor;

    format!("{}.{:0>width$}", whole, fraction.to_string(), width = decimals as usize)
}

/// Whether `raw` is a `0x`-prefixed 20-byte address. Mixed-case input must
/// carry a valid EIP-55 checksum.
pub fn is_valid_address(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix("0x") else {
        return false;
    };
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(raw, None).is_ok();
    }
    true
}

/// Parse an address, reporting [`FhevmError::InvalidAddress`] on failure.
pub fn parse_address(raw: &str) -> Result<Address, FhevmError> {
    if !is_valid_address(raw) {
        return Err(FhevmError::InvalidAddress(raw.to_string()));
    }
    Address::from_str(raw).map_err(|e| FhevmError::InvalidAddress(e.to_string()))
}

/// `0x1234...abcd` style shortening. Invalid addresses are returned as is.
pub fn shorten_address(address: &str, start: usize, end: usize) -> String {
    if !is_valid_address(address) || start.saturating_add(end) >= address.len() {
        return address.to_string();
    }
    format!("{}...{}", &address[..start], &address[address.len() - end..])
}

/// Extract the revert reason from a provider error message.
pub fn parse_contract_error(message: &str) -> String {
    const MARKER: &str = "reason=\"";

    if let Some(start) = message.find(MARKER) {
        let rest = &message[start + MARKER.len()..];
        if let Some(end) = rest.find('"') {
            return rest[..end].to_string();
        }
    }

    if message.trim().is_empty() {
        "Unknown error occurred".to_string()
    } else {
        message.to_string()
    }
}

pub fn to_hex(data: &[u8]) -> String {
    alloy::hex::encode_prefixed(data)
}

pub fn from_hex(raw: &str) -> Result<Bytes, FhevmError> {
    alloy::hex::decode(raw.trim())
        .map(Bytes::from)
        .map_err(|e| FhevmError::InvalidArgument(format!("Invalid hex: {e}")))
}

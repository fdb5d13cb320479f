//! Order and wallet domain types, with request-level validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_FIELD_LEN: usize = 200;
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("'{field}' is required")]
    Required { field: &'static str },

    #[error("'{field}' must be at most {MAX_FIELD_LEN} characters")]
    TooLong { field: &'static str },

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("country must be a two-letter ISO code, got '{0}'")]
    InvalidCountry(String),

    #[error("'{0}' is not a valid EVM or Solana wallet address")]
    InvalidWallet(String),
}

/// Shipping address in the shape the fulfillment provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    pub physical_address: PhysicalAddress,
}

impl Recipient {
    /// Trims every field and validates the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderValidationError`] encountered.
    pub fn normalized(&self) -> Result<Self, OrderValidationError> {
        let email = required("email", &self.email)?;
        if !looks_like_email(&email) {
            return Err(OrderValidationError::InvalidEmail(email));
        }

        let addr = &self.physical_address;
        let country = required("country", &addr.country)?.to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(OrderValidationError::InvalidCountry(country));
        }
        let state = optional("state", addr.state.as_deref())?;
        if country == "US" && state.is_none() {
            return Err(OrderValidationError::Required { field: "state" });
        }

        Ok(Self {
            email,
            physical_address: PhysicalAddress {
                name: required("name", &addr.name)?,
                line1: required("line1", &addr.line1)?,
                line2: optional("line2", addr.line2.as_deref())?,
                city: required("city", &addr.city)?,
                state,
                postal_code: required("postalCode", &addr.postal_code)?,
                country,
            },
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, OrderValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OrderValidationError::Required { field });
    }
    if trimmed.chars().count() > MAX_FIELD_LEN {
        return Err(OrderValidationError::TooLong { field });
    }
    Ok(trimmed.to_owned())
}

fn optional(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, OrderValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => required(field, v).map(Some),
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletChain {
    Evm,
    Solana,
}

impl WalletChain {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WalletChain::Evm => "evm",
            WalletChain::Solana => "solana",
        }
    }
}

/// A payer wallet address, normalized for use as a storage key.
///
/// EVM addresses are lowercased; Solana addresses are case-sensitive and kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress {
    address: String,
    chain: WalletChain,
}

impl WalletAddress {
    /// # Errors
    ///
    /// Returns [`OrderValidationError::InvalidWallet`] for anything that is
    /// neither a `0x`-prefixed 20-byte hex address nor a base58 Solana key.
    pub fn parse(raw: &str) -> Result<Self, OrderValidationError> {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(Self {
                    address: format!("0x{}", hex.to_ascii_lowercase()),
                    chain: WalletChain::Evm,
                });
            }
        } else if (32..=44).contains(&trimmed.len())
            && trimmed.chars().all(|c| BASE58_ALPHABET.contains(c))
        {
            return Ok(Self {
                address: trimmed.to_owned(),
                chain: WalletChain::Solana,
            });
        }
        Err(OrderValidationError::InvalidWallet(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn chain(&self) -> WalletChain {
        self.chain
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Lifecycle of an order recorded by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Maps a fulfillment provider order phase onto a gateway status.
    ///
    /// Returns `None` for phases that do not change the gateway status.
    #[must_use]
    pub fn from_provider_phase(phase: &str) -> Option<Self> {
        match phase.to_ascii_lowercase().as_str() {
            "completed" | "delivered" => Some(OrderStatus::Completed),
            "failed" => Some(OrderStatus::Failed),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "submitted" => Ok(OrderStatus::Submitted),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;

//! Wire types for the fulfillment provider's order API.

use paycart_core::{Locator, OrderStatus, Recipient};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/2022-06-09/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub recipient: Recipient,
    pub payment: PaymentDetails,
    pub line_items: Vec<LineItem>,
}

impl CreateOrderRequest {
    /// Single-item order for `locator`, paid from `payer_address`.
    #[must_use]
    pub fn single_item(
        recipient: Recipient,
        locator: &Locator,
        method: &str,
        currency: &str,
        payer_address: &str,
    ) -> Self {
        Self {
            recipient,
            payment: PaymentDetails {
                method: method.to_owned(),
                currency: currency.to_owned(),
                payer_address: payer_address.to_owned(),
            },
            line_items: vec![LineItem {
                product_locator: locator.as_str().to_owned(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: String,
    pub currency: String,
    pub payer_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_locator: String,
}

/// Response envelope of the create-order call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateOrderResponse {
    pub order: ProviderOrder,
}

/// An order as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOrder {
    pub order_id: String,
    pub phase: String,
    #[serde(default)]
    pub quote: Option<Quote>,
}

impl ProviderOrder {
    /// Local status for the provider's phase, if the phase is one we track.
    #[must_use]
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::from_provider_phase(&self.phase)
    }

    #[must_use]
    pub fn total_price(&self) -> Option<&Price> {
        self.quote.as_ref().and_then(|q| q.total_price.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default)]
    pub total_price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Price {
    pub amount: Decimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use paycart_core::{LocatorPrefix, PhysicalAddress};

    fn recipient() -> Recipient {
        Recipient {
            email: "buyer@example.com".to_owned(),
            physical_address: PhysicalAddress {
                name: "Ada Lovelace".to_owned(),
                line1: "1 Main St".to_owned(),
                line2: None,
                city: "Springfield".to_owned(),
                state: Some("IL".to_owned()),
                postal_code: "62701".to_owned(),
                country: "US".to_owned(),
            },
        }
    }

    #[test]
    fn create_request_serializes_in_provider_shape() {
        let locator = Locator::new(LocatorPrefix::Amazon, "https://www.amazon.com/dp/B08N5WRWNW");
        let request = CreateOrderRequest::single_item(
            recipient(),
            &locator,
            "base-sepolia",
            "usdc",
            "0xabc",
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["recipient"]["email"], "buyer@example.com");
        assert_eq!(json["recipient"]["physicalAddress"]["postalCode"], "62701");
        assert!(json["recipient"]["physicalAddress"].get("line2").is_none());
        assert_eq!(json["payment"]["method"], "base-sepolia");
        assert_eq!(json["payment"]["payerAddress"], "0xabc");
        assert_eq!(
            json["lineItems"][0]["productLocator"],
            "amazon:https://www.amazon.com/dp/B08N5WRWNW"
        );
    }

    #[test]
    fn provider_order_parses_quote_total() {
        let order: ProviderOrder = serde_json::from_value(serde_json::json!({
            "orderId": "ord_1",
            "phase": "payment",
            "quote": { "totalPrice": { "amount": "19.99", "currency": "usdc" } },
            "lineItems": []
        }))
        .unwrap();

        let total = order.total_price().unwrap();
        assert_eq!(total.amount, Decimal::new(1999, 2));
        assert_eq!(total.currency, "usdc");
        assert_eq!(order.status(), None);
    }

    #[test]
    fn provider_order_without_quote_parses() {
        let order: ProviderOrder =
            serde_json::from_str(r#"{"orderId":"ord_2","phase":"delivered"}"#).unwrap();
        assert!(order.total_price().is_none());
        assert_eq!(order.status(), Some(OrderStatus::Completed));
    }
}

//! Static OpenAPI description of the HTTP surface.

use std::sync::LazyLock;

use axum::Json;
use serde_json::{json, Value};

static DOCUMENT: LazyLock<Value> = LazyLock::new(document);

pub(super) async fn openapi_json() -> Json<Value> {
    Json(DOCUMENT.clone())
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ApiError" } } }
    })
}

fn data_response(description: &str, schema: &Value) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "required": ["data", "meta"],
                    "properties": {
                        "data": schema,
                        "meta": { "$ref": "#/components/schemas/ResponseMeta" }
                    }
                }
            }
        }
    })
}

#[allow(clippy::too_many_lines)]
fn document() -> Value {
    let order = json!({ "$ref": "#/components/schemas/Order" });
    let orders = json!({ "type": "array", "items": order });
    let bearer = json!([{ "bearerAuth": [] }]);

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "paycart",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Checkout gateway that takes x402 payments and places orders with a fulfillment provider."
        },
        "paths": {
            "/api/v1/health": {
                "get": {
                    "summary": "Service and database health",
                    "responses": {
                        "200": { "description": "Healthy" },
                        "503": { "description": "Database unavailable" }
                    }
                }
            },
            "/api/v1/orders": {
                "post": {
                    "summary": "Place a paid order",
                    "description": "Requires a base64 x402 payment in the X-PAYMENT header. The payment is settled only after the fulfillment provider accepts the order.",
                    "parameters": [{
                        "name": "X-PAYMENT",
                        "in": "header",
                        "required": true,
                        "schema": { "type": "string" }
                    }],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateOrder" }
                            }
                        }
                    },
                    "responses": {
                        "201": data_response("Order submitted; X-PAYMENT-RESPONSE carries the settlement receipt", &order),
                        "400": error_response("Invalid body or unresolvable product URL"),
                        "402": {
                            "description": "Payment required, rejected, or not settled",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/PaymentRequired" }
                                }
                            }
                        },
                        "429": error_response("Rate limited"),
                        "502": error_response("Facilitator or fulfillment provider failed")
                    }
                }
            },
            "/api/v1/orders/{public_id}": {
                "get": {
                    "summary": "Look up an order",
                    "security": bearer,
                    "parameters": [{
                        "name": "public_id",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "string", "format": "uuid" }
                    }],
                    "responses": {
                        "200": data_response("Order", &order),
                        "400": error_response("Malformed order id"),
                        "401": error_response("Missing or invalid bearer token"),
                        "404": error_response("Unknown order")
                    }
                }
            },
            "/api/v1/wallets/{address}/orders": {
                "get": {
                    "summary": "Orders placed by a wallet, newest first",
                    "security": bearer,
                    "parameters": [
                        {
                            "name": "address",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        },
                        {
                            "name": "limit",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "integer", "minimum": 1, "maximum": 200, "default": 50 }
                        }
                    ],
                    "responses": {
                        "200": data_response("Orders", &orders),
                        "400": error_response("Malformed wallet address"),
                        "401": error_response("Missing or invalid bearer token")
                    }
                }
            },
            "/api/v1/locators/resolve": {
                "post": {
                    "summary": "Resolve a product URL into a provider locator",
                    "security": bearer,
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["product_url"],
                                    "properties": { "product_url": { "type": "string" } }
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": data_response("Resolved locator", &json!({
                            "type": "object",
                            "properties": {
                                "locator": { "type": "string", "example": "amazon:https://www.amazon.com/dp/B08N5WRWNW" },
                                "prefix": { "type": "string", "enum": ["amazon", "shopify", "url"] }
                            }
                        })),
                        "400": error_response("Empty, malformed, or incomplete product URL"),
                        "401": error_response("Missing or invalid bearer token")
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer" }
            },
            "schemas": {
                "ResponseMeta": {
                    "type": "object",
                    "properties": {
                        "request_id": { "type": "string" },
                        "timestamp": { "type": "string", "format": "date-time" }
                    }
                },
                "ApiError": {
                    "type": "object",
                    "properties": {
                        "error": {
                            "type": "object",
                            "properties": {
                                "code": { "type": "string" },
                                "message": { "type": "string" }
                            }
                        },
                        "meta": { "$ref": "#/components/schemas/ResponseMeta" }
                    }
                },
                "PaymentRequired": {
                    "type": "object",
                    "properties": {
                        "x402Version": { "type": "integer" },
                        "error": { "type": "string" },
                        "accepts": { "type": "array", "items": { "type": "object" } }
                    }
                },
                "CreateOrder": {
                    "type": "object",
                    "required": ["product_url", "wallet_address", "email", "shipping_address"],
                    "properties": {
                        "product_url": { "type": "string" },
                        "wallet_address": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "shipping_address": {
                            "type": "object",
                            "required": ["name", "line1", "city", "postal_code", "country"],
                            "properties": {
                                "name": { "type": "string" },
                                "line1": { "type": "string" },
                                "line2": { "type": "string" },
                                "city": { "type": "string" },
                                "state": { "type": "string" },
                                "postal_code": { "type": "string" },
                                "country": { "type": "string", "minLength": 2, "maxLength": 2 }
                            }
                        }
                    }
                },
                "Order": {
                    "type": "object",
                    "properties": {
                        "order_id": { "type": "string", "format": "uuid" },
                        "wallet_address": { "type": "string" },
                        "product_url": { "type": "string" },
                        "locator": { "type": "string" },
                        "status": {
                            "type": "string",
                            "enum": ["pending", "submitted", "completed", "failed", "cancelled"]
                        },
                        "provider_order_id": { "type": "string", "nullable": true },
                        "payment_reference": { "type": "string", "nullable": true },
                        "quote_total": { "type": "string", "nullable": true },
                        "quote_currency": { "type": "string", "nullable": true },
                        "error_message": { "type": "string", "nullable": true },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_routed_path_is_documented() {
        let doc = document();
        for path in [
            "/api/v1/health",
            "/api/v1/orders",
            "/api/v1/orders/{public_id}",
            "/api/v1/wallets/{address}/orders",
            "/api/v1/locators/resolve",
        ] {
            assert!(doc["paths"].get(path).is_some(), "{path} missing");
        }
    }

    #[test]
    fn paywalled_route_documents_payment_header() {
        let doc = document();
        let post = &doc["paths"]["/api/v1/orders"]["post"];
        assert_eq!(post["parameters"][0]["name"], "X-PAYMENT");
        assert!(post["responses"].get("402").is_some());
        assert!(post.get("security").is_none());
    }
}

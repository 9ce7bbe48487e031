//! Request payloads accepted by the application services

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{MerchantId, UserId};
use crate::domain::value_objects::MAX_AMOUNT;

/// Whole cents in `(0, MAX_AMOUNT]`. Sub-cent input would round to a different price.
fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO { return Err(ValidationError::new("amount_not_positive")); }
    if *amount > MAX_AMOUNT { return Err(ValidationError::new("amount_too_large")); }
    if amount.normalize().scale() > 2 { return Err(ValidationError::new("amount_sub_cent")); }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RechargeRequest {
    #[validate(custom = "positive_amount")]
    pub amount: Decimal,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMerchantRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 10, max = 20))]
    pub phone: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "positive_amount")]
    pub price: Decimal,
    pub currency: Option<String>,
    #[validate(range(max = 2147483647))]
    pub stock_quantity: u32,
    pub merchant_id: MerchantId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddStockRequest {
    #[validate(range(min = 1, max = 2147483647))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePriceRequest {
    #[validate(custom = "positive_amount")]
    pub price: Decimal,
    pub currency: Option<String>,
}

/// Item list emptiness is checked by the workflow after the buyer resolves.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    #[validate]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderItemRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_short_username_and_bad_email() {
        let req = CreateUserRequest { username: "al".into(), email: "nope".into(), currency: None };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username") && fields.contains_key("email"));
    }

    #[test]
    fn rejects_zero_quantity_lines() {
        let req = CreateOrderRequest {
            user_id: UserId::new(),
            items: vec![OrderItemRequest { sku: "A".into(), quantity: 0 }],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_prices() {
        let req = RechargeRequest { amount: dec!(0), currency: None };
        assert!(req.validate().is_err());
        let req = RechargeRequest { amount: dec!(0.01), currency: None };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_sub_cent_and_oversized_amounts() {
        let price = |price| CreateProductRequest {
            sku: "W-1".into(),
            name: "Widget".into(),
            description: None,
            price,
            currency: None,
            stock_quantity: 1,
            merchant_id: MerchantId::new(),
        };
        assert!(price(dec!(0.001)).validate().is_err());
        assert!(price(dec!(1.005)).validate().is_err());
        assert!(price(dec!(1.500)).validate().is_ok());
        assert!(price(dec!(99999999999999999.99)).validate().is_ok());
        assert!(price(dec!(100000000000000000)).validate().is_err());
        assert!(RechargeRequest { amount: dec!(70000000000000000000000000000), currency: None }.validate().is_err());
    }

    #[test]
    fn amounts_accept_strings_and_numbers() {
        let a: RechargeRequest = serde_json::from_str(r#"{"amount": "12.50"}"#).unwrap();
        let b: RechargeRequest = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        assert_eq!(a.amount, b.amount);
    }
}

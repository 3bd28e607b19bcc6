use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::payment::PaymentStatus;
use crate::utils::validation::validate_not_empty;

// Request para crear una orden de pago
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub workshop_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_not_empty")]
    pub zone: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub workshop_id: Uuid,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminPaymentsQuery {
    pub workshop_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payment_validation() {
        let ok = CreatePaymentRequest {
            workshop_id: Uuid::nil(),
            quantity: 250,
            zone: "AMBA".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank_zone = CreatePaymentRequest {
            zone: "  ".to_string(),
            ..ok
        };
        assert!(blank_zone.validate().is_err());
    }

    #[test]
    fn test_transition_request_uses_snake_case() {
        let request: TransitionRequest =
            serde_json::from_value(serde_json::json!({ "status": "in_review" })).unwrap();
        assert_eq!(request.status, PaymentStatus::InReview);
    }
}

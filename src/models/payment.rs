//! Modelo de PaymentOrder
//!
//! Órdenes de pago que acreditan cupos de inspección a un taller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de la orden - mapea al ENUM payment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pendiente",
            PaymentStatus::InReview => "En Revisión",
            PaymentStatus::Approved => "Aprobado",
            PaymentStatus::Rejected => "Rechazado",
        }
    }

    /// Estados desde los cuales el taller puede subir un comprobante
    pub fn accepts_receipt(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Rejected)
    }
}

/// Movimiento de cupos que produce un cambio de estado de la orden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerDelta {
    None,
    Credit(i32),
    Debit(i32),
}

impl LedgerDelta {
    /// Entrar a Aprobado acredita, salir de Aprobado debita, el resto no mueve cupos
    pub fn for_transition(previous: PaymentStatus, next: PaymentStatus, quantity: i32) -> Self {
        match (previous == PaymentStatus::Approved, next == PaymentStatus::Approved) {
            (false, true) => LedgerDelta::Credit(quantity),
            (true, false) => LedgerDelta::Debit(quantity),
            _ => LedgerDelta::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentOrder {
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub zone: String,
    pub status: PaymentStatus,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Importe total de una orden
pub fn order_amount(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    fn signed(delta: LedgerDelta) -> i32 {
        match delta {
            LedgerDelta::None => 0,
            LedgerDelta::Credit(q) => q,
            LedgerDelta::Debit(q) => -q,
        }
    }

    #[test]
    fn test_same_state_is_noop() {
        for status in [Pending, InReview, Approved, Rejected] {
            assert_eq!(LedgerDelta::for_transition(status, status, 250), LedgerDelta::None);
        }
    }

    #[test]
    fn test_entering_and_leaving_approved() {
        assert_eq!(
            LedgerDelta::for_transition(InReview, Approved, 250),
            LedgerDelta::Credit(250)
        );
        assert_eq!(
            LedgerDelta::for_transition(Approved, Rejected, 250),
            LedgerDelta::Debit(250)
        );
        assert_eq!(
            LedgerDelta::for_transition(Pending, Rejected, 250),
            LedgerDelta::None
        );
    }

    #[test]
    fn test_net_delta_depends_only_on_endpoints() {
        // Cualquier secuencia de estados suma qty si termina en Aprobado partiendo de otro
        // estado, y 0 si vuelve a un estado no aprobado.
        let sequences: Vec<Vec<PaymentStatus>> = vec![
            vec![Pending, InReview, Approved],
            vec![InReview, Approved, Rejected, Approved],
            vec![InReview, Approved, Rejected],
            vec![Pending, Approved, Pending, Approved, InReview],
        ];
        for seq in sequences {
            let net: i32 = seq
                .windows(2)
                .map(|w| signed(LedgerDelta::for_transition(w[0], w[1], 250)))
                .sum();
            let first_approved = seq[0] == Approved;
            let last_approved = *seq.last().unwrap() == Approved;
            let expected = match (first_approved, last_approved) {
                (false, true) => 250,
                (true, false) => -250,
                _ => 0,
            };
            assert_eq!(net, expected, "sequence {:?}", seq);
        }
    }

    #[test]
    fn test_amount() {
        let price = Decimal::new(150050, 2); // 1500.50
        assert_eq!(order_amount(250, price), Decimal::new(37512500, 2));
    }

    #[test]
    fn test_receipt_states() {
        assert!(Pending.accepts_receipt());
        assert!(Rejected.accepts_receipt());
        assert!(!Approved.accepts_receipt());
        assert!(!InReview.accepts_receipt());
    }
}

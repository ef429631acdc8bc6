//! Typed lifecycles for orders, complaints and seller requests.
//!
//! Statuses are stored as text columns but only ever assigned through these
//! enums, so an illegal transition is rejected before it reaches the database.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::app_error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
    Returned,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Paid)
                | (Created, Cancelled)
                | (Created, Failed)
                | (Paid, Processing)
                | (Paid, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Returned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Failed | OrderStatus::Returned
        )
    }

    /// Shipping details are frozen once the parcel leaves the seller.
    pub fn shipping_address_mutable(self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Paid | OrderStatus::Processing
        )
    }

    pub fn buyer_cancellable(self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Paid | OrderStatus::Processing
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(OrderStatus::Created),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "failed" => Ok(OrderStatus::Failed),
            "returned" => Ok(OrderStatus::Returned),
            other => Err(AppError::BadRequest(format!(
                "{other} is not a valid order status"
            ))),
        }
    }
}

/// Parse the stored status and check the requested transition against the
/// table, returning a typed 400 on an illegal pair.
pub fn ensure_order_transition(current: &str, next: OrderStatus) -> Result<OrderStatus, AppError> {
    let from = current.parse::<OrderStatus>()?;
    if from.can_transition_to(next) {
        Ok(from)
    } else {
        Err(AppError::InvalidTransition {
            from: from.to_string(),
            to: next.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    InReview,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Open => "open",
            ComplaintStatus::InReview => "in_review",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(self, next: ComplaintStatus) -> bool {
        use ComplaintStatus::*;
        matches!(
            (self, next),
            (Open, InReview) | (Open, Rejected) | (InReview, Resolved) | (InReview, Rejected)
        )
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(ComplaintStatus::Open),
            "in_review" => Ok(ComplaintStatus::InReview),
            "resolved" => Ok(ComplaintStatus::Resolved),
            "rejected" => Ok(ComplaintStatus::Rejected),
            other => Err(AppError::BadRequest(format!(
                "{other} is not a valid complaint status"
            ))),
        }
    }
}

pub fn ensure_complaint_transition(
    current: &str,
    next: ComplaintStatus,
) -> Result<ComplaintStatus, AppError> {
    let from = current.parse::<ComplaintStatus>()?;
    if from.can_transition_to(next) {
        Ok(from)
    } else {
        Err(AppError::InvalidTransition {
            from: from.to_string(),
            to: next.to_string(),
        })
    }
}

/// Shared by voucher and promotion requests: an admin decides once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_happy_path_is_accepted() {
        let chain = [
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Returned,
        ];
        for pair in chain.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn cancelled_order_cannot_ship() {
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Shipped));
        assert!(ensure_order_transition("cancelled", OrderStatus::Shipped).is_err());
    }

    #[test]
    fn terminal_states_accept_nothing() {
        let all = [
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
            OrderStatus::Returned,
        ];
        for terminal in all.into_iter().filter(|status| status.is_terminal()) {
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn shipped_order_freezes_shipping_address() {
        assert!(OrderStatus::Paid.shipping_address_mutable());
        assert!(!OrderStatus::Shipped.shipping_address_mutable());
        assert!(!OrderStatus::Delivered.shipping_address_mutable());
    }

    #[test]
    fn order_status_round_trips_through_text() {
        for status in ["created", "paid", "shipped", "returned"] {
            assert_eq!(status.parse::<OrderStatus>().unwrap().as_str(), status);
        }
        assert!("sent".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn complaint_flow() {
        assert!(ComplaintStatus::Open.can_transition_to(ComplaintStatus::InReview));
        assert!(ComplaintStatus::InReview.can_transition_to(ComplaintStatus::Resolved));
        assert!(!ComplaintStatus::Resolved.can_transition_to(ComplaintStatus::Open));
        assert!(ensure_complaint_transition("open", ComplaintStatus::Resolved).is_err());
    }
}

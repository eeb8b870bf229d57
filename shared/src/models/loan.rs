//! Loan Model

use super::PhotoClaim;
use serde::{Deserialize, Serialize};

/// Loan entity
///
/// Active while `returned_at` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Loan {
    pub id: String,
    pub member_id: String,
    pub store_location: String,
    pub primary_photo_id: String,
    pub primary_photo_key: String,
    pub checkout_at: i64,
    pub due_at: i64,
    pub returned_at: Option<i64>,
    pub created_at: i64,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// Loan with the photo claims linked to it besides the primary photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub gallery: Vec<PhotoClaim>,
}

/// Compact loan row for member lookups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoanSummary {
    pub id: String,
    pub store_location: String,
    pub checkout_at: i64,
    pub due_at: i64,
}

impl From<&Loan> for LoanSummary {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            store_location: loan.store_location.clone(),
            checkout_at: loan.checkout_at,
            due_at: loan.due_at,
        }
    }
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(alias = "memberId")]
    pub member_id: String,
    #[serde(alias = "storeLocation")]
    pub store_location: String,
    #[serde(alias = "photoIds")]
    pub photo_ids: Vec<String>,
}

/// Return payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    #[serde(alias = "memberId")]
    pub member_id: String,
    #[serde(alias = "loanId")]
    pub loan_id: String,
}

/// Swap payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    #[serde(alias = "memberId")]
    pub member_id: String,
    #[serde(alias = "loanId")]
    pub loan_id: String,
    #[serde(alias = "storeLocation")]
    pub store_location: String,
    #[serde(alias = "photoIds")]
    pub photo_ids: Vec<String>,
}

/// Result of a swap: the loan handed back and the loan issued in its place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapOutcome {
    pub returned_loan: Loan,
    pub new_loan: LoanDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_detail_flattens_loan() {
        let detail = LoanDetail {
            loan: Loan {
                id: "l-1".into(),
                member_id: "m-1".into(),
                store_location: "Downtown".into(),
                primary_photo_id: "p-1".into(),
                primary_photo_key: "loans/m-1/p-1.jpg".into(),
                checkout_at: 1,
                due_at: 2,
                returned_at: None,
                created_at: 1,
            },
            gallery: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], "l-1");
        assert_eq!(json["store_location"], "Downtown");
        assert!(json["gallery"].as_array().unwrap().is_empty());
        assert!(detail.loan.is_active());
    }

    #[test]
    fn test_requests_accept_camel_case_fields() {
        let checkout: CheckoutRequest = serde_json::from_str(
            r#"{"memberId":"m-1","storeLocation":"Downtown","photoIds":["p-1","p-2"]}"#,
        )
        .unwrap();
        assert_eq!(checkout.member_id, "m-1");
        assert_eq!(checkout.store_location, "Downtown");
        assert_eq!(checkout.photo_ids, vec!["p-1", "p-2"]);

        let ret: ReturnRequest =
            serde_json::from_str(r#"{"memberId":"m-1","loanId":"l-1"}"#).unwrap();
        assert_eq!(ret.loan_id, "l-1");

        let swap: SwapRequest = serde_json::from_str(
            r#"{"member_id":"m-1","loanId":"l-1","storeLocation":"A","photo_ids":["p-3"]}"#,
        )
        .unwrap();
        assert_eq!(swap.loan_id, "l-1");
        assert_eq!(swap.store_location, "A");
    }
}

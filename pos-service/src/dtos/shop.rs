use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Customer;
use crate::services::UserDetailsPatch;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDetailsRequest {
    #[validate(length(max = 100, message = "Shop name is too long"))]
    pub shop_name: Option<String>,
    #[validate(length(max = 20, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 300, message = "Address is too long"))]
    pub address: Option<String>,
}

impl From<UpdateUserDetailsRequest> for UserDetailsPatch {
    fn from(req: UpdateUserDetailsRequest) -> Self {
        Self {
            shop_name: req.shop_name,
            phone: req.phone,
            address: req.address,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 20, message = "Phone must be 1-20 characters"))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: customer.name,
            phone: customer.phone,
            created_at: customer.created_at,
        }
    }
}

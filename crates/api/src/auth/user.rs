use infra::{
    db::Db,
    repos::{business_owners, users, UserRole},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessAdminProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub bank_code: String,
    pub account_number: String,
    pub account_holder_name: String,
}

/// An authenticated user, resolved to its role-specific profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    Customer(CustomerProfile),
    BusinessAdmin(BusinessAdminProfile),
}

/// Load the local profile for an identity. `None` when the user has not
/// completed registration for their role.
pub async fn load_user(db: &Db, user_id: Uuid) -> Result<Option<User>, AppError> {
    let Some(row) = users::get_by_id(db, user_id).await? else {
        return Ok(None);
    };

    let user = match row.role {
        UserRole::Customer => {
            if !users::is_customer(db, row.id).await? {
                return Ok(None);
            }
            User::Customer(CustomerProfile {
                id: row.id,
                email: row.email,
                name: row.name,
                phone: row.phone,
            })
        }
        UserRole::BusinessAdmin => {
            let Some(owner) = business_owners::get(db, row.id).await? else {
                return Ok(None);
            };
            User::BusinessAdmin(BusinessAdminProfile {
                id: row.id,
                email: row.email,
                name: row.name,
                phone: row.phone,
                bank_code: owner.bank_code,
                account_number: owner.account_number,
                account_holder_name: owner.account_holder_name,
            })
        }
    };

    Ok(Some(user))
}

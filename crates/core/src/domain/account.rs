use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Caller classification used only for ACCOUNT_TYPE discount eligibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Student,
    Enterprise,
    Startup,
    Individual,
}

/// Identity of the user driving a store operation.
///
/// Passed explicitly to every quote operation rather than read from ambient
/// state, so access control stays testable in isolation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
    pub account_type: AccountType,
}

impl Caller {
    pub fn owns(&self, owner: &UserId) -> bool {
        self.user_id == *owner
    }

    /// Admins may act on any quote; everyone else only on their own.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.is_admin || self.owns(owner)
    }
}

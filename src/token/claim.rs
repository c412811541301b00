use serde::{Deserialize, Serialize};

pub const ROLE: &str = "role";
pub const NAME_IDENTIFIER: &str = "nameidentifier";

/// A (type, value) assertion carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(ROLE, name)
    }

    pub fn name_identifier(value: impl Into<String>) -> Self {
        Self::new(NAME_IDENTIFIER, value)
    }

    pub fn is_role(&self, name: &str) -> bool {
        self.claim_type == ROLE && self.value == name
    }
}

use serde::{Deserialize, Serialize};

/// A network interface bound to a security group, indicating active use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub eni_id: String,
    pub description: String,
    pub private_ip: String,
}

impl Attachment {
    pub fn new(
        eni_id: impl Into<String>,
        description: impl Into<String>,
        private_ip: impl Into<String>,
    ) -> Self {
        Self {
            eni_id: eni_id.into(),
            description: description.into(),
            private_ip: private_ip.into(),
        }
    }
}

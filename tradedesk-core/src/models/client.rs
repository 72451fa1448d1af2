use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Client of a tenant (the customer a quote or invoice is addressed to).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,

    /// Owning tenant
    pub tenant_id: Uuid,

    pub first_name: String,

    pub last_name: String,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Contact fields denormalized into document responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClientSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<Client> for ClientSummary {
    fn from(client: Client) -> Self {
        ClientSummary {
            id: client.id,
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone: client.phone,
        }
    }
}

/// Client creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateClient {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,
}

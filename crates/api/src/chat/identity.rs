//! Identity lookup collaborator
//!
//! Maps an authenticated user id and role to profile data (display name,
//! avatar, expertise). The real directory lives outside this service; the
//! default implementation derives a deterministic name so the coordinator
//! works standalone.

use async_trait::async_trait;
use uuid::Uuid;

use fixchat_shared::ParticipantRole;

/// Profile data resolved for a connecting user
#[derive(Debug, Clone)]
pub struct Profile {
    pub display_name: String,
    pub avatar: Option<String>,
    pub expertise: Vec<String>,
}

/// External identity/role lookup
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, user_id: Uuid, role: ParticipantRole) -> Profile;
}

/// Fallback directory: role label plus a short id
pub struct StaticDirectory;

#[async_trait]
impl IdentityProvider for StaticDirectory {
    async fn resolve(&self, user_id: Uuid, role: ParticipantRole) -> Profile {
        let label = match role {
            ParticipantRole::Customer => "Customer",
            ParticipantRole::Technician => "Technician",
            ParticipantRole::Admin => "Admin",
            ParticipantRole::Ai => "Assistant",
        };
        let short = user_id.simple().to_string();
        Profile {
            display_name: format!("{label} {}", &short[..8]),
            avatar: None,
            expertise: Vec::new(),
        }
    }
}

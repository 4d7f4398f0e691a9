//! Registration requests from hosts that are not agents yet.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{degrade, require_text, ApiClient, Call};
use crate::error::ApiResult;
use crate::normalize::list_from_value;
use crate::types::{AgentId, RegistrationRequest, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Approval {
    pub agent_id: AgentId,
}

impl ApiClient {
    pub async fn try_pending_registrations(&self) -> ApiResult<Vec<RegistrationRequest>> {
        let value = self.fetch(Call::get("registrations/pending/")).await?;
        Ok(list_from_value(value))
    }

    pub async fn pending_registrations(&self) -> Vec<RegistrationRequest> {
        degrade(
            "pending registrations",
            self.try_pending_registrations().await,
            Vec::new,
        )
    }

    /// Approve a request; the backend creates the agent and returns its id.
    pub async fn approve_registration(&self, id: RequestId) -> ApiResult<Approval> {
        let approval: Approval = self
            .fetch_as(Call::post(format!("registrations/{id}/approve/")))
            .await?;
        info!(request = id, agent = approval.agent_id, "registration approved");
        Ok(approval)
    }

    /// Reject a request. Blank notes are refused before anything is sent.
    pub async fn reject_registration(&self, id: RequestId, notes: &str) -> ApiResult<()> {
        let notes = require_text(notes, "reason for rejection")?;
        self.fetch(Call::post(format!("registrations/{id}/reject/")).json(json!({ "notes": notes })))
            .await?;
        info!(request = id, "registration rejected");
        Ok(())
    }
}

//! Agents: listing, summary counters and the approve/disapprove/activate actions.

use serde_json::json;
use tracing::info;

use super::{degrade, require_text, ApiClient, Call};
use crate::error::ApiResult;
use crate::normalize::list_from_value;
use crate::types::{Agent, AgentId, AgentStats};

impl ApiClient {
    pub async fn try_list_agents(&self) -> ApiResult<Vec<Agent>> {
        let value = self.fetch(Call::get("agents/")).await?;
        Ok(list_from_value(value))
    }

    /// Always resolves; `[]` when the backend cannot be read.
    pub async fn list_agents(&self) -> Vec<Agent> {
        degrade("agents", self.try_list_agents().await, Vec::new)
    }

    pub async fn try_agent_stats(&self) -> ApiResult<AgentStats> {
        let value = self.fetch(Call::get("agents/stats/")).await?;
        // the stats view answers 200 with zeros and an `error` key on failure
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    pub async fn agent_stats(&self) -> AgentStats {
        degrade("agent stats", self.try_agent_stats().await, AgentStats::default)
    }

    /// Re-approve an agent that was previously disapproved.
    pub async fn approve_agent(&self, id: AgentId) -> ApiResult<()> {
        self.fetch(Call::post(format!("agents/{id}/approve/"))).await?;
        info!(agent = id, "agent approved");
        Ok(())
    }

    /// Demote an approved agent back to the pending-approval queue.
    pub async fn disapprove_agent(&self, id: AgentId, reason: &str) -> ApiResult<()> {
        let reason = require_text(reason, "reason for disapproval")?;
        self.fetch(Call::post(format!("agents/{id}/disapprove/")).json(json!({ "reason": reason })))
            .await?;
        info!(agent = id, "agent disapproved");
        Ok(())
    }

    pub async fn activate_agent(&self, id: AgentId) -> ApiResult<()> {
        self.fetch(Call::post(format!("agents/{id}/activate/"))).await?;
        Ok(())
    }

    pub async fn deactivate_agent(&self, id: AgentId) -> ApiResult<()> {
        self.fetch(Call::post(format!("agents/{id}/deactivate/"))).await?;
        Ok(())
    }
}

//! Registration and agent approval queues.
//!
//! New hosts arrive as registration requests and are either approved (the
//! backend creates an agent) or rejected, both final. Existing agents can be
//! disapproved with a reason, which puts them back in the pending-approval
//! queue until approved again.

use std::collections::BTreeMap;

use tracing::info;

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::types::{Agent, AgentId, RegistrationRequest, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Approved { agent_id: AgentId },
    Rejected,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestState::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentApproval {
    Approved,
    PendingApproval,
}

impl AgentApproval {
    pub fn of(agent: &Agent) -> Self {
        if agent.is_approved {
            AgentApproval::Approved
        } else {
            AgentApproval::PendingApproval
        }
    }
}

/// What a reason draft will be submitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonTarget {
    Reject(RequestId),
    Disapprove(AgentId),
}

impl ReasonTarget {
    pub fn title(self) -> String {
        match self {
            ReasonTarget::Reject(id) => format!("Reject registration #{id}"),
            ReasonTarget::Disapprove(id) => format!("Disapprove agent #{id}"),
        }
    }
}

/// Modal text held until submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonDraft {
    pub target: ReasonTarget,
    pub text: String,
    /// Inline validation or server message shown under the input.
    pub error: Option<String>,
}

impl ReasonDraft {
    fn new(target: ReasonTarget) -> Self {
        Self {
            target,
            text: String::new(),
            error: None,
        }
    }

    /// Blank reasons are refused here, before any request exists.
    pub fn validate(&self) -> ApiResult<String> {
        let text = self.text.trim();
        if text.is_empty() {
            let what = match self.target {
                ReasonTarget::Reject(_) => "reason for rejection",
                ReasonTarget::Disapprove(_) => "reason for disapproval",
            };
            return Err(ApiError::validation(format!("Please provide a {what}")));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApprovalQueues {
    requests: Vec<RegistrationRequest>,
    pending_agents: Vec<Agent>,
    approved_agents: Vec<Agent>,
    decided: BTreeMap<RequestId, RequestState>,
    draft: Option<ReasonDraft>,
}

impl ApprovalQueues {
    pub fn from_parts(requests: Vec<RegistrationRequest>, agents: Vec<Agent>) -> Self {
        let mut queues = Self::default();
        queues.replace(requests, agents);
        queues
    }

    fn replace(&mut self, requests: Vec<RegistrationRequest>, agents: Vec<Agent>) {
        let (approved, pending): (Vec<Agent>, Vec<Agent>) =
            agents.into_iter().partition(|a| a.is_approved);
        // the backend's pending list may lag behind decisions made here
        self.requests = requests
            .into_iter()
            .filter(|r| !self.decided.contains_key(&r.id))
            .collect();
        self.pending_agents = pending;
        self.approved_agents = approved;
    }

    /// Reload both queues. Reads degrade, so a backend outage empties them.
    pub async fn load(&mut self, client: &ApiClient) {
        let (requests, agents) = tokio::join!(client.pending_registrations(), client.list_agents());
        self.replace(requests, agents);
    }

    pub fn requests(&self) -> &[RegistrationRequest] {
        &self.requests
    }

    pub fn pending_agents(&self) -> &[Agent] {
        &self.pending_agents
    }

    pub fn approved_agents(&self) -> &[Agent] {
        &self.approved_agents
    }

    pub fn request_state(&self, id: RequestId) -> RequestState {
        self.decided
            .get(&id)
            .copied()
            .unwrap_or(RequestState::Pending)
    }

    fn ensure_pending(&self, id: RequestId) -> ApiResult<()> {
        if self.request_state(id).is_terminal() {
            return Err(ApiError::validation(format!(
                "Registration #{id} was already decided"
            )));
        }
        Ok(())
    }

    pub async fn approve_request(&mut self, client: &ApiClient, id: RequestId) -> ApiResult<AgentId> {
        self.ensure_pending(id)?;
        let approval = client.approve_registration(id).await?;
        self.record_request(id, RequestState::Approved {
            agent_id: approval.agent_id,
        });
        Ok(approval.agent_id)
    }

    pub async fn approve_agent(&mut self, client: &ApiClient, id: AgentId) -> ApiResult<()> {
        client.approve_agent(id).await?;
        self.record_agent(id, true);
        Ok(())
    }

    // ---- reason modal ----

    pub fn draft(&self) -> Option<&ReasonDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut ReasonDraft> {
        self.draft.as_mut()
    }

    pub fn begin_reject(&mut self, id: RequestId) -> ApiResult<()> {
        self.ensure_pending(id)?;
        self.draft = Some(ReasonDraft::new(ReasonTarget::Reject(id)));
        Ok(())
    }

    pub fn begin_disapprove(&mut self, id: AgentId) {
        self.draft = Some(ReasonDraft::new(ReasonTarget::Disapprove(id)));
    }

    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    /// Submit the open draft. Blank text stays in the modal with an inline
    /// message; server errors do too. Success closes the modal and moves the
    /// item out of its queue.
    pub async fn submit_draft(&mut self, client: &ApiClient) -> ApiResult<()> {
        let Some(draft) = self.draft.as_mut() else {
            return Err(ApiError::validation("Nothing to submit"));
        };
        let reason = match draft.validate() {
            Ok(reason) => reason,
            Err(e) => {
                draft.error = Some(e.user_message());
                return Err(e);
            }
        };
        let target = draft.target;
        let result = match target {
            ReasonTarget::Reject(id) => client.reject_registration(id, &reason).await,
            ReasonTarget::Disapprove(id) => client.disapprove_agent(id, &reason).await,
        };
        if let Err(e) = result {
            if let Some(draft) = self.draft.as_mut() {
                draft.error = Some(e.user_message());
            }
            return Err(e);
        }
        match target {
            ReasonTarget::Reject(id) => self.record_request(id, RequestState::Rejected),
            ReasonTarget::Disapprove(id) => self.record_agent(id, false),
        }
        self.draft = None;
        Ok(())
    }

    fn record_request(&mut self, id: RequestId, state: RequestState) {
        self.requests.retain(|r| r.id != id);
        self.decided.insert(id, state);
        info!(request = id, ?state, "registration decided");
    }

    // Move an agent between the approved and pending queues.
    fn record_agent(&mut self, id: AgentId, approved: bool) {
        let (from, to) = if approved {
            (&mut self.pending_agents, &mut self.approved_agents)
        } else {
            (&mut self.approved_agents, &mut self.pending_agents)
        };
        if let Some(pos) = from.iter().position(|a| a.id == id) {
            let mut agent = from.remove(pos);
            agent.is_approved = approved;
            to.push(agent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientConfig;
    use serde_json::json;

    fn request(id: i64) -> RegistrationRequest {
        serde_json::from_value(json!({"id": id, "hostname": format!("new{id}")})).unwrap()
    }

    fn agent(id: i64, approved: bool) -> Agent {
        serde_json::from_value(json!({
            "id": id, "hostname": format!("h{id}"), "is_approved": approved
        }))
        .unwrap()
    }

    // Nothing listens here; any request that escapes fails as Transport.
    fn offline_client() -> ApiClient {
        ApiClient::new(ClientConfig::new("http://127.0.0.1:9/api")).unwrap()
    }

    #[test]
    fn agents_split_by_approval() {
        let q = ApprovalQueues::from_parts(
            vec![request(1)],
            vec![agent(10, true), agent(11, false), agent(12, true)],
        );
        assert_eq!(q.requests().len(), 1);
        assert_eq!(q.pending_agents().len(), 1);
        assert_eq!(q.approved_agents().len(), 2);
        assert_eq!(AgentApproval::of(&q.pending_agents()[0]), AgentApproval::PendingApproval);
    }

    #[test]
    fn disapproval_demotes_and_approval_restores() {
        let mut q = ApprovalQueues::from_parts(vec![], vec![agent(10, true)]);
        q.record_agent(10, false);
        assert!(q.approved_agents().is_empty());
        assert!(!q.pending_agents()[0].is_approved);

        q.record_agent(10, true);
        assert!(q.pending_agents().is_empty());
        assert_eq!(AgentApproval::of(&q.approved_agents()[0]), AgentApproval::Approved);
    }

    #[test]
    fn decided_requests_are_terminal() {
        let mut q = ApprovalQueues::from_parts(vec![request(1), request(2)], vec![]);
        q.record_request(1, RequestState::Rejected);
        assert_eq!(q.requests().len(), 1);
        assert_eq!(q.request_state(1), RequestState::Rejected);
        assert!(q.begin_reject(1).is_err());
        assert_eq!(q.request_state(2), RequestState::Pending);
    }

    #[test]
    fn reload_keeps_decided_requests_out() {
        let mut q = ApprovalQueues::from_parts(vec![request(1), request(2)], vec![]);
        q.record_request(1, RequestState::Rejected);
        q.record_request(2, RequestState::Approved { agent_id: 20 });

        q.replace(vec![request(1), request(2), request(3)], vec![]);
        let ids: Vec<_> = q.requests().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(q.request_state(1), RequestState::Rejected);
    }

    #[tokio::test]
    async fn blank_reason_stays_in_modal() {
        let client = offline_client();
        let mut q = ApprovalQueues::from_parts(vec![request(42)], vec![]);
        q.begin_reject(42).unwrap();
        q.draft_mut().unwrap().text = "   ".into();

        let err = q.submit_draft(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let draft = q.draft().unwrap();
        assert_eq!(
            draft.error.as_deref(),
            Some("Please provide a reason for rejection")
        );
        assert_eq!(q.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft_and_queue() {
        let client = offline_client();
        let mut q = ApprovalQueues::from_parts(vec![], vec![agent(5, true)]);
        q.begin_disapprove(5);
        q.draft_mut().unwrap().text = "compromised host".into();

        let err = q.submit_draft(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(q.draft().unwrap().error.is_some());
        assert_eq!(q.approved_agents().len(), 1);
    }

    #[tokio::test]
    async fn submit_without_draft_is_refused() {
        let mut q = ApprovalQueues::default();
        assert!(q.submit_draft(&offline_client()).await.is_err());
    }
}

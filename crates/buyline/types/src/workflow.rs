//! Workflow steps, decisions, and object-to-step mappings
//!
//! A workflow step is a durable human task. Steps are linked to the
//! domain objects they act on through `ObjectWorkflowMapping` rows so
//! that either side can be found from the other.

use crate::ids::{MediaBuyId, PrincipalId, TenantId, WorkflowStepId};
use crate::request::{MediaBuyRequest, PackageSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of human task a step represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Approve or reject an operation prepared by the system
    Approval,
    /// Create something on behalf of the system
    Creation,
    /// Perform work entirely outside the system, then confirm
    ManualTask,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Approval => "approval",
            StepType::Creation => "creation",
            StepType::ManualTask => "manual_task",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "approval" => Some(StepType::Approval),
            "creation" => Some(StepType::Creation),
            "manual_task" => Some(StepType::ManualTask),
            _ => None,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStepStatus {
    /// Queued but not yet ready for a decision
    Pending,
    /// Waiting on a human decision
    RequiresApproval,
    Approved,
    Rejected,
    Completed,
    Failed,
}

impl WorkflowStepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStepStatus::Pending => "pending",
            WorkflowStepStatus::RequiresApproval => "requires_approval",
            WorkflowStepStatus::Approved => "approved",
            WorkflowStepStatus::Rejected => "rejected",
            WorkflowStepStatus::Completed => "completed",
            WorkflowStepStatus::Failed => "failed",
        }
    }

    /// Accepts the legacy spelling `approval` for `requires_approval`,
    /// which older writers persisted.
    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(WorkflowStepStatus::Pending),
            "requires_approval" | "approval" => Some(WorkflowStepStatus::RequiresApproval),
            "approved" => Some(WorkflowStepStatus::Approved),
            "rejected" => Some(WorkflowStepStatus::Rejected),
            "completed" => Some(WorkflowStepStatus::Completed),
            "failed" => Some(WorkflowStepStatus::Failed),
            _ => None,
        }
    }

    /// Only steps in this state accept an approve/reject decision.
    pub fn awaits_decision(&self) -> bool {
        matches!(self, WorkflowStepStatus::RequiresApproval)
    }
}

impl fmt::Display for WorkflowStepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Human decision applied to a step awaiting approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Reject => "reject",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "approve" => Some(DecisionAction::Approve),
            "reject" => Some(DecisionAction::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a step's append-only comment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepComment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Machine-readable request detail carried by a step.
///
/// The payload tells a human operator exactly what is being asked of
/// them, and tells the executor which external side effect an approval
/// unlocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRequestPayload {
    /// An order already exists on the ad server and needs a go/no-go
    /// before activation.
    ActivationApproval {
        media_buy_id: MediaBuyId,
        external_order_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_url: Option<String>,
        packages: Vec<PackageSummary>,
    },
    /// Nothing was created automatically; a human sets up the order
    /// from the replayed request and then approves the step.
    ManualCreation {
        media_buy_id: MediaBuyId,
        request: MediaBuyRequest,
    },
}

impl StepRequestPayload {
    pub fn media_buy_id(&self) -> &MediaBuyId {
        match self {
            StepRequestPayload::ActivationApproval { media_buy_id, .. } => media_buy_id,
            StepRequestPayload::ManualCreation { media_buy_id, .. } => media_buy_id,
        }
    }
}

/// Durable human task record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: WorkflowStepId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    pub step_type: StepType,
    pub status: WorkflowStepStatus,
    /// Role expected to action the step, e.g. `publisher`.
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Human-readable summary of what is being asked.
    pub instructions: String,
    pub request: StepRequestPayload,
    pub comments: Vec<StepComment>,
    /// Optimistic concurrency token, incremented on every decision.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowStep {
    /// Build a step that immediately awaits a human decision.
    pub fn awaiting_approval(
        tenant_id: TenantId,
        principal_id: PrincipalId,
        step_type: StepType,
        owner: impl Into<String>,
        instructions: impl Into<String>,
        request: StepRequestPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkflowStepId::generate(),
            tenant_id,
            principal_id,
            step_type,
            status: WorkflowStepStatus::RequiresApproval,
            owner: owner.into(),
            assignee: None,
            instructions: instructions.into(),
            request,
            comments: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Domain-object side of a step link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    MediaBuy,
    Creative,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::MediaBuy => "media_buy",
            ObjectType::Creative => "creative",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "media_buy" => Some(ObjectType::MediaBuy),
            "creative" => Some(ObjectType::Creative),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation a step performs on its linked object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Create,
    Activate,
    Approve,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::Create => "create",
            WorkflowAction::Activate => "activate",
            WorkflowAction::Approve => "approve",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(WorkflowAction::Create),
            "activate" => Some(WorkflowAction::Activate),
            "approve" => Some(WorkflowAction::Approve),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Link between a domain object and the step acting on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectWorkflowMapping {
    pub object_type: ObjectType,
    /// Display form of the object id, e.g. `mb:<uuid>`.
    pub object_id: String,
    pub step_id: WorkflowStepId,
    pub action: WorkflowAction,
    pub created_at: DateTime<Utc>,
}

impl ObjectWorkflowMapping {
    pub fn for_media_buy(
        media_buy_id: &MediaBuyId,
        step_id: WorkflowStepId,
        action: WorkflowAction,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            object_type: ObjectType::MediaBuy,
            object_id: media_buy_id.to_string(),
            step_id,
            action,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_parse_accepts_legacy_spelling() {
        assert_eq!(
            WorkflowStepStatus::parse_str("approval"),
            Some(WorkflowStepStatus::RequiresApproval)
        );
        assert_eq!(
            WorkflowStepStatus::parse_str("requires_approval"),
            Some(WorkflowStepStatus::RequiresApproval)
        );
        assert_eq!(WorkflowStepStatus::parse_str("on_hold"), None);
    }

    #[test]
    fn test_only_requires_approval_awaits_decision() {
        assert!(WorkflowStepStatus::RequiresApproval.awaits_decision());
        for status in [
            WorkflowStepStatus::Pending,
            WorkflowStepStatus::Approved,
            WorkflowStepStatus::Rejected,
            WorkflowStepStatus::Completed,
            WorkflowStepStatus::Failed,
        ] {
            assert!(!status.awaits_decision());
        }
    }

    #[test]
    fn test_payload_tag_is_preserved_in_json() {
        let payload = StepRequestPayload::ActivationApproval {
            media_buy_id: MediaBuyId::generate(),
            external_order_id: "ord-42".to_string(),
            order_url: None,
            packages: vec![],
        };
        let raw = serde_json::to_value(&payload).unwrap();
        assert_eq!(raw["kind"], "activation_approval");
        let parsed: StepRequestPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_new_step_awaits_approval_at_version_one() {
        let payload = StepRequestPayload::ActivationApproval {
            media_buy_id: MediaBuyId::generate(),
            external_order_id: "ord-7".to_string(),
            order_url: None,
            packages: vec![],
        };
        let step = WorkflowStep::awaiting_approval(
            TenantId::new("default"),
            PrincipalId::new("buyer-1"),
            StepType::Approval,
            "publisher",
            "Review order ord-7 before activation",
            payload,
            Utc::now(),
        );
        assert_eq!(step.status, WorkflowStepStatus::RequiresApproval);
        assert_eq!(step.version, 1);
        assert!(step.comments.is_empty());
    }
}

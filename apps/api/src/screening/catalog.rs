//! Requirement catalogue — the closed set of roles a resume can be screened against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role '{0}'")]
pub struct UnknownRoleError(pub String);

/// Role identifier. Adding a role means adding a variant and its requirements block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleId {
    AiMlEngineer,
    FrontendEngineer,
    BackendEngineer,
}

impl RoleId {
    pub const ALL: [RoleId; 3] = [
        RoleId::AiMlEngineer,
        RoleId::FrontendEngineer,
        RoleId::BackendEngineer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleId::AiMlEngineer => "ai_ml_engineer",
            RoleId::FrontendEngineer => "frontend_engineer",
            RoleId::BackendEngineer => "backend_engineer",
        }
    }

    pub fn requirements(self) -> &'static str {
        match self {
            RoleId::AiMlEngineer => AI_ML_ENGINEER,
            RoleId::FrontendEngineer => FRONTEND_ENGINEER,
            RoleId::BackendEngineer => BACKEND_ENGINEER,
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleId {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleId::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRoleError(s.to_string()))
    }
}

/// Looks up the requirements block for a role id.
pub fn requirements_for(role_id: &str) -> Result<&'static str, UnknownRoleError> {
    role_id.parse::<RoleId>().map(RoleId::requirements)
}

/// Every role with its requirements, in catalogue order.
pub fn roles() -> impl Iterator<Item = (RoleId, &'static str)> {
    RoleId::ALL.into_iter().map(|r| (r, r.requirements()))
}

const AI_ML_ENGINEER: &str = "\
Required Skills:
- Python, PyTorch/TensorFlow
- Machine Learning algorithms and frameworks
- Deep Learning and Neural Networks
- Data preprocessing and analysis
- MLOps and model deployment
- RAG, LLM, Finetuning and Prompt Engineering";

const FRONTEND_ENGINEER: &str = "\
Required Skills:
- React/Vue.js/Angular
- HTML5, CSS3, JavaScript/TypeScript
- Responsive design
- State management
- Frontend testing";

const BACKEND_ENGINEER: &str = "\
Required Skills:
- Python/Java/Node.js
- REST APIs
- Database design and management
- System architecture
- Cloud services (AWS/GCP/Azure)
- Kubernetes, Docker, CI/CD";

//! Operation types, operation statuses and the call-method whitelist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MeridianError, MeridianResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(rename = "System__Transfer")]
    NativeTransfer,
    #[serde(rename = "SplToken__Transfer")]
    TokenTransfer,
    #[serde(rename = "Reward")]
    Reward,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl OperationType {
    pub const ALL: [OperationType; 4] = [
        OperationType::NativeTransfer,
        OperationType::TokenTransfer,
        OperationType::Reward,
        OperationType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::NativeTransfer => "System__Transfer",
            OperationType::TokenTransfer => "SplToken__Transfer",
            OperationType::Reward => "Reward",
            OperationType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = MeridianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MeridianError::UnsupportedOperationType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 2] = [OperationStatus::Success, OperationStatus::Failure];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "SUCCESS",
            OperationStatus::Failure => "FAILURE",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, OperationStatus::Success)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps the native execution result onto a status. Only an explicit `true`
/// is a success.
pub fn classify_status(native_success: bool) -> OperationStatus {
    if native_success {
        OperationStatus::Success
    } else {
        OperationStatus::Failure
    }
}

/// Status entry as advertised to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDescriptor {
    pub status: OperationStatus,
    pub successful: bool,
}

pub const GET_PROGRAM_ACCOUNTS: &str = "getProgramAccounts";
pub const GET_CLUSTER_NODES: &str = "getClusterNodes";

/// The closed tables the translator and the API boundary agree on.
///
/// Built once at startup and handed to the classifier and assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    operation_types: Vec<OperationType>,
    operation_statuses: Vec<OperationStatus>,
    call_methods: Vec<&'static str>,
}

impl Taxonomy {
    pub fn new(
        operation_types: Vec<OperationType>,
        operation_statuses: Vec<OperationStatus>,
        call_methods: Vec<&'static str>,
    ) -> Self {
        Self {
            operation_types,
            operation_statuses,
            call_methods,
        }
    }

    pub fn solana() -> Self {
        Self::new(
            OperationType::ALL.to_vec(),
            OperationStatus::ALL.to_vec(),
            vec![GET_PROGRAM_ACCOUNTS, GET_CLUSTER_NODES],
        )
    }

    pub fn operation_types(&self) -> &[OperationType] {
        &self.operation_types
    }

    pub fn operation_statuses(&self) -> &[OperationStatus] {
        &self.operation_statuses
    }

    pub fn status_descriptors(&self) -> Vec<StatusDescriptor> {
        self.operation_statuses
            .iter()
            .map(|status| StatusDescriptor {
                status: *status,
                successful: status.is_successful(),
            })
            .collect()
    }

    pub fn call_methods(&self) -> &[&'static str] {
        &self.call_methods
    }

    pub fn supports(&self, op_type: OperationType) -> bool {
        self.operation_types.contains(&op_type)
    }

    /// Narrows `op_type` to what this taxonomy carries. Unlisted types fall
    /// back to `Unknown`.
    pub fn admit(&self, op_type: OperationType) -> OperationType {
        if self.supports(op_type) {
            op_type
        } else {
            OperationType::Unknown
        }
    }

    pub fn validate_operation_type(&self, name: &str) -> MeridianResult<OperationType> {
        let op_type: OperationType = name.parse()?;
        if self.supports(op_type) {
            Ok(op_type)
        } else {
            Err(MeridianError::UnsupportedOperationType(name.to_string()))
        }
    }

    pub fn validate_operation_status(&self, name: &str) -> MeridianResult<OperationStatus> {
        self.operation_statuses
            .iter()
            .copied()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| MeridianError::UnsupportedOperationStatus(name.to_string()))
    }

    /// Returns the whitelisted spelling of `method`.
    pub fn validate_call_method(&self, method: &str) -> MeridianResult<&'static str> {
        self.call_methods
            .iter()
            .copied()
            .find(|m| *m == method)
            .ok_or_else(|| MeridianError::UnsupportedCallMethod(method.to_string()))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::solana()
    }
}

//! Task and sub-task type codes.

use super::SubTaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work order a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// New gas connection construction (`01`).
    #[serde(rename = "01")]
    Construction,
    /// Debt management visits (`02`).
    #[serde(rename = "02")]
    DebtManagement,
    /// Technical support visits (`03`).
    #[serde(rename = "03")]
    TechnicalSupport,
    /// Complaint handling visits (`04`).
    #[serde(rename = "04")]
    ComplainHandling,
}

impl TaskType {
    /// Returns the two-digit type code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Construction => "01",
            Self::DebtManagement => "02",
            Self::TechnicalSupport => "03",
            Self::ComplainHandling => "04",
        }
    }
}

impl TryFrom<&str> for TaskType {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "01" => Ok(Self::Construction),
            "02" => Ok(Self::DebtManagement),
            "03" => Ok(Self::TechnicalSupport),
            "04" => Ok(Self::ComplainHandling),
            _ => Err(SubTaskDomainError::UnknownTaskType(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of field work a sub-task represents, keyed by its full type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubTaskType {
    /// Household installation, "sambungan kompor" (`01-01`).
    #[serde(rename = "01-01")]
    Sk,
    /// Service line, "sambungan rumah" (`01-02`).
    #[serde(rename = "01-02")]
    Sr,
    /// Meter installation (`01-03`).
    #[serde(rename = "01-03")]
    MeterInstallation,
    /// First gas flow into the installation (`01-04`).
    #[serde(rename = "01-04")]
    GasIn,
    /// Stop gas flow for unpaid debt (`02-01`).
    #[serde(rename = "02-01")]
    StopGasFlow,
    /// Remove the gas meter for unpaid debt (`02-02`).
    #[serde(rename = "02-02")]
    RemoveGasMeter,
    /// Reopen gas flow after settlement (`02-03`).
    #[serde(rename = "02-03")]
    OpenGasFlow,
    /// Reinstall the gas meter after settlement (`02-04`).
    #[serde(rename = "02-04")]
    ReinstallGasMeter,
}

impl SubTaskType {
    /// Every sub-task type.
    pub const ALL: [Self; 8] = [
        Self::Sk,
        Self::Sr,
        Self::MeterInstallation,
        Self::GasIn,
        Self::StopGasFlow,
        Self::RemoveGasMeter,
        Self::OpenGasFlow,
        Self::ReinstallGasMeter,
    ];

    /// Sub-task types a construction task is split into.
    pub const CONSTRUCTION: [Self; 4] = [Self::Sk, Self::Sr, Self::MeterInstallation, Self::GasIn];

    /// Returns the full type code, e.g. `01-03`.
    #[must_use]
    pub const fn full_code(self) -> &'static str {
        match self {
            Self::Sk => "01-01",
            Self::Sr => "01-02",
            Self::MeterInstallation => "01-03",
            Self::GasIn => "01-04",
            Self::StopGasFlow => "02-01",
            Self::RemoveGasMeter => "02-02",
            Self::OpenGasFlow => "02-03",
            Self::ReinstallGasMeter => "02-04",
        }
    }

    /// Returns the task type this sub-task type belongs to.
    #[must_use]
    pub const fn task_type(self) -> TaskType {
        match self {
            Self::Sk | Self::Sr | Self::MeterInstallation | Self::GasIn => TaskType::Construction,
            Self::StopGasFlow
            | Self::RemoveGasMeter
            | Self::OpenGasFlow
            | Self::ReinstallGasMeter => TaskType::DebtManagement,
        }
    }
}

impl TryFrom<&str> for SubTaskType {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.full_code() == trimmed)
            .ok_or_else(|| SubTaskDomainError::UnknownSubTaskType(value.to_owned()))
    }
}

impl fmt::Display for SubTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_code())
    }
}

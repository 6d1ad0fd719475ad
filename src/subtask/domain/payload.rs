//! Typed report payloads filed with each transition.
//!
//! Activity notes accompany operational steps such as pick, pause, or verify.
//! Form reports carry the sub-task-type-specific measurements a field
//! executor submits when finishing work, and are validated against the
//! sub-task type before anything is persisted.

use super::{SubTaskDomainError, SubTaskType, TaskType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MAX_NOTES_CHARS: usize = 2000;

/// Report payload attached to a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    /// Free-form note for an operational step.
    Activity(ActivityReport),
    /// Household installation form.
    Sk(SkReport),
    /// Service line form.
    Sr(SrReport),
    /// Meter installation form.
    MeterInstallation(MeterInstallationReport),
    /// Gas-in form.
    GasIn(GasInReport),
    /// Debt handling visit form.
    DebtHandling(DebtHandlingReport),
}

impl Default for ReportPayload {
    fn default() -> Self {
        Self::Activity(ActivityReport::default())
    }
}

impl ReportPayload {
    /// Returns the payload variant name.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Activity(_) => "activity",
            Self::Sk(_) => "sk",
            Self::Sr(_) => "sr",
            Self::MeterInstallation(_) => "meter_installation",
            Self::GasIn(_) => "gas_in",
            Self::DebtHandling(_) => "debt_handling",
        }
    }

    /// Returns `true` for sub-task-type form reports.
    #[must_use]
    pub const fn is_form(&self) -> bool {
        !matches!(self, Self::Activity(_))
    }

    /// Validates the payload against the sub-task it is filed for.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskDomainError::PayloadTypeMismatch`] when a form does
    /// not belong to the sub-task type, or
    /// [`SubTaskDomainError::InvalidReportField`] when a field is out of
    /// range.
    pub fn validate_for(&self, sub_task_type: SubTaskType) -> Result<(), SubTaskDomainError> {
        let matches_type = match self {
            Self::Activity(_) => true,
            Self::Sk(_) => sub_task_type == SubTaskType::Sk,
            Self::Sr(_) => sub_task_type == SubTaskType::Sr,
            Self::MeterInstallation(_) => sub_task_type == SubTaskType::MeterInstallation,
            Self::GasIn(_) => sub_task_type == SubTaskType::GasIn,
            Self::DebtHandling(_) => sub_task_type.task_type() == TaskType::DebtManagement,
        };
        if !matches_type {
            return Err(SubTaskDomainError::PayloadTypeMismatch {
                payload: self.variant_name(),
                sub_task_type: sub_task_type.full_code(),
            });
        }

        match self {
            Self::Activity(report) => report.validate(),
            Self::Sk(report) => report.validate(),
            Self::Sr(report) => report.validate(),
            Self::MeterInstallation(report) => report.validate(),
            Self::GasIn(report) => report.validate(),
            Self::DebtHandling(report) => report.validate(),
        }
    }
}

/// Note and optional position recorded for an operational step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Position of the actor when acting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,
    /// Additional caller-defined attributes, stored verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl ActivityReport {
    /// Creates an activity report carrying a note.
    #[must_use]
    pub fn note(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }

    /// Adds a caller-defined attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<(), SubTaskDomainError> {
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_CHARS {
                return Err(SubTaskDomainError::invalid_field(
                    "notes",
                    format!("must not exceed {MAX_NOTES_CHARS} characters"),
                ));
            }
        }
        self.position.as_ref().map_or(Ok(()), GeoPoint::validate)
    }
}

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SubTaskDomainError::invalid_field(
                "latitude",
                "must be between -90 and 90",
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SubTaskDomainError::invalid_field(
                "longitude",
                "must be between -180 and 180",
            ));
        }
        Ok(())
    }
}

/// Gas appliance connected to an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasAppliance {
    /// Appliance catalogue identifier.
    pub appliance_id: i64,
    /// Number of appliances of this kind.
    pub quantity: u32,
}

/// Meter identity shared by meter-related forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterIdentity {
    /// Meter catalogue identifier.
    pub meter_id: i64,
    /// Meter brand.
    pub meter_brand: String,
    /// Meter serial number.
    pub sn_meter: String,
    /// Meter G-size catalogue identifier.
    pub g_size_id: i64,
}

impl MeterIdentity {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        require_text("meter_brand", &self.meter_brand)?;
        require_text("sn_meter", &self.sn_meter)
    }
}

/// Household installation (`01-01`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkReport {
    /// Installed pipe length in metres.
    pub pipe_length: f64,
    /// Pipe length beyond the contracted allowance, in metres.
    #[serde(default)]
    pub extra_pipe_length: f64,
    /// Pressure test start.
    pub test_start_time: DateTime<Utc>,
    /// Pressure test end.
    pub test_end_time: DateTime<Utc>,
    /// Pressure held during the test, in bar.
    pub test_pressure: f64,
    /// Date the installation was finished.
    pub finished_date: NaiveDate,
    /// Appliances connected.
    #[serde(default)]
    pub gas_appliances: Vec<GasAppliance>,
}

impl SkReport {
    /// Returns the pressure test duration in whole minutes.
    #[must_use]
    pub fn test_duration_minutes(&self) -> i64 {
        (self.test_end_time - self.test_start_time).num_minutes()
    }

    fn validate(&self) -> Result<(), SubTaskDomainError> {
        require_non_negative("pipe_length", self.pipe_length)?;
        require_non_negative("extra_pipe_length", self.extra_pipe_length)?;
        require_test_window(self.test_start_time, self.test_end_time)?;
        require_positive("test_pressure", self.test_pressure)?;
        require_appliances(&self.gas_appliances)
    }
}

/// Service line (`01-02`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrReport {
    /// Tapping saddle catalogue identifier.
    pub tapping_saddle_id: i64,
    /// Free-text saddle description when the catalogue has no match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tapping_saddle_custom: Option<String>,
    /// Pressure test start.
    pub test_start_time: DateTime<Utc>,
    /// Pressure test end.
    pub test_end_time: DateTime<Utc>,
    /// Pressure held during the test, in bar.
    pub test_pressure: f64,
    /// Whether a branch pipe was available on site.
    pub branch_pipe_available: bool,
    /// Date the service line was finished.
    pub finished_date: NaiveDate,
}

impl SrReport {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        if let Some(custom) = &self.tapping_saddle_custom {
            require_text("tapping_saddle_custom", custom)?;
        }
        require_test_window(self.test_start_time, self.test_end_time)?;
        require_positive("test_pressure", self.test_pressure)
    }
}

/// Meter installation (`01-03`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterInstallationReport {
    /// Installed meter.
    pub meter: MeterIdentity,
    /// Minimum flow rate.
    pub qmin: f64,
    /// Maximum flow rate.
    pub qmax: f64,
    /// Maximum working pressure.
    pub pmax: f64,
    /// Calibration start month, 1 to 12.
    pub start_calibration_month: u32,
    /// Calibration start year.
    pub start_calibration_year: i32,
    /// Regulator brand.
    pub regulator_brand: String,
    /// Regulator size in inches, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator_size_inch: Option<f64>,
}

impl MeterInstallationReport {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        self.meter.validate()?;
        require_non_negative("qmin", self.qmin)?;
        require_positive("qmax", self.qmax)?;
        if self.qmin > self.qmax {
            return Err(SubTaskDomainError::invalid_field(
                "qmin",
                "must not exceed qmax",
            ));
        }
        require_positive("pmax", self.pmax)?;
        if !(1..=12).contains(&self.start_calibration_month) {
            return Err(SubTaskDomainError::invalid_field(
                "start_calibration_month",
                "must be between 1 and 12",
            ));
        }
        if self.start_calibration_year < 1900 {
            return Err(SubTaskDomainError::invalid_field(
                "start_calibration_year",
                "must be 1900 or later",
            ));
        }
        require_text("regulator_brand", &self.regulator_brand)?;
        self.regulator_size_inch
            .map_or(Ok(()), |size| require_positive("regulator_size_inch", size))
    }
}

/// Gas-in (`01-04`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasInReport {
    /// Meter gas was let into.
    pub meter: MeterIdentity,
    /// Maximum working pressure.
    pub pmax: f64,
    /// Meter reading at gas-in.
    pub stand_meter_start_number: f64,
    /// Line pressure at gas-in.
    pub pressure_start: f64,
    /// Gas temperature at gas-in, in degrees Celsius.
    pub temperature_start: f64,
    /// Meter position.
    pub meter_location: GeoPoint,
    /// Date of the gas-in.
    pub gas_in_date: NaiveDate,
    /// Appliances connected.
    #[serde(default)]
    pub gas_appliances: Vec<GasAppliance>,
}

impl GasInReport {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        self.meter.validate()?;
        require_positive("pmax", self.pmax)?;
        require_non_negative("stand_meter_start_number", self.stand_meter_start_number)?;
        require_positive("pressure_start", self.pressure_start)?;
        require_finite("temperature_start", self.temperature_start)?;
        self.meter_location.validate()?;
        require_appliances(&self.gas_appliances)
    }
}

/// Debt handling visit (`02-xx`) form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtHandlingReport {
    /// Meter the visit acted on.
    pub meter: MeterIdentity,
    /// Meter reading at the visit.
    pub stand_meter_number: f64,
    /// Line pressure, when measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// Gas temperature, when measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Meter position, when captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Seal number applied to the meter, when sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal_no: Option<String>,
    /// Observed installation condition.
    pub condition: String,
    /// Notes on the observed condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_notes: Option<String>,
}

impl DebtHandlingReport {
    fn validate(&self) -> Result<(), SubTaskDomainError> {
        self.meter.validate()?;
        require_non_negative("stand_meter_number", self.stand_meter_number)?;
        if let Some(pressure) = self.pressure {
            require_positive("pressure", pressure)?;
        }
        if let Some(temperature) = self.temperature {
            require_finite("temperature", temperature)?;
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(seal_no) = &self.seal_no {
            require_text("seal_no", seal_no)?;
        }
        require_text("condition", &self.condition)
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), SubTaskDomainError> {
    if value.trim().is_empty() {
        return Err(SubTaskDomainError::invalid_field(field, "must not be empty"));
    }
    Ok(())
}

fn require_finite(field: &'static str, value: f64) -> Result<(), SubTaskDomainError> {
    if !value.is_finite() {
        return Err(SubTaskDomainError::invalid_field(field, "must be a finite number"));
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), SubTaskDomainError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(SubTaskDomainError::invalid_field(field, "must not be negative"));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), SubTaskDomainError> {
    require_finite(field, value)?;
    if value <= 0.0 {
        return Err(SubTaskDomainError::invalid_field(field, "must be positive"));
    }
    Ok(())
}

fn require_test_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), SubTaskDomainError> {
    if end <= start {
        return Err(SubTaskDomainError::invalid_field(
            "test_end_time",
            "must be after test_start_time",
        ));
    }
    Ok(())
}

fn require_appliances(appliances: &[GasAppliance]) -> Result<(), SubTaskDomainError> {
    if appliances.iter().any(|appliance| appliance.quantity == 0) {
        return Err(SubTaskDomainError::invalid_field(
            "gas_appliances",
            "every appliance needs a positive quantity",
        ));
    }
    Ok(())
}

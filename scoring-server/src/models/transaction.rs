//! Transaction feature record
//!
//! One banking transaction's risk attributes, as posted to `/predict`.
//! Wire names are the column tokens used by the journals store and the
//! training pipeline; Rust names are their English meaning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::Validate;

/// Feature columns in the fixed order the classifier was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "anciennete_jours")]
    AccountAgeDays,
    #[serde(rename = "montant")]
    Amount,
    #[serde(rename = "heure")]
    Hour,
    #[serde(rename = "nouveau_beneficiaire")]
    NewBeneficiary,
    #[serde(rename = "solde_avant")]
    BalanceBefore,
    #[serde(rename = "nb_virements_1h")]
    TransfersLastHour,
    #[serde(rename = "changement_mdp")]
    PasswordChangedRecently,
    #[serde(rename = "minutes_depuis_chg_mdp")]
    MinutesSincePasswordChange,
    #[serde(rename = "localisation")]
    Location,
    #[serde(rename = "nb_virements_vers_benef")]
    TransfersToBeneficiary,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::AccountAgeDays,
        Column::Amount,
        Column::Hour,
        Column::NewBeneficiary,
        Column::BalanceBefore,
        Column::TransfersLastHour,
        Column::PasswordChangedRecently,
        Column::MinutesSincePasswordChange,
        Column::Location,
        Column::TransfersToBeneficiary,
    ];

    /// Wire / column name
    pub fn name(self) -> &'static str {
        match self {
            Column::AccountAgeDays => "anciennete_jours",
            Column::Amount => "montant",
            Column::Hour => "heure",
            Column::NewBeneficiary => "nouveau_beneficiaire",
            Column::BalanceBefore => "solde_avant",
            Column::TransfersLastHour => "nb_virements_1h",
            Column::PasswordChangedRecently => "changement_mdp",
            Column::MinutesSincePasswordChange => "minutes_depuis_chg_mdp",
            Column::Location => "localisation",
            Column::TransfersToBeneficiary => "nb_virements_vers_benef",
        }
    }

    /// Whether the column carries a number (flags count as 0/1)
    pub fn is_numeric(self) -> bool {
        !matches!(self, Column::Location)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete feature record: all ten columns present and typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FeatureRecord {
    #[serde(rename = "anciennete_jours")]
    #[validate(range(min = 0))]
    pub account_age_days: i64,

    #[serde(rename = "montant")]
    #[validate(range(min = 0.0))]
    pub amount: f64,

    #[serde(rename = "heure")]
    #[validate(range(min = 0, max = 23))]
    pub hour: i64,

    #[serde(rename = "nouveau_beneficiaire")]
    pub new_beneficiary: bool,

    #[serde(rename = "solde_avant")]
    pub balance_before: f64,

    #[serde(rename = "nb_virements_1h")]
    #[validate(range(min = 0))]
    pub transfers_last_hour: i64,

    #[serde(rename = "changement_mdp")]
    pub password_changed_recently: bool,

    #[serde(rename = "minutes_depuis_chg_mdp")]
    #[validate(range(min = 0))]
    pub minutes_since_password_change: i64,

    #[serde(rename = "localisation")]
    #[validate(length(min = 1))]
    pub location: String,

    #[serde(rename = "nb_virements_vers_benef")]
    #[validate(range(min = 0))]
    pub transfers_to_beneficiary: i64,
}

impl FeatureRecord {
    /// Numeric value of a column, `None` for the categorical location
    pub fn numeric(&self, column: Column) -> Option<f64> {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match column {
            Column::AccountAgeDays => Some(self.account_age_days as f64),
            Column::Amount => Some(self.amount),
            Column::Hour => Some(self.hour as f64),
            Column::NewBeneficiary => Some(flag(self.new_beneficiary)),
            Column::BalanceBefore => Some(self.balance_before),
            Column::TransfersLastHour => Some(self.transfers_last_hour as f64),
            Column::PasswordChangedRecently => Some(flag(self.password_changed_recently)),
            Column::MinutesSincePasswordChange => Some(self.minutes_since_password_change as f64),
            Column::Location => None,
            Column::TransfersToBeneficiary => Some(self.transfers_to_beneficiary as f64),
        }
    }

    /// Build a record from a JSON object, projecting it onto the fixed
    /// column list. Keys outside the list are ignored.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, RecordError> {
        let missing: Vec<Column> = Column::ALL
            .iter()
            .copied()
            .filter(|c| object.get(c.name()).map_or(true, Value::is_null))
            .collect();

        if !missing.is_empty() {
            return Err(RecordError::Missing(missing));
        }

        let row: Map<String, Value> = Column::ALL
            .iter()
            .filter_map(|c| object.get(c.name()).map(|v| (c.name().to_string(), v.clone())))
            .collect();

        let record: FeatureRecord = serde_json::from_value(Value::Object(row))
            .map_err(|e| RecordError::Malformed(e.to_string()))?;

        record
            .validate()
            .map_err(|e| RecordError::Malformed(e.to_string()))?;

        Ok(record)
    }
}

/// Why a request body could not become a `FeatureRecord`
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Columns absent or null, in column order
    Missing(Vec<Column>),
    /// Present but wrongly typed or out of range
    Malformed(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Missing(columns) => {
                let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
                write!(f, "Missing or null columns: {}", names.join(", "))
            }
            RecordError::Malformed(msg) => write!(f, "Malformed columns: {}", msg),
        }
    }
}

/// `/predict` success body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub fraude: bool,
}

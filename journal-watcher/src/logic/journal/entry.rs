//! Journal entry and the feature record built from it

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Feature columns, in the order the scoring endpoint expects them
pub const FEATURE_COLUMNS: [&str; 10] = [
    "anciennete_jours",
    "montant",
    "heure",
    "nouveau_beneficiaire",
    "solde_avant",
    "nb_virements_1h",
    "changement_mdp",
    "minutes_depuis_chg_mdp",
    "localisation",
    "nb_virements_vers_benef",
];

/// One row of the journals table.
///
/// The table is shared with audit logging, so every feature column is
/// nullable; rows written by the audit trail only carry `action`,
/// `utilisateur` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: i64,

    #[sqlx(rename = "anciennete_jours")]
    pub account_age_days: Option<i64>,
    #[sqlx(rename = "montant")]
    pub amount: Option<f64>,
    #[sqlx(rename = "heure")]
    pub hour: Option<i64>,
    #[sqlx(rename = "nouveau_beneficiaire")]
    pub new_beneficiary: Option<bool>,
    #[sqlx(rename = "solde_avant")]
    pub balance_before: Option<f64>,
    #[sqlx(rename = "nb_virements_1h")]
    pub transfers_last_hour: Option<i64>,
    #[sqlx(rename = "changement_mdp")]
    pub password_changed_recently: Option<bool>,
    #[sqlx(rename = "minutes_depuis_chg_mdp")]
    pub minutes_since_password_change: Option<i64>,
    #[sqlx(rename = "localisation")]
    pub location: Option<String>,
    #[sqlx(rename = "nb_virements_vers_benef")]
    pub transfers_to_beneficiary: Option<i64>,

    pub action: Option<String>,
    pub utilisateur: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Complete feature vector, serialized as the `/predict` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    #[serde(rename = "anciennete_jours")]
    pub account_age_days: i64,
    #[serde(rename = "montant")]
    pub amount: f64,
    #[serde(rename = "heure")]
    pub hour: i64,
    #[serde(rename = "nouveau_beneficiaire")]
    pub new_beneficiary: bool,
    #[serde(rename = "solde_avant")]
    pub balance_before: f64,
    #[serde(rename = "nb_virements_1h")]
    pub transfers_last_hour: i64,
    #[serde(rename = "changement_mdp")]
    pub password_changed_recently: bool,
    #[serde(rename = "minutes_depuis_chg_mdp")]
    pub minutes_since_password_change: i64,
    #[serde(rename = "localisation")]
    pub location: String,
    #[serde(rename = "nb_virements_vers_benef")]
    pub transfers_to_beneficiary: i64,
}

impl JournalEntry {
    /// Feature columns that are null, in column order
    pub fn missing_columns(&self) -> Vec<&'static str> {
        let present = [
            self.account_age_days.is_some(),
            self.amount.is_some(),
            self.hour.is_some(),
            self.new_beneficiary.is_some(),
            self.balance_before.is_some(),
            self.transfers_last_hour.is_some(),
            self.password_changed_recently.is_some(),
            self.minutes_since_password_change.is_some(),
            self.location.is_some(),
            self.transfers_to_beneficiary.is_some(),
        ];

        FEATURE_COLUMNS
            .iter()
            .zip(present)
            .filter(|(_, p)| !p)
            .map(|(name, _)| *name)
            .collect()
    }

    /// The feature record, or the missing columns if the entry is incomplete
    pub fn to_features(&self) -> Result<FeatureRecord, Vec<&'static str>> {
        match (
            self.account_age_days,
            self.amount,
            self.hour,
            self.new_beneficiary,
            self.balance_before,
            self.transfers_last_hour,
            self.password_changed_recently,
            self.minutes_since_password_change,
            &self.location,
            self.transfers_to_beneficiary,
        ) {
            (
                Some(account_age_days),
                Some(amount),
                Some(hour),
                Some(new_beneficiary),
                Some(balance_before),
                Some(transfers_last_hour),
                Some(password_changed_recently),
                Some(minutes_since_password_change),
                Some(location),
                Some(transfers_to_beneficiary),
            ) => Ok(FeatureRecord {
                account_age_days,
                amount,
                hour,
                new_beneficiary,
                balance_before,
                transfers_last_hour,
                password_changed_recently,
                minutes_since_password_change,
                location: location.clone(),
                transfers_to_beneficiary,
            }),
            _ => Err(self.missing_columns()),
        }
    }

    /// Audit context for log lines, empty when the entry has none
    pub fn audit_context(&self) -> String {
        let mut parts = Vec::new();
        if let Some(action) = &self.action {
            parts.push(format!("action: {}", action));
        }
        if let Some(user) = &self.utilisateur {
            parts.push(format!("by: {}", user));
        }
        if let Some(at) = &self.created_at {
            parts.push(format!("at: {}", at.to_rfc3339()));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!(" ({})", parts.join(", "))
        }
    }
}

#[cfg(test)]
impl JournalEntry {
    /// Complete low-risk entry
    pub fn sample(id: i64) -> Self {
        JournalEntry {
            id,
            account_age_days: Some(400),
            amount: Some(50.0),
            hour: Some(14),
            new_beneficiary: Some(false),
            balance_before: Some(1000.0),
            transfers_last_hour: Some(1),
            password_changed_recently: Some(false),
            minutes_since_password_change: Some(9999),
            location: Some("FR".to_string()),
            transfers_to_beneficiary: Some(5),
            ..Default::default()
        }
    }
}

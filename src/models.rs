use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("unknown entry kind `{0}`")]
    UnknownKind(String),
    #[error("unknown meal type `{0}`")]
    UnknownMealType(String),
    #[error("unknown subscription tier `{0}`")]
    UnknownTier(String),
    #[error("unknown subscription status `{0}`")]
    UnknownStatus(String),
    #[error("unknown notification channel `{0}`")]
    UnknownChannel(String),
    #[error("unknown delivery mode `{0}`")]
    UnknownDelivery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Caregiver,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Caregiver => "caregiver",
            Role::Patient => "patient",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "caregiver" => Ok(Role::Caregiver),
            "patient" => Ok(Role::Patient),
            _ => Err(ModelError::UnknownRole(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Meal,
    Activity,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Meal => "meal",
            EntryKind::Activity => "activity",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl TryFrom<String> for MealType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(ModelError::UnknownMealType(value)),
        }
    }
}

/// Kind-specific payload shared by planned and logged entries.
/// Serialized inline with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryDetail {
    #[serde(rename_all = "camelCase")]
    Meal {
        meal_type: Option<MealType>,
        calories: Option<i32>,
    },
    #[serde(rename_all = "camelCase")]
    Activity {
        activity_type: Option<String>,
        calories_burned: Option<i32>,
        duration_minutes: Option<i32>,
    },
}

impl EntryDetail {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDetail::Meal { .. } => EntryKind::Meal,
            EntryDetail::Activity { .. } => EntryKind::Activity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedEntry {
    pub date: NaiveDate,
    pub description: String,
    #[serde(flatten)]
    pub detail: EntryDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEntry {
    pub logged_at: DateTime<Utc>,
    pub description: String,
    #[serde(flatten)]
    pub detail: EntryDetail,
}

impl LoggedEntry {
    /// Calendar day the entry counts toward (UTC).
    pub fn date(&self) -> NaiveDate {
        self.logged_at.date_naive()
    }
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Caregiver {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub caregiver_id: Uuid,
    pub patient_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LifestylePlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Nullable kind-specific columns as stored in `plan_entries` and `logged_entries`.
#[derive(Debug, FromRow)]
pub struct EntryColumns {
    pub kind: String,
    pub description: String,
    pub meal_type: Option<String>,
    pub calories: Option<i32>,
    pub activity_type: Option<String>,
    pub calories_burned: Option<i32>,
    pub duration_minutes: Option<i32>,
}

impl EntryColumns {
    pub fn from_detail(description: &str, detail: &EntryDetail) -> Self {
        let mut columns = EntryColumns {
            kind: detail.kind().as_str().to_string(),
            description: description.to_string(),
            meal_type: None,
            calories: None,
            activity_type: None,
            calories_burned: None,
            duration_minutes: None,
        };
        match detail {
            EntryDetail::Meal { meal_type, calories } => {
                columns.meal_type = meal_type.map(|m| m.as_str().to_string());
                columns.calories = *calories;
            }
            EntryDetail::Activity {
                activity_type,
                calories_burned,
                duration_minutes,
            } => {
                columns.activity_type = activity_type.clone();
                columns.calories_burned = *calories_burned;
                columns.duration_minutes = *duration_minutes;
            }
        }
        columns
    }

    pub fn into_parts(self) -> Result<(String, EntryDetail), ModelError> {
        let detail = match self.kind.as_str() {
            "meal" => EntryDetail::Meal {
                meal_type: self.meal_type.map(MealType::try_from).transpose()?,
                calories: self.calories,
            },
            "activity" => EntryDetail::Activity {
                activity_type: self.activity_type,
                calories_burned: self.calories_burned,
                duration_minutes: self.duration_minutes,
            },
            _ => return Err(ModelError::UnknownKind(self.kind)),
        };
        Ok((self.description, detail))
    }
}

#[derive(Debug, FromRow)]
pub struct PlanEntryRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub entry_date: NaiveDate,
    #[sqlx(flatten)]
    pub columns: EntryColumns,
}

#[derive(Debug, FromRow)]
pub struct LoggedEntryRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub logged_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub columns: EntryColumns,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntryRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    #[serde(flatten)]
    pub entry: PlannedEntry,
}

impl TryFrom<PlanEntryRow> for PlanEntryRecord {
    type Error = ModelError;

    fn try_from(row: PlanEntryRow) -> Result<Self, Self::Error> {
        let (description, detail) = row.columns.into_parts()?;
        Ok(PlanEntryRecord {
            id: row.id,
            plan_id: row.plan_id,
            entry: PlannedEntry {
                date: row.entry_date,
                description,
                detail,
            },
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEntryRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub entry: LoggedEntry,
}

impl TryFrom<LoggedEntryRow> for LoggedEntryRecord {
    type Error = ModelError;

    fn try_from(row: LoggedEntryRow) -> Result<Self, Self::Error> {
        let (description, detail) = row.columns.into_parts()?;
        Ok(LoggedEntryRecord {
            id: row.id,
            patient_id: row.patient_id,
            entry: LoggedEntry {
                logged_at: row.logged_at,
                description,
                detail,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Basic,
    Standard,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Standard => "standard",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl TryFrom<String> for SubscriptionTier {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "basic" => Ok(SubscriptionTier::Basic),
            "standard" => Ok(SubscriptionTier::Standard),
            "premium" => Ok(SubscriptionTier::Premium),
            _ => Err(ModelError::UnknownTier(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Cancelled subscriptions are final.
    pub fn can_become(self, next: SubscriptionStatus) -> bool {
        match self {
            SubscriptionStatus::Cancelled => next == SubscriptionStatus::Cancelled,
            SubscriptionStatus::Active | SubscriptionStatus::Paused => true,
        }
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            _ => Err(ModelError::UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
    InApp,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
            NotificationChannel::Push => "push",
            NotificationChannel::InApp => "in_app",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for NotificationChannel {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "email" => Ok(NotificationChannel::Email),
            "sms" => Ok(NotificationChannel::Sms),
            "push" => Ok(NotificationChannel::Push),
            "in_app" => Ok(NotificationChannel::InApp),
            _ => Err(ModelError::UnknownChannel(value)),
        }
    }
}

/// How a user wants one channel delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Immediate,
    DailyDigest,
    Muted,
}

impl Delivery {
    pub fn as_str(self) -> &'static str {
        match self {
            Delivery::Immediate => "immediate",
            Delivery::DailyDigest => "daily_digest",
            Delivery::Muted => "muted",
        }
    }

    /// Channels without a stored preference deliver immediately.
    pub fn accepts(preference: Option<Delivery>) -> bool {
        match preference {
            None | Some(Delivery::Immediate) | Some(Delivery::DailyDigest) => true,
            Some(Delivery::Muted) => false,
        }
    }
}

impl TryFrom<String> for Delivery {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "immediate" => Ok(Delivery::Immediate),
            "daily_digest" => Ok(Delivery::DailyDigest),
            "muted" => Ok(Delivery::Muted),
            _ => Err(ModelError::UnknownDelivery(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    #[sqlx(try_from = "String")]
    pub channel: NotificationChannel,
    #[sqlx(try_from = "String")]
    pub delivery: Delivery,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[sqlx(try_from = "String")]
    pub tier: SubscriptionTier,
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    pub started_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub title: String,
    pub file_name: String,
    pub content_type: String,
    pub storage_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!(Role::try_from("caregiver".to_string()), Ok(Role::Caregiver));
        assert_eq!(
            Role::try_from("Caregiver".to_string()),
            Err(ModelError::UnknownRole("Caregiver".into()))
        );
    }

    #[test]
    fn planned_meal_serializes_with_kind_tag() {
        let entry = PlannedEntry {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            description: "Oatmeal breakfast".into(),
            detail: EntryDetail::Meal {
                meal_type: Some(MealType::Breakfast),
                calories: Some(350),
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "date": "2025-01-01",
                "description": "Oatmeal breakfast",
                "kind": "meal",
                "mealType": "breakfast",
                "calories": 350
            })
        );
    }

    #[test]
    fn activity_deserializes_without_optional_fields() {
        let entry: PlannedEntry = serde_json::from_value(json!({
            "date": "2025-01-02",
            "description": "30-min walk",
            "kind": "activity",
            "durationMinutes": 30
        }))
        .unwrap();
        assert_eq!(entry.detail.kind(), EntryKind::Activity);
        assert_eq!(
            entry.detail,
            EntryDetail::Activity {
                activity_type: None,
                calories_burned: None,
                duration_minutes: Some(30),
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected_on_input() {
        let result: Result<PlannedEntry, _> = serde_json::from_value(json!({
            "date": "2025-01-02",
            "description": "Metformin",
            "kind": "medication"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn logged_entry_date_truncates_to_utc_day() {
        let entry: LoggedEntry = serde_json::from_value(json!({
            "loggedAt": "2025-01-01T23:59:59Z",
            "description": "Late snack",
            "kind": "meal"
        }))
        .unwrap();
        assert_eq!(entry.date(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn entry_columns_survive_storage_shape() {
        let detail = EntryDetail::Activity {
            activity_type: Some("walking".into()),
            calories_burned: Some(120),
            duration_minutes: Some(30),
        };
        let columns = EntryColumns::from_detail("30-min walk", &detail);
        assert_eq!(columns.kind, "activity");
        assert!(columns.meal_type.is_none());

        let (description, parsed) = columns.into_parts().unwrap();
        assert_eq!(description, "30-min walk");
        assert_eq!(parsed, detail);
    }

    #[test]
    fn notification_channel_uses_snake_case_on_both_sides() {
        let value = serde_json::to_value(NotificationChannel::InApp).unwrap();
        assert_eq!(value, json!("in_app"));
        assert_eq!(
            NotificationChannel::try_from("in_app".to_string()),
            Ok(NotificationChannel::InApp)
        );
        assert_eq!(
            NotificationChannel::try_from("pager".to_string()),
            Err(ModelError::UnknownChannel("pager".into()))
        );
    }

    #[test]
    fn muted_channels_refuse_delivery() {
        assert!(Delivery::accepts(None));
        assert!(Delivery::accepts(Some(Delivery::DailyDigest)));
        assert!(!Delivery::accepts(Some(Delivery::Muted)));
    }

    #[test]
    fn preference_round_trips_through_storage_strings() {
        let pref: NotificationPreference =
            serde_json::from_value(json!({ "channel": "sms", "delivery": "daily_digest" }))
                .unwrap();
        assert_eq!(
            Delivery::try_from(pref.delivery.as_str().to_string()),
            Ok(Delivery::DailyDigest)
        );
        assert_eq!(pref.channel.as_str(), "sms");
    }

    #[test]
    fn cancelled_subscription_is_final() {
        assert!(SubscriptionStatus::Active.can_become(SubscriptionStatus::Paused));
        assert!(SubscriptionStatus::Paused.can_become(SubscriptionStatus::Active));
        assert!(!SubscriptionStatus::Cancelled.can_become(SubscriptionStatus::Active));
        assert_eq!(
            SubscriptionTier::try_from("gold".to_string()),
            Err(ModelError::UnknownTier("gold".into()))
        );
    }

    #[test]
    fn entry_columns_keep_description_verbatim() {
        let detail = EntryDetail::Meal {
            meal_type: None,
            calories: None,
        };
        let columns = EntryColumns::from_detail("Oatmeal  breakfast ", &detail);
        assert_eq!(columns.description, "Oatmeal  breakfast ");
    }

    #[test]
    fn stored_row_with_unknown_meal_type_fails() {
        let columns = EntryColumns {
            kind: "meal".into(),
            description: "Brunch".into(),
            meal_type: Some("brunch".into()),
            calories: None,
            activity_type: None,
            calories_burned: None,
            duration_minutes: None,
        };
        assert_eq!(
            columns.into_parts().unwrap_err(),
            ModelError::UnknownMealType("brunch".into())
        );
    }
}

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::models::{
    CreateExceptionRequest, CreateRuleRequest, ScheduleError, ScheduleException, ScheduleRule,
    UpdateRuleRequest,
};

/// CRUD over schedule rules and exceptions in the clinic backend.
/// Availability computation lives in `AvailabilityService`.
pub struct ScheduleService {
    backend: BackendClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }

    /// Create a recurring weekly availability window for a doctor.
    ///
    /// Overlapping rules for the same day are accepted: clinics schedule
    /// deliberately overlapping shifts, and the availability checker
    /// reports whatever is stored.
    pub async fn create_rule(
        &self,
        doctor_id: &str,
        request: CreateRuleRequest,
        auth_token: &str,
    ) -> Result<ScheduleRule> {
        debug!("Creating schedule rule for doctor: {}", doctor_id);

        validate_rule_fields(
            request.day_of_week,
            request.start_time,
            request.end_time,
            request.slot_duration_minutes,
            request.valid_from,
            request.valid_until,
        )?;

        let rule_data = json!({
            "doctor_id": doctor_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "slot_duration_minutes": request.slot_duration_minutes,
            "valid_from": request.valid_from,
            "valid_until": request.valid_until,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::POST,
            "/rest/v1/schedule_rules",
            Some(auth_token),
            Some(rule_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create schedule rule"));
        }

        let rule: ScheduleRule = serde_json::from_value(result[0].clone())?;
        debug!("Schedule rule created with ID: {}", rule.id);

        Ok(rule)
    }

    /// Get all schedule rules for a doctor, in stored order.
    pub async fn get_rules(
        &self,
        doctor_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<ScheduleRule>> {
        debug!("Fetching schedule rules for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/schedule_rules?doctor_id=eq.{}&order=created_at.asc",
            doctor_id
        );
        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let rules: Vec<ScheduleRule> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ScheduleRule>, _>>()?;

        Ok(rules)
    }

    /// Update a schedule rule. Only provided fields change.
    pub async fn update_rule(
        &self,
        rule_id: &str,
        request: UpdateRuleRequest,
        auth_token: &str,
    ) -> Result<ScheduleRule> {
        debug!("Updating schedule rule: {}", rule_id);

        let current = self.get_rule_by_id(rule_id, auth_token).await?;

        let day_of_week = request.day_of_week.unwrap_or(current.day_of_week);
        let start_time = request.start_time.unwrap_or(current.start_time);
        let end_time = request.end_time.unwrap_or(current.end_time);
        let duration = request.slot_duration_minutes.unwrap_or(current.slot_duration_minutes);
        let valid_from = request.valid_from.or(current.valid_from);
        let valid_until = request.valid_until.or(current.valid_until);

        validate_rule_fields(
            day_of_week,
            start_time,
            end_time,
            duration,
            valid_from,
            valid_until,
        )?;

        let mut update_data = serde_json::Map::new();

        if let Some(day) = request.day_of_week {
            update_data.insert("day_of_week".to_string(), json!(day));
        }
        if let Some(start) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start.format("%H:%M:%S").to_string()));
        }
        if let Some(end) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end.format("%H:%M:%S").to_string()));
        }
        if let Some(duration) = request.slot_duration_minutes {
            update_data.insert("slot_duration_minutes".to_string(), json!(duration));
        }
        if let Some(from) = request.valid_from {
            update_data.insert("valid_from".to_string(), json!(from));
        }
        if let Some(until) = request.valid_until {
            update_data.insert("valid_until".to_string(), json!(until));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update schedule rule"));
        }

        let updated: ScheduleRule = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    /// Delete a schedule rule.
    pub async fn delete_rule(&self, rule_id: &str, auth_token: &str) -> Result<()> {
        debug!("Deleting schedule rule: {}", rule_id);

        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule_id);
        let _: Vec<Value> = self.backend.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }

    /// Create a date-specific exception (vacation, sick day, shortened
    /// hours). At most one exception per doctor and date.
    pub async fn create_exception(
        &self,
        doctor_id: &str,
        request: CreateExceptionRequest,
        auth_token: &str,
    ) -> Result<ScheduleException> {
        debug!("Creating schedule exception for doctor {} on {}", doctor_id, request.date);

        if !request.full_day {
            let (start, end) = match (request.start_time, request.end_time) {
                (Some(start), Some(end)) => (start, end),
                _ => return Err(ScheduleError::IncompleteException.into()),
            };
            if start >= end {
                return Err(ScheduleError::InvalidRange.into());
            }
        }

        let existing_path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&date=eq.{}",
            doctor_id,
            request.date
        );
        let existing: Vec<Value> = self.backend.request(
            Method::GET,
            &existing_path,
            Some(auth_token),
            None,
        ).await?;

        if !existing.is_empty() {
            return Err(anyhow!("Schedule exception already exists for this date"));
        }

        let exception_data = json!({
            "doctor_id": doctor_id,
            "date": request.date,
            "full_day": request.full_day,
            "start_time": request.start_time.map(|t| t.format("%H:%M:%S").to_string()),
            "end_time": request.end_time.map(|t| t.format("%H:%M:%S").to_string()),
            "reason": request.reason,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.backend.request_with_headers(
            Method::POST,
            "/rest/v1/schedule_exceptions",
            Some(auth_token),
            Some(exception_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create schedule exception"));
        }

        let exception: ScheduleException = serde_json::from_value(result[0].clone())?;
        Ok(exception)
    }

    /// Get all exceptions for a doctor, soonest first.
    pub async fn get_exceptions(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<ScheduleException>> {
        let path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&order=date.asc",
            doctor_id
        );

        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let exceptions: Vec<ScheduleException> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ScheduleException>, _>>()?;

        Ok(exceptions)
    }

    /// Delete a schedule exception.
    pub async fn delete_exception(&self, exception_id: &str, auth_token: &str) -> Result<()> {
        debug!("Deleting schedule exception: {}", exception_id);

        let path = format!("/rest/v1/schedule_exceptions?id=eq.{}", exception_id);
        let _: Vec<Value> = self.backend.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }

    async fn get_rule_by_id(&self, rule_id: &str, auth_token: &str) -> Result<ScheduleRule> {
        let path = format!("/rest/v1/schedule_rules?id=eq.{}", rule_id);
        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Schedule rule not found"));
        }

        let rule: ScheduleRule = serde_json::from_value(result[0].clone())?;
        Ok(rule)
    }
}

fn validate_rule_fields(
    day_of_week: i32,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: i32,
    valid_from: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
) -> Result<()> {
    if !(1..=7).contains(&day_of_week) {
        return Err(ScheduleError::InvalidDayOfWeek(day_of_week).into());
    }
    if start_time >= end_time || slot_duration_minutes <= 0 {
        return Err(ScheduleError::InvalidRange.into());
    }
    if let (Some(from), Some(until)) = (valid_from, valid_until) {
        if from > until {
            return Err(ScheduleError::InvalidValidityWindow.into());
        }
    }
    Ok(())
}

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::models::{Appointment, DayAvailability, ScheduleException, ScheduleRule};
use crate::services::slots::{generate_slots, mark_appointment_conflicts, mark_window_unavailable};

/// Computes bookable slots for a doctor on a given date from the stored
/// schedule rules, exceptions and appointments.
pub struct AvailabilityService {
    backend: BackendClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            backend: BackendClient::new(config),
        }
    }

    /// Determine which slots are bookable for `doctor_id` on `date`.
    ///
    /// A full-day exception blocks the date outright. Otherwise slots are
    /// generated per governing rule and concatenated in stored rule order;
    /// overlapping rules are reported as stored, without sorting or
    /// de-duplication. Partial-day exceptions and non-cancelled
    /// appointments mark intersecting slots unavailable.
    pub async fn check_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<DayAvailability> {
        debug!("Checking availability for doctor {} on {}", doctor_id, date);

        let exception = self.get_exception_for_date(doctor_id, date, auth_token).await?;

        if let Some(ref exception) = exception {
            if exception.full_day {
                debug!("Doctor {} blocked on {}: {}", doctor_id, date, exception.reason);
                return Ok(DayAvailability {
                    doctor_id,
                    date,
                    blocked: true,
                    reason: Some(exception.reason.clone()),
                    slots: vec![],
                });
            }
        }

        let rules = self.get_rules_for_date(doctor_id, date, auth_token).await?;

        if rules.is_empty() {
            // No configured hours. Not the same as blocked.
            return Ok(DayAvailability {
                doctor_id,
                date,
                blocked: false,
                reason: None,
                slots: vec![],
            });
        }

        let mut slots = Vec::new();
        for rule in &rules {
            let generated = generate_slots(
                date,
                rule.start_time,
                rule.end_time,
                rule.slot_duration_minutes,
            )?;
            slots.extend(generated);
        }

        if let Some(exception) = exception {
            if let (Some(start), Some(end)) = (exception.start_time, exception.end_time) {
                mark_window_unavailable(
                    &mut slots,
                    date.and_time(start).and_utc(),
                    date.and_time(end).and_utc(),
                );
            }
        }

        let appointments = self.get_appointments_for_date(doctor_id, date, auth_token).await?;
        mark_appointment_conflicts(&mut slots, &appointments);

        debug!(
            "Doctor {} on {}: {} slots, {} bookable",
            doctor_id,
            date,
            slots.len(),
            slots.iter().filter(|s| s.available).count()
        );

        Ok(DayAvailability {
            doctor_id,
            date,
            blocked: false,
            reason: None,
            slots,
        })
    }

    async fn get_exception_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Option<ScheduleException>> {
        let path = format!(
            "/rest/v1/schedule_exceptions?doctor_id=eq.{}&date=eq.{}",
            doctor_id, date
        );

        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let exception = match result.into_iter().next() {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };

        Ok(exception)
    }

    async fn get_rules_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<ScheduleRule>> {
        let day_of_week = date.weekday().number_from_monday();

        let path = format!(
            "/rest/v1/schedule_rules?doctor_id=eq.{}&day_of_week=eq.{}&order=created_at.asc",
            doctor_id, day_of_week
        );

        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let mut rules: Vec<ScheduleRule> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ScheduleRule>, _>>()?;

        // The validity window is checked here; the backend filter only
        // covers the weekday.
        rules.retain(|rule| rule.applies_on(date));

        Ok(rules)
    }

    async fn get_appointments_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = date.and_hms_opt(23, 59, 59).unwrap().and_utc();

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&start_time=gte.{}&start_time=lte.{}&status=neq.cancelled&order=start_time.asc",
            doctor_id,
            start_of_day.to_rfc3339(),
            end_of_day.to_rfc3339()
        );

        let result: Vec<Value> = self.backend.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()?;

        Ok(appointments)
    }
}

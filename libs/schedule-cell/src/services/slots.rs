use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::{Appointment, AppointmentStatus, AvailabilitySlot, ScheduleError};

/// Generate fixed-width booking slots covering `[start_time, end_time)`
/// on the given date. Slots are contiguous, non-overlapping and exactly
/// `duration_minutes` long; a trailing window shorter than one slot is
/// dropped, not emitted. All slots start out available.
pub fn generate_slots(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    duration_minutes: i32,
) -> Result<Vec<AvailabilitySlot>, ScheduleError> {
    if start_time >= end_time || duration_minutes <= 0 {
        return Err(ScheduleError::InvalidRange);
    }

    let duration = Duration::minutes(duration_minutes as i64);
    let window_end = date.and_time(end_time).and_utc();

    let mut slots = Vec::new();
    let mut cursor = date.and_time(start_time).and_utc();

    while cursor + duration <= window_end {
        slots.push(AvailabilitySlot {
            start_time: cursor,
            end_time: cursor + duration,
            duration_minutes,
            available: true,
        });
        cursor += duration;
    }

    Ok(slots)
}

/// Mark every slot intersecting `[start, end)` as unavailable.
pub fn mark_window_unavailable(
    slots: &mut [AvailabilitySlot],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) {
    for slot in slots.iter_mut() {
        if slot.overlaps(start, end) {
            slot.available = false;
        }
    }
}

/// Mark slots occupied by existing appointments. Cancelled appointments
/// do not block a slot.
pub fn mark_appointment_conflicts(slots: &mut [AvailabilitySlot], appointments: &[Appointment]) {
    for slot in slots.iter_mut() {
        let occupied = appointments
            .iter()
            .filter(|apt| apt.status != AppointmentStatus::Cancelled)
            .any(|apt| slot.overlaps(apt.start_time, apt.end_time()));

        if occupied {
            slot.available = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn appointment(start: DateTime<Utc>, duration: i32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            start_time: start,
            duration_minutes: duration,
            status,
        }
    }

    #[test]
    fn even_division_yields_exact_slot_count() {
        let slots = generate_slots(date(), time(9, 0), time(17, 0), 30).unwrap();
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn slots_are_contiguous_and_bounded() {
        let slots = generate_slots(date(), time(9, 0), time(12, 30), 45).unwrap();
        let window_end = date().and_time(time(12, 30)).and_utc();

        for pair in slots.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        for slot in &slots {
            assert_eq!(slot.end_time - slot.start_time, Duration::minutes(45));
            assert!(slot.end_time <= window_end);
        }
    }

    #[test]
    fn nine_to_ten_with_half_hour_slots() {
        let slots = generate_slots(date(), time(9, 0), time(10, 0), 30).unwrap();
        assert_eq!(slots.len(), 2);

        assert_eq!(slots[0].start_time, date().and_time(time(9, 0)).and_utc());
        assert_eq!(slots[0].end_time, date().and_time(time(9, 30)).and_utc());
        assert_eq!(slots[1].start_time, date().and_time(time(9, 30)).and_utc());
        assert_eq!(slots[1].end_time, date().and_time(time(10, 0)).and_utc());
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn trailing_partial_slot_is_dropped() {
        // 09:00-10:15 with 30-minute slots: the 10:00-10:15 remainder is
        // too short for a slot and must not be emitted.
        let slots = generate_slots(date(), time(9, 0), time(10, 15), 30).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end_time, date().and_time(time(10, 0)).and_utc());
    }

    #[test]
    fn window_shorter_than_one_slot_yields_nothing() {
        let slots = generate_slots(date(), time(9, 0), time(9, 20), 30).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = generate_slots(date(), time(10, 0), time(9, 0), 30).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidRange);

        let err = generate_slots(date(), time(9, 0), time(9, 0), 30).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidRange);
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert_eq!(
            generate_slots(date(), time(9, 0), time(10, 0), 0).unwrap_err(),
            ScheduleError::InvalidRange
        );
        assert_eq!(
            generate_slots(date(), time(9, 0), time(10, 0), -15).unwrap_err(),
            ScheduleError::InvalidRange
        );
    }

    #[test]
    fn appointment_blocks_exactly_its_slot() {
        let mut slots = generate_slots(date(), time(9, 0), time(11, 0), 30).unwrap();
        let apt = appointment(
            date().and_time(time(9, 0)).and_utc(),
            30,
            AppointmentStatus::Confirmed,
        );

        mark_appointment_conflicts(&mut slots, &[apt]);

        assert!(!slots[0].available);
        assert!(slots[1].available);
        assert!(slots[2].available);
        assert!(slots[3].available);
    }

    #[test]
    fn cancelled_appointment_does_not_block() {
        let mut slots = generate_slots(date(), time(9, 0), time(10, 0), 30).unwrap();
        let apt = appointment(
            date().and_time(time(9, 0)).and_utc(),
            30,
            AppointmentStatus::Cancelled,
        );

        mark_appointment_conflicts(&mut slots, &[apt]);

        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn appointment_straddling_two_slots_blocks_both() {
        let mut slots = generate_slots(date(), time(9, 0), time(10, 30), 30).unwrap();
        let apt = appointment(
            date().and_time(time(9, 15)).and_utc(),
            30,
            AppointmentStatus::Scheduled,
        );

        mark_appointment_conflicts(&mut slots, &[apt]);

        assert!(!slots[0].available);
        assert!(!slots[1].available);
        assert!(slots[2].available);
    }

    #[test]
    fn window_marking_touches_only_intersecting_slots() {
        let mut slots = generate_slots(date(), time(9, 0), time(12, 0), 30).unwrap();
        let block_start = date().and_time(time(10, 0)).and_utc();
        let block_end = date().and_time(time(11, 0)).and_utc();

        mark_window_unavailable(&mut slots, block_start, block_end);

        let unavailable: Vec<_> = slots.iter().filter(|s| !s.available).collect();
        assert_eq!(unavailable.len(), 2);
        assert_eq!(unavailable[0].start_time, block_start);

        // A slot ending exactly at the window start is untouched.
        assert!(slots[1].available);
    }
}

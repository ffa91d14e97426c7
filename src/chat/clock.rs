//! Wall-clock reply generator.

use chrono::{Local, Timelike};

/// Current local time as `HH:MM`.
#[must_use]
pub fn current_time() -> String {
    format_clock(&Local::now())
}

/// Format the hour and minute of `time` as zero-padded `HH:MM`.
#[must_use]
pub fn format_clock(time: &impl Timelike) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_format_clock_zero_pads() {
        let time = NaiveTime::from_hms_opt(7, 5, 59).unwrap();
        assert_eq!(format_clock(&time), "07:05");
    }

    #[test]
    fn test_format_clock_afternoon() {
        let time = NaiveTime::from_hms_opt(15, 48, 0).unwrap();
        assert_eq!(format_clock(&time), "15:48");
    }

    #[test]
    fn test_current_time_shape() {
        let now = current_time();
        assert_eq!(now.len(), 5);
        assert_eq!(&now[2..3], ":");

        let (hours, minutes) = now.split_at(2);
        let hours: u32 = hours.parse().unwrap();
        let minutes: u32 = minutes[1..].parse().unwrap();
        assert!(hours < 24);
        assert!(minutes < 60);
    }
}

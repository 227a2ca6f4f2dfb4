use chrono::{DateTime, TimeZone, Timelike};
use std::thread;
use std::time::{Duration, Instant};

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=4 => "Good Night",
        5..=11 => "Good Morning",
        12..=17 => "Good Afternoon",
        _ => "Good Evening",
    }
}

pub fn greeting_at<Tz: TimeZone>(now: &DateTime<Tz>) -> &'static str {
    greeting(now.hour())
}

/// 24h wall clock, e.g. `23:05`.
pub fn format_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M").to_string()
}

/// Long date, e.g. `Friday, October 16`.
pub fn format_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %B %-d").to_string()
}

/// Call `tick` at a steady cadence until it returns `false`.
pub fn run_ticker(interval: Duration, mut tick: impl FnMut() -> bool) {
    loop {
        let tick_start = Instant::now();
        if !tick() {
            return;
        }

        // Maintain steady cadence
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn greeting_boundaries() {
        assert_eq!(greeting(0), "Good Night");
        assert_eq!(greeting(4), "Good Night");
        assert_eq!(greeting(5), "Good Morning");
        assert_eq!(greeting(11), "Good Morning");
        assert_eq!(greeting(12), "Good Afternoon");
        assert_eq!(greeting(17), "Good Afternoon");
        assert_eq!(greeting(18), "Good Evening");
        assert_eq!(greeting(23), "Good Evening");
    }

    #[test]
    fn formats_clock_and_date() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 16, 23, 5, 42).unwrap();
        assert_eq!(format_time(&ts), "23:05");
        assert_eq!(format_date(&ts), "Friday, October 16");
        assert_eq!(greeting_at(&ts), "Good Evening");
    }

    #[test]
    fn ticker_stops_when_asked() {
        let mut ticks = 0;
        run_ticker(Duration::from_millis(1), || {
            ticks += 1;
            ticks < 3
        });
        assert_eq!(ticks, 3);
    }
}

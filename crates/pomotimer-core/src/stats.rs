//! Statistics over the session history.
//!
//! Day boundaries follow the time zone of the `now` passed in, so callers
//! hand in `Local::now()` for user-facing numbers and tests can pin UTC.

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::timer::{SessionType, TimerSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    /// The last 7 days.
    Week,
    /// The last 30 days.
    Month,
    All,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "all" | "all_time" | "all-time" => Ok(Period::All),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub period: Period,
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub skipped_sessions: u64,
    pub focus_sessions: u64,
    pub short_breaks: u64,
    pub long_breaks: u64,
    pub focus_secs: u64,
    pub break_secs: u64,
    pub total_secs: u64,
    pub average_session_secs: u64,
    /// Percentage of sessions that ran to completion, 0.0 .. 100.0.
    pub completion_rate: f64,
}

impl Statistics {
    pub fn compute<Tz: TimeZone>(sessions: &[TimerSession], period: Period, now: &DateTime<Tz>) -> Self {
        let selected: Vec<&TimerSession> = sessions
            .iter()
            .filter(|s| in_period(s, period, now))
            .collect();

        let mut stats = Statistics {
            period,
            total_sessions: selected.len() as u64,
            completed_sessions: 0,
            skipped_sessions: 0,
            focus_sessions: 0,
            short_breaks: 0,
            long_breaks: 0,
            focus_secs: 0,
            break_secs: 0,
            total_secs: 0,
            average_session_secs: 0,
            completion_rate: 0.0,
        };

        for session in &selected {
            if session.was_completed {
                stats.completed_sessions += 1;
            } else {
                stats.skipped_sessions += 1;
            }
            match session.session_type {
                SessionType::Focus => {
                    stats.focus_sessions += 1;
                    stats.focus_secs += session.duration_secs;
                }
                SessionType::ShortBreak => {
                    stats.short_breaks += 1;
                    stats.break_secs += session.duration_secs;
                }
                SessionType::LongBreak => {
                    stats.long_breaks += 1;
                    stats.break_secs += session.duration_secs;
                }
            }
            stats.total_secs += session.duration_secs;
        }

        if stats.total_sessions > 0 {
            stats.average_session_secs = stats.total_secs / stats.total_sessions;
            stats.completion_rate =
                stats.completed_sessions as f64 / stats.total_sessions as f64 * 100.0;
        }
        stats
    }
}

fn in_period<Tz: TimeZone>(session: &TimerSession, period: Period, now: &DateTime<Tz>) -> bool {
    let at = session.completed_at.with_timezone(&now.timezone());
    match period {
        Period::Today => at.date_naive() == now.date_naive(),
        Period::Week => at >= now.clone() - Duration::days(7),
        Period::Month => at >= now.clone() - Duration::days(30),
        Period::All => true,
    }
}

/// Today's focus numbers, as shown on a widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaySummary {
    /// Focus sessions that ran to completion today.
    pub completed_focus: u32,
    /// Seconds counted in Focus sessions today, skipped ones included.
    pub focus_secs: u64,
}

pub fn today_summary<Tz: TimeZone>(sessions: &[TimerSession], now: &DateTime<Tz>) -> TodaySummary {
    let today = now.date_naive();
    sessions
        .iter()
        .filter(|s| s.session_type == SessionType::Focus)
        .filter(|s| s.completed_at.with_timezone(&now.timezone()).date_naive() == today)
        .fold(TodaySummary::default(), |mut acc, s| {
            if s.was_completed {
                acc.completed_focus += 1;
            }
            acc.focus_secs += s.duration_secs;
            acc
        })
}

fn completed_days<Tz: TimeZone>(sessions: &[TimerSession], tz: &Tz) -> BTreeSet<NaiveDate> {
    sessions
        .iter()
        .filter(|s| s.was_completed)
        .map(|s| s.completed_at.with_timezone(tz).date_naive())
        .collect()
}

/// Consecutive days, counting back from today, with at least one completed
/// session. Zero when today has none.
pub fn current_streak<Tz: TimeZone>(sessions: &[TimerSession], now: &DateTime<Tz>) -> u32 {
    let days = completed_days(sessions, &now.timezone());
    let mut day = now.date_naive();
    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive days with at least one completed session.
pub fn longest_streak<Tz: TimeZone>(sessions: &[TimerSession], tz: &Tz) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in completed_days(sessions, tz) {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakStatistics {
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl StreakStatistics {
    pub fn compute<Tz: TimeZone>(sessions: &[TimerSession], now: &DateTime<Tz>) -> Self {
        Self {
            current_streak: current_streak(sessions, now),
            longest_streak: longest_streak(sessions, &now.timezone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap()
    }

    fn focus(day: u32, completed: bool, secs: u64) -> TimerSession {
        let mut s = TimerSession::completed(SessionType::Focus, secs, at(day, 9));
        s.was_completed = completed;
        s
    }

    #[test]
    fn computes_counts_and_completion_rate() {
        let sessions = vec![
            focus(10, true, 1500),
            focus(10, false, 600),
            TimerSession::completed(SessionType::ShortBreak, 300, at(10, 10)),
            TimerSession::completed(SessionType::LongBreak, 900, at(10, 11)),
        ];
        let stats = Statistics::compute(&sessions, Period::All, &at(10, 12));
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.completed_sessions, 3);
        assert_eq!(stats.skipped_sessions, 1);
        assert_eq!(stats.focus_secs, 2100);
        assert_eq!(stats.break_secs, 1200);
        assert_eq!(stats.average_session_secs, 3300 / 4);
        assert!((stats.completion_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_history_has_zero_rate() {
        let stats = Statistics::compute(&[], Period::Today, &Utc::now());
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn period_filters_by_day_and_window() {
        let sessions = vec![focus(1, true, 1500), focus(8, true, 1500), focus(10, true, 1500)];
        let now = at(10, 12);
        assert_eq!(Statistics::compute(&sessions, Period::Today, &now).total_sessions, 1);
        assert_eq!(Statistics::compute(&sessions, Period::Week, &now).total_sessions, 2);
        assert_eq!(Statistics::compute(&sessions, Period::Month, &now).total_sessions, 3);
    }

    #[test]
    fn month_is_thirty_days_not_a_calendar_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let sessions = vec![
            TimerSession::completed(SessionType::Focus, 1500, now - Duration::days(29)),
            TimerSession::completed(SessionType::Focus, 1500, now - Duration::days(31)),
        ];
        let stats = Statistics::compute(&sessions, Period::Month, &now);
        assert_eq!(stats.total_sessions, 1);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let sessions = vec![focus(7, true, 1500), focus(8, true, 1500), focus(9, true, 1500), focus(10, true, 1500)];
        assert_eq!(current_streak(&sessions, &at(10, 20)), 4);
        assert_eq!(current_streak(&sessions, &at(11, 8)), 0);
    }

    #[test]
    fn skipped_sessions_do_not_extend_streak() {
        let sessions = vec![focus(9, true, 1500), focus(10, false, 100)];
        assert_eq!(current_streak(&sessions, &at(10, 20)), 0);
    }

    #[test]
    fn longest_streak_finds_best_run() {
        let sessions = vec![
            focus(1, true, 1500),
            focus(2, true, 1500),
            focus(3, true, 1500),
            focus(5, true, 1500),
            focus(6, true, 1500),
        ];
        assert_eq!(longest_streak(&sessions, &Utc), 3);
    }

    #[test]
    fn today_summary_counts_completed_focus_only() {
        let sessions = vec![
            focus(10, true, 1500),
            focus(10, false, 200),
            focus(9, true, 1500),
            TimerSession::completed(SessionType::ShortBreak, 300, at(10, 10)),
        ];
        let summary = today_summary(&sessions, &at(10, 23));
        assert_eq!(summary.completed_focus, 1);
        assert_eq!(summary.focus_secs, 1700);
    }
}

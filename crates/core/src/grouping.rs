//! Time bucketing for the session list.
//!
//! Buckets are computed from calendar days in the caller's time zone: the
//! boundary instant of each bucket is local midnight, and an `updated_at`
//! exactly on a boundary belongs to the more recent bucket.

use std::cmp::Reverse;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::Serialize;

use crate::Session;

/// Label of one bucket of the session list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeBucket {
    Today,
    Yesterday,
    Previous7Days,
    Previous30Days,
    Month { year: i32, month: u32 },
    /// Sessions without an `updated_at`.
    Older,
}

impl TimeBucket {
    /// Picks the bucket for a calendar day relative to `today`.
    pub fn for_day(day: NaiveDate, today: NaiveDate) -> Self {
        let days_ago = (today - day).num_days();
        match days_ago {
            i64::MIN..=0 => Self::Today,
            1 => Self::Yesterday,
            2..=7 => Self::Previous7Days,
            8..=30 => Self::Previous30Days,
            _ => Self::Month {
                year: day.year(),
                month: day.month(),
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Today => "Today".to_string(),
            Self::Yesterday => "Yesterday".to_string(),
            Self::Previous7Days => "Previous 7 Days".to_string(),
            Self::Previous30Days => "Previous 30 Days".to_string(),
            Self::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|first| first.format("%B %Y").to_string())
                .unwrap_or_else(|| format!("{year}-{month:02}")),
            Self::Older => "Older".to_string(),
        }
    }

    fn sort_key(&self) -> (u8, Reverse<(i32, u32)>) {
        match self {
            Self::Today => (0, Reverse((0, 0))),
            Self::Yesterday => (1, Reverse((0, 0))),
            Self::Previous7Days => (2, Reverse((0, 0))),
            Self::Previous30Days => (3, Reverse((0, 0))),
            Self::Month { year, month } => (4, Reverse((*year, *month))),
            Self::Older => (5, Reverse((0, 0))),
        }
    }
}

impl Ord for TimeBucket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for TimeBucket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A non-empty bucket and its sessions in server list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionGroup {
    pub bucket: TimeBucket,
    pub sessions: Vec<Session>,
}

/// Position of a session inside [`GroupedSessions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLocation {
    pub bucket: TimeBucket,
    pub index: usize,
}

/// Ordered, non-empty buckets of sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedSessions {
    groups: Vec<SessionGroup>,
}

impl GroupedSessions {
    pub fn groups(&self) -> &[SessionGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of sessions across all buckets.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.sessions.len()).sum()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Sessions in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.groups.iter().flat_map(|group| group.sessions.iter())
    }

    pub fn find(&self, id: &str) -> Option<SessionLocation> {
        self.groups.iter().find_map(|group| {
            group
                .sessions
                .iter()
                .position(|session| session.id == id)
                .map(|index| SessionLocation {
                    bucket: group.bucket,
                    index,
                })
        })
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.iter().find(|session| session.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.sessions.iter_mut())
            .find(|session| session.id == id)
    }

    /// Writes `session` back at `location`. Returns false when the slot no
    /// longer exists.
    pub fn replace_at(&mut self, location: SessionLocation, session: Session) -> bool {
        let Some(slot) = self
            .groups
            .iter_mut()
            .find(|group| group.bucket == location.bucket)
            .and_then(|group| group.sessions.get_mut(location.index))
        else {
            return false;
        };
        *slot = session;
        true
    }
}

impl<'a> IntoIterator for &'a GroupedSessions {
    type Item = &'a SessionGroup;
    type IntoIter = std::slice::Iter<'a, SessionGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Groups sessions into ordered time buckets relative to `now`.
///
/// Total and deterministic for a given `(sessions, now)`: empty buckets are
/// omitted and relative order inside a bucket follows the input.
pub fn group_sessions_by_time<Tz: TimeZone>(
    sessions: Vec<Session>,
    now: &DateTime<Tz>,
) -> GroupedSessions {
    let zone = now.timezone();
    let today = now.date_naive();
    let mut groups: Vec<SessionGroup> = Vec::new();

    for session in sessions {
        let bucket = match session.updated_at {
            Some(updated_at) => {
                TimeBucket::for_day(updated_at.with_timezone(&zone).date_naive(), today)
            }
            None => TimeBucket::Older,
        };
        match groups.iter_mut().find(|group| group.bucket == bucket) {
            Some(group) => group.sessions.push(session),
            None => groups.push(SessionGroup {
                bucket,
                sessions: vec![session],
            }),
        }
    }

    groups.sort_by(|a, b| a.bucket.cmp(&b.bucket));
    GroupedSessions { groups }
}

use chrono::{DateTime, Duration, DurationRound, Utc};

/// The `[entry, exit)` interval a reservation occupies, aligned to whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitWindow {
    pub entry: DateTime<Utc>,
    pub exit: DateTime<Utc>,
}

impl VisitWindow {
    pub fn new(entry_time: DateTime<Utc>, stay_hours: i32) -> Self {
        let entry = truncate_to_hour(entry_time);
        let exit = entry + Duration::hours(i64::from(stay_hours.max(1)));
        Self { entry, exit }
    }

    /// Every whole hour the visit occupies, entry hour first.
    pub fn hours(&self) -> impl Iterator<Item = DateTime<Utc>> {
        let VisitWindow { entry, exit } = *self;
        (0..)
            .map(move |offset| entry + Duration::hours(offset))
            .take_while(move |hour| *hour < exit)
    }

    pub fn covers(&self, hour: DateTime<Utc>) -> bool {
        self.entry <= hour && hour < self.exit
    }
}

pub fn truncate_to_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(Duration::hours(1)).unwrap_or(time)
}

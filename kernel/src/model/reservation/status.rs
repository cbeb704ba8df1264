use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
    WaitNotify,
    Notified,
    Confirmed,
    InPark,
    Completed,
    Cancelled,
    TimePassed,
    InWaitlist,
    NotifiedWaitlisted,
    Irrelevant,
}

/// What moved a reservation. Paired with the current status by
/// [`ReservationStatus::apply`] to produce the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StatusTransition {
    Notify,
    Confirm,
    CheckIn,
    CheckOut,
    Cancel,
    ExpireNotification,
    Promote,
    Lapse,
    Discard,
}

impl ReservationStatus {
    /// Statuses whose party size counts against a park's capacity.
    pub const CAPACITY_HOLDING: [ReservationStatus; 5] = [
        ReservationStatus::WaitNotify,
        ReservationStatus::Notified,
        ReservationStatus::NotifiedWaitlisted,
        ReservationStatus::Confirmed,
        ReservationStatus::InPark,
    ];

    pub fn holds_capacity(self) -> bool {
        Self::CAPACITY_HOLDING.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        use ReservationStatus::*;
        match self {
            Completed | Cancelled | TimePassed | Irrelevant => true,
            WaitNotify | Notified | Confirmed | InPark | InWaitlist | NotifiedWaitlisted => false,
        }
    }

    pub fn is_waitlisted(self) -> bool {
        matches!(
            self,
            ReservationStatus::InWaitlist | ReservationStatus::NotifiedWaitlisted
        )
    }

    /// Discard-and-rebook is allowed until the visitor has entered.
    pub fn is_rebookable(self) -> bool {
        !self.is_terminal() && self != ReservationStatus::InPark
    }

    pub fn apply(self, transition: StatusTransition) -> AppResult<ReservationStatus> {
        use ReservationStatus::*;
        use StatusTransition::*;
        let next = match (self, transition) {
            (WaitNotify, Notify) => Notified,
            (Notified | NotifiedWaitlisted, Confirm) => Confirmed,
            (Confirmed, CheckIn) => InPark,
            (InPark, CheckOut) => Completed,
            (WaitNotify | Notified | Confirmed | InWaitlist | NotifiedWaitlisted, Cancel) => {
                Cancelled
            }
            (Notified | NotifiedWaitlisted, ExpireNotification) => Cancelled,
            (InWaitlist, Promote) => NotifiedWaitlisted,
            (WaitNotify | Confirmed, Lapse) => TimePassed,
            (InWaitlist | NotifiedWaitlisted, Discard) => Irrelevant,
            (
                WaitNotify | Notified | Confirmed | InPark | Completed | Cancelled | TimePassed
                | InWaitlist | NotifiedWaitlisted | Irrelevant,
                Notify | Confirm | CheckIn | CheckOut | Cancel | ExpireNotification | Promote
                | Lapse | Discard,
            ) => {
                return Err(AppError::StateConflict(format!(
                    "cannot {transition} a reservation in state {self}"
                )))
            }
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;
    use StatusTransition::*;

    #[test]
    fn happy_path_reaches_completed() {
        let status = WaitNotify
            .apply(Notify)
            .and_then(|s| s.apply(Confirm))
            .and_then(|s| s.apply(CheckIn))
            .and_then(|s| s.apply(CheckOut))
            .unwrap();
        assert_eq!(status, Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn waitlist_branch() {
        assert_eq!(InWaitlist.apply(Promote).unwrap(), NotifiedWaitlisted);
        assert_eq!(NotifiedWaitlisted.apply(Confirm).unwrap(), Confirmed);
        assert_eq!(NotifiedWaitlisted.apply(Discard).unwrap(), Irrelevant);
        assert_eq!(InWaitlist.apply(Discard).unwrap(), Irrelevant);
    }

    #[test]
    fn cancel_is_refused_once_inside_the_park() {
        for status in [WaitNotify, Notified, Confirmed, InWaitlist, NotifiedWaitlisted] {
            assert_eq!(status.apply(Cancel).unwrap(), Cancelled);
        }
        assert!(matches!(InPark.apply(Cancel), Err(AppError::StateConflict(_))));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        let transitions = [
            Notify,
            Confirm,
            CheckIn,
            CheckOut,
            Cancel,
            ExpireNotification,
            Promote,
            Lapse,
            Discard,
        ];
        for status in [Completed, Cancelled, TimePassed, Irrelevant] {
            for transition in transitions {
                assert!(status.apply(transition).is_err(), "{status} accepted {transition}");
            }
        }
    }

    #[test]
    fn confirming_a_cancelled_reservation_is_a_conflict() {
        let err = Cancelled.apply(Confirm).unwrap_err();
        assert_eq!(err.to_string(), "cannot confirm a reservation in state cancelled");
    }

    #[test]
    fn round_trips_through_its_stored_name() {
        assert_eq!(NotifiedWaitlisted.as_ref(), "notified_waitlisted");
        assert_eq!("in_park".parse::<ReservationStatus>().unwrap(), InPark);
    }

    #[test]
    fn capacity_holding_excludes_waitlist_and_terminal_states() {
        assert!(NotifiedWaitlisted.holds_capacity());
        assert!(!InWaitlist.holds_capacity());
        assert!(!Cancelled.holds_capacity());
    }
}

use crate::model::IncidentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Failure,
    Success,
    Acknowledge,
    Resolve,
}

/// What a signal does to the latest non-resolved incident of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    Increment,
    Absorb,
    Acknowledge,
    Resolve,
    Ignore,
}

impl Step {
    pub fn next(active: Option<IncidentStatus>, signal: Signal) -> Self {
        use IncidentStatus::{Acknowledged, Open, Resolved};

        match (active, signal) {
            (None | Some(Resolved), Signal::Failure) => Self::Create,
            (Some(Open), Signal::Failure) => Self::Increment,
            (Some(Acknowledged), Signal::Failure) => Self::Absorb,

            (Some(Open | Acknowledged), Signal::Success | Signal::Resolve) => Self::Resolve,
            (None | Some(Resolved), Signal::Success | Signal::Resolve) => Self::Ignore,

            (Some(Open), Signal::Acknowledge) => Self::Acknowledge,
            (_, Signal::Acknowledge) => Self::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IncidentStatus::*;

    #[test]
    fn first_failure_creates() {
        assert_eq!(Step::next(None, Signal::Failure), Step::Create);
        assert_eq!(Step::next(Some(Resolved), Signal::Failure), Step::Create);
    }

    #[test]
    fn failure_while_open_increments() {
        assert_eq!(Step::next(Some(Open), Signal::Failure), Step::Increment);
    }

    #[test]
    fn failure_while_acknowledged_is_absorbed() {
        assert_eq!(Step::next(Some(Acknowledged), Signal::Failure), Step::Absorb);
    }

    #[test]
    fn success_resolves_any_active() {
        assert_eq!(Step::next(Some(Open), Signal::Success), Step::Resolve);
        assert_eq!(Step::next(Some(Acknowledged), Signal::Success), Step::Resolve);
        assert_eq!(Step::next(None, Signal::Success), Step::Ignore);
    }

    #[test]
    fn acknowledge_only_from_open() {
        assert_eq!(Step::next(Some(Open), Signal::Acknowledge), Step::Acknowledge);
        assert_eq!(Step::next(Some(Acknowledged), Signal::Acknowledge), Step::Ignore);
        assert_eq!(Step::next(None, Signal::Acknowledge), Step::Ignore);
    }

    #[test]
    fn operator_resolve_matches_success() {
        for active in [None, Some(Open), Some(Acknowledged)] {
            assert_eq!(
                Step::next(active, Signal::Resolve),
                Step::next(active, Signal::Success)
            );
        }
    }
}

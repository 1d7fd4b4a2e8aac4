//! Adaptive poll frequency.
//!
//! The closer the wake-up gets, the more often the route is re-checked. The
//! bands cascade: the hour bands are tested first and the minute bands only
//! apply once less than an hour is left. Each band includes its upper bound.

use time::Duration;

const FIVE_HOURS: Duration = Duration::hours(5);
const ONE_HOUR: Duration = Duration::hours(1);
const THIRTY_MINUTES: Duration = Duration::minutes(30);
const FIFTEEN_MINUTES: Duration = Duration::minutes(15);
const TEN_MINUTES: Duration = Duration::minutes(10);

/// Delay until the next poll, given how long is left until the optimal
/// wake-up. A negative input falls through to the shortest delay.
pub fn select_delay(time_until_alarm: Duration) -> Duration {
    if time_until_alarm > FIVE_HOURS {
        Duration::minutes(90)
    } else if time_until_alarm > ONE_HOUR {
        Duration::minutes(30)
    } else if time_until_alarm > THIRTY_MINUTES {
        Duration::minutes(10)
    } else if time_until_alarm > FIFTEEN_MINUTES {
        Duration::minutes(5)
    } else if time_until_alarm > TEN_MINUTES {
        Duration::minutes(2)
    } else {
        Duration::minutes(1)
    }
}

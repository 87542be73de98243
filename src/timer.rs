//! Deterministic alarm scheduling on a logical clock
//!
//! The engine never reads wall-clock time. Hosts advance a session by
//! reporting elapsed time, and this module turns those reports into alarm
//! deliveries in a fixed order: earliest deadline first, ties broken by
//! scheduling order. Repeating alarms catch up one firing per elapsed
//! period, so a session behaves identically whether the host pumps it
//! every frame or once a second.

use derive_where::derive_where;
use web_time::Duration;

/// Handle identifying a scheduled alarm so it can be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A single scheduled alarm
#[derive(Debug, Clone)]
struct Entry<M> {
    /// Handle returned to the scheduler
    handle: TimerHandle,
    /// Logical time at which the alarm becomes due
    due: Duration,
    /// Firing period for repeating alarms
    period: Option<Duration>,
    /// Message delivered when the alarm fires
    message: M,
}

/// Alarm queue driven by host-reported elapsed time
///
/// Time only moves when [`Timers::advance`] is called, and due alarms are
/// only delivered when [`Timers::pop_due`] is drained. Both operations are
/// deterministic, which is what makes sessions snapshot-safe: a restored
/// session re-arms its alarms and replays exactly.
#[derive_where(Default)]
#[derive(Debug, Clone)]
pub struct Timers<M> {
    /// Current logical time, starting at zero
    now: Duration,
    /// Source of the next handle, incremented per scheduled alarm
    next_handle: u64,
    /// Pending alarms in scheduling order
    entries: Vec<Entry<M>>,
}

impl<M> Timers<M> {
    /// Returns the current logical time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedules a one-shot alarm to fire after the given delay
    pub fn schedule(&mut self, delay: Duration, message: M) -> TimerHandle {
        let due = self.now + delay;
        self.insert(due, None, message)
    }

    /// Schedules a repeating alarm firing once per interval
    ///
    /// The first firing happens one full interval from now. A zero
    /// interval would never stop firing, so it degrades to a one-shot.
    pub fn schedule_repeating(&mut self, interval: Duration, message: M) -> TimerHandle {
        let due = self.now + interval;
        let period = (!interval.is_zero()).then_some(interval);
        self.insert(due, period, message)
    }

    fn insert(&mut self, due: Duration, period: Option<Duration>, message: M) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push(Entry {
            handle,
            due,
            period,
            message,
        });
        handle
    }

    /// Cancels the alarm with the given handle
    ///
    /// Returns true if the alarm was still pending. Cancelling an alarm
    /// that already fired or was already cancelled is a harmless no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() < before
    }

    /// Cancels every pending alarm without touching the clock
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Moves the logical clock forward by the elapsed time
    ///
    /// Alarms that become due are not delivered here; callers drain them
    /// with [`Timers::pop_due`] so that handling one alarm can schedule
    /// or cancel others before the next is delivered.
    pub fn advance(&mut self, elapsed: Duration) {
        self.now += elapsed;
    }

    /// Delivers the next due alarm, if any
    ///
    /// Alarms are delivered in (deadline, scheduling order). A repeating
    /// alarm is re-armed one period later before being delivered, so a
    /// large advance drains one delivery per elapsed period.
    pub fn pop_due(&mut self) -> Option<M>
    where
        M: Clone,
    {
        let position = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= self.now)
            .min_by_key(|(_, entry)| (entry.due, entry.handle.0))
            .map(|(position, _)| position)?;

        match self.entries[position].period {
            Some(period) => {
                let entry = &mut self.entries[position];
                entry.due += period;
                Some(entry.message.clone())
            }
            None => Some(self.entries.remove(position).message),
        }
    }

    /// Returns the earliest pending deadline on the logical clock
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    /// Returns the number of pending alarms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no alarms are pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_is_not_due_before_its_deadline() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(100), "later");

        timers.advance(Duration::from_millis(99));

        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn test_alarm_fires_at_its_deadline() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(100), "now");

        timers.advance(Duration::from_millis(100));

        assert_eq!(timers.pop_due(), Some("now"));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_alarms_fire_in_deadline_order() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(300), "third");
        timers.schedule(Duration::from_millis(100), "first");
        timers.schedule(Duration::from_millis(200), "second");

        timers.advance(Duration::from_millis(300));

        assert_eq!(timers.pop_due(), Some("first"));
        assert_eq!(timers.pop_due(), Some("second"));
        assert_eq!(timers.pop_due(), Some("third"));
        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn test_simultaneous_alarms_fire_in_scheduling_order() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(100), "earlier");
        timers.schedule(Duration::from_millis(100), "later");

        timers.advance(Duration::from_millis(100));

        assert_eq!(timers.pop_due(), Some("earlier"));
        assert_eq!(timers.pop_due(), Some("later"));
    }

    #[test]
    fn test_cancelled_alarm_never_fires() {
        let mut timers = Timers::default();
        let handle = timers.schedule(Duration::from_millis(100), "cancelled");

        assert!(timers.cancel(handle));
        timers.advance(Duration::from_millis(200));

        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut timers = Timers::default();
        let handle = timers.schedule(Duration::from_millis(100), "once");

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
    }

    #[test]
    fn test_cancel_all_clears_every_alarm() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(100), "a");
        timers.schedule_repeating(Duration::from_millis(50), "b");

        timers.cancel_all();
        timers.cancel_all();
        timers.advance(Duration::from_millis(500));

        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn test_repeating_alarm_catches_up_per_period() {
        let mut timers = Timers::default();
        timers.schedule_repeating(Duration::from_millis(100), "tick");

        timers.advance(Duration::from_millis(350));

        assert_eq!(timers.pop_due(), Some("tick"));
        assert_eq!(timers.pop_due(), Some("tick"));
        assert_eq!(timers.pop_due(), Some("tick"));
        assert_eq!(timers.pop_due(), None);

        timers.advance(Duration::from_millis(50));

        assert_eq!(timers.pop_due(), Some("tick"));
    }

    #[test]
    fn test_zero_interval_repeating_degrades_to_one_shot() {
        let mut timers = Timers::default();
        timers.schedule_repeating(Duration::ZERO, "once");

        assert_eq!(timers.pop_due(), Some("once"));
        assert_eq!(timers.pop_due(), None);
    }

    #[test]
    fn test_delay_is_measured_from_the_current_clock() {
        let mut timers = Timers::default();
        timers.advance(Duration::from_millis(500));
        timers.schedule(Duration::from_millis(100), "late");

        timers.advance(Duration::from_millis(99));
        assert_eq!(timers.pop_due(), None);

        timers.advance(Duration::from_millis(1));
        assert_eq!(timers.pop_due(), Some("late"));
    }

    #[test]
    fn test_next_due_reports_the_earliest_deadline() {
        let mut timers = Timers::default();
        assert_eq!(timers.next_due(), None);

        timers.schedule(Duration::from_millis(300), "late");
        timers.schedule(Duration::from_millis(100), "early");
        assert_eq!(timers.next_due(), Some(Duration::from_millis(100)));

        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.pop_due(), Some("early"));
        assert_eq!(timers.next_due(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_handler_driven_rescheduling_stays_ordered() {
        let mut timers = Timers::default();
        timers.schedule(Duration::from_millis(100), "first");

        timers.advance(Duration::from_millis(250));

        // Draining one alarm and scheduling the next from its handler
        // keeps delivery deterministic even when the clock ran ahead.
        assert_eq!(timers.pop_due(), Some("first"));
        timers.schedule(Duration::from_millis(50), "second");
        assert_eq!(timers.pop_due(), None);

        timers.advance(Duration::from_millis(50));
        assert_eq!(timers.pop_due(), Some("second"));
    }
}

//! Scheduler — per-second ticks, periodic jobs and one-shot timers.
//!
//! The scheduler does not own a thread. Something (the daemon's interval,
//! or a test) calls [`Scheduler::tick`]; each call evaluates every whole
//! second since the previous call, in order. For each second:
//!
//! 1. one-shot timers whose deadline has passed fire, earliest first;
//! 2. `second` is published, plus `minute` / `hour` on those boundaries;
//! 3. periodic jobs due at that second run in registration order.
//!
//! Job and timer failures are logged and do not stop the tick: one broken
//! scenario must not starve the others.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use chrono::{Datelike, TimeDelta, Timelike};
use serde_json::{Value, json};
use tracing::{error, trace, warn};
use tripwire_domain::calendar::day_name;
use tripwire_domain::error::TripwireError;
use tripwire_domain::id::{JobId, TimerId};
use tripwire_domain::schedule::Schedule;
use tripwire_domain::time::{TimeOfDay, WallClock};

use crate::clock::add;
use crate::ports::{Clock, EventPublisher};

pub const SECOND_TOPIC: &str = "second";
pub const MINUTE_TOPIC: &str = "minute";
pub const HOUR_TOPIC: &str = "hour";

/// Largest clock jump replayed second by second.
pub const DEFAULT_MAX_CATCH_UP_SECS: u32 = 300;

/// Work run by the scheduler.
pub type Job = Rc<dyn Fn() -> Result<(), TripwireError>>;

#[derive(Clone)]
struct PeriodicJob {
    id: JobId,
    schedule: Schedule,
    run: Job,
}

struct Timer {
    id: TimerId,
    deadline: WallClock,
    run: Job,
}

struct SchedulerInner {
    clock: Rc<dyn Clock>,
    publisher: Rc<dyn EventPublisher>,
    jobs: RefCell<Vec<PeriodicJob>>,
    timers: RefCell<Vec<Timer>>,
    last_tick: Cell<Option<WallClock>>,
    current: Cell<Option<WallClock>>,
    max_catch_up: Cell<u32>,
}

/// Shared scheduler handle.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(clock: Rc<dyn Clock>, publisher: Rc<dyn EventPublisher>) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                clock,
                publisher,
                jobs: RefCell::default(),
                timers: RefCell::default(),
                last_tick: Cell::new(None),
                current: Cell::new(None),
                max_catch_up: Cell::new(DEFAULT_MAX_CATCH_UP_SECS),
            }),
        }
    }

    /// Clock jumps larger than this are not replayed; only the latest
    /// second is evaluated.
    pub fn set_max_catch_up(&self, seconds: u32) {
        self.inner.max_catch_up.set(seconds);
    }

    #[must_use]
    pub fn now(&self) -> WallClock {
        self.inner.clock.now()
    }

    /// The second being evaluated while a tick runs, otherwise [`now`](Self::now).
    ///
    /// During catch-up this lags the clock.
    #[must_use]
    pub fn tick_time(&self) -> WallClock {
        self.inner.current.get().unwrap_or_else(|| self.now())
    }

    /// Run `job` whenever `schedule` is due.
    pub fn every(
        &self,
        schedule: Schedule,
        job: impl Fn() -> Result<(), TripwireError> + 'static,
    ) -> JobId {
        let id = JobId::new();
        trace!(job = %id, expression = %schedule.expression(), "periodic job registered");
        self.inner.jobs.borrow_mut().push(PeriodicJob {
            id,
            schedule,
            run: Rc::new(job),
        });
        id
    }

    /// Stop a periodic job. Returns `false` if it was unknown.
    pub fn remove(&self, id: JobId) -> bool {
        let mut jobs = self.inner.jobs.borrow_mut();
        let before = jobs.len();
        jobs.retain(|job| job.id != id);
        jobs.len() != before
    }

    /// Run `job` once, the first tick at or after `now + delay`.
    pub fn once(
        &self,
        delay: Duration,
        job: impl Fn() -> Result<(), TripwireError> + 'static,
    ) -> TimerId {
        let id = TimerId::new();
        let deadline = add(self.now(), delay);
        trace!(timer = %id, %deadline, "timer armed");
        self.inner.timers.borrow_mut().push(Timer {
            id,
            deadline,
            run: Rc::new(job),
        });
        id
    }

    /// Disarm a pending timer. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut timers = self.inner.timers.borrow_mut();
        let before = timers.len();
        timers.retain(|timer| timer.id != id);
        timers.len() != before
    }

    #[must_use]
    pub fn job_count(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Evaluate every second elapsed since the previous tick.
    ///
    /// Returns how many seconds were evaluated.
    pub fn tick(&self) -> usize {
        let now = self.now();
        let (first, count) = self.steps_until(truncate(now));
        for offset in 0..count {
            self.run_second(first + TimeDelta::seconds(offset));
        }
        // Sub-second deadlines that are already due.
        self.fire_timers(now);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// First second to evaluate and how many follow it.
    fn steps_until(&self, now: WallClock) -> (WallClock, i64) {
        let last = self.inner.last_tick.replace(Some(now));
        let Some(last) = last else {
            return (now, 1);
        };
        if now == last {
            return (now, 0);
        }
        if now < last {
            warn!(%last, %now, "clock moved backwards");
            return (now, 1);
        }
        let gap = (now - last).num_seconds();
        let max = i64::from(self.inner.max_catch_up.get());
        if gap > max {
            warn!(gap_secs = gap, max_catch_up_secs = max, "clock jump too large, skipping ahead");
            return (now, 1);
        }
        (last + TimeDelta::seconds(1), gap)
    }

    fn run_second(&self, at: WallClock) {
        let outer = self.inner.current.replace(Some(at));
        self.step(at);
        self.inner.current.set(outer);
    }

    fn step(&self, at: WallClock) {
        self.fire_timers(at);

        let payload = [tick_payload(at)];
        self.notify(SECOND_TOPIC, &payload);
        if at.second() == 0 {
            self.notify(MINUTE_TOPIC, &payload);
            if at.minute() == 0 {
                self.notify(HOUR_TOPIC, &payload);
            }
        }

        let due: Vec<PeriodicJob> = self
            .inner
            .jobs
            .borrow()
            .iter()
            .filter(|job| job.schedule.is_due(at))
            .cloned()
            .collect();
        for job in due {
            if let Err(err) = (job.run)() {
                error!(
                    job = %job.id,
                    schedule = %job.schedule,
                    error = ?err,
                    "scheduled job failed"
                );
            }
        }
    }

    fn fire_timers(&self, at: WallClock) {
        let mut due = {
            let mut timers = self.inner.timers.borrow_mut();
            let (due, pending): (Vec<Timer>, Vec<Timer>) =
                timers.drain(..).partition(|timer| timer.deadline <= at);
            *timers = pending;
            due
        };
        due.sort_by_key(|timer| timer.deadline);
        for timer in due {
            if let Err(err) = (timer.run)() {
                error!(timer = %timer.id, error = ?err, "timer failed");
            }
        }
    }

    fn notify(&self, topic: &str, payload: &[Value]) {
        if let Err(err) = self.inner.publisher.publish(topic, payload) {
            error!(topic, error = ?err, "tick subscriber failed");
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.job_count())
            .field("pending_timers", &self.pending_timers())
            .field("last_tick", &self.inner.last_tick.get())
            .finish_non_exhaustive()
    }
}

fn truncate(at: WallClock) -> WallClock {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Payload published with `second` / `minute` / `hour`.
#[must_use]
pub fn tick_payload(at: WallClock) -> Value {
    json!({
        "at": at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "time": TimeOfDay::of(at).to_string(),
        "day": day_name(at.weekday()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;
    use tripwire_domain::error::ValidationError;

    #[derive(Default)]
    struct SpyPublisher {
        published: RefCell<Vec<(String, Value)>>,
    }

    impl EventPublisher for SpyPublisher {
        fn publish(&self, topic: &str, args: &[Value]) -> Result<(), TripwireError> {
            let payload = args.first().cloned().unwrap_or(Value::Null);
            self.published.borrow_mut().push((topic.to_string(), payload));
            Ok(())
        }
    }

    impl SpyPublisher {
        fn topics(&self) -> Vec<String> {
            self.published.borrow().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    fn at(hour: u32, minute: u32, second: u32) -> WallClock {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn setup(start: WallClock) -> (ManualClock, Rc<SpyPublisher>, Scheduler) {
        let clock = ManualClock::new(start);
        let spy = Rc::new(SpyPublisher::default());
        let scheduler = Scheduler::new(Rc::new(clock.clone()), spy.clone());
        (clock, spy, scheduler)
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Result<(), TripwireError> + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || {
            inner.set(inner.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn should_fire_two_second_job_on_even_seconds() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        scheduler.every("2 seconds".parse().unwrap(), job);

        scheduler.tick();
        assert_eq!(count.get(), 1);

        clock.advance(Duration::from_secs(1));
        scheduler.tick();
        assert_eq!(count.get(), 1);

        clock.advance(Duration::from_secs(1));
        scheduler.tick();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn should_replay_every_missed_second() {
        let (clock, spy, scheduler) = setup(at(10, 0, 58));
        let (count, job) = counter();
        scheduler.every("second".parse().unwrap(), job);

        scheduler.tick();
        clock.advance(Duration::from_secs(4));
        let evaluated = scheduler.tick();

        assert_eq!(evaluated, 4);
        assert_eq!(count.get(), 5);
        assert_eq!(
            spy.topics().iter().filter(|t| *t == MINUTE_TOPIC).count(),
            1
        );
    }

    #[test]
    fn should_skip_ahead_when_jump_exceeds_catch_up_limit() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        scheduler.set_max_catch_up(10);
        let (count, job) = counter();
        scheduler.every("second".parse().unwrap(), job);

        scheduler.tick();
        clock.advance(Duration::from_secs(3600));
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn should_expose_each_replayed_second_as_tick_time() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handle = scheduler.clone();
        scheduler.every("second".parse().unwrap(), move || {
            sink.borrow_mut().push(handle.tick_time());
            Ok(())
        });

        scheduler.tick();
        clock.advance(Duration::from_secs(2));
        assert_eq!(scheduler.tick(), 2);

        assert_eq!(*seen.borrow(), vec![at(10, 0, 0), at(10, 0, 1), at(10, 0, 2)]);
        assert_eq!(scheduler.tick_time(), clock.now());
    }

    #[test]
    fn should_evaluate_long_gap_within_catch_up_limit() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        scheduler.set_max_catch_up(u32::MAX);
        let (count, job) = counter();
        scheduler.every("hour".parse().unwrap(), job);

        scheduler.tick();
        clock.advance(Duration::from_secs(2 * 3600));

        assert_eq!(scheduler.tick(), 7200);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn should_not_reevaluate_the_same_second() {
        let (_clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        scheduler.every("second".parse().unwrap(), job);

        scheduler.tick();
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_publish_minute_and_hour_on_boundaries() {
        let (clock, spy, scheduler) = setup(at(10, 59, 59));
        scheduler.tick();
        clock.advance(Duration::from_secs(1));
        scheduler.tick();

        assert_eq!(spy.topics(), vec!["second", "second", "minute", "hour"]);
        let (_, payload) = spy.published.borrow()[2].clone();
        assert_eq!(payload["time"], "11:00");
        assert_eq!(payload["day"], "friday");
        assert_eq!(payload["at"], "2026-10-16T11:00:00");
    }

    #[test]
    fn should_fire_one_shot_timer_once_after_delay() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        scheduler.tick();
        scheduler.once(Duration::from_secs(5), job);

        clock.advance(Duration::from_secs(4));
        scheduler.tick();
        assert_eq!(count.get(), 0);
        assert_eq!(scheduler.pending_timers(), 1);

        clock.advance(Duration::from_secs(1));
        scheduler.tick();
        clock.advance(Duration::from_secs(10));
        scheduler.tick();
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn should_fire_sub_second_timer_without_a_new_second() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        scheduler.tick();
        scheduler.once(Duration::from_millis(200), job);

        clock.advance(Duration::from_millis(500));
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_not_fire_cancelled_timer() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        let id = scheduler.once(Duration::from_secs(1), job);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        clock.advance(Duration::from_secs(2));
        scheduler.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn should_isolate_failing_jobs() {
        let (_clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        scheduler.every("second".parse().unwrap(), || {
            Err(ValidationError::EmptyName.into())
        });
        scheduler.every("second".parse().unwrap(), job);

        scheduler.tick();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn should_stop_running_removed_jobs() {
        let (clock, _spy, scheduler) = setup(at(10, 0, 0));
        let (count, job) = counter();
        let id = scheduler.every("second".parse().unwrap(), job);
        scheduler.tick();

        assert!(scheduler.remove(id));
        clock.advance(Duration::from_secs(1));
        scheduler.tick();
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.job_count(), 0);
    }
}

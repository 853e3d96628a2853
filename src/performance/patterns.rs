use std::time::Duration;

/// Starts virtual users at a fixed rate until the target count is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSchedule {
    users: u32,
    spawn_rate: f64,
}

impl SpawnSchedule {
    pub fn new(users: u32, spawn_rate: f64) -> Self {
        Self { users, spawn_rate }
    }

    pub fn users(&self) -> u32 {
        self.users
    }

    /// Offset from the start of the run at which user `index` (zero based) starts.
    pub fn start_offset(&self, index: u32) -> Duration {
        Duration::from_secs_f64(index as f64 / self.spawn_rate)
    }

    /// Number of users that should be running after `elapsed`.
    pub fn users_due(&self, elapsed: Duration) -> u32 {
        let started = (elapsed.as_secs_f64() * self.spawn_rate).floor() + 1.0;
        (started.min(self.users as f64)) as u32
    }

    /// Time until the last user has been started.
    pub fn ramp_duration(&self) -> Duration {
        self.start_offset(self.users.saturating_sub(1))
    }

    /// Get a human-readable description of the current load phase
    pub fn phase_description(&self, elapsed: Duration) -> String {
        let due = self.users_due(elapsed);
        if due < self.users {
            format!("Spawning users ({}/{})", due, self.users)
        } else {
            format!("All {} users running", self.users)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_user_starts_immediately() {
        let schedule = SpawnSchedule::new(100, 10.0);
        assert_eq!(schedule.start_offset(0), Duration::ZERO);
        assert_eq!(schedule.users_due(Duration::ZERO), 1);
    }

    #[test]
    fn test_users_due_follows_rate() {
        let schedule = SpawnSchedule::new(100, 10.0);
        assert_eq!(schedule.users_due(Duration::from_millis(950)), 10);
        assert_eq!(schedule.users_due(Duration::from_secs(1)), 11);
        assert_eq!(schedule.users_due(Duration::from_secs(60)), 100);
        assert_eq!(schedule.start_offset(25), Duration::from_millis(2500));
    }

    #[test]
    fn test_ramp_duration() {
        assert_eq!(
            SpawnSchedule::new(11, 5.0).ramp_duration(),
            Duration::from_secs(2)
        );
        assert_eq!(SpawnSchedule::new(1, 5.0).ramp_duration(), Duration::ZERO);
    }

    #[test]
    fn test_phase_description() {
        let schedule = SpawnSchedule::new(50, 10.0);
        assert_eq!(
            schedule.phase_description(Duration::from_secs(1)),
            "Spawning users (11/50)"
        );
        assert_eq!(
            schedule.phase_description(Duration::from_secs(10)),
            "All 50 users running"
        );
    }
}

//! Simulated actuator controller
//!
//! In-process stand-in for the serial-attached controller, used by
//! `--test` mode and the test suite. Models the firmware's command set
//! and a motor that walks toward its target a fixed number of steps per
//! status poll, so watchers observe realistic Stopped → Moving → Stopped
//! transitions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{LinkError, SerialLink};
use crate::status::{ActuatorStatus, ErrorCode, StatusCode};

/// Steps the simulated motor covers between two status polls
const DEFAULT_STEP_PER_POLL: i64 = 25;

/// Free RAM reported when the simulator starts, bytes
const BASE_FREE_MEMORY: i64 = 1850;

/// Distance used for an open-ended move (`>0` / `<0`) when the soft
/// limits are disabled
const OPEN_ENDED_TRAVEL: i64 = 10_000;

/// Simulated serial link. Never faults; `open` always succeeds.
pub struct SimulatedLink {
    opened: bool,
    target: i64,
    position: i64,
    east_limit: i64,
    west_limit: i64,
    limits_enabled: bool,
    error: ErrorCode,
    step_per_poll: i64,
    rng: StdRng,
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLink {
    /// Create a simulator at position 0 with limits at ±2000, enabled
    pub fn new() -> Self {
        Self {
            opened: false,
            target: 0,
            position: 0,
            east_limit: 2000,
            west_limit: -2000,
            limits_enabled: true,
            error: ErrorCode::None,
            step_per_poll: DEFAULT_STEP_PER_POLL,
            rng: StdRng::from_entropy(),
        }
    }

    /// Override how far the motor travels between status polls
    pub fn with_step_per_poll(mut self, steps: i64) -> Self {
        self.step_per_poll = steps.max(1);
        self
    }

    fn clamp_to_limits(&self, target: i64) -> i64 {
        if self.limits_enabled {
            target.clamp(self.west_limit, self.east_limit)
        } else {
            target
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.target.cmp(&self.position) {
            std::cmp::Ordering::Equal => StatusCode::Stopped,
            std::cmp::Ordering::Greater => StatusCode::MovingEast,
            std::cmp::Ordering::Less => StatusCode::MovingWest,
        }
    }

    /// Advance the motor one poll interval's worth of travel
    fn step(&mut self) {
        let delta = self.target - self.position;
        let step = delta.clamp(-self.step_per_poll, self.step_per_poll);
        self.position += step;
    }

    fn snapshot(&mut self) -> ActuatorStatus {
        ActuatorStatus {
            status: self.status_code(),
            error: self.error,
            target: self.target,
            position: self.position,
            east_limit: self.east_limit,
            west_limit: self.west_limit,
            limits_enabled: self.limits_enabled,
            free_memory: BASE_FREE_MEMORY + self.rng.gen_range(-30..=30),
        }
    }

    /// Interpret one firmware command and produce the reply line
    fn handle(&mut self, command: &str) -> String {
        let command = command.trim();
        if command == "?" {
            self.step();
            return self.snapshot().to_string();
        }
        if command.is_empty() || !command.is_ascii() {
            return "ERR?".to_string();
        }

        match command.split_at(1) {
            ("H", "") => {
                self.target = self.position;
                "OK".to_string()
            }
            (">", steps) => match steps.parse::<i64>() {
                Ok(0) => {
                    let open_end = if self.limits_enabled {
                        self.east_limit
                    } else {
                        self.position + OPEN_ENDED_TRAVEL
                    };
                    self.target = open_end;
                    "OK".to_string()
                }
                Ok(n) if n > 0 => {
                    self.target = self.clamp_to_limits(self.position + n);
                    "OK".to_string()
                }
                _ => "ERR?".to_string(),
            },
            ("<", steps) => match steps.parse::<i64>() {
                Ok(0) => {
                    let open_end = if self.limits_enabled {
                        self.west_limit
                    } else {
                        self.position - OPEN_ENDED_TRAVEL
                    };
                    self.target = open_end;
                    "OK".to_string()
                }
                Ok(n) if n > 0 => {
                    self.target = self.clamp_to_limits(self.position - n);
                    "OK".to_string()
                }
                _ => "ERR?".to_string(),
            },
            ("G", pos) => match pos.parse::<i64>() {
                Ok(n) => {
                    self.target = self.clamp_to_limits(n);
                    "OK".to_string()
                }
                Err(_) => "ERR?".to_string(),
            },
            ("P", pos) => match pos.parse::<i64>() {
                Ok(n) => {
                    self.position = n;
                    self.target = n;
                    self.error = ErrorCode::None;
                    "OK".to_string()
                }
                Err(_) => "ERR?".to_string(),
            },
            ("+", "") => {
                self.east_limit = self.position;
                "OK".to_string()
            }
            ("-", "") => {
                self.west_limit = self.position;
                "OK".to_string()
            }
            ("E", "") => {
                self.limits_enabled = true;
                "OK".to_string()
            }
            ("D", "") => {
                self.limits_enabled = false;
                "OK".to_string()
            }
            _ => "ERR?".to_string(),
        }
    }
}

impl SerialLink for SimulatedLink {
    fn open(&mut self) -> Result<(), LinkError> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn transact(&mut self, command: &str) -> Result<String, LinkError> {
        if !self.opened {
            return Err(LinkError::Fault("link not open".to_string()));
        }
        Ok(self.handle(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn poll(link: &mut SimulatedLink) -> ActuatorStatus {
        link.transact("?").unwrap().parse().unwrap()
    }

    #[test]
    fn test_starts_stopped_at_origin() {
        let mut link = SimulatedLink::new();
        link.open().unwrap();
        let status = poll(&mut link);
        assert_eq!(status.status, StatusCode::Stopped);
        assert_eq!(status.position, 0);
        assert_eq!(status.target, 0);
    }

    #[test]
    fn test_moves_toward_goto_target() {
        let mut link = SimulatedLink::new().with_step_per_poll(25);
        link.open().unwrap();
        assert_eq!(link.transact("G100").unwrap(), "OK");

        let status = poll(&mut link);
        assert_eq!(status.status, StatusCode::MovingEast);
        assert_eq!(status.position, 25);
        assert_eq!(status.target, 100);

        for _ in 0..3 {
            poll(&mut link);
        }
        let status = poll(&mut link);
        assert_eq!(status.status, StatusCode::Stopped);
        assert_eq!(status.position, 100);
    }

    #[test]
    fn test_halt_freezes_target_at_position() {
        let mut link = SimulatedLink::new();
        link.open().unwrap();
        link.transact("G1000").unwrap();
        poll(&mut link);
        assert_eq!(link.transact("H").unwrap(), "OK");
        let status = poll(&mut link);
        assert_eq!(status.status, StatusCode::Stopped);
        assert_eq!(status.target, status.position);
    }

    #[test]
    fn test_goto_clamped_by_enabled_limits() {
        let mut link = SimulatedLink::new();
        link.open().unwrap();
        link.transact("G99999").unwrap();
        let status = poll(&mut link);
        assert_eq!(status.target, status.east_limit);
    }

    #[test]
    fn test_relative_moves_and_disable_limits() {
        let mut link = SimulatedLink::new().with_step_per_poll(10);
        link.open().unwrap();
        assert_eq!(link.transact("D").unwrap(), "OK");
        assert_eq!(link.transact("<30").unwrap(), "OK");
        let status = poll(&mut link);
        assert_eq!(status.status, StatusCode::MovingWest);
        assert_eq!(status.position, -10);
        assert!(!status.limits_enabled);
    }

    #[test]
    fn test_unknown_command_replies_err() {
        let mut link = SimulatedLink::new();
        link.open().unwrap();
        assert_eq!(link.transact("Z").unwrap(), "ERR?");
        assert_eq!(link.transact(">abc").unwrap(), "ERR?");
    }

    #[test]
    fn test_transact_requires_open() {
        let mut link = SimulatedLink::new();
        assert!(link.transact("?").is_err());
    }
}

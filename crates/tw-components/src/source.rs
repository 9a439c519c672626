//! Source components: constants and weekly schedules.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tw_core::ensure_finite;
use tw_graph::{
    ComponentError, ComponentResult, ComponentRole, PortMap, PortSpec, SimPeriod, StepContext,
    Steppable,
};

/// Fixed value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: f64,
}

impl Constant {
    pub fn new(value: f64) -> ComponentResult<Self> {
        ensure_finite(value, "constant value")?;
        Ok(Self { value })
    }
}

impl Steppable for Constant {
    fn kind(&self) -> &str {
        "Constant"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().output("value")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Source
    }

    fn initialize(&mut self, _period: &SimPeriod, output: &mut PortMap) -> ComponentResult<()> {
        output.set_scalar("value", self.value)
    }

    fn do_step(&mut self, _: &StepContext, _: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        output.set_scalar("value", self.value)
    }
}

/// One time window of a ruleset, `[start, end)` within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub start_hour: u32,
    #[serde(default)]
    pub start_minute: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub end_minute: u32,
    pub value: f64,
}

impl ScheduleRule {
    fn start(&self) -> u32 {
        self.start_hour * 60 + self.start_minute
    }

    fn end(&self) -> u32 {
        self.end_hour * 60 + self.end_minute
    }

    fn contains(&self, minute_of_day: u32) -> bool {
        (self.start()..self.end()).contains(&minute_of_day)
    }
}

/// Day profile: the first rule containing the time wins, else the default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub default_value: f64,
    #[serde(default)]
    pub rules: Vec<ScheduleRule>,
}

impl Ruleset {
    pub fn constant(value: f64) -> Self {
        Self {
            default_value: value,
            rules: Vec::new(),
        }
    }

    pub fn value_at(&self, time: NaiveDateTime) -> f64 {
        let minute = time.hour() * 60 + time.minute();
        self.rules
            .iter()
            .find(|r| r.contains(minute))
            .map_or(self.default_value, |r| r.value)
    }

    fn validate(&self) -> ComponentResult<()> {
        ensure_finite(self.default_value, "schedule default value")?;
        for rule in &self.rules {
            ensure_finite(rule.value, "schedule value")?;
            if rule.start_minute >= 60 || rule.end_minute >= 60 || rule.end() > 24 * 60 {
                return Err(ComponentError::InvalidParameter {
                    what: "schedule rule outside of a day",
                });
            }
            if rule.start() >= rule.end() {
                return Err(ComponentError::InvalidParameter {
                    what: "schedule rule must end after it starts",
                });
            }
        }
        Ok(())
    }
}

/// Ruleset for a specific day, taking precedence over weekday/weekend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRuleset {
    pub day: Weekday,
    pub ruleset: Ruleset,
}

/// Weekly schedule producing `scheduleValue` from the step's wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub weekday: Ruleset,
    /// Saturday and Sunday; falls back to `weekday` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend: Option<Ruleset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<DayRuleset>,
}

impl Schedule {
    pub fn new(weekday: Ruleset) -> ComponentResult<Self> {
        weekday.validate()?;
        Ok(Self {
            weekday,
            weekend: None,
            days: Vec::new(),
        })
    }

    pub fn with_weekend(mut self, weekend: Ruleset) -> ComponentResult<Self> {
        weekend.validate()?;
        self.weekend = Some(weekend);
        Ok(self)
    }

    pub fn with_day(mut self, day: Weekday, ruleset: Ruleset) -> ComponentResult<Self> {
        ruleset.validate()?;
        self.days.retain(|d| d.day != day);
        self.days.push(DayRuleset { day, ruleset });
        Ok(self)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        self.weekday.validate()?;
        if let Some(weekend) = &self.weekend {
            weekend.validate()?;
        }
        self.days.iter().try_for_each(|d| d.ruleset.validate())
    }

    fn ruleset_for(&self, day: Weekday) -> &Ruleset {
        if let Some(d) = self.days.iter().find(|d| d.day == day) {
            return &d.ruleset;
        }
        match (day, &self.weekend) {
            (Weekday::Sat | Weekday::Sun, Some(weekend)) => weekend,
            _ => &self.weekday,
        }
    }

    pub fn value_at(&self, time: NaiveDateTime) -> f64 {
        self.ruleset_for(time.weekday()).value_at(time)
    }
}

impl Steppable for Schedule {
    fn kind(&self) -> &str {
        "Schedule"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().output("scheduleValue")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Source
    }

    fn initialize(&mut self, period: &SimPeriod, output: &mut PortMap) -> ComponentResult<()> {
        self.validate()?;
        output.set_scalar("scheduleValue", self.value_at(period.start))
    }

    fn do_step(&mut self, step: &StepContext, _: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        output.set_scalar("scheduleValue", self.value_at(step.date_time))
    }
}

//! Canned anomaly scenarios, each a replay script plus a verdict on its trace.

use isolab::prelude::{
    play_events, Engine, Event, IsolationLevel, Key, ReplayOptions, ReplayTrace, Value,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// An anomaly the demo tries to provoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    DirtyRead,
    DirtyWrite,
    ReadSkew,
    WriteSkew,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::DirtyRead,
        Scenario::DirtyWrite,
        Scenario::ReadSkew,
        Scenario::WriteSkew,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::DirtyRead => "dirty-read",
            Scenario::DirtyWrite => "dirty-write",
            Scenario::ReadSkew => "read-skew",
            Scenario::WriteSkew => "write-skew",
        }
    }

    fn seeds(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Scenario::DirtyRead | Scenario::DirtyWrite => &[("x", "1")],
            Scenario::ReadSkew => &[("x", "50"), ("y", "50")],
            Scenario::WriteSkew => &[("a", "true"), ("b", "true")],
        }
    }

    fn script(&self, level: IsolationLevel) -> Vec<Event> {
        match self {
            // t2 reads x while t1's write is uncommitted
            Scenario::DirtyRead => vec![
                Event::write("t1", level, "x", "2"),
                Event::read("t2", level, "x"),
                Event::commit("t1", level),
                Event::commit("t2", level),
            ],
            // t2 overwrites x while t1's write is uncommitted
            Scenario::DirtyWrite => vec![
                Event::write("t1", level, "x", "2"),
                Event::write("t2", level, "x", "3"),
                Event::commit("t1", level),
                Event::commit("t2", level),
            ],
            // t2 moves 50 from x to y between t1's two reads
            Scenario::ReadSkew => vec![
                Event::read("t1", level, "x"),
                Event::write("t2", level, "x", "0"),
                Event::write("t2", level, "y", "100"),
                Event::commit("t2", level),
                Event::read("t1", level, "y"),
                Event::commit("t1", level),
            ],
            // each clears its own flag after seeing the other's still set
            Scenario::WriteSkew => vec![
                Event::read("t1", level, "b"),
                Event::read("t2", level, "a"),
                Event::write("t1", level, "a", "false"),
                Event::write("t2", level, "b", "false"),
                Event::commit("t1", level),
                Event::commit("t2", level),
            ],
        }
    }

    fn judge(&self, trace: &ReplayTrace) -> Verdict {
        if trace.timed_out {
            return Verdict::Deadlocked;
        }
        let observed = match self {
            Scenario::DirtyRead => trace
                .step(1)
                .map_or(false, |step| !step.blocked && step.observed == Some(Value::from("2"))),
            Scenario::DirtyWrite => trace.step(1).map_or(false, |step| !step.blocked),
            Scenario::ReadSkew => {
                let number = |index| {
                    trace
                        .observed(index)
                        .and_then(|value: &Value| value.as_str().parse::<i64>().ok())
                };
                match (number(0), number(4)) {
                    (Some(x), Some(y)) => x + y != 100,
                    _ => false,
                }
            }
            Scenario::WriteSkew => ["a", "b"].into_iter().all(|key| {
                trace
                    .row(&Key::from(key))
                    .map_or(false, |row| row.committed == "false")
            }),
        };
        if observed {
            Verdict::Observed
        } else {
            Verdict::Prevented
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| format!("unknown scenario: {s}"))
    }
}

/// What happened to the anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Observed,
    Prevented,
    /// The transactions waited on each other until the replay gave up
    Deadlocked,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Observed => "observed",
            Verdict::Prevented => "prevented",
            Verdict::Deadlocked => "prevented (deadlock, timed out)",
        })
    }
}

/// One scenario run under one level.
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub scenario: Scenario,
    pub level: IsolationLevel,
    pub verdict: Verdict,
    pub trace: ReplayTrace,
}

/// Play `scenario` under `level` on a fresh engine.
pub fn run(
    scenario: Scenario,
    level: IsolationLevel,
    options: &ReplayOptions,
) -> isolab::Result<DemoReport> {
    let engine = Engine::builder().default_level(level).build();
    for (key, value) in scenario.seeds() {
        engine.seed(*key, *value);
    }

    let trace = play_events(&scenario.script(level), engine.table(), options)?;
    let verdict = scenario.judge(&trace);
    tracing::debug!(%scenario, %level, %verdict, "demo finished");

    Ok(DemoReport {
        scenario,
        level,
        verdict,
        trace,
    })
}

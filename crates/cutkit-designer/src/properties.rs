//! Per-shape machining parameters and their inheritance rule.
//!
//! Every numeric field can be unset: doubles use NaN and the pass count
//! uses -1. A child's value only overrides the inherited one when it is
//! set. The all-at-once flag is a one-way gate: once an ancestor selects
//! flat execution, descendants can no longer change the depth schedule.

use serde::{Deserialize, Serialize};

/// Sentinel for an unset pass count.
pub const UNSET_COUNT: i32 = -1;

/// Upper bound on the passes a single schedule may hold.
pub const MAX_PASSES: usize = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngravingProperties {
    pub enabled: bool,
    pub power: f64,
    pub feed: f64,
    pub pass_count: i32,
    pub z_start: f64,
    pub pass_depth: f64,
    pub z_end: f64,
    pub all_at_once: bool,
}

impl Default for EngravingProperties {
    fn default() -> Self {
        Self::unset()
    }
}

impl EngravingProperties {
    /// Every field unset; merging this into anything is the identity.
    pub fn unset() -> Self {
        Self {
            enabled: true,
            power: f64::NAN,
            feed: f64::NAN,
            pass_count: UNSET_COUNT,
            z_start: f64::NAN,
            pass_depth: f64::NAN,
            z_end: f64::NAN,
            all_at_once: false,
        }
    }

    pub fn with_feed(mut self, feed: f64) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_passes(mut self, count: i32) -> Self {
        self.pass_count = count;
        self
    }

    /// Depth schedule from `z_start` down to `z_end` in steps of `pass_depth`.
    pub fn with_depth(mut self, z_start: f64, z_end: f64, pass_depth: f64) -> Self {
        self.z_start = z_start;
        self.z_end = z_end;
        self.pass_depth = pass_depth;
        self
    }

    pub fn with_all_at_once(mut self, flat: bool) -> Self {
        self.all_at_once = flat;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn has_feed(&self) -> bool {
        !self.feed.is_nan()
    }

    pub fn has_power(&self) -> bool {
        !self.power.is_nan()
    }

    pub fn has_pass_count(&self) -> bool {
        self.pass_count != UNSET_COUNT
    }

    /// Resolve the effective properties of a child: `self` is what the
    /// ancestors resolved to, `own` is the child's declared value.
    pub fn merge(&self, own: &EngravingProperties) -> EngravingProperties {
        let mut out = *self;
        out.enabled = self.enabled && own.enabled;
        if !own.feed.is_nan() {
            out.feed = own.feed;
        }
        if !own.power.is_nan() {
            out.power = own.power;
        }
        if self.all_at_once {
            return out;
        }
        if !own.z_start.is_nan() {
            out.z_start = own.z_start;
        }
        if !own.z_end.is_nan() {
            out.z_end = own.z_end;
        }
        if !own.pass_depth.is_nan() {
            out.pass_depth = own.pass_depth;
        }
        if own.pass_count != UNSET_COUNT {
            out.pass_count = own.pass_count;
        }
        out.all_at_once = own.all_at_once;
        out
    }

    /// Number of passes the fields ask for, before any cap. Can be
    /// infinite for a vanishing pass depth.
    fn requested_passes(&self) -> f64 {
        let (zs, ze, depth) = (self.z_start, self.z_end, self.pass_depth);
        if !zs.is_nan() && !ze.is_nan() && depth > 0.0 {
            let raw = ((zs - ze) / depth).ceil() + 1.0;
            return if raw.is_nan() { 1.0 } else { raw.max(1.0) };
        }
        if self.pass_count > 0 {
            f64::from(self.pass_count)
        } else {
            1.0
        }
    }

    pub fn exceeds_pass_limit(&self) -> bool {
        self.requested_passes() > MAX_PASSES as f64
    }

    /// Z value of every pass, first to last.
    ///
    /// With start, end and a positive depth the count is
    /// `ceil((start - end) / depth) + 1` (at least 1) and each pass steps
    /// down by `depth`, clamped at `end`. Without a full depth range the
    /// pass count (default 1) repeats at `z_start`, or `z_end`, or with
    /// no Z at all (NaN). The count is capped at [`MAX_PASSES`]; use
    /// [`Self::try_z_schedule`] to treat that as an error.
    pub fn z_schedule(&self) -> Vec<f64> {
        let count = self.requested_passes().min(MAX_PASSES as f64) as usize;
        let (zs, ze, depth) = (self.z_start, self.z_end, self.pass_depth);
        if !zs.is_nan() && !ze.is_nan() && depth > 0.0 {
            return (0..count)
                .map(|i| {
                    let z = zs - depth * i as f64;
                    if z < ze {
                        ze
                    } else {
                        z
                    }
                })
                .collect();
        }
        if !zs.is_nan() && !ze.is_nan() && count > 1 {
            let step = (zs - ze) / (count - 1) as f64;
            return (0..count).map(|i| zs - step * i as f64).collect();
        }
        let z = if !zs.is_nan() { zs } else { ze };
        vec![z; count]
    }

    /// The schedule, or `None` when it would exceed [`MAX_PASSES`].
    pub fn try_z_schedule(&self) -> Option<Vec<f64>> {
        if self.exceeds_pass_limit() {
            None
        } else {
            Some(self.z_schedule())
        }
    }

    pub fn pass_count_resolved(&self) -> usize {
        self.z_schedule().len()
    }

    /// Body of a `(Prop: ...)` line, unset fields left empty.
    pub fn encode(&self) -> String {
        let num = |v: f64| if v.is_nan() { String::new() } else { format!("{}", v) };
        let count = if self.pass_count == UNSET_COUNT {
            String::new()
        } else {
            self.pass_count.to_string()
        };
        format!(
            "{},{},{},{},{},{},{},{}",
            self.enabled,
            num(self.power),
            num(self.feed),
            count,
            num(self.z_start),
            num(self.pass_depth),
            num(self.z_end),
            self.all_at_once
        )
    }

    /// Parse the body of a `(Prop: ...)` line.
    pub fn decode(body: &str) -> Result<Self, String> {
        let fields: Vec<&str> = body.split(',').map(str::trim).collect();
        if fields.len() != 8 {
            return Err(format!("expected 8 fields, found {}", fields.len()));
        }
        let flag = |s: &str, default: bool| -> Result<bool, String> {
            match s.to_ascii_lowercase().as_str() {
                "" => Ok(default),
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                other => Err(format!("invalid flag '{}'", other)),
            }
        };
        let num = |s: &str| -> Result<f64, String> {
            if s.is_empty() {
                Ok(f64::NAN)
            } else {
                s.parse::<f64>()
                    .map_err(|_| format!("invalid number '{}'", s))
            }
        };
        let count = if fields[3].is_empty() {
            UNSET_COUNT
        } else {
            fields[3]
                .parse::<i32>()
                .map_err(|_| format!("invalid pass count '{}'", fields[3]))?
        };
        let props = Self {
            enabled: flag(fields[0], true)?,
            power: num(fields[1])?,
            feed: num(fields[2])?,
            pass_count: count,
            z_start: num(fields[4])?,
            pass_depth: num(fields[5])?,
            z_end: num(fields[6])?,
            all_at_once: flag(fields[7], false)?,
        };
        if props.exceeds_pass_limit() {
            return Err(format!("more than {} passes requested", MAX_PASSES));
        }
        Ok(props)
    }
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

/// Field-by-field equality where two unset values are equal.
impl PartialEq for EngravingProperties {
    fn eq(&self, other: &Self) -> bool {
        self.enabled == other.enabled
            && same(self.power, other.power)
            && same(self.feed, other.feed)
            && self.pass_count == other.pass_count
            && same(self.z_start, other.z_start)
            && same(self.pass_depth, other.pass_depth)
            && same(self.z_end, other.z_end)
            && self.all_at_once == other.all_at_once
    }
}

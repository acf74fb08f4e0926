//! Incremental trailing stop-loss line
//!
//! For every bar `i` the engine emits one value: either `None` (no line yet)
//! or the stop-loss level in force after that bar. Classification is a fixed
//! priority cascade over four predicates - did the close break through
//! yesterday's line, and did the bar print a windowed extreme - and each
//! branch derives its value from a backward scan over prior bars. All inputs
//! to bar `i`'s value are bars `0..=i` and previously emitted values, so the
//! series is append-only.

use log::debug;
use stopline_core::{Bar, Price};

/// Tuning knobs for the stop-loss line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLossConfig {
    /// Lookback window, in bars, for the new-high / new-low extremum tests.
    /// Values below 1 are treated as 1.
    pub period: usize,
    /// Bound backward value scans to the last `2 * period` bars
    pub restrict: bool,
    /// On an immediate break-reversal (broke above yesterday, back below
    /// today), restore the line from two bars ago instead of rescanning
    pub volatile: bool,
    /// Treat a break that follows a fresh extreme as a pullback and restore
    /// the line from before the run-up
    pub backtrack: bool,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            period: 6,
            restrict: false,
            volatile: false,
            backtrack: false,
        }
    }
}

/// Append-only stop-loss state machine over an OHLC series
pub struct StopLossEngine {
    period: usize,
    restrict: bool,
    volatile: bool,
    backtrack: bool,
    open: Vec<Price>,
    close: Vec<Price>,
    high: Vec<Price>,
    low: Vec<Price>,
    stop_loss: Vec<Option<Price>>,
}

impl StopLossEngine {
    pub fn new(config: StopLossConfig) -> Self {
        Self {
            period: config.period.max(1),
            restrict: config.restrict,
            volatile: config.volatile,
            backtrack: config.backtrack,
            open: Vec::new(),
            close: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            stop_loss: Vec::new(),
        }
    }

    /// Number of bars consumed so far
    pub fn len(&self) -> usize {
        self.stop_loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_loss.is_empty()
    }

    /// Every value emitted so far, one per bar
    pub fn series(&self) -> &[Option<Price>] {
        &self.stop_loss
    }

    /// The line in force after the latest bar
    pub fn latest(&self) -> Option<Price> {
        self.stop_loss.last().copied().flatten()
    }

    /// Consume one bar and emit its stop-loss value
    pub fn update(&mut self, bar: &Bar) -> Option<Price> {
        self.open.push(bar.open);
        self.close.push(bar.close);
        self.high.push(bar.high);
        self.low.push(bar.low);

        let i = self.stop_loss.len();
        let value = self.classify(i);
        debug!("bar {i}: close {} -> stop {value:?}", bar.close);
        self.stop_loss.push(value);
        value
    }

    /// The priority cascade. Exactly one branch fires per bar.
    fn classify(&self, i: usize) -> Option<Price> {
        // Warm-up: the extremum window is not filled until bar period-1
        if i + 1 < self.period {
            return None;
        }

        // No line yet: a windowed low starts one, anything else stays flat
        if i == 0 || self.stop_loss[i - 1].is_none() {
            return self.is_new_low(i).then(|| self.initial_value(i));
        }

        let broke_below = self.broke_below(i);
        let broke_above = self.broke_above(i);
        let new_high = self.is_new_high(i);
        let new_low = self.is_new_low(i);

        if broke_below && !new_high {
            if self.volatile && i > 1 && self.broke_above(i - 1) {
                // Immediate reversal of yesterday's upside break: restore
                // the line that was in force before the whipsaw
                self.stop_loss[i - 2]
            } else if self.backtrack && self.is_new_high(i - 1) {
                // Pullback off a fresh high: rewind to the line that held
                // before the run-up began
                match self.last_not_above(i) {
                    Some(j) => self.stop_loss[j - 1],
                    None => self.stop_loss[i - 1],
                }
            } else {
                Some(self.value_on_break_below(i))
            }
        } else if broke_above && !new_low {
            if self.volatile && i > 1 && self.broke_below(i - 1) {
                self.stop_loss[i - 2]
            } else if self.backtrack && self.is_new_low(i - 1) {
                match self.last_not_below(i) {
                    Some(j) => self.stop_loss[j - 1],
                    None => self.stop_loss[i - 1],
                }
            } else {
                Some(self.value_on_break_above(i))
            }
        } else if broke_below && new_high {
            self.value_on_new_high(i)
        } else if broke_above && new_low {
            self.value_on_new_low(i)
        } else if self.above_line(i) && new_high {
            self.value_on_new_high(i)
        } else if self.below_line(i) && new_low {
            self.value_on_new_low(i)
        } else {
            self.stop_loss[i - 1]
        }
    }

    /// Whether `low[i]` ties or sets the minimum over the last `period` bars
    fn is_new_low(&self, i: usize) -> bool {
        let start = i.saturating_sub(self.period - 1);
        self.low[start..=i].iter().min() == Some(&self.low[i])
    }

    /// Whether `high[i]` ties or sets the maximum over the last `period` bars
    fn is_new_high(&self, i: usize) -> bool {
        let start = i.saturating_sub(self.period - 1);
        self.high[start..=i].iter().max() == Some(&self.high[i])
    }

    /// Bar `i` closed on the upper side of yesterday's line.
    ///
    /// An exact touch is classified by the bar's own direction; a doji on the
    /// line inherits the side of the nearest prior bar that resolves one.
    /// Requires `i >= 1`; no line yesterday means no side.
    fn above_line(&self, i: usize) -> bool {
        let Some(line) = self.stop_loss[i - 1] else {
            return false;
        };
        if self.close[i] > line {
            return true;
        }
        if self.close[i] < line {
            return false;
        }
        if self.open[i] > self.close[i] {
            return true;
        }
        if self.open[i] < self.close[i] {
            return false;
        }
        for j in (0..i).rev() {
            let Some(prior) = self.stop_loss[j] else {
                return false;
            };
            if self.close[j] == prior && self.open[j] == self.close[j] {
                continue;
            }
            if self.close[j] > prior {
                return true;
            }
            return self.close[j] == prior && self.open[j] > self.close[j];
        }
        false
    }

    /// Mirror of [`above_line`](Self::above_line)
    fn below_line(&self, i: usize) -> bool {
        let Some(line) = self.stop_loss[i - 1] else {
            return false;
        };
        if self.close[i] < line {
            return true;
        }
        if self.close[i] > line {
            return false;
        }
        if self.open[i] < self.close[i] {
            return true;
        }
        if self.open[i] > self.close[i] {
            return false;
        }
        for j in (0..i).rev() {
            let Some(prior) = self.stop_loss[j] else {
                return false;
            };
            if self.close[j] == prior && self.open[j] == self.close[j] {
                continue;
            }
            if self.close[j] < prior {
                return true;
            }
            return self.close[j] == prior && self.open[j] < self.close[j];
        }
        false
    }

    /// Bar `i` closed strictly above the line after yesterday sat at or
    /// below it. A run of dojis pinned to the line is walked backwards until
    /// a bar resolves which side the market was on. Requires `i >= 1`.
    fn broke_above(&self, i: usize) -> bool {
        let Some(line) = self.stop_loss[i - 1] else {
            return false;
        };
        if self.close[i] <= line {
            return false;
        }
        if self.close[i - 1] < line {
            return true;
        }
        if self.close[i - 1] > line {
            return false;
        }
        if self.open[i - 1] < self.close[i - 1] {
            return true;
        }
        if self.open[i - 1] > self.close[i - 1] {
            return false;
        }
        for j in (0..i - 1).rev() {
            let Some(prior) = self.stop_loss[j] else {
                return false;
            };
            if self.close[j] < prior {
                return true;
            }
            if self.close[j] == prior {
                if self.open[j] < self.close[j] {
                    return true;
                }
                if self.open[j] == self.close[j] {
                    continue;
                }
            }
            return false;
        }
        false
    }

    /// Mirror of [`broke_above`](Self::broke_above)
    fn broke_below(&self, i: usize) -> bool {
        let Some(line) = self.stop_loss[i - 1] else {
            return false;
        };
        if self.close[i] >= line {
            return false;
        }
        if self.close[i - 1] > line {
            return true;
        }
        if self.close[i - 1] < line {
            return false;
        }
        if self.open[i - 1] > self.close[i - 1] {
            return true;
        }
        if self.open[i - 1] < self.close[i - 1] {
            return false;
        }
        for j in (0..i - 1).rev() {
            let Some(prior) = self.stop_loss[j] else {
                return false;
            };
            if self.close[j] > prior {
                return true;
            }
            if self.close[j] == prior {
                if self.open[j] > self.close[j] {
                    return true;
                }
                if self.open[j] == self.close[j] {
                    continue;
                }
            }
            return false;
        }
        false
    }

    /// Inclusive lower index for the restricted backward scans
    fn scan_floor(&self, i: usize) -> usize {
        if self.restrict {
            (i + 1).saturating_sub(2 * self.period)
        } else {
            0
        }
    }

    /// Second successively higher high scanning back from `pivot`, or the
    /// best improvement found, or `pivot` itself
    fn second_higher_high(&self, pivot: Price, from: usize, floor: usize) -> Price {
        let mut pivot = pivot;
        let mut improvements = 0;
        for j in (floor..from).rev() {
            if self.high[j] > pivot {
                pivot = self.high[j];
                improvements += 1;
                if improvements == 2 {
                    return pivot;
                }
            }
        }
        pivot
    }

    /// Mirror of [`second_higher_high`](Self::second_higher_high) over lows
    fn second_lower_low(&self, pivot: Price, from: usize, floor: usize) -> Price {
        let mut pivot = pivot;
        let mut improvements = 0;
        for j in (floor..from).rev() {
            if self.low[j] < pivot {
                pivot = self.low[j];
                improvements += 1;
                if improvements == 2 {
                    return pivot;
                }
            }
        }
        pivot
    }

    /// Seed value for a fresh line: unrestricted scan for the second higher
    /// high behind the current bar
    fn initial_value(&self, i: usize) -> Price {
        self.second_higher_high(self.high[i], i, 0)
    }

    /// Line after a downside break: a resistance level from recent highs
    fn value_on_break_below(&self, i: usize) -> Price {
        self.second_higher_high(self.high[i], i, self.scan_floor(i))
    }

    /// Line after an upside break: a support level from recent lows
    fn value_on_break_above(&self, i: usize) -> Price {
        self.second_lower_low(self.low[i], i, self.scan_floor(i))
    }

    /// Line after a windowed high: a support level from recent lows, keeping
    /// yesterday's line when no second improvement exists
    fn value_on_new_high(&self, i: usize) -> Option<Price> {
        let floor = self.scan_floor(i);
        let mut pivot = self.low[i];
        let mut improvements = 0;
        for j in (floor..i).rev() {
            if self.low[j] < pivot {
                pivot = self.low[j];
                improvements += 1;
                if improvements == 2 {
                    return Some(pivot);
                }
            }
        }
        self.stop_loss[i - 1]
    }

    /// Mirror of [`value_on_new_high`](Self::value_on_new_high) over highs
    fn value_on_new_low(&self, i: usize) -> Option<Price> {
        let floor = self.scan_floor(i);
        let mut pivot = self.high[i];
        let mut improvements = 0;
        for j in (floor..i).rev() {
            if self.high[j] > pivot {
                pivot = self.high[j];
                improvements += 1;
                if improvements == 2 {
                    return Some(pivot);
                }
            }
        }
        self.stop_loss[i - 1]
    }

    /// Most recent bar before `i` (never earlier than bar 2) that did not
    /// sit above the line, marking where the run-up began
    fn last_not_above(&self, i: usize) -> Option<usize> {
        (2..i).rev().find(|&j| !self.above_line(j))
    }

    /// Mirror of [`last_not_above`](Self::last_not_above)
    fn last_not_below(&self, i: usize) -> Option<usize> {
        (2..i).rev().find(|&j| !self.below_line(j))
    }
}

impl Default for StopLossEngine {
    fn default() -> Self {
        Self::new(StopLossConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, close: Decimal, high: Decimal, low: Decimal) -> Bar {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Bar::new(time, open, close, high, low, dec!(1000))
    }

    fn run(config: StopLossConfig, bars: &[Bar]) -> Vec<Option<Decimal>> {
        let mut engine = StopLossEngine::new(config);
        bars.iter().map(|b| engine.update(b)).collect()
    }

    fn config(period: usize) -> StopLossConfig {
        StopLossConfig {
            period,
            restrict: false,
            volatile: false,
            backtrack: false,
        }
    }

    #[test]
    fn test_default_config() {
        let cfg = StopLossConfig::default();
        assert_eq!(cfg.period, 6);
        assert!(!cfg.restrict && !cfg.volatile && !cfg.backtrack);
    }

    #[test]
    fn test_warm_up_emits_no_line() {
        let bars: Vec<Bar> = (0..6)
            .map(|n| {
                let px = Decimal::from(10 + n);
                bar(px, px, px + dec!(1), px - dec!(1))
            })
            .collect();
        for period in 1..=5 {
            let series = run(config(period), &bars);
            for (i, value) in series.iter().enumerate() {
                if i + 1 < period {
                    assert_eq!(*value, None, "period {period}, bar {i}");
                }
            }
        }
    }

    // Downtrend into a reversal: the line seeds at the second higher high
    // behind the first windowed low, then an upside break rebuilds it from
    // the lows.
    #[test]
    fn test_seed_then_upside_break() {
        let bars = [
            bar(dec!(10), dec!(11), dec!(12), dec!(9)),
            bar(dec!(11), dec!(10), dec!(11), dec!(8)),
            bar(dec!(10), dec!(9), dec!(10), dec!(7)),
            bar(dec!(13), dec!(14), dec!(15), dec!(11)),
        ];
        let series = run(config(3), &bars);
        assert_eq!(
            series,
            vec![None, None, Some(dec!(12)), Some(dec!(7))]
        );
    }

    #[test]
    fn test_no_trigger_carries_line_forward() {
        let bars = [
            bar(dec!(10), dec!(11), dec!(12), dec!(9)),
            bar(dec!(11), dec!(10), dec!(11), dec!(8)),
            bar(dec!(10), dec!(9), dec!(10), dec!(7)),
            bar(dec!(13), dec!(14), dec!(15), dec!(11)),
            // Inside bar: above the line, no extreme, no break
            bar(dec!(13), dec!(13), dec!(13), dec!(12)),
        ];
        let series = run(config(3), &bars);
        assert_eq!(series[3], Some(dec!(7)));
        assert_eq!(series[4], Some(dec!(7)));
    }

    // Emitted values never change when later bars change: two series that
    // share a prefix agree on every value of that prefix.
    #[test]
    fn test_emitted_values_are_final() {
        let shared = [
            bar(dec!(10), dec!(11), dec!(12), dec!(9)),
            bar(dec!(11), dec!(10), dec!(11), dec!(8)),
            bar(dec!(10), dec!(9), dec!(10), dec!(7)),
        ];
        let mut rally = shared.to_vec();
        rally.push(bar(dec!(13), dec!(14), dec!(15), dec!(11)));
        let mut slump = shared.to_vec();
        slump.push(bar(dec!(9), dec!(6), dec!(9), dec!(5)));

        let a = run(config(3), &rally);
        let b = run(config(3), &slump);
        assert_eq!(a[..3], b[..3]);
    }

    // A close pinned exactly on the line takes its side from the bar's own
    // direction, and that side decides which branch fires.
    #[test]
    fn test_doji_on_line_resolved_by_bar_direction() {
        let shared = [
            bar(dec!(10), dec!(10), dec!(12), dec!(8)),
            bar(dec!(9), dec!(8), dec!(9), dec!(7)), // seeds the line at 12
            bar(dec!(12), dec!(13), dec!(13), dec!(10)), // break above -> 7
            bar(dec!(9), dec!(8), dec!(9), dec!(6)), // drifts, line holds at 7
        ];

        // Close == line (7) with a down bar: counted below, and the fresh
        // low rebuilds the line from the highs behind it.
        let mut down = shared.to_vec();
        down.push(bar(dec!(6), dec!(7), dec!(8), dec!(5)));
        let series = run(config(2), &down);
        assert_eq!(series[4], Some(dec!(13)));

        // Same close on an up bar: counted above, nothing fires.
        let mut up = shared.to_vec();
        up.push(bar(dec!(8), dec!(7), dec!(8), dec!(5)));
        let series = run(config(2), &up);
        assert_eq!(series[4], Some(dec!(7)));
    }

    // A doji run pinned to the line inherits its side from the bar before
    // the run, so a close through the line still counts as a break.
    #[test]
    fn test_break_resolves_through_doji_run() {
        let bars = [
            bar(dec!(10), dec!(10), dec!(12), dec!(8)),
            bar(dec!(9), dec!(8), dec!(9), dec!(7)), // line at 12
            bar(dec!(12), dec!(12), dec!(12), dec!(11)), // doji pinned on 12
            bar(dec!(12), dec!(13), dec!(13), dec!(12)), // break above
        ];
        let series = run(config(2), &bars);
        assert_eq!(series, vec![None, Some(dec!(12)), Some(dec!(12)), Some(dec!(7))]);
    }

    // volatile: a downside break right after an upside break restores the
    // line from two bars back instead of rescanning.
    #[test]
    fn test_volatile_whipsaw_restores_prior_line() {
        let bars = [
            bar(dec!(10), dec!(10), dec!(12), dec!(8)),
            bar(dec!(9), dec!(8), dec!(9), dec!(7)), // line at 12
            bar(dec!(12), dec!(13), dec!(13), dec!(10)), // breaks above -> 7
            bar(dec!(7), dec!(6), dec!(7), dec!(5)), // breaks back below
        ];
        let cfg = StopLossConfig {
            volatile: true,
            ..config(2)
        };
        assert_eq!(
            run(cfg.clone(), &bars),
            vec![None, Some(dec!(12)), Some(dec!(7)), Some(dec!(12))]
        );

        // Without the flag the same whipsaw rescans the highs
        assert_eq!(run(config(2), &bars)[3], Some(dec!(13)));
    }

    // backtrack: a break that follows a fresh extreme rewinds to the line
    // from before the run began; with no bar on the other side of the line
    // to rewind to, the previous value carries forward.
    #[test]
    fn test_backtrack_pullback() {
        let bars = [
            bar(dec!(10), dec!(10), dec!(12), dec!(8)),
            bar(dec!(9), dec!(8), dec!(9), dec!(7)), // line at 12
            bar(dec!(12), dec!(13), dec!(13), dec!(10)), // break after new low: carry 12
            bar(dec!(13), dec!(14), dec!(15), dec!(11)), // new high above line -> 7
            bar(dec!(6), dec!(5), dec!(6), dec!(4)), // break after new high: carry 7
            bar(dec!(8), dec!(9), dec!(9), dec!(5)), // break after new low: rewind to 12
        ];
        let cfg = StopLossConfig {
            backtrack: true,
            ..config(2)
        };
        assert_eq!(
            run(cfg, &bars),
            vec![
                None,
                Some(dec!(12)),
                Some(dec!(12)),
                Some(dec!(7)),
                Some(dec!(7)),
                Some(dec!(12)),
            ]
        );
    }

    // restrict: the value scan after a break only sees the last 2 * period
    // bars, so an older extreme stops contributing.
    #[test]
    fn test_restrict_bounds_value_scan() {
        let bars = [
            bar(dec!(10), dec!(10), dec!(12), dec!(2)), // deep early low
            bar(dec!(9), dec!(8), dec!(9), dec!(7)),
            bar(dec!(8), dec!(7), dec!(8), dec!(6)), // line seeds at 12
            bar(dec!(9), dec!(10), dec!(10), dec!(5)),
            bar(dec!(11), dec!(13), dec!(13), dec!(10)), // upside break
        ];
        let unrestricted = run(config(2), &bars);
        assert_eq!(unrestricted[4], Some(dec!(2)));

        let cfg = StopLossConfig {
            restrict: true,
            ..config(2)
        };
        let restricted = run(cfg, &bars);
        assert_eq!(restricted[4], Some(dec!(5)));
    }

    #[test]
    fn test_latest_tracks_series() {
        let mut engine = StopLossEngine::new(config(2));
        assert_eq!(engine.latest(), None);
        assert!(engine.is_empty());

        engine.update(&bar(dec!(10), dec!(10), dec!(12), dec!(8)));
        assert_eq!(engine.latest(), None);

        engine.update(&bar(dec!(9), dec!(8), dec!(9), dec!(7)));
        assert_eq!(engine.latest(), Some(dec!(12)));
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.series(), &[None, Some(dec!(12))]);
    }

    #[test]
    fn test_period_one_seeds_immediately() {
        let mut engine = StopLossEngine::new(config(1));
        // A single bar is always its own windowed low
        let value = engine.update(&bar(dec!(10), dec!(11), dec!(12), dec!(9)));
        assert_eq!(value, Some(dec!(12)));
    }
}

//! Reaction-time classification of stimulus blocks.
//!
//! A block starts at a stimulus row (code with the stimulus prefix, `gr_*`)
//! and runs until the next block-end row (`fix` / `anim`). Every row in
//! between is consumed, later stimulus rows included. Within a block the
//! last `disappear`, response (`16`) and `late` times are kept and the
//! block is classified by the first matching rule:
//!
//! | rule | class |
//! | --- | --- |
//! | no disappear marker | 3 |
//! | response before disappear | 0 |
//! | response within the response window | 0 |
//! | late marker present and response after it | 2 |
//! | response past the window, no late marker, within the extended window | 1 |
//! | any other response | 2 |
//! | no response | 2 |
//!
//! An early response gets the same class as an on-time one. This is how the
//! study's tables were produced, so it is kept; [`ResponseBranch`] records
//! which rule fired so the two cases can still be told apart.

use crate::domain::BehaviorConfig;
use crate::io::LogEntry;

/// Numeric response class as written to the trial tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 0: response before the window closed (early responses included).
    Correct,
    /// 1: past the window but inside the extended window.
    ExtendedLate,
    /// 2: late or missing response.
    Late,
    /// 3: no disappear marker; the trial cannot be scored.
    Invalid,
}

impl ResponseClass {
    pub fn code(self) -> u8 {
        match self {
            ResponseClass::Correct => 0,
            ResponseClass::ExtendedLate => 1,
            ResponseClass::Late => 2,
            ResponseClass::Invalid => 3,
        }
    }
}

/// The classification rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBranch {
    NoDisappear,
    EarlyResponse,
    OnTime,
    AfterLateMarker,
    ExtendedWindow,
    VeryLate,
    NoResponseLateMarker,
    NoResponse,
}

impl ResponseBranch {
    pub fn class(self) -> ResponseClass {
        match self {
            ResponseBranch::EarlyResponse | ResponseBranch::OnTime => ResponseClass::Correct,
            ResponseBranch::ExtendedWindow => ResponseClass::ExtendedLate,
            ResponseBranch::AfterLateMarker
            | ResponseBranch::VeryLate
            | ResponseBranch::NoResponseLateMarker
            | ResponseBranch::NoResponse => ResponseClass::Late,
            ResponseBranch::NoDisappear => ResponseClass::Invalid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResponseBranch::NoDisappear => "no_disappear",
            ResponseBranch::EarlyResponse => "early_response",
            ResponseBranch::OnTime => "on_time",
            ResponseBranch::AfterLateMarker => "after_late_marker",
            ResponseBranch::ExtendedWindow => "extended_window",
            ResponseBranch::VeryLate => "very_late",
            ResponseBranch::NoResponseLateMarker => "no_response_late_marker",
            ResponseBranch::NoResponse => "no_response",
        }
    }
}

/// One classified stimulus block.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResponse {
    /// Stimulus code that opened the block.
    pub stimulus: String,
    pub onset: Option<f64>,
    pub class: ResponseClass,
    pub branch: ResponseBranch,
    /// `response - disappear`, whenever both exist.
    pub time_diff: Option<f64>,
}

/// Marker times collected within one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockMarkers {
    pub disappear: Option<f64>,
    pub response: Option<f64>,
    pub late: Option<f64>,
}

/// Apply the classification rules to one block's markers.
pub fn classify_block(markers: BlockMarkers, cfg: &BehaviorConfig) -> (ResponseBranch, Option<f64>) {
    let Some(disappear) = markers.disappear else {
        return (ResponseBranch::NoDisappear, None);
    };

    let Some(response) = markers.response else {
        let branch = if markers.late.is_some() {
            ResponseBranch::NoResponseLateMarker
        } else {
            ResponseBranch::NoResponse
        };
        return (branch, None);
    };

    let diff = response - disappear;
    let window_end = disappear + cfg.response_window_ms;
    let branch = if response < disappear {
        ResponseBranch::EarlyResponse
    } else if response <= window_end {
        ResponseBranch::OnTime
    } else if markers.late.is_some_and(|late| response > late) {
        ResponseBranch::AfterLateMarker
    } else if markers.late.is_none() && diff < cfg.extended_window_ms {
        ResponseBranch::ExtendedWindow
    } else {
        ResponseBranch::VeryLate
    };
    (branch, Some(diff))
}

/// Classify every stimulus block of a behavior log, in log order.
///
/// Marker rows without a parseable time are ignored.
pub fn classify_responses(log: &[LogEntry], cfg: &BehaviorConfig) -> Vec<TrialResponse> {
    let is_block_end = |code: &str| cfg.block_end_codes.iter().any(|c| c == code);

    let mut trials = Vec::new();
    let mut i = 0;
    while i < log.len() {
        let opener = &log[i];
        if !opener.code.starts_with(&cfg.stimulus_prefix) {
            i += 1;
            continue;
        }

        let mut markers = BlockMarkers::default();
        while i < log.len() && !is_block_end(&log[i].code) {
            let entry = &log[i];
            if let Some(t) = entry.time {
                if entry.code == cfg.disappear_code {
                    markers.disappear = Some(t);
                } else if entry.code == cfg.response_code {
                    markers.response = Some(t);
                } else if entry.code == cfg.late_code {
                    markers.late = Some(t);
                }
            }
            i += 1;
        }

        let (branch, time_diff) = classify_block(markers, cfg);
        trials.push(TrialResponse {
            stimulus: opener.code.clone(),
            onset: opener.time,
            class: branch.class(),
            branch,
            time_diff,
        });
    }
    trials
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BehaviorConfig {
        BehaviorConfig::default()
    }

    fn markers(disappear: Option<f64>, response: Option<f64>, late: Option<f64>) -> BlockMarkers {
        BlockMarkers {
            disappear,
            response,
            late,
        }
    }

    #[test]
    fn classification_rules_in_order() {
        let c = cfg();
        let cases = [
            (markers(None, Some(10.0), None), ResponseBranch::NoDisappear, 3, None),
            (markers(Some(1000.0), Some(900.0), None), ResponseBranch::EarlyResponse, 0, Some(-100.0)),
            (markers(Some(1000.0), Some(1000.0), None), ResponseBranch::OnTime, 0, Some(0.0)),
            (markers(Some(1000.0), Some(2700.0), None), ResponseBranch::OnTime, 0, Some(1700.0)),
            (markers(Some(1000.0), Some(5000.0), Some(4000.0)), ResponseBranch::AfterLateMarker, 2, Some(4000.0)),
            (markers(Some(1000.0), Some(5000.0), None), ResponseBranch::ExtendedWindow, 1, Some(4000.0)),
            (markers(Some(1000.0), Some(11_000.0), None), ResponseBranch::VeryLate, 2, Some(10_000.0)),
            // Late marker after the response: not "after late", and the
            // extended rule needs no late marker at all.
            (markers(Some(1000.0), Some(5000.0), Some(6000.0)), ResponseBranch::VeryLate, 2, Some(4000.0)),
            (markers(Some(1000.0), None, Some(4000.0)), ResponseBranch::NoResponseLateMarker, 2, None),
            (markers(Some(1000.0), None, None), ResponseBranch::NoResponse, 2, None),
        ];

        for (m, branch, class, diff) in cases {
            let (got, got_diff) = classify_block(m, &c);
            assert_eq!(got, branch, "{m:?}");
            assert_eq!(got.class().code(), class, "{m:?}");
            assert_eq!(got_diff, diff, "{m:?}");
        }
    }

    #[test]
    fn early_and_on_time_share_a_class() {
        assert_eq!(ResponseBranch::EarlyResponse.class(), ResponseBranch::OnTime.class());
    }

    #[test]
    fn blocks_run_until_fix_or_anim() {
        let log = vec![
            LogEntry::new("anim", 0.0),
            LogEntry::new("gr_1", 100.0),
            LogEntry::new("disappear", 3000.0),
            LogEntry::new("16", 3500.0),
            LogEntry::new("fix", 4000.0),
            LogEntry::new("gr_3", 5000.0),
            // A second stimulus inside the same block is consumed.
            LogEntry::new("gr_4", 5500.0),
            LogEntry::new("16", 5600.0),
            LogEntry::new("anim", 6000.0),
            LogEntry::new("gr_0", 7000.0),
            LogEntry::new("disappear", 9000.0),
        ];

        let trials = classify_responses(&log, &cfg());
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[0].stimulus, "gr_1");
        assert_eq!(trials[0].branch, ResponseBranch::OnTime);
        assert_eq!(trials[0].time_diff, Some(500.0));
        assert_eq!(trials[1].stimulus, "gr_3");
        assert_eq!(trials[1].class, ResponseClass::Invalid);
        // Log ends inside the block.
        assert_eq!(trials[2].branch, ResponseBranch::NoResponse);
    }
}

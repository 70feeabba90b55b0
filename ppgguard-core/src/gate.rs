//! Quality gate
//!
//! Pure accept/reject decision over an [`SqiRecord`]. The default policy
//! accepts when the excess kurtosis of the Chebyshev-filtered series lies
//! strictly inside `(-2, 5)` for every required channel that was captured.
//!
//! The gate fails closed: a captured channel whose statistic could not be
//! computed is a rejection.
//!
//! ```rust
//! use ppgguard_core::{Channel, FilterVariant, GatePolicy, QualityGate, SqiKey, SqiRecord};
//! use ppgguard_core::sqi::DistributionShape;
//!
//! let mut sqi = SqiRecord::new();
//! for (channel, kurtosis) in [(Channel::Red, -1.999), (Channel::Ir, 0.0)] {
//!     let key = SqiKey::new(channel, FilterVariant::Chebyshev);
//!     sqi.insert(key, DistributionShape { skewness: 0.0, kurtosis });
//! }
//!
//! let gate = QualityGate::new(GatePolicy::default());
//! assert!(gate.accept(&sqi));
//! ```

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::constants::quality::{GATE_KURTOSIS_MAX, GATE_KURTOSIS_MIN};
use crate::errors::ScoringError;
use crate::filters::FilterVariant;
use crate::measurement::Channel;
use crate::sqi::{SqiKey, SqiRecord, Statistic};

fn default_channels() -> Vec<Channel> {
    Channel::ALL.to_vec()
}

/// Which statistic is checked, on which series, against which open interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    /// Series the statistic is read from
    pub variant: FilterVariant,
    /// Statistic compared against the bounds
    pub statistic: Statistic,
    /// Exclusive lower bound
    pub lower: f64,
    /// Exclusive upper bound
    pub upper: f64,
    /// Channels that must pass when captured
    pub channels: Vec<Channel>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            variant: FilterVariant::Chebyshev,
            statistic: Statistic::Kurtosis,
            lower: GATE_KURTOSIS_MIN,
            upper: GATE_KURTOSIS_MAX,
            channels: default_channels(),
        }
    }
}

impl GatePolicy {
    /// Check `statistic` of `variant` on both channels
    pub fn new(variant: FilterVariant, statistic: Statistic) -> Self {
        Self {
            variant,
            statistic,
            ..Self::default()
        }
    }

    /// Set the open interval
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Set the required channels
    pub fn channels(mut self, channels: &[Channel]) -> Self {
        self.channels = channels.to_vec();
        self
    }

    /// Strictly inside the bounds
    pub fn within(&self, value: f64) -> bool {
        value.is_finite() && self.lower < value && value < self.upper
    }
}

/// Why a measurement was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Statistic on or outside the bounds
    OutOfBounds {
        /// Offending channel
        channel: Channel,
        /// The statistic's value
        value: f64,
        /// Exclusive lower bound
        lower: f64,
        /// Exclusive upper bound
        upper: f64,
    },
    /// Channel captured but the statistic is absent
    MissingStatistic {
        /// Offending channel
        channel: Channel,
        /// Scoring failure, if the series existed but could not be scored
        cause: Option<ScoringError>,
    },
    /// None of the required channels was captured
    NoScoredChannels,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                channel,
                value,
                lower,
                upper,
            } => write!(f, "{channel} statistic {value} outside ({lower}, {upper})"),
            Self::MissingStatistic {
                channel,
                cause: Some(cause),
            } => write!(f, "{channel} statistic undefined: {cause}"),
            Self::MissingStatistic { channel, cause: None } => {
                write!(f, "{channel} statistic missing")
            }
            Self::NoScoredChannels => f.write_str("no required channel was scored"),
        }
    }
}

/// Gate verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Persist the measurement
    Accept,
    /// Drop the measurement
    Reject(RejectReason),
}

impl GateDecision {
    /// Accepted
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Rejection reason, if rejected
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accept => None,
            Self::Reject(reason) => Some(reason),
        }
    }
}

/// Applies a [`GatePolicy`] to SQI records
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    policy: GatePolicy,
}

impl QualityGate {
    /// Gate with the given policy
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    /// Active policy
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Accept or reject
    pub fn accept(&self, sqi: &SqiRecord) -> bool {
        self.evaluate(sqi).is_accept()
    }

    /// Accept, or reject with the first failing channel
    pub fn evaluate(&self, sqi: &SqiRecord) -> GateDecision {
        let mut checked = 0usize;

        for &channel in &self.policy.channels {
            if !sqi.has_channel(channel) {
                continue;
            }
            checked += 1;

            let Some(value) = sqi.get(channel, self.policy.variant, self.policy.statistic) else {
                let cause = sqi.failure(SqiKey::new(channel, self.policy.variant));
                return GateDecision::Reject(RejectReason::MissingStatistic { channel, cause });
            };

            if !self.policy.within(value) {
                return GateDecision::Reject(RejectReason::OutOfBounds {
                    channel,
                    value,
                    lower: self.policy.lower,
                    upper: self.policy.upper,
                });
            }
        }

        if checked == 0 {
            return GateDecision::Reject(RejectReason::NoScoredChannels);
        }
        GateDecision::Accept
    }
}

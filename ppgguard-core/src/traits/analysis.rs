//! PPG analysis capability
//!
//! Beat-level analysis (cleaning, peak detection, beat segmentation, beat
//! quality) is consumed by review and statistics features, not by the gate.
//! A third-party implementation plugs in here;
//! [`BasicPpgAnalysis`](crate::analysis::BasicPpgAnalysis) is the built-in one.

/// Beat-level analysis of one channel
pub trait PpgAnalysis {
    /// Analysis failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Condition a raw series for peak detection
    fn clean(&self, signal: &[f64], sample_rate: f64) -> Result<Vec<f64>, Self::Error>;

    /// Indices of systolic peaks in a cleaned series, ascending
    fn find_peaks(&self, cleaned: &[f64], sample_rate: f64) -> Result<Vec<usize>, Self::Error>;

    /// Split a cleaned series into per-beat segments
    fn segment(
        &self,
        cleaned: &[f64],
        peaks: &[usize],
        sample_rate: f64,
    ) -> Result<Vec<Vec<f64>>, Self::Error>;

    /// Quality trace, one value per beat
    fn quality(
        &self,
        cleaned: &[f64],
        peaks: &[usize],
        sample_rate: f64,
    ) -> Result<Vec<f64>, Self::Error>;
}

//! Market data port.

use crate::domain::error::BarsignalError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Source of daily or intraday bars for one ticker.
///
/// Implementations must be `Sync` so a batch can fetch from worker threads.
pub trait DataPort: Sync {
    /// Bars for `code` whose calendar day falls within `start_date..=end_date`,
    /// ascending by timestamp.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BarsignalError>;
}

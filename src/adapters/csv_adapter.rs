//! CSV candle feed adapter.
//!
//! Expects a header row `timestamp,open,high,low,close,volume`. Timestamps
//! are epoch milliseconds or RFC 3339. The same file serves both modes:
//! `fetch_candles` returns the slice at once, `poll_next` replays it one
//! bar per call, which is how the paper loop is exercised offline.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::domain::candle::Candle;
use crate::domain::error::VolbreakError;
use crate::ports::data_port::CandleFeed;

pub struct CsvCandleFeed {
    path: PathBuf,
    // Poll cursor; the file is read once on first poll.
    buffered: Option<Vec<Candle>>,
    cursor: usize,
}

impl CsvCandleFeed {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buffered: None,
            cursor: 0,
        }
    }

    fn read_all(&self) -> Result<Vec<Candle>, VolbreakError> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| VolbreakError::Data {
            reason: format!("failed to open {}: {e}", self.path.display()),
        })?;

        let mut candles = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| VolbreakError::Data {
                reason: format!("CSV parse error at record {line}: {e}"),
            })?;
            candles.push(parse_record(&record, line)?);
        }

        if candles.is_empty() {
            return Err(VolbreakError::NoData {
                path: self.path.display().to_string(),
            });
        }
        Ok(candles)
    }
}

impl CandleFeed for CsvCandleFeed {
    fn fetch_candles(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>, VolbreakError> {
        let candles = self
            .read_all()?
            .into_iter()
            .filter(|c| start.is_none_or(|s| c.timestamp >= s))
            .filter(|c| end.is_none_or(|e| c.timestamp <= e))
            .collect::<Vec<_>>();

        if candles.is_empty() {
            return Err(VolbreakError::NoData {
                path: self.path.display().to_string(),
            });
        }
        Ok(candles)
    }

    fn poll_next(&mut self) -> Result<Option<Candle>, VolbreakError> {
        if self.buffered.is_none() {
            self.buffered = Some(self.read_all()?);
        }
        let next = self
            .buffered
            .as_ref()
            .and_then(|candles| candles.get(self.cursor))
            .cloned();
        if next.is_some() {
            self.cursor += 1;
        }
        Ok(next)
    }
}

fn parse_record(record: &csv::StringRecord, line: usize) -> Result<Candle, VolbreakError> {
    let field = |idx: usize, name: &str| -> Result<&str, VolbreakError> {
        record.get(idx).ok_or_else(|| VolbreakError::Data {
            reason: format!("record {line}: missing {name} column"),
        })
    };

    let timestamp = parse_timestamp(field(0, "timestamp")?, line)?;
    let number = |idx: usize, name: &str| -> Result<f64, VolbreakError> {
        field(idx, name)?
            .trim()
            .parse::<f64>()
            .map_err(|e| VolbreakError::Data {
                reason: format!("record {line}: invalid {name}: {e}"),
            })
    };

    Ok(Candle {
        timestamp,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}

fn parse_timestamp(raw: &str, line: usize) -> Result<DateTime<Utc>, VolbreakError> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).ok_or_else(|| VolbreakError::Data {
            reason: format!("record {line}: epoch millis out of range: {millis}"),
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VolbreakError::Data {
            reason: format!("record {line}: invalid timestamp '{raw}': {e}"),
        })
}

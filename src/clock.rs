//! Time keeping for the watch face

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Timelike, Utc,
};

/// Length of a Current Time Service payload
pub const CTS_LEN: usize = 10;

/// Source of the current time for the face
pub trait TimeSource {
    /// Current UTC time
    fn now_utc(&self) -> NaiveDateTime;

    /// Offset of the local time zone
    fn local_offset(&self) -> FixedOffset;

    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64 {
        self.now_utc().and_utc().timestamp_millis().max(0) as u64
    }

    /// Milliseconds until the next multiple of `period_ms` on the wall clock,
    /// a full period when exactly on one
    fn ms_until_next(&self, period_ms: u64) -> u64 {
        period_ms - self.now_ms() % period_ms
    }
}

/// Period of the host's minute tick
pub const MINUTE_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Payload shorter than a CTS record
    TooShort,
    /// Date or time fields out of range
    InvalidDateTime,
    /// Time zone offset out of range
    InvalidOffset,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TooShort => f.write_str("payload too short"),
            Error::InvalidDateTime => f.write_str("invalid date or time"),
            Error::InvalidOffset => f.write_str("invalid time zone offset"),
        }
    }
}

pub struct TimeReference {
    /// Clock time (UTC)
    time: NaiveDateTime,
    /// Uptime at which `time` was taken
    uptime_ms: u64,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: DateTime::<Utc>::UNIX_EPOCH.naive_utc(),
            uptime_ms: 0,
        }
    }
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime, uptime_ms: u64) -> Self {
        Self { time, uptime_ms }
    }

    /// Create new time reference from seconds since the Unix epoch
    pub fn from_epoch(secs: i64, uptime_ms: u64) -> Result<Self, Error> {
        let time = DateTime::<Utc>::UNIX_EPOCH.naive_utc()
            .checked_add_signed(Duration::seconds(secs))
            .ok_or(Error::InvalidDateTime)?;
        Ok(Self::from_datetime(time, uptime_ms))
    }

    /// Create new time reference from Current Time Service data
    pub fn from_cts_bytes(bytes: &[u8], uptime_ms: u64) -> Result<Self, Error> {
        if bytes.len() < CTS_LEN {
            return Err(Error::TooShort);
        }

        let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
        let month = bytes[2] as u32;
        let day = bytes[3] as u32;
        let hour = bytes[4] as u32;
        let min = bytes[5] as u32;
        let sec = bytes[6] as u32;
        // bytes[7] is the day of week
        let milli = bytes[8] as u32 * 1000 / 256; // Convert fractions_256 to milliseconds

        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
            .ok_or(Error::InvalidDateTime)?;

        Ok(Self::from_datetime(time, uptime_ms))
    }

    /// Time at the given uptime
    fn at(&self, uptime_ms: u64) -> NaiveDateTime {
        let elapsed = uptime_ms.saturating_sub(self.uptime_ms) as i64;
        self.time
            .checked_add_signed(Duration::milliseconds(elapsed))
            .unwrap_or(self.time)
    }
}

/// Wall clock driven by the system uptime
pub struct WallClock {
    reference: TimeReference,
    offset: FixedOffset,
}

impl Default for WallClock {
    fn default() -> Self {
        Self::init(TimeReference::default())
    }
}

impl WallClock {
    /// Initialize time measurement on boot
    pub fn init(reference: TimeReference) -> Self {
        Self {
            reference,
            offset: Utc.fix(),
        }
    }

    /// Update time reference
    pub fn set_time(&mut self, reference: TimeReference) {
        self.reference = reference;
    }

    /// Set the local time zone from a BLE Local Time Information record.
    ///
    /// The zone is given in 15 minute steps, the DST offset in the units of
    /// the DST Offset characteristic (0, 2, 4 or 8 quarter hours, 255 unknown).
    pub fn set_local_time_info(&mut self, zone: i8, dst: u8) -> Result<(), Error> {
        if !(-48..=56).contains(&zone) {
            return Err(Error::InvalidOffset);
        }
        let dst_quarters = match dst {
            0 | 2 | 4 | 8 => dst as i32,
            255 => 0,
            _ => return Err(Error::InvalidOffset),
        };
        self.set_offset_secs((zone as i32 + dst_quarters) * 15 * 60)
    }

    /// Set the local time zone as seconds east of UTC
    pub fn set_offset_secs(&mut self, secs: i32) -> Result<(), Error> {
        self.offset = FixedOffset::east_opt(secs).ok_or(Error::InvalidOffset)?;
        Ok(())
    }

    /// Read the clock at the given uptime
    pub fn at(&self, uptime_ms: u64) -> ClockReading {
        ClockReading {
            utc: self.reference.at(uptime_ms),
            offset: self.offset,
        }
    }
}

/// A single reading of the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    utc: NaiveDateTime,
    offset: FixedOffset,
}

impl ClockReading {
    pub fn new(utc: NaiveDateTime, offset: FixedOffset) -> Self {
        Self { utc, offset }
    }
}

impl TimeSource for ClockReading {
    fn now_utc(&self) -> NaiveDateTime {
        self.utc
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Local time as shown on the face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Hour on the 12 hour clock (1..=12)
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub meridiem: Meridiem,
    pub date: NaiveDate,
}

impl TimeSample {
    /// Sample the local time of a time source
    pub fn now(source: &impl TimeSource, offset: FixedOffset) -> Self {
        let utc = source.now_utc();
        let local = utc
            .checked_add_signed(Duration::seconds(offset.local_minus_utc() as i64))
            .unwrap_or(utc);
        Self::from_datetime(&local)
    }

    pub fn from_datetime(local: &NaiveDateTime) -> Self {
        let (pm, hours) = local.hour12();
        Self {
            hours,
            minutes: local.minute(),
            seconds: local.second(),
            meridiem: if pm { Meridiem::Pm } else { Meridiem::Am },
            date: local.date(),
        }
    }

    /// Format the time into `buf`, `H:MM` in ambient mode and `H:MM:SS AM`
    /// otherwise.
    pub fn format_time<'a>(
        &self,
        buf: &'a mut [u8],
        ambient: bool,
    ) -> Result<&'a str, core::fmt::Error> {
        if ambient {
            format_no_std::show(buf, format_args!("{}:{:02}", self.hours, self.minutes))
        } else {
            format_no_std::show(
                buf,
                format_args!(
                    "{}:{:02}:{:02} {}",
                    self.hours,
                    self.minutes,
                    self.seconds,
                    self.meridiem.as_str()
                ),
            )
        }
    }

    /// Format the date into `buf` as `DOW, MON DD YYYY`
    pub fn format_date<'a>(&self, buf: &'a mut [u8]) -> Result<&'a str, core::fmt::Error> {
        format_no_std::show(
            buf,
            format_args!(
                "{}, {} {:02} {}",
                WEEKDAYS[self.date.weekday().num_days_from_monday() as usize],
                MONTHS[self.date.month0() as usize],
                self.date.day(),
                self.date.year()
            ),
        )
    }
}

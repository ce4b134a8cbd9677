use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{Result, TimestampError};

/// timestamp - Date/time/timezone moments of arbitrary precision.
///
/// The variant is the precision tag: a timestamp at day precision or coarser
/// carries no offset, and only fractional-second precision carries a
/// fraction, so the construction invariants of the data model are enforced
/// by the shape of the type. Constructors still validate component ranges.
///
/// Timestamps follow the W3C note on date and time formats in text, ending
/// with a literal `T` when coarser than whole-day precision. Local-time
/// offsets are minutes from UTC; `None` is the RFC 3339 "unknown local
/// offset" (written `-00:00`), which differs from an offset of zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Year {
        year: u16,
    },
    Month {
        year: u16,
        month: u8,
    },
    Day {
        year: u16,
        month: u8,
        day: u8,
    },
    Minute {
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    },
    Second {
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },
    FractionalSecond {
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        /// Digits of the fraction; the value is `coefficient * 10^exponent`.
        fraction_coefficient: BigUint,
        /// Always negative; `-exponent` is the declared digit count, so a
        /// coefficient of 10 with exponent -3 is `.010`, not `.10`.
        fraction_exponent: i32,
    },
}

/// The coarsest-significant field a timestamp carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    FractionalSecond,
}

fn check_range(component: &'static str, value: i64, low: i64, high: i64) -> Result<()> {
    if value < low || value > high {
        return Err(TimestampError::ComponentRange { component, value }.into());
    }
    Ok(())
}

fn check_date(year: u16, month: u8, day: u8) -> Result<()> {
    check_range("year", i64::from(year), 1, 9999)?;
    check_range("month", i64::from(month), 1, 12)?;
    if time::Date::try_from_ymd(i32::from(year), month, day).is_err() {
        return Err(TimestampError::DayOutOfRange { year, month, day }.into());
    }
    Ok(())
}

fn check_time(hour: u8, minute: u8, second: u8, offset: Option<i16>) -> Result<()> {
    check_range("hour", i64::from(hour), 0, 23)?;
    check_range("minute", i64::from(minute), 0, 59)?;
    check_range("second", i64::from(second), 0, 59)?;
    if let Some(offset) = offset {
        check_range("offset", i64::from(offset), -1439, 1439)?;
    }
    Ok(())
}

impl Timestamp {
    pub fn year(year: u16) -> Result<Self> {
        check_range("year", i64::from(year), 1, 9999)?;
        Ok(Timestamp::Year { year })
    }

    pub fn month(year: u16, month: u8) -> Result<Self> {
        check_range("year", i64::from(year), 1, 9999)?;
        check_range("month", i64::from(month), 1, 12)?;
        Ok(Timestamp::Month { year, month })
    }

    pub fn day(year: u16, month: u8, day: u8) -> Result<Self> {
        check_date(year, month, day)?;
        Ok(Timestamp::Day { year, month, day })
    }

    pub fn minute(
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    ) -> Result<Self> {
        check_date(year, month, day)?;
        check_time(hour, minute, 0, offset)?;
        Ok(Timestamp::Minute {
            offset,
            year,
            month,
            day,
            hour,
            minute,
        })
    }

    pub fn second(
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self> {
        check_date(year, month, day)?;
        check_time(hour, minute, second, offset)?;
        Ok(Timestamp::Second {
            offset,
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fractional_second(
        offset: Option<i16>,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        fraction_coefficient: BigUint,
        fraction_exponent: i32,
    ) -> Result<Self> {
        check_date(year, month, day)?;
        check_time(hour, minute, second, offset)?;
        if fraction_exponent >= 0 {
            return Err(TimestampError::FractionExponent(fraction_exponent).into());
        }
        let limit = num_traits::pow(
            BigUint::from(10u8),
            fraction_exponent.unsigned_abs() as usize,
        );
        if fraction_coefficient >= limit {
            return Err(TimestampError::FractionOutOfRange.into());
        }
        Ok(Timestamp::FractionalSecond {
            offset,
            year,
            month,
            day,
            hour,
            minute,
            second,
            fraction_coefficient,
            fraction_exponent,
        })
    }

    pub fn precision(&self) -> Precision {
        match self {
            Timestamp::Year { .. } => Precision::Year,
            Timestamp::Month { .. } => Precision::Month,
            Timestamp::Day { .. } => Precision::Day,
            Timestamp::Minute { .. } => Precision::Minute,
            Timestamp::Second { .. } => Precision::Second,
            Timestamp::FractionalSecond { .. } => Precision::FractionalSecond,
        }
    }

    /// Minutes from UTC. `None` both for unknown offsets and for
    /// date-precision timestamps, which never carry one.
    pub fn offset_minutes(&self) -> Option<i16> {
        match self {
            Timestamp::Year { .. } | Timestamp::Month { .. } | Timestamp::Day { .. } => None,
            Timestamp::Minute { offset, .. }
            | Timestamp::Second { offset, .. }
            | Timestamp::FractionalSecond { offset, .. } => *offset,
        }
    }

    /// The declared digit count of the fractional seconds, which may exceed
    /// the count of significant digits (`.10` has fractional precision 2).
    pub fn fractional_precision(&self) -> Option<u32> {
        match self {
            Timestamp::FractionalSecond {
                fraction_exponent, ..
            } => Some(fraction_exponent.unsigned_abs()),
            _ => None,
        }
    }

    pub(crate) fn components(&self) -> TimestampComponents<'_> {
        match *self {
            Timestamp::Year { year } => TimestampComponents {
                year,
                ..TimestampComponents::default()
            },
            Timestamp::Month { year, month } => TimestampComponents {
                year,
                month: Some(month),
                ..TimestampComponents::default()
            },
            Timestamp::Day { year, month, day } => TimestampComponents {
                year,
                month: Some(month),
                day: Some(day),
                ..TimestampComponents::default()
            },
            Timestamp::Minute {
                offset,
                year,
                month,
                day,
                hour,
                minute,
            } => TimestampComponents {
                year,
                month: Some(month),
                day: Some(day),
                hour: Some(hour),
                minute: Some(minute),
                offset,
                ..TimestampComponents::default()
            },
            Timestamp::Second {
                offset,
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => TimestampComponents {
                year,
                month: Some(month),
                day: Some(day),
                hour: Some(hour),
                minute: Some(minute),
                second: Some(second),
                offset,
                ..TimestampComponents::default()
            },
            Timestamp::FractionalSecond {
                offset,
                year,
                month,
                day,
                hour,
                minute,
                second,
                ref fraction_coefficient,
                fraction_exponent,
            } => TimestampComponents {
                year,
                month: Some(month),
                day: Some(day),
                hour: Some(hour),
                minute: Some(minute),
                second: Some(second),
                fraction: Some((fraction_coefficient, fraction_exponent)),
                offset,
            },
        }
    }

    /// The UTC instant as (seconds since the julian epoch, fractional
    /// seconds), available only when the local offset is known.
    fn instant(&self) -> Option<(i64, (BigUint, i32))> {
        let c = self.components();
        let offset = c.offset?;
        let date = time::Date::try_from_ymd(
            i32::from(c.year),
            c.month.unwrap_or(1),
            c.day.unwrap_or(1),
        )
        .ok()?;
        let seconds = date.julian_day() * 86_400
            + i64::from(c.hour.unwrap_or(0)) * 3_600
            + i64::from(c.minute.unwrap_or(0)) * 60
            + i64::from(c.second.unwrap_or(0))
            - i64::from(offset) * 60;
        let fraction = match c.fraction {
            Some((coefficient, exponent)) => (coefficient.clone(), exponent),
            None => (BigUint::zero(), -1),
        };
        Some((seconds, fraction))
    }
}

/// A flattened view of the fields, `None` below the declared precision.
#[derive(Default)]
pub(crate) struct TimestampComponents<'a> {
    pub year: u16,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
    pub fraction: Option<(&'a BigUint, i32)>,
    pub offset: Option<i16>,
}

fn compare_fractions(a: (BigUint, i32), b: (BigUint, i32)) -> Ordering {
    let (ca, ea) = a;
    let (cb, eb) = b;
    let common = ea.min(eb);
    let scale = |c: BigUint, e: i32| -> BigUint {
        c * num_traits::pow(BigUint::from(10u8), (e - common) as usize)
    };
    scale(ca, ea).cmp(&scale(cb, eb))
}

/// Ordered by instant-of-time when both offsets are known; incomparable
/// otherwise. Equality stays structural, so `2000-01-01T00:00Z` and
/// `2000-01-01T01:00+01:00` compare `Some(Equal)` yet are not `==`.
impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (sa, fa) = self.instant()?;
        let (sb, fb) = other.instant()?;
        Some(sa.cmp(&sb).then_with(|| compare_fractions(fa, fb)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn offset(f: &mut fmt::Formatter<'_>, offset: Option<i16>) -> fmt::Result {
            match offset {
                None => f.write_str("-00:00"),
                Some(0) => f.write_str("Z"),
                Some(minutes) => {
                    let sign = if minutes < 0 { '-' } else { '+' };
                    let magnitude = minutes.unsigned_abs();
                    write!(f, "{}{:02}:{:02}", sign, magnitude / 60, magnitude % 60)
                }
            }
        }

        match self {
            Timestamp::Year { year } => write!(f, "{:04}T", year),
            Timestamp::Month { year, month } => write!(f, "{:04}-{:02}T", year, month),
            Timestamp::Day { year, month, day } => {
                write!(f, "{:04}-{:02}-{:02}", year, month, day)
            }
            Timestamp::Minute {
                offset: o,
                year,
                month,
                day,
                hour,
                minute,
            } => {
                write!(
                    f,
                    "{:04}-{:02}-{:02}T{:02}:{:02}",
                    year, month, day, hour, minute
                )?;
                offset(f, *o)
            }
            Timestamp::Second {
                offset: o,
                year,
                month,
                day,
                hour,
                minute,
                second,
            } => {
                write!(
                    f,
                    "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                )?;
                offset(f, *o)
            }
            Timestamp::FractionalSecond {
                offset: o,
                year,
                month,
                day,
                hour,
                minute,
                second,
                fraction_coefficient,
                fraction_exponent,
            } => {
                let width = fraction_exponent.unsigned_abs() as usize;
                write!(
                    f,
                    "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:0>width$}",
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    second,
                    fraction_coefficient.to_str_radix(10),
                    width = width
                )?;
                offset(f, *o)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn constructors_validate_ranges() {
        assert!(Timestamp::year(0).is_err());
        assert!(Timestamp::month(2000, 13).is_err());
        assert!(Timestamp::day(2001, 2, 29).is_err());
        assert!(Timestamp::day(2000, 2, 29).is_ok());
        assert!(Timestamp::minute(Some(1440), 2000, 1, 1, 0, 0).is_err());
        assert!(Timestamp::second(Some(0), 2000, 1, 1, 23, 59, 60).is_err());
    }

    #[test]
    fn fraction_must_be_proper() {
        assert!(Timestamp::fractional_second(
            Some(0),
            2000,
            1,
            1,
            0,
            0,
            0,
            BigUint::from(456u32),
            -3
        )
        .is_ok());
        // 456 * 10^-2 is 4.56, not a fraction of a second
        assert!(Timestamp::fractional_second(
            Some(0),
            2000,
            1,
            1,
            0,
            0,
            0,
            BigUint::from(456u32),
            -2
        )
        .is_err());
        assert!(Timestamp::fractional_second(
            Some(0),
            2000,
            1,
            1,
            0,
            0,
            0,
            BigUint::from(0u32),
            0
        )
        .is_err());
    }

    #[test]
    fn fractional_precision_counts_digits() {
        let t = Timestamp::fractional_second(
            Some(0),
            2000,
            1,
            1,
            0,
            0,
            0,
            BigUint::from(10u32),
            -3,
        )
        .unwrap();
        assert_eq!(t.fractional_precision(), Some(3));
        assert_eq!(t.to_string(), "2000-01-01T00:00:00.010Z");
    }

    #[test]
    fn text_forms() {
        assert_eq!(Timestamp::year(1997).unwrap().to_string(), "1997T");
        assert_eq!(Timestamp::month(1997, 7).unwrap().to_string(), "1997-07T");
        assert_eq!(
            Timestamp::day(1997, 7, 16).unwrap().to_string(),
            "1997-07-16"
        );
        assert_eq!(
            Timestamp::minute(None, 2007, 2, 23, 0, 0).unwrap().to_string(),
            "2007-02-23T00:00-00:00"
        );
        assert_eq!(
            Timestamp::second(Some(-8 * 60), 2007, 2, 23, 20, 14, 33)
                .unwrap()
                .to_string(),
            "2007-02-23T20:14:33-08:00"
        );
    }

    #[test]
    fn ordering_is_by_instant() {
        let utc = Timestamp::second(Some(0), 2000, 1, 1, 12, 0, 0).unwrap();
        let plus_one = Timestamp::second(Some(60), 2000, 1, 1, 13, 0, 0).unwrap();
        assert_eq!(utc.partial_cmp(&plus_one), Some(Ordering::Equal));
        assert_ne!(utc, plus_one);

        let unknown = Timestamp::second(None, 2000, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(utc.partial_cmp(&unknown), None);
    }
}

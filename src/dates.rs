use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime, Time};

pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s.trim(), DATE_FORMAT)
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("date {0} has no following day")]
pub struct OutOfRange(pub Date);

/// `[start, end)` of a UTC calendar day. Fails on the last representable date.
pub fn day_range(date: Date) -> Result<(OffsetDateTime, OffsetDateTime), OutOfRange> {
    let next = date.next_day().ok_or(OutOfRange(date))?;
    Ok((
        date.with_time(Time::MIDNIGHT).assume_utc(),
        next.with_time(Time::MIDNIGHT).assume_utc(),
    ))
}

/// Serde adapter for `YYYY-MM-DD` dates.
pub mod iso_date {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        let text = date.format(DATE_FORMAT).map_err(S::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let text = String::deserialize(d)?;
        super::parse_date(&text).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
            let text: Option<String> = Option::deserialize(d)?;
            text.map(|t| super::super::parse_date(&t).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2025-03-09").unwrap(), date!(2025 - 03 - 09));
        assert!(parse_date("09/03/2025").is_err());
    }

    #[test]
    fn day_range_covers_one_utc_day() {
        let (start, end) = day_range(date!(2025 - 03 - 09)).unwrap();
        assert_eq!(start, datetime!(2025-03-09 0:00 UTC));
        assert_eq!(end, datetime!(2025-03-10 0:00 UTC));
    }

    #[test]
    fn last_representable_day_is_out_of_range() {
        let last = parse_date("9999-12-31").unwrap();
        assert_eq!(day_range(last), Err(OutOfRange(last)));
        assert!(day_range(date!(9999 - 12 - 30)).is_ok());
    }
}

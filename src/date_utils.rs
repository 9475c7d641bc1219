//! Shared date helpers (epoch conversion, Spark date patterns).

use chrono::{Local, NaiveDate};

/// Unix epoch (1970-01-01) as NaiveDate. Used for date/day-count conversions.
#[inline]
pub(crate) fn epoch_naive_date() -> NaiveDate {
    NaiveDate::default()
}

/// Days since the Unix epoch, the physical representation of a Polars `Date`.
pub(crate) fn naive_date_to_days(d: NaiveDate) -> i32 {
    d.signed_duration_since(epoch_naive_date()).num_days() as i32
}

pub(crate) fn days_to_naive_date(days: i32) -> Option<NaiveDate> {
    epoch_naive_date().checked_add_signed(chrono::TimeDelta::days(days as i64))
}

/// Today's date on the local clock (Spark `current_date` uses the session time zone).
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Map a Spark/Java `SimpleDateFormat` pattern to a chrono strftime pattern.
///
/// Letters are consumed in runs (`yyyy`, `MM`, `dd`, ...); text in single quotes is copied
/// verbatim. Unknown letters are passed through unchanged.
pub(crate) fn spark_format_to_chrono(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(spec);
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_round_trip() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let days = naive_date_to_days(d);
        assert_eq!(days, 19783);
        assert_eq!(days_to_naive_date(days), Some(d));
        assert_eq!(naive_date_to_days(epoch_naive_date()), 0);
    }

    #[test]
    fn spark_patterns_translate() {
        assert_eq!(spark_format_to_chrono("dd-MM-yyyy"), "%d-%m-%Y");
        assert_eq!(spark_format_to_chrono("yyyy/MM/dd HH:mm:ss"), "%Y/%m/%d %H:%M:%S");
        assert_eq!(spark_format_to_chrono("E, MMM d"), "%a, %b %-d");
        assert_eq!(spark_format_to_chrono("yyyy'T'MM"), "%YT%m");
        assert_eq!(spark_format_to_chrono("100%"), "100%%");
    }
}

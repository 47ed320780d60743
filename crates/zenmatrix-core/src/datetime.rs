use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;

/// Parse a due-date expression from the command line. Accepted forms:
/// `now`, `today`, `tomorrow`, `yesterday`, a day offset like `3d` or
/// `+10d`, a plain `YYYY-MM-DD`, or a full RFC 3339 timestamp. Calendar
/// dates resolve to UTC midnight, which is also how they go on the wire.
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Ok(now),
        "today" => return midnight(now.date_naive()),
        "tomorrow" => return Ok(parse_date_expr("today", now)? + Duration::days(1)),
        "yesterday" => return Ok(parse_date_expr("today", now)? - Duration::days(1)),
        _ => {}
    }

    let offset_re = Regex::new(r"^\+?(\d{1,4})d$")
        .map_err(|err| anyhow!("internal regex compile failure: {err}"))?;
    if let Some(captures) = offset_re.captures(&lower) {
        let days: i64 = captures[1].parse().context("invalid day offset")?;
        return Ok(parse_date_expr("today", now)? + Duration::days(days));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return midnight(date);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(token) {
        return Ok(parsed.with_timezone(&Utc));
    }

    Err(anyhow!("unrecognized date expression: {input}"))
}

fn midnight(date: NaiveDate) -> anyhow::Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("failed to construct midnight for {date}"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::parse_date_expr;

    #[test]
    fn keywords_and_offsets() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();

        assert_eq!(parse_date_expr("now", now).expect("now"), now);
        assert_eq!(parse_date_expr("today", now).expect("today"), today);
        assert_eq!(
            parse_date_expr("tomorrow", now).expect("tomorrow"),
            today + Duration::days(1)
        );
        assert_eq!(
            parse_date_expr("+3d", now).expect("offset"),
            today + Duration::days(3)
        );
    }

    #[test]
    fn calendar_dates_and_rfc3339() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();

        assert_eq!(
            parse_date_expr("2026-04-01", now).expect("calendar date"),
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_expr("2026-04-01T10:00:00Z", now).expect("rfc3339"),
            Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
        );
        assert!(parse_date_expr("next blue moon", now).is_err());
    }
}

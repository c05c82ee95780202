//! Degrees/minutes/seconds text to decimal degrees.
//!
//! Accepts the loose notations found in the wild: `-20° 47' 26.37`,
//! `20°47′26″`, ``47`20 06.09E``, `20° 47' 26.37 W`. Degrees are 1-2 digits,
//! minutes and seconds exactly 2 digits, optionally followed by a fraction of
//! seconds.

use crate::error::{Error, Result};

pub(crate) fn parse_degrees(text: &str) -> Result<f64> {
    let err = || Error::MalformedText(format!("invalid sexagesimal value `{text}`"));
    let chars: Vec<char> = text.chars().collect();
    let mut pos = chars
        .iter()
        .position(|c| c.is_ascii_digit())
        .ok_or_else(err)?;
    let negative = (pos > 0 && chars[pos - 1] == '-') || text.contains(|c| c == 'W' || c == 'S');

    let deg = take_digits(&chars, &mut pos, 1, 2).ok_or_else(err)?;
    skip_non_digits(&chars, &mut pos);
    let min = take_digits(&chars, &mut pos, 2, 2).ok_or_else(err)?;
    skip_non_digits(&chars, &mut pos);
    let sec = take_digits(&chars, &mut pos, 2, 2).ok_or_else(err)?;

    // Fraction of seconds, only when introduced by a decimal point
    let mut seconds = sec;
    if chars.get(pos) == Some(&'.') {
        pos += 1;
        if let Some(frac) = take_digits(&chars, &mut pos, 1, 3) {
            seconds.push('.');
            seconds.push_str(&frac);
        }
    }

    let deg: f64 = deg.parse().map_err(|_| err())?;
    let min: f64 = min.parse().map_err(|_| err())?;
    let seconds: f64 = seconds.parse().map_err(|_| err())?;
    let value = deg + (min * 60.0 + seconds) / 3600.0;
    Ok(if negative { -value } else { value })
}

fn take_digits(chars: &[char], pos: &mut usize, min: usize, max: usize) -> Option<String> {
    let digits: String = chars[*pos..]
        .iter()
        .take(max)
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() < min {
        return None;
    }
    *pos += digits.len();
    Some(digits)
}

fn skip_non_digits(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && !chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn with_seconds_fraction() -> Result<()> {
        assert!(close(parse_degrees("-20° 47' 26.37")?, -20.790658, 0.00001));
        assert!(close(parse_degrees("20° 47' 26.378")?, 20.790658, 0.00001));
        Ok(())
    }

    #[test]
    fn without_seconds_fraction() -> Result<()> {
        assert!(close(parse_degrees("-20°47′26″")?, -20.790555, 0.00001));
        assert!(close(parse_degrees("20°47′26″")?, 20.790555, 0.00001));
        Ok(())
    }

    #[test]
    fn hemisphere_markers() -> Result<()> {
        assert!(close(parse_degrees("20° 47' 26.37 W")?, -20.790658, 0.00001));
        assert!(close(parse_degrees("20° 47' 26.37 S")?, -20.790658, 0.00001));
        assert!(close(parse_degrees("47`20 06.09E")?, 47.335025, 0.000001));
        assert!(close(parse_degrees("22`50 77.35N")?, 22.8548194, 0.000001));
        assert!(close(parse_degrees("22`50 77.35S")?, -22.8548194, 0.000001));
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_degrees("north").is_err());
        assert!(parse_degrees("12° 3").is_err());
    }
}

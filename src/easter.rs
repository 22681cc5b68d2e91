use jiff::civil::Date;

/// The first year in which the Gregorian calendar was in use.
///
/// Easter dates computed for years before this one are meaningless, so
/// callers are expected to reject them before asking for a computation.
pub const GREGORIAN_FLOOR: i16 = 1583;

/// The last year that dates can be computed for.
pub const MAX_YEAR: i16 = 9999;

/// Returns the date of Easter Sunday in the given Gregorian year.
///
/// This is the anonymous Gregorian algorithm (sometimes attributed to Meeus,
/// Jones and Butcher). It is a fixed sequence of integer divisions that never
/// fails for a year in the range `1583..=9999`.
///
/// Callers must check the lower bound themselves. See `GREGORIAN_FLOOR`.
pub fn compute_easter(year: i16) -> Date {
    let y = i32::from(year);
    let a = y % 19;
    let b = y / 100;
    let c = y % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let n = h + l - 7 * m + 114;
    // Both of these are small positive integers for any positive year: the
    // month is always 3 or 4 and the day is always in 1..=31.
    let month = (n / 31) as i8;
    let day = ((n % 31) + 1) as i8;
    jiff::civil::date(year, month, day)
}

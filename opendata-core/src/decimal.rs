//! Exact decimal arithmetic on numeric text.
//!
//! Report helpers round and rescale measurement values that arrive as text.
//! Going through `f64` would turn `0.125` into `0.12` under half-up rounding,
//! so values are kept as an unscaled digit string plus a scale instead.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Largest number of fraction digits (or trailing integer zeros) a value may
/// carry. Parsing and rescaling beyond it fail instead of allocating.
pub const MAX_SCALE: i32 = 1_000;

/// `digits × 10^-scale`, sign kept separately. `digits` never has leading
/// zeros except for the single digit of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    digits: Vec<u8>,
    scale: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError {
    input: String,
}

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a decimal number", self.input)
    }
}

impl std::error::Error for ParseDecimalError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
    HalfUp,
    Ceiling,
}

impl Decimal {
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: vec![0],
            scale: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.iter().all(|d| *d == 0)
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    /// Divides by `10^places` without any rounding. `None` when the result
    /// would leave the `±MAX_SCALE` range.
    pub fn shift_right(&self, places: i32) -> Option<Decimal> {
        let scale = checked_scale(self.scale.checked_add(places)?)?;
        Some(Decimal {
            scale,
            ..self.clone()
        })
    }

    /// Rounds half away from zero to exactly `decimals` fraction digits
    /// (zeros are appended when the value has fewer). `None` when `decimals`
    /// is outside `±MAX_SCALE`.
    pub fn round_half_up(&self, decimals: i32) -> Option<Decimal> {
        Some(self.rescale(checked_scale(decimals)?, Rounding::HalfUp))
    }

    /// Rounds toward positive infinity to `decimals` fraction digits.
    pub fn round_ceiling(&self, decimals: i32) -> Option<Decimal> {
        Some(self.rescale(checked_scale(decimals)?, Rounding::Ceiling))
    }

    /// Keeps `significant` leading digits, rounding half up.
    pub fn round_significant(&self, significant: u32) -> Decimal {
        if self.is_zero() {
            return Decimal::zero();
        }
        let precision = i64::try_from(self.digits.len()).unwrap_or(i64::MAX);
        let significant = i64::from(significant.max(1));
        if precision <= significant {
            return self.clone();
        }
        // dropping digits only lowers the scale; clamp keeps it representable
        let target = (i64::from(self.scale) - (precision - significant)).max(i64::from(i32::MIN));
        self.rescale(target as i32, Rounding::HalfUp)
    }

    /// Drops zeros after the decimal point.
    pub fn strip_trailing_zeros(&self) -> Decimal {
        if self.is_zero() {
            return Decimal::zero();
        }
        let mut out = self.clone();
        while out.scale > 0 && out.digits.len() > 1 && out.digits.last() == Some(&0) {
            out.digits.pop();
            out.scale -= 1;
        }
        out
    }

    /// Plain notation, never an exponent: `1E+3` prints as `1000`.
    pub fn to_plain_string(&self) -> String {
        let mut out = String::new();
        if self.is_negative() {
            out.push('-');
        }
        let digits: String = self.digits.iter().map(|d| char::from(b'0' + d)).collect();
        if self.scale <= 0 {
            out.push_str(&digits);
            if !self.is_zero() {
                out.extend(std::iter::repeat('0').take((-self.scale) as usize));
            }
            return out;
        }
        let scale = self.scale as usize;
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            out.push_str(int);
            out.push('.');
            out.push_str(frac);
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take(scale - digits.len()));
            out.push_str(&digits);
        }
        out
    }

    /// Numeric ordering; `1.0` and `1` compare equal.
    pub fn compare(&self, other: &Decimal) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            _ => {}
        }
        let scale = self.scale.max(other.scale);
        let a = self.rescale(scale, Rounding::HalfUp).digits;
        let b = other.rescale(scale, Rounding::HalfUp).digits;
        let magnitude = a.len().cmp(&b.len()).then_with(|| a.cmp(&b));
        if self.is_negative() {
            magnitude.reverse()
        } else {
            magnitude
        }
    }

    pub fn to_f64(&self) -> f64 {
        // plain decimal text always parses as f64
        self.to_plain_string().parse().unwrap_or(f64::NAN)
    }

    /// Callers keep `target` and `self.scale` within `±MAX_SCALE` whenever
    /// `target` is the larger one, so the zero padding stays bounded.
    fn rescale(&self, target: i32, mode: Rounding) -> Decimal {
        if target >= self.scale {
            let pad = (i64::from(target) - i64::from(self.scale)) as usize;
            let mut digits = self.digits.clone();
            digits.extend(std::iter::repeat(0).take(pad));
            return Decimal {
                negative: self.negative,
                digits,
                scale: target,
            }
            .normalized();
        }

        let drop = usize::try_from(i64::from(self.scale) - i64::from(target))
            .unwrap_or(usize::MAX);
        let len = self.digits.len();
        let (kept, dropped): (Vec<u8>, &[u8]) = if drop >= len {
            (vec![0], &self.digits[..])
        } else {
            (self.digits[..len - drop].to_vec(), &self.digits[len - drop..])
        };

        let round_up = match mode {
            Rounding::HalfUp => {
                let first_dropped = if drop > len { 0 } else { dropped[0] };
                first_dropped >= 5
            }
            Rounding::Ceiling => !self.negative && dropped.iter().any(|d| *d != 0),
        };

        let mut digits = kept;
        if round_up {
            increment(&mut digits);
        }
        Decimal {
            negative: self.negative,
            digits,
            scale: target,
        }
        .normalized()
    }

    fn normalized(mut self) -> Decimal {
        let leading = self
            .digits
            .iter()
            .take_while(|d| **d == 0)
            .count()
            .min(self.digits.len().saturating_sub(1));
        self.digits.drain(..leading);
        if self.digits.is_empty() {
            self.digits.push(0);
        }
        if self.is_zero() {
            self.negative = false;
        }
        self
    }
}

fn checked_scale(scale: i32) -> Option<i32> {
    (-MAX_SCALE..=MAX_SCALE).contains(&scale).then_some(scale)
}

fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

/// Accepts an optional sign, digits with an optional fraction, and an
/// optional `e`/`E` exponent. Values whose scale falls outside `±MAX_SCALE`
/// are rejected.
impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError {
            input: s.to_string(),
        };
        let text = s.trim();
        let (negative, rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exponent) = match rest.find(|c| c == 'e' || c == 'E') {
            Some(pos) => {
                let exp: i32 = rest[pos + 1..].parse().map_err(|_| err())?;
                (&rest[..pos], exp)
            }
            None => (rest, 0),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let digits = int.bytes().chain(frac.bytes()).map(|b| b - b'0').collect();
        let scale = i32::try_from(frac.len())
            .ok()
            .and_then(|frac| frac.checked_sub(exponent))
            .and_then(checked_scale)
            .ok_or_else(err)?;
        Ok(Decimal {
            negative,
            digits,
            scale,
        }
        .normalized())
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal {
            negative: value < 0,
            digits: value
                .unsigned_abs()
                .to_string()
                .bytes()
                .map(|b| b - b'0')
                .collect(),
            scale: 0,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}
